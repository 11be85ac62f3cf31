//! Optimization test functions library
//!
//! A collection of benchmark functions used to validate the diffevo
//! optimizers. Functions are organized by category:
//!
//! - **Unimodal**: single global optimum functions (sphere, rosenbrock, ...)
//! - **Multimodal**: functions with many local minima (ackley, rastrigin, ...)
//! - **Multiobjective**: vector-valued functions (ZDT1, Binh-Korn, ...)
//! - **Constrained**: objectives paired with inequality constraints
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array1;
//! use diffevo_testfunctions::*;
//!
//! let x = Array1::from_vec(vec![0.0, 0.0]);
//! assert_eq!(sphere(&x), 0.0);
//! ```

use ndarray::Array2;

pub mod functions;
pub use functions::*;

/// Create bounds matrix for optimization (2 x n matrix)
/// bounds[[0, i]] = lower bound, bounds[[1, i]] = upper bound
pub fn create_bounds(n: usize, lower: f64, upper: f64) -> Array2<f64> {
    Array2::from_shape_fn((2, n), |(i, _)| if i == 0 { lower } else { upper })
}
