//! Vector-valued benchmark problems for multi-objective optimizers
//!
//! All objectives are minimized. Functions return one value per objective.

use ndarray::Array1;

/// ZDT1: two objectives over n >= 2 variables in [0, 1].
/// The Pareto front is f2 = 1 - sqrt(f1) with f1 in [0, 1], reached at
/// x[1..] = 0.
pub fn zdt1(x: &Array1<f64>) -> Array1<f64> {
    let n = x.len();
    let f1 = x[0];
    let g = 1.0 + 9.0 * x.iter().skip(1).sum::<f64>() / (n - 1) as f64;
    let f2 = g * (1.0 - (f1 / g).sqrt());
    Array1::from(vec![f1, f2])
}

/// Schaffer N.1 generalized to n variables: f1 = sum(x_i^2),
/// f2 = sum((x_i - 2)^2). Pareto set is the segment between 0 and 2.
pub fn schaffer_n1(x: &Array1<f64>) -> Array1<f64> {
    let f1 = x.iter().map(|&xi| xi * xi).sum();
    let f2 = x.iter().map(|&xi| (xi - 2.0).powi(2)).sum();
    Array1::from(vec![f1, f2])
}

/// Binh-Korn objectives (2D), usually paired with the two constraints from
/// the constrained module. Bounds: x1 in [0, 5], x2 in [0, 3].
pub fn binh_korn(x: &Array1<f64>) -> Array1<f64> {
    let f1 = 4.0 * x[0] * x[0] + 4.0 * x[1] * x[1];
    let f2 = (x[0] - 5.0).powi(2) + (x[1] - 5.0).powi(2);
    Array1::from(vec![f1, f2])
}
