//! Test function implementations organized by category
//!
//! - `unimodal`: single-optimum functions (bowl-shaped, valley-shaped)
//! - `multimodal`: multi-optimum functions with many local minima
//! - `multiobjective`: vector-valued benchmark problems
//! - `constrained`: objectives with inequality constraints

pub mod unimodal;
pub mod multimodal;
pub mod multiobjective;
pub mod constrained;

pub use unimodal::*;
pub use multimodal::*;
pub use multiobjective::*;
pub use constrained::*;
