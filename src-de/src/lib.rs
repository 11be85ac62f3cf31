//! Differential evolution optimizers in pure Rust using ndarray
//!
//! Two cooperating engines:
//! - [`lde`]: a single-objective DE/best/1 variant meant to refine an
//!   existing solution, with a temporal-locality secondary trial and
//!   age-based reinitialization of individuals.
//! - [`mode`]: a multi-objective DE/current-to-rand/1 optimizer that can
//!   switch to an NSGA-II style population update (SBX + polynomial
//!   mutation), with enhanced multiple-constraint ranking, an ask/tell
//!   driver and delayed-update parallel function evaluation.
//!
//! Supported features:
//! - Box constraints (lower/upper bounds) or unbounded search anchored at
//!   the incumbent via an adaptive normal mixture
//! - Mixed-integer decision variables (per-coordinate integrality mask)
//! - Oscillating F/CR parameters; elitist sampling (`pareto_update`)
//! - Deterministic runs for a fixed seed in serial mode
//! - Bounded worker pool evaluating the objective out of order
//! - C-callable entry points in [`ffi`]

use ndarray::Array2;

pub mod error;
pub mod fitness;
pub mod ffi;
pub mod lde;
pub mod mode;
pub mod parallel_eval;
pub mod ranking;

pub(crate) mod integer_mutation;
pub(crate) mod sort_index;
pub(crate) mod variation;

pub use error::OptimizeError;
pub use fitness::{Fitness, Objective};
pub use lde::{optimize_lde, LdeConfig, LdeConfigBuilder, LdeOptimizer, LdeReport};
pub use mode::{optimize_mode, ModeConfig, ModeConfigBuilder, ModeOptimizer, ModeReport};
pub use parallel_eval::Evaluator;

/// Information passed to the progress callback every `log_period`
/// iterations. Matrices hold one individual per row; the first `popsize`
/// rows are the current population, the rest the offspring slots.
pub struct ModeIntermediate {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub iter: usize,
}

/// Action returned by the progress callback
pub enum CallbackAction {
    Continue,
    Stop,
}
