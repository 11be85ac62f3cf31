use std::any::Any;

use thiserror::Error;

/// Errors surfaced by the optimization drivers.
///
/// Numeric anomalies in the objective never reach this type; they are
/// absorbed by the fitness wrapper. Only structural failures end up here.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("parallel evaluator disconnected: {0}")]
    WorkerPool(String),
}

/// Best-effort extraction of a panic payload for logging.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
