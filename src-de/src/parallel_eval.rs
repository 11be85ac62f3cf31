//! Bounded worker pool for objective evaluation
//!
//! Workers pull decision vectors off a task queue, evaluate them against
//! the shared fitness wrapper and push `(y, id)` pairs back in completion
//! order. The driver blocks in [`Evaluator::result`]; dropping the
//! evaluator closes the queue, lets in-flight work finish and joins the
//! threads. Engine state never crosses into the workers; they only touch
//! the objective and the atomic evaluation counter.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use ndarray::Array1;

use crate::error::{panic_message, OptimizeError};
use crate::fitness::{Fitness, COERCED_INFINITY};

type Task = (Array1<f64>, usize);
type Completed = (Array1<f64>, usize);

pub struct Evaluator {
    task_tx: Option<Sender<Task>>,
    result_rx: Receiver<Completed>,
    workers: Vec<JoinHandle<()>>,
}

impl Evaluator {
    /// Spawn `workers` threads sharing the fitness wrapper.
    pub fn new(fitfun: Arc<Fitness>, workers: usize) -> Self {
        let (task_tx, task_rx) = bounded::<Task>(2 * workers.max(1));
        let (result_tx, result_rx) = unbounded::<Completed>();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let fit = fitfun.clone();
            handles.push(std::thread::spawn(move || {
                while let Ok((x, id)) = rx.recv() {
                    let y = match catch_unwind(AssertUnwindSafe(|| fit.eval(&x))) {
                        Ok(y) => y,
                        Err(payload) => {
                            // an objective panic ends the run but must not
                            // wedge the driver waiting on this result
                            log::error!(
                                "objective raised in worker: {}",
                                panic_message(&payload)
                            );
                            fit.set_terminate();
                            Array1::from_elem(fit.nres(), COERCED_INFINITY)
                        }
                    };
                    if tx.send((y, id)).is_err() {
                        break;
                    }
                }
            }));
        }
        Self {
            task_tx: Some(task_tx),
            result_rx,
            workers: handles,
        }
    }

    /// Queue `x` for evaluation; `id` is handed back with the result.
    pub fn evaluate(&self, x: Array1<f64>, id: usize) {
        if let Some(tx) = &self.task_tx {
            let _ = tx.send((x, id));
        }
    }

    /// Next completed evaluation, in completion order (which may differ
    /// from submission order).
    pub fn result(&self) -> Result<Completed, OptimizeError> {
        self.result_rx
            .recv()
            .map_err(|_| OptimizeError::WorkerPool("all workers exited".to_string()))
    }
}

impl Drop for Evaluator {
    fn drop(&mut self) {
        // closing the task channel stops the workers after their current
        // task; unread results are discarded with the receiver
        self.task_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Objective;
    use ndarray::Array1;
    use std::collections::HashSet;

    #[test]
    fn test_all_results_delivered() {
        let func: Objective = Arc::new(|x: &Array1<f64>| {
            Array1::from(vec![x.iter().map(|v| v * v).sum()])
        });
        let fit = Arc::new(Fitness::new(func, 2, 1, None, None));
        let pool = Evaluator::new(fit.clone(), 4);
        for id in 0..20 {
            pool.evaluate(Array1::from_elem(2, id as f64), id);
        }
        let mut seen = HashSet::new();
        for _ in 0..20 {
            let (y, id) = pool.result().unwrap();
            assert_eq!(y[0], (id * id * 2) as f64);
            seen.insert(id);
        }
        assert_eq!(seen.len(), 20);
        assert_eq!(fit.evaluations(), 20);
    }

    #[test]
    fn test_worker_panic_sets_terminate() {
        let func: Objective = Arc::new(|x: &Array1<f64>| {
            if x[0] < 0.0 {
                panic!("bad input");
            }
            Array1::from(vec![x[0]])
        });
        let fit = Arc::new(Fitness::new(func, 1, 1, None, None));
        let pool = Evaluator::new(fit.clone(), 2);
        pool.evaluate(Array1::from(vec![-1.0]), 0);
        let (y, id) = pool.result().unwrap();
        assert_eq!(id, 0);
        assert_eq!(y[0], COERCED_INFINITY);
        assert!(fit.terminate());
    }
}
