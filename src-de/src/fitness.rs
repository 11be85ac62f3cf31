//! Bounds-aware wrapper around the user objective
//!
//! Holds the decision-space bounds, the integer-coordinate flags and the
//! incumbent-anchored sampling state shared by both engines. Evaluation
//! coerces non-finite objective values to a large sentinel and counts every
//! call atomically, so the wrapper can be shared across evaluation workers
//! while the sampling state stays with the driver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Non-finite objective values are replaced by this sentinel.
pub const COERCED_INFINITY: f64 = 1e99;

/// Vector-valued objective: `nobj` objective values optionally followed by
/// `ncon` constraint values (feasible when <= 0). All objectives minimized.
pub type Objective = Arc<dyn Fn(&Array1<f64>) -> Array1<f64> + Send + Sync>;

pub struct Fitness {
    func: Objective,
    dim: usize,
    nres: usize,
    lower: Option<Array1<f64>>,
    upper: Option<Array1<f64>>,
    scale: Array1<f64>,
    ints: Option<Vec<bool>>,
    xmean: Array1<f64>,
    sigma0: Array1<f64>,
    sigma: Array1<f64>,
    max_sigma: Array1<f64>,
    evaluations: AtomicUsize,
    terminated: AtomicBool,
}

impl Fitness {
    /// Wrap `func` returning `nres` values over a `dim`-dimensional box.
    /// Either both bounds are given or neither.
    pub fn new(
        func: Objective,
        dim: usize,
        nres: usize,
        lower: Option<Array1<f64>>,
        upper: Option<Array1<f64>>,
    ) -> Self {
        let scale = match (&lower, &upper) {
            (Some(lo), Some(up)) => up - lo,
            _ => Array1::ones(dim),
        };
        let xmean = match (&lower, &upper) {
            (Some(lo), Some(up)) => (lo + up) * 0.5,
            _ => Array1::zeros(dim),
        };
        let sigma0 = &scale * 0.5;
        Self {
            func,
            dim,
            nres,
            lower,
            upper,
            max_sigma: &scale * 0.25,
            sigma: sigma0.clone(),
            sigma0,
            scale,
            ints: None,
            xmean,
            evaluations: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        }
    }

    /// Anchor the sampling distribution at `guess` with the per-coordinate
    /// relative deviation `input_sigma` (normalized over the bounds).
    pub fn with_guess(mut self, guess: Array1<f64>, input_sigma: &Array1<f64>) -> Self {
        self.sigma0 = (&self.scale * input_sigma) * 0.5;
        self.sigma = self.sigma0.clone();
        self.xmean = guess;
        self
    }

    /// Mark discrete decision variables. They are rounded to the nearest
    /// integer before every evaluation.
    pub fn with_ints(mut self, ints: Option<Vec<bool>>) -> Self {
        self.ints = ints.filter(|v| v.iter().any(|&b| b));
        self
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nres(&self) -> usize {
        self.nres
    }

    pub fn bounded(&self) -> bool {
        self.lower.is_some()
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn ints(&self) -> Option<&[bool]> {
        self.ints.as_deref()
    }

    /// Evaluate the objective. Integer coordinates are rounded on a copy,
    /// non-finite results coerced, and the evaluation counter bumped.
    pub fn eval(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut y = match &self.ints {
            Some(_) => {
                let mut xr = x.clone();
                self.round_integers(&mut xr);
                (self.func)(&xr)
            }
            None => (self.func)(x),
        };
        for v in y.iter_mut() {
            if !v.is_finite() {
                *v = COERCED_INFINITY;
            }
        }
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        y
    }

    /// Single-objective convenience accessor.
    pub fn eval_scalar(&self, x: &Array1<f64>) -> f64 {
        self.eval(x)[0]
    }

    pub fn round_integers(&self, x: &mut Array1<f64>) {
        if let Some(ints) = &self.ints {
            for (i, &is_int) in ints.iter().enumerate() {
                if is_int {
                    x[i] = x[i].round();
                }
            }
        }
    }

    /// Bounds-only predicate for a single coordinate.
    pub fn feasible(&self, i: usize, v: f64) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(up)) => v >= lo[i] && v <= up[i],
            _ => true,
        }
    }

    /// Clamp every coordinate into the box; identity when unbounded.
    pub fn closest_feasible(&self, x: &Array1<f64>) -> Array1<f64> {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(up)) => {
                Array1::from_shape_fn(x.len(), |i| x[i].clamp(lo[i], up[i]))
            }
            _ => x.clone(),
        }
    }

    /// Clamp a matrix of row vectors in place.
    pub fn clamp_rows(&self, x: &mut Array2<f64>) {
        if let (Some(lo), Some(up)) = (&self.lower, &self.upper) {
            for mut row in x.rows_mut() {
                for i in 0..row.len() {
                    row[i] = row[i].clamp(lo[i], up[i]);
                }
            }
        }
    }

    /// Uniform in the box when bounded, incumbent-anchored normal otherwise.
    pub fn sample(&self, rng: &mut StdRng) -> Array1<f64> {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(_)) => Array1::from_shape_fn(self.dim, |i| {
                lo[i] + self.scale[i] * rng.random::<f64>()
            }),
            _ => self.norm_x(rng),
        }
    }

    /// One-dimensional version of [`sample`](Self::sample).
    pub fn sample_i(&self, i: usize, rng: &mut StdRng) -> f64 {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(_)) => lo[i] + self.scale[i] * rng.random::<f64>(),
            _ => self.norm_x_i(i, rng),
        }
    }

    /// Draw from the incumbent-anchored normal: a 50/50 mixture of the
    /// initial and the adaptive sigma, clamped into the box. The mixture
    /// keeps coverage when the adaptive sigma collapses.
    pub fn norm_x(&self, rng: &mut StdRng) -> Array1<f64> {
        let sdev = if rng.random::<f64>() < 0.5 {
            &self.sigma0
        } else {
            &self.sigma
        };
        let x = Array1::from_shape_fn(self.dim, |i| {
            let n: f64 = rng.sample(StandardNormal);
            self.xmean[i] + sdev[i] * n
        });
        self.closest_feasible(&x)
    }

    /// One-dimensional incumbent-anchored draw; rejects until feasible.
    pub fn norm_x_i(&self, i: usize, rng: &mut StdRng) -> f64 {
        let sdev = if rng.random::<f64>() < 0.5 {
            self.sigma0[i]
        } else {
            self.sigma[i]
        };
        loop {
            let n: f64 = rng.sample(StandardNormal);
            let v = self.xmean[i] + sdev * n;
            if self.feasible(i, v) {
                return v;
            }
        }
    }

    /// Shrink the adaptive sigma towards the step that produced the new
    /// incumbent `x`, capped at a quarter of the bounds span per coordinate.
    pub fn update_sigma(&mut self, x: &Array1<f64>) {
        for i in 0..self.dim {
            let delta = 0.5 * (self.xmean[i] - x[i]).abs();
            self.sigma[i] = delta.min(self.max_sigma[i]);
        }
        self.xmean.assign(x);
    }

    /// Coordinate normalized over the bounds, in [0, 1].
    pub fn norm_i(&self, i: usize, v: f64) -> f64 {
        match &self.lower {
            Some(lo) => ((v - lo[i]) / self.scale[i]).clamp(0.0, 1.0),
            None => 0.5,
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn reset_evaluations(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
    }

    pub fn terminate(&self) -> bool {
        self.terminated.load(Ordering::Relaxed)
    }

    pub fn set_terminate(&self) {
        self.terminated.store(true, Ordering::Relaxed);
    }
}
