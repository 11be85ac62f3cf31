//! Local differential evolution on the DE/best/1 strategy
//!
//! Meant to further refine an existing solution: the whole population starts
//! at the caller's guess and the sampling distribution is anchored there
//! with per-variable deviations normalized over the bounds. Two deviations
//! from standard DE:
//! a) a temporal-locality secondary trial reusing the successful step
//!    direction around the incumbent best,
//! b) reinitialization of individuals based on their age.
//!
//! Supported features:
//! - Box constraints with per-variable feasibility repair inside crossover
//! - Oscillating F/CR parameters between generations
//! - Mixed-integer variables via the integrality mask
//! - Optional stop-fitness threshold for early exit

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::panic_message;
use crate::fitness::{Fitness, Objective};
use crate::integer_mutation::modify;

/// Configuration for the local DE optimizer
pub struct LdeConfig {
    /// Population size (None = 15 * dimension)
    pub popsize: Option<usize>,
    pub max_evaluations: usize,
    /// Expected individual lifetime without improvement, in iterations
    pub keep: f64,
    /// Early exit once the best fitness drops below this (must be finite
    /// to take effect)
    pub stop_fitness: f64,
    pub f0: f64,
    pub cr0: f64,
    /// Mutation rate range for integer variables
    pub min_mutate: f64,
    pub max_mutate: f64,
    /// Random seed (None = OS entropy)
    pub seed: Option<u64>,
    /// Print objective best at each iteration
    pub disp: bool,
}

impl Default for LdeConfig {
    fn default() -> Self {
        Self {
            popsize: None,
            max_evaluations: 50_000,
            keep: 30.0,
            stop_fitness: f64::NEG_INFINITY,
            f0: 0.5,
            cr0: 0.9,
            min_mutate: 0.1,
            max_mutate: 0.5,
            seed: None,
            disp: false,
        }
    }
}

/// Fluent builder for `LdeConfig`
pub struct LdeConfigBuilder {
    cfg: LdeConfig,
}

impl LdeConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: LdeConfig::default() }
    }
    pub fn popsize(mut self, v: usize) -> Self {
        self.cfg.popsize = Some(v);
        self
    }
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.cfg.max_evaluations = v;
        self
    }
    pub fn keep(mut self, v: f64) -> Self {
        self.cfg.keep = v;
        self
    }
    pub fn stop_fitness(mut self, v: f64) -> Self {
        self.cfg.stop_fitness = v;
        self
    }
    pub fn f0(mut self, v: f64) -> Self {
        self.cfg.f0 = v;
        self
    }
    pub fn cr0(mut self, v: f64) -> Self {
        self.cfg.cr0 = v;
        self
    }
    pub fn min_mutate(mut self, v: f64) -> Self {
        self.cfg.min_mutate = v;
        self
    }
    pub fn max_mutate(mut self, v: f64) -> Self {
        self.cfg.max_mutate = v;
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    pub fn disp(mut self, v: bool) -> Self {
        self.cfg.disp = v;
        self
    }
    pub fn build(self) -> LdeConfig {
        self.cfg
    }
}

impl Default for LdeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result/Report of an LDE optimization run
#[derive(Clone)]
pub struct LdeReport {
    pub x: Array1<f64>,
    pub fun: f64,
    /// Whether the stop-fitness threshold was reached
    pub success: bool,
    pub message: String,
    pub nit: usize,
    pub nfev: usize,
    pub population: Array2<f64>,
    pub population_energies: Array1<f64>,
}

impl fmt::Debug for LdeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdeReport")
            .field("x", &format!("len={}", self.x.len()))
            .field("fun", &self.fun)
            .field("success", &self.success)
            .field("message", &self.message)
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field(
                "population",
                &format!("{}x{}", self.population.nrows(), self.population.ncols()),
            )
            .field(
                "population_energies",
                &format!("len={}", self.population_energies.len()),
            )
            .finish()
    }
}

/// Local differential evolution optimizer
pub struct LdeOptimizer {
    fitfun: Fitness,
    dim: usize,
    popsize: usize,
    max_evaluations: usize,
    keep: f64,
    stop_fitness: f64,
    f0: f64,
    cr0: f64,
    min_mutate: f64,
    max_mutate: f64,
    disp: bool,
    rng: StdRng,
    pop_x: Array2<f64>,
    pop_y: Array1<f64>,
    pop_iter: Vec<usize>,
    best_i: usize,
    best_x: Array1<f64>,
    best_y: f64,
    iterations: usize,
    stop: i32,
}

impl LdeOptimizer {
    /// Create a new optimizer refining `guess` within the optional bounds.
    /// `input_sigma` gives the initial per-variable deviation relative to
    /// the bounds span.
    pub fn new(
        func: Objective,
        guess: Array1<f64>,
        input_sigma: Array1<f64>,
        bounds: Option<(Array1<f64>, Array1<f64>)>,
        ints: Option<Vec<bool>>,
        config: LdeConfig,
    ) -> Self {
        let dim = guess.len();
        let (lower, upper) = match bounds {
            Some((lo, up)) => (Some(lo), Some(up)),
            None => (None, None),
        };
        let fitfun = Fitness::new(func, dim, 1, lower, upper)
            .with_guess(guess.clone(), &input_sigma)
            .with_ints(ints);
        let popsize = config.popsize.unwrap_or(15 * dim);
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut pop_x = Array2::zeros((popsize, dim));
        for mut row in pop_x.rows_mut() {
            row.assign(&guess);
        }
        Self {
            fitfun,
            dim,
            popsize,
            max_evaluations: config.max_evaluations,
            keep: config.keep,
            stop_fitness: config.stop_fitness,
            f0: config.f0,
            cr0: config.cr0,
            min_mutate: config.min_mutate,
            max_mutate: config.max_mutate,
            disp: config.disp,
            rng,
            pop_x,
            pop_y: Array1::from_elem(popsize, f64::INFINITY),
            pop_iter: vec![0; popsize],
            best_i: 0,
            best_x: guess,
            best_y: f64::INFINITY,
            iterations: 0,
            stop: 0,
        }
    }

    /// Run the generation loop until the evaluation budget is spent or the
    /// stop-fitness threshold is crossed.
    pub fn solve(&mut self) -> LdeReport {
        'outer: while self.fitfun.evaluations() < self.max_evaluations {
            self.iterations += 1;
            let cr = if self.iterations % 2 == 0 { 0.5 * self.cr0 } else { self.cr0 };
            let f = if self.iterations % 2 == 0 { 0.5 * self.f0 } else { self.f0 };

            for p in 0..self.popsize {
                if self.fitfun.evaluations() >= self.max_evaluations {
                    break 'outer;
                }
                let xp = self.pop_x.row(p).to_owned();
                let xb = self.pop_x.row(self.best_i).to_owned();

                let mut r1 = self.rng.random_range(0..self.popsize);
                while r1 == p || r1 == self.best_i {
                    r1 = self.rng.random_range(0..self.popsize);
                }
                let mut r2 = self.rng.random_range(0..self.popsize);
                while r2 == p || r2 == self.best_i || r2 == r1 {
                    r2 = self.rng.random_range(0..self.popsize);
                }

                // DE/best/1 with per-variable feasibility repair
                let r = self.rng.random_range(0..self.dim);
                let mut x = xp.clone();
                for j in 0..self.dim {
                    if j == r || self.rng.random::<f64>() < cr {
                        x[j] = xb[j] + f * (self.pop_x[[r1, j]] - self.pop_x[[r2, j]]);
                        if !self.fitfun.feasible(j, x[j]) {
                            x[j] = self.fitfun.norm_x_i(j, &mut self.rng);
                        }
                    }
                }
                modify(&mut x, &self.fitfun, self.min_mutate, self.max_mutate, true, &mut self.rng);
                let mut y = self.fitfun.eval_scalar(&x);

                if y.is_finite() && y < self.pop_y[p] {
                    // temporal locality: try the successful step direction
                    // again, anchored at the incumbent best
                    if self.fitfun.evaluations() < self.max_evaluations {
                        let mut xn = self.fitfun.closest_feasible(&(&xb + &((&x - &xp) * 0.5)));
                        modify(
                            &mut xn,
                            &self.fitfun,
                            self.min_mutate,
                            self.max_mutate,
                            true,
                            &mut self.rng,
                        );
                        let yn = self.fitfun.eval_scalar(&xn);
                        if yn.is_finite() && yn < y {
                            y = yn;
                            x = xn;
                        }
                    }
                    self.pop_x.row_mut(p).assign(&x);
                    self.pop_y[p] = y;
                    self.pop_iter[p] = self.iterations;
                    if y < self.pop_y[self.best_i] {
                        self.best_i = p;
                        if y < self.best_y {
                            self.fitfun.update_sigma(&x);
                            self.best_y = y;
                            self.best_x = x;
                            if self.stop_fitness.is_finite() && self.best_y < self.stop_fitness {
                                self.stop = 1;
                                break 'outer;
                            }
                        }
                    }
                } else if self.keep * self.rng.random::<f64>()
                    < (self.iterations - self.pop_iter[p]) as f64
                {
                    // age-based restart: expected lifetime ~ keep iterations
                    let xr = self.fitfun.norm_x(&mut self.rng);
                    self.pop_x.row_mut(p).assign(&xr);
                    self.pop_y[p] = f64::INFINITY;
                }
            }

            if self.disp {
                eprintln!(
                    "LDE iter {:4}  best_f={:.6e}  evals={}",
                    self.iterations,
                    self.best_y,
                    self.fitfun.evaluations()
                );
            }
        }
        let message = if self.stop == 1 {
            format!("Stop fitness reached: {:.6e}", self.best_y)
        } else {
            format!("Maximum evaluations reached: {}", self.fitfun.evaluations())
        };
        self.report(message)
    }

    /// Like [`solve`](Self::solve), but a panic from the user objective is
    /// caught, logged and turned into a best-so-far report.
    pub fn run(&mut self) -> LdeReport {
        match catch_unwind(AssertUnwindSafe(|| self.solve())) {
            Ok(report) => report,
            Err(payload) => {
                log::error!("LDE objective raised: {}", panic_message(&payload));
                self.report("objective raised; returning best so far".to_string())
            }
        }
    }

    pub fn best_x(&self) -> &Array1<f64> {
        &self.best_x
    }

    pub fn best_value(&self) -> f64 {
        self.best_y
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn stop(&self) -> i32 {
        self.stop
    }

    pub fn evaluations(&self) -> usize {
        self.fitfun.evaluations()
    }

    fn report(&self, message: String) -> LdeReport {
        LdeReport {
            x: self.best_x.clone(),
            fun: self.best_y,
            success: self.stop == 1,
            message,
            nit: self.iterations,
            nfev: self.fitfun.evaluations(),
            population: self.pop_x.clone(),
            population_energies: self.pop_y.clone(),
        }
    }
}

/// Convenience driver: refine `guess` with the given bounds and config.
/// Objective panics are caught and logged; the best solution seen so far is
/// returned in that case.
pub fn optimize_lde<F>(
    func: F,
    guess: Array1<f64>,
    input_sigma: Array1<f64>,
    bounds: Option<(Array1<f64>, Array1<f64>)>,
    ints: Option<Vec<bool>>,
    config: LdeConfig,
) -> LdeReport
where
    F: Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
{
    let obj: Objective = Arc::new(move |x: &Array1<f64>| Array1::from(vec![func(x)]));
    let mut opt = LdeOptimizer::new(obj, guess, input_sigma, bounds, ints, config);
    opt.run()
}
