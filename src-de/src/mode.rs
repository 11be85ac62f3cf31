//! Multi-objective differential evolution using the DE/current-to-rand/1
//! strategy
//!
//! Can switch to an NSGA-II like population update via `nsga_update`. It
//! then works essentially like NSGA-II, but instead of tournament selection
//! the whole working population is sorted and the best individuals survive;
//! to do this efficiently the crowding distance ordering is slightly
//! inaccurate (first objective only).
//!
//! Features enhanced multiple-constraint ranking, improving constraint
//! handling for engineering design problems, and makes DE and NSGA-II
//! population updates comparable with everything else kept identical.
//!
//! Uses one deviation from the standard DE algorithm: oscillating CR/F
//! parameters. F and CR can usually stay at their defaults.
//!
//! For expensive objective functions use `workers` to parallelize function
//! evaluation; results are applied in completion order (delayed update).
//! The integrality mask marks discrete variables, which are rounded before
//! evaluation and receive an extra mutation so they do not get stuck at
//! local minima.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::panic_message;
use crate::fitness::{Fitness, Objective};
use crate::integer_mutation::modify;
use crate::parallel_eval::Evaluator;
use crate::ranking::{crowd_dist, pareto};
use crate::sort_index::sort_index;
use crate::variation::variation;
use crate::{CallbackAction, ModeIntermediate};

/// Progress callback invoked every `log_period` iterations
pub type ModeCallback = Box<dyn FnMut(&ModeIntermediate) -> CallbackAction>;

/// Configuration for the multi-objective DE optimizer
pub struct ModeConfig {
    pub popsize: usize,
    pub max_evaluations: usize,
    /// DE population update parameters, ignored if `nsga_update`
    pub f0: f64,
    pub cr0: f64,
    /// NSGA population update parameters, ignored unless `nsga_update`;
    /// usually pro_c = 1.0, dis_c = 20.0, pro_m = 1.0, dis_m = 20.0
    pub pro_c: f64,
    pub dis_c: f64,
    pub pro_m: f64,
    pub dis_m: f64,
    /// Use the NSGA-II style population update instead of the DE update.
    /// The DE update diversifies results.
    pub nsga_update: bool,
    /// DE update parameter: favor better solutions when sampling the base
    /// vector. 0 samples the whole population uniformly.
    pub pareto_update: f64,
    /// Mutation rate range for integer variables
    pub min_mutate: f64,
    pub max_mutate: f64,
    /// The progress callback is called each `log_period` iterations
    pub log_period: usize,
    /// Evaluation workers; <= 1 runs serially
    pub workers: usize,
    /// Random seed (None = OS entropy)
    pub seed: Option<u64>,
    /// Print population statistics at each generation
    pub disp: bool,
    pub callback: Option<ModeCallback>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            popsize: 128,
            max_evaluations: 500_000,
            f0: 0.5,
            cr0: 0.9,
            pro_c: 1.0,
            dis_c: 20.0,
            pro_m: 1.0,
            dis_m: 20.0,
            nsga_update: true,
            pareto_update: 0.0,
            min_mutate: 0.1,
            max_mutate: 0.5,
            log_period: 1000,
            workers: 0,
            seed: None,
            disp: false,
            callback: None,
        }
    }
}

/// Fluent builder for `ModeConfig`
pub struct ModeConfigBuilder {
    cfg: ModeConfig,
}

impl ModeConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: ModeConfig::default() }
    }
    pub fn popsize(mut self, v: usize) -> Self {
        self.cfg.popsize = v;
        self
    }
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.cfg.max_evaluations = v;
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
    pub fn pro_c(mut self, v: f64) -> Self {
        self.cfg.pro_c = v;
        self
    }
    pub fn dis_c(mut self, v: f64) -> Self {
        self.cfg.dis_c = v;
        self
    }
    pub fn pro_m(mut self, v: f64) -> Self {
        self.cfg.pro_m = v;
        self
    }
    pub fn dis_m(mut self, v: f64) -> Self {
        self.cfg.dis_m = v;
        self
    }
    pub fn nsga_update(mut self, v: bool) -> Self {
        self.cfg.nsga_update = v;
        self
    }
    pub fn pareto_update(mut self, v: f64) -> Self {
        self.cfg.pareto_update = v;
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
    pub fn log_period(mut self, v: usize) -> Self {
        self.cfg.log_period = v;
        self
    }
    pub fn workers(mut self, v: usize) -> Self {
        self.cfg.workers = v;
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
    pub fn callback(mut self, cb: ModeCallback) -> Self {
        self.cfg.callback = Some(cb);
        self
    }
    pub fn build(self) -> ModeConfig {
        self.cfg
    }
}

impl Default for ModeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result/Report of a MODE optimization run. The first `popsize` rows of
/// `x`/`y` hold the surviving population, the rest the last offspring.
#[derive(Clone)]
pub struct ModeReport {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub nit: usize,
    pub nfev: usize,
    pub stop: i32,
}

impl fmt::Debug for ModeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeReport")
            .field("x", &format!("{}x{}", self.x.nrows(), self.x.ncols()))
            .field("y", &format!("{}x{}", self.y.nrows(), self.y.ncols()))
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("stop", &self.stop)
            .finish()
    }
}

/// Multi-objective differential evolution optimizer
pub struct ModeOptimizer {
    fitfun: Arc<Fitness>,
    dim: usize,
    nobj: usize,
    ncon: usize,
    popsize: usize,
    max_evaluations: usize,
    f0: f64,
    cr0: f64,
    f: f64,
    cr: f64,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    nsga_update: bool,
    pareto_update: f64,
    min_mutate: f64,
    max_mutate: f64,
    log_period: usize,
    workers: usize,
    disp: bool,
    callback: Option<ModeCallback>,
    rng: StdRng,
    iterations: usize,
    /// Accepted ask/tell results since the start of the run
    n_accepted: usize,
    pos: usize,
    pop_x: Array2<f64>,
    pop_y: Array2<f64>,
    n_x: Array2<f64>,
    n_y: Array2<f64>,
    v_done: Vec<bool>,
    v_x: Array2<f64>,
    vp: usize,
    stop: i32,
}

impl ModeOptimizer {
    pub fn new(
        func: Objective,
        dim: usize,
        nobj: usize,
        ncon: usize,
        lower: Option<Array1<f64>>,
        upper: Option<Array1<f64>>,
        ints: Option<Vec<bool>>,
        config: ModeConfig,
    ) -> Self {
        let nres = nobj + ncon;
        let fitfun = Arc::new(Fitness::new(func, dim, nres, lower, upper).with_ints(ints));
        let popsize = config.popsize;
        let mut rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut pop_x = Array2::zeros((2 * popsize, dim));
        for p in 0..popsize {
            let x = fitfun.sample(&mut rng);
            pop_x.row_mut(p).assign(&x);
        }
        // f64::MAX rather than infinity keeps the crowding-distance gap
        // arithmetic over unevaluated rows NaN-free
        let pop_y = Array2::from_elem((2 * popsize, nres), f64::MAX);
        let next_size = 2 * popsize;
        // the ask cursor cycles over v_x, so before the first survival step
        // NSGA mode hands out the initial samples for evaluation
        let v_x = pop_x.slice(s![..popsize, ..]).to_owned();
        Self {
            fitfun,
            dim,
            nobj,
            ncon,
            popsize,
            max_evaluations: config.max_evaluations,
            f0: config.f0,
            cr0: config.cr0,
            f: config.f0,
            cr: config.cr0,
            pro_c: config.pro_c,
            dis_c: config.dis_c,
            pro_m: config.pro_m,
            dis_m: config.dis_m,
            nsga_update: config.nsga_update,
            pareto_update: config.pareto_update,
            min_mutate: config.min_mutate,
            max_mutate: config.max_mutate,
            log_period: config.log_period.max(1),
            workers: config.workers,
            disp: config.disp,
            callback: config.callback,
            rng,
            iterations: 0,
            n_accepted: 0,
            pos: 0,
            pop_x,
            pop_y,
            n_x: Array2::zeros((next_size, dim)),
            n_y: Array2::zeros((next_size, nres)),
            v_done: vec![false; next_size],
            v_x,
            vp: 0,
            stop: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nobj(&self) -> usize {
        self.nobj
    }

    pub fn ncon(&self) -> usize {
        self.ncon
    }

    pub fn popsize(&self) -> usize {
        self.popsize
    }

    pub fn stop(&self) -> i32 {
        self.stop
    }

    pub fn evaluations(&self) -> usize {
        self.fitfun.evaluations()
    }

    /// Number of told results accepted past the parent-slot rejection rule.
    pub fn accepted(&self) -> usize {
        self.n_accepted
    }

    /// Next trial vector for slot `p`. Advances the iteration counter and
    /// fires the progress callback when `p == 0`.
    fn next_x(&mut self, p: usize) -> Array1<f64> {
        if p == 0 {
            self.iterations += 1;
            if self.iterations % self.log_period == 0 {
                if let Some(cb) = self.callback.as_mut() {
                    let info = ModeIntermediate {
                        x: self.pop_x.clone(),
                        y: self.pop_y.clone(),
                        iter: self.iterations,
                    };
                    if matches!(cb(&info), CallbackAction::Stop) {
                        self.fitfun.set_terminate();
                    }
                }
            }
        }
        if self.nsga_update {
            let x = self.v_x.row(self.vp).to_owned();
            self.vp = (self.vp + 1) % self.v_x.nrows();
            return x;
        }
        // DE update strategy
        if p == 0 {
            self.cr = if self.iterations % 2 == 0 { 0.5 * self.cr0 } else { self.cr0 };
            self.f = if self.iterations % 2 == 0 { 0.5 * self.f0 } else { self.f0 };
        }
        let (r1, r2, r3) = loop {
            let r1 = self.rng.random_range(0..self.popsize);
            let r2 = self.rng.random_range(0..self.popsize);
            let r3 = if self.pareto_update > 0.0 {
                // sample elite solutions; the population is survival-sorted
                // best first
                (self.rng.random::<f64>().powf(1.0 + self.pareto_update)
                    * self.popsize as f64) as usize
            } else {
                self.rng.random_range(0..self.popsize)
            };
            if r3 != p && r3 != r1 && r3 != r2 && r2 != p && r2 != r1 && r1 != p {
                break (r1, r2, r3);
            }
        };
        let mut x = Array1::from_shape_fn(self.dim, |j| {
            self.pop_x[[r3, j]] + self.f * (self.pop_x[[r1, j]] - self.pop_x[[r2, j]])
        });
        let r = self.rng.random_range(0..self.dim);
        for j in 0..self.dim {
            if j != r && self.rng.random::<f64>() > self.cr {
                x[j] = self.pop_x[[p, j]];
            }
        }
        let mut x = self.fitfun.closest_feasible(&x);
        modify(&mut x, &self.fitfun, self.min_mutate, self.max_mutate, false, &mut self.rng);
        x
    }

    /// Survival selection over the 2N working rows: admit whole domination
    /// levels from best to worst, the partial level by descending crowding
    /// distance. Survivors overwrite the first N rows in admission order.
    fn pop_update(&mut self) {
        let two_n = 2 * self.popsize;
        let (x0, y0) = if self.nobj == 1 {
            // align the single-objective ordering with the rank direction
            let col: Vec<f64> = (0..two_n).map(|p| self.pop_y[[p, 0]]).collect();
            let mut yi = sort_index(&col);
            yi.reverse();
            (
                self.pop_x.select(Axis(0), &yi),
                self.pop_y.select(Axis(0), &yi),
            )
        } else {
            (self.pop_x.clone(), self.pop_y.clone())
        };
        let domination = pareto(&y0.view(), self.nobj, self.ncon);
        let maxdom = domination.iter().cloned().fold(0.0f64, f64::max) as i64;
        let mut admitted: Vec<usize> = Vec::with_capacity(self.popsize);
        let mut dom = maxdom;
        while dom >= 0 && admitted.len() < self.popsize {
            let level: Vec<usize> = (0..two_n)
                .filter(|&i| domination[i] == dom as f64)
                .collect();
            if admitted.len() + level.len() <= self.popsize {
                admitted.extend_from_slice(&level);
                dom -= 1;
                continue;
            }
            // partial level: admit by crowding distance of its objectives
            let domy = y0.select(Axis(0), &level);
            let cd = crowd_dist(&domy.view());
            let mut si = sort_index(&cd.to_vec());
            si.reverse();
            for &k in &si {
                if admitted.len() >= self.popsize {
                    break;
                }
                admitted.push(level[k]);
            }
            break;
        }
        for (i, &k) in admitted.iter().take(self.popsize).enumerate() {
            self.pop_x.row_mut(i).assign(&x0.row(k));
            self.pop_y.row_mut(i).assign(&y0.row(k));
        }
        if self.nsga_update {
            self.v_x = variation(
                &self.pop_x.slice(s![..self.popsize, ..]),
                &self.fitfun,
                self.pro_c,
                self.dis_c,
                self.pro_m,
                self.dis_m,
                &mut self.rng,
            );
            self.vp = 0;
        }
    }

    /// Next trial vector and its slot id.
    pub fn ask(&mut self) -> (Array1<f64>, usize) {
        let p = self.pos;
        let x = self.next_x(p);
        self.pos = (self.pos + 1) % self.popsize;
        (x, p)
    }

    /// Report an evaluated trial back. Results coordinate-wise not better
    /// than the parent slot are dropped. Once `popsize` results are
    /// pending, they are appended to the offspring rows and survival runs.
    pub fn tell(&mut self, y: &Array1<f64>, x: &Array1<f64>, p: usize) -> i32 {
        if self.dominated_by_slot(y, p) {
            return self.stop;
        }
        let mut dp = 0;
        while dp < self.v_done.len() && self.v_done[dp] {
            dp += 1;
        }
        self.n_x.row_mut(dp).assign(x);
        self.n_y.row_mut(dp).assign(y);
        self.v_done[dp] = true;
        let ndone = self.v_done.iter().filter(|&&b| b).count();
        if ndone >= self.popsize {
            let mut row = self.popsize;
            for dp in 0..self.v_done.len() {
                if self.v_done[dp] {
                    self.pop_x.row_mut(row).assign(&self.n_x.row(dp));
                    self.pop_y.row_mut(row).assign(&self.n_y.row(dp));
                    self.v_done[dp] = false;
                    row += 1;
                    if row >= 2 * self.popsize {
                        break;
                    }
                }
            }
            self.pop_update();
        }
        self.n_accepted += 1;
        self.stop
    }

    /// True when no component of `y` is strictly better than the current
    /// fitness of slot `p`.
    fn dominated_by_slot(&self, y: &Array1<f64>, p: usize) -> bool {
        for j in 0..self.nobj + self.ncon {
            if y[j] < self.pop_y[[p, j]] {
                return false;
            }
        }
        true
    }

    /// Fill all offspring slots and return them, one generation at a time.
    pub fn ask_all(&mut self) -> Array2<f64> {
        for p in 0..self.popsize {
            let x = self.next_x(p);
            self.pop_x.row_mut(self.popsize + p).assign(&x);
        }
        self.pop_x.slice(s![self.popsize.., ..]).to_owned()
    }

    /// Accept fitness values for a full generation of offspring and run the
    /// survival selection.
    pub fn tell_all(&mut self, ys: &Array2<f64>) -> i32 {
        for p in 0..self.popsize {
            self.pop_y.row_mut(self.popsize + p).assign(&ys.row(p));
        }
        self.pop_update();
        self.stop
    }

    /// Like [`tell_all`](Self::tell_all), switching the population update
    /// regime first.
    pub fn tell_all_switch(&mut self, ys: &Array2<f64>, nsga_update: bool, pareto_update: f64) -> i32 {
        self.nsga_update = nsga_update;
        self.pareto_update = pareto_update;
        self.tell_all(ys)
    }

    /// The current (surviving) population.
    pub fn population(&self) -> Array2<f64> {
        self.pop_x.slice(s![..self.popsize, ..]).to_owned()
    }

    /// Serial generation loop.
    pub fn optimize(&mut self) -> ModeReport {
        self.iterations = 0;
        self.fitfun.reset_evaluations();
        'outer: while self.fitfun.evaluations() < self.max_evaluations && !self.fitfun.terminate()
        {
            for p in 0..self.popsize {
                if self.fitfun.evaluations() >= self.max_evaluations || self.fitfun.terminate() {
                    break 'outer;
                }
                let x = self.next_x(p);
                let y = self.fitfun.eval(&x);
                self.pop_x.row_mut(self.popsize + p).assign(&x);
                self.pop_y.row_mut(self.popsize + p).assign(&y);
            }
            self.pop_update();
            if self.disp {
                eprintln!(
                    "MODE iter {:4}  evals={}",
                    self.iterations,
                    self.fitfun.evaluations()
                );
            }
        }
        self.report()
    }

    /// Parallel generation loop with delayed population update: results are
    /// told back in completion order, so different worker counts yield
    /// different (but equally valid) trajectories.
    pub fn optimize_delayed_update(&mut self, workers: usize) -> ModeReport {
        self.iterations = 0;
        self.fitfun.reset_evaluations();
        let workers = workers.min(self.popsize);
        let evaluator = Evaluator::new(self.fitfun.clone(), workers);
        let mut evals_x: Vec<Array1<f64>> = vec![Array1::zeros(self.dim); self.popsize];
        for _ in 0..workers {
            let (x, p) = self.ask();
            evaluator.evaluate(x.clone(), p);
            evals_x[p] = x;
        }
        while self.fitfun.evaluations() < self.max_evaluations && !self.fitfun.terminate() {
            let (y, p) = match evaluator.result() {
                Ok(r) => r,
                Err(e) => {
                    log::error!("parallel evaluation failed: {e}");
                    break;
                }
            };
            let x = evals_x[p].clone();
            self.tell(&y, &x, p);
            if self.fitfun.evaluations() >= self.max_evaluations || self.fitfun.terminate() {
                break;
            }
            let (x, p) = self.ask();
            evaluator.evaluate(x.clone(), p);
            evals_x[p] = x;
        }
        // drain in-flight work and join the pool before reading the final
        // evaluation count
        drop(evaluator);
        self.report()
    }

    /// Serial or parallel, depending on the configured worker count; panics
    /// from the user objective are caught and logged.
    pub fn run(&mut self) -> ModeReport {
        let workers = self.workers;
        match catch_unwind(AssertUnwindSafe(|| {
            if workers <= 1 {
                self.optimize()
            } else {
                self.optimize_delayed_update(workers)
            }
        })) {
            Ok(report) => report,
            Err(payload) => {
                log::error!("MODE objective raised: {}", panic_message(&payload));
                self.report()
            }
        }
    }

    fn report(&self) -> ModeReport {
        ModeReport {
            x: self.pop_x.clone(),
            y: self.pop_y.clone(),
            nit: self.iterations,
            nfev: self.fitfun.evaluations(),
            stop: self.stop,
        }
    }
}

/// Convenience driver mirroring the library calling convention: minimize a
/// vector objective of `nobj` objectives and `ncon` constraints.
pub fn optimize_mode<F>(
    func: F,
    dim: usize,
    nobj: usize,
    ncon: usize,
    lower: Option<Array1<f64>>,
    upper: Option<Array1<f64>>,
    ints: Option<Vec<bool>>,
    config: ModeConfig,
) -> ModeReport
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Send + Sync + 'static,
{
    let mut opt = ModeOptimizer::new(Arc::new(func), dim, nobj, ncon, lower, upper, ints, config);
    opt.run()
}
