//! C entry points for the two optimizers
//!
//! Argument marshalling for foreign callers. Matrices cross the boundary
//! column-major `[dim x popsize]`, i.e. one decision vector after another,
//! which is exactly the row-major row layout used internally. No panic
//! crosses the boundary: failures are logged to standard error and the
//! best-so-far results (if any) are written out.

#![allow(non_snake_case)]

use std::os::raw::c_int;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::error::panic_message;
use crate::fitness::{Objective, COERCED_INFINITY};
use crate::lde::{LdeConfig, LdeOptimizer};
use crate::mode::{ModeConfig, ModeOptimizer};
use crate::{CallbackAction, ModeIntermediate};

/// Objective / log callback: `f(n, x_in, y_out) -> terminate?`
pub type CCallback = extern "C" fn(c_int, *const f64, *mut f64) -> bool;

unsafe fn read_vec(ptr: *const f64, len: usize) -> Array1<f64> {
    Array1::from(slice::from_raw_parts(ptr, len).to_vec())
}

fn c_objective(func: CCallback, dim: usize, nres: usize) -> Objective {
    Arc::new(move |x: &Array1<f64>| {
        let mut y = vec![0.0f64; nres];
        func(dim as c_int, x.as_ptr(), y.as_mut_ptr());
        Array1::from(y)
    })
}

/// Synchronous local DE run. Bounds are "absent" iff `lower` and `upper`
/// are all zero. Output layout: `res[0..dim)` best x, then best fitness,
/// evaluation count, iteration count and the stop flag.
///
/// # Safety
/// All pointers must reference buffers of the documented lengths; `res`
/// must hold `dim + 4` values.
#[no_mangle]
pub unsafe extern "C" fn optimizeLDE(
    runid: i64,
    objective: CCallback,
    dim: c_int,
    init: *const f64,
    sigma: *const f64,
    seed: i64,
    lower: *const f64,
    upper: *const f64,
    maxEvals: c_int,
    keep: f64,
    stopfitness: f64,
    popsize: c_int,
    F: f64,
    CR: f64,
    min_mutate: f64,
    max_mutate: f64,
    ints: *const bool,
    res: *mut f64,
) {
    let n = dim as usize;
    let guess = read_vec(init, n);
    let input_sigma = read_vec(sigma, n);
    let lo = read_vec(lower, n);
    let up = read_vec(upper, n);
    let use_limit = lo.iter().chain(up.iter()).any(|&v| v != 0.0);
    let bounds = use_limit.then(|| (lo, up));
    let ints_slice = slice::from_raw_parts(ints, n);
    let ints_opt = ints_slice
        .iter()
        .any(|&b| b)
        .then(|| ints_slice.to_vec());

    let mut config = LdeConfig {
        seed: Some(seed as u64),
        stop_fitness: stopfitness,
        ..LdeConfig::default()
    };
    if maxEvals > 0 {
        config.max_evaluations = maxEvals as usize;
    }
    if popsize > 0 {
        config.popsize = Some(popsize as usize);
    }
    if keep > 0.0 {
        config.keep = keep;
    }
    if F > 0.0 {
        config.f0 = F;
    }
    if CR > 0.0 {
        config.cr0 = CR;
    }
    if min_mutate > 0.0 {
        config.min_mutate = min_mutate;
    }
    if max_mutate > 0.0 {
        config.max_mutate = max_mutate;
    }

    log::debug!("optimizeLDE run {runid} dim {n}");
    let obj = c_objective(objective, n, 1);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut opt = LdeOptimizer::new(obj, guess, input_sigma, bounds, ints_opt, config);
        opt.run()
    }));
    match outcome {
        Ok(report) => {
            let out = slice::from_raw_parts_mut(res, n + 4);
            for (i, &v) in report.x.iter().enumerate() {
                out[i] = v;
            }
            out[n] = report.fun;
            out[n + 1] = report.nfev as f64;
            out[n + 2] = report.nit as f64;
            out[n + 3] = if report.success { 1.0 } else { 0.0 };
        }
        Err(payload) => {
            eprintln!("optimizeLDE run {}: {}", runid, panic_message(&payload));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn mode_config(
    seed: i64,
    maxEvals: c_int,
    popsize: c_int,
    F: f64,
    CR: f64,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    nsga_update: bool,
    pareto_update: f64,
    min_mutate: f64,
    max_mutate: f64,
    log_period: c_int,
) -> ModeConfig {
    let mut config = ModeConfig {
        seed: Some(seed as u64),
        nsga_update,
        pareto_update,
        pro_c,
        dis_c,
        pro_m,
        dis_m,
        ..ModeConfig::default()
    };
    if maxEvals > 0 {
        config.max_evaluations = maxEvals as usize;
    }
    if popsize > 0 {
        config.popsize = popsize as usize;
    }
    if F > 0.0 {
        config.f0 = F;
    }
    if CR > 0.0 {
        config.cr0 = CR;
    }
    if min_mutate > 0.0 {
        config.min_mutate = min_mutate;
    }
    if max_mutate > 0.0 {
        config.max_mutate = max_mutate;
    }
    if log_period > 0 {
        config.log_period = log_period as usize;
    }
    config
}

/// Synchronous MODE run; `workers <= 1` evaluates serially. `res` receives
/// the full working population, `2 * popsize` decision vectors.
///
/// # Safety
/// All pointers must reference buffers of the documented lengths; `res`
/// must hold `dim * 2 * popsize` values (with the defaulted population
/// size when `popsize <= 0`).
#[no_mangle]
pub unsafe extern "C" fn optimizeMODE(
    runid: i64,
    objective: CCallback,
    log: CCallback,
    dim: c_int,
    nobj: c_int,
    ncon: c_int,
    seed: i64,
    lower: *const f64,
    upper: *const f64,
    ints: *const bool,
    maxEvals: c_int,
    popsize: c_int,
    workers: c_int,
    F: f64,
    CR: f64,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    nsga_update: bool,
    pareto_update: f64,
    min_mutate: f64,
    max_mutate: f64,
    log_period: c_int,
    res: *mut f64,
) {
    let n = dim as usize;
    let nres = (nobj + ncon) as usize;
    let lo = read_vec(lower, n);
    let up = read_vec(upper, n);
    let ints_slice = slice::from_raw_parts(ints, n);
    let ints_opt = ints_slice
        .iter()
        .any(|&b| b)
        .then(|| ints_slice.to_vec());

    let mut config = mode_config(
        seed, maxEvals, popsize, F, CR, pro_c, dis_c, pro_m, dis_m, nsga_update, pareto_update,
        min_mutate, max_mutate, log_period,
    );
    config.workers = if workers > 1 { workers as usize } else { 0 };
    config.callback = Some(Box::new(move |info: &ModeIntermediate| {
        let rows = info.x.nrows();
        let mut xs: Vec<f64> = Vec::with_capacity(rows * info.x.ncols());
        for row in info.x.rows() {
            xs.extend(row.iter());
        }
        let mut ys: Vec<f64> = Vec::with_capacity(rows * info.y.ncols());
        for row in info.y.rows() {
            ys.extend(row.iter());
        }
        if log(rows as c_int, xs.as_ptr(), ys.as_mut_ptr()) {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }));

    log::debug!("optimizeMODE run {runid} dim {n} nobj {nobj} ncon {ncon}");
    let obj = c_objective(objective, n, nres);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut opt = ModeOptimizer::new(
            obj,
            n,
            nobj as usize,
            ncon as usize,
            Some(lo),
            Some(up),
            ints_opt,
            config,
        );
        opt.run()
    }));
    match outcome {
        Ok(report) => {
            let rows = report.x.nrows();
            let out = slice::from_raw_parts_mut(res, rows * n);
            for (p, row) in report.x.rows().into_iter().enumerate() {
                for (i, &v) in row.iter().enumerate() {
                    out[p * n + i] = v;
                }
            }
        }
        Err(payload) => {
            eprintln!("optimizeMODE run {}: {}", runid, panic_message(&payload));
        }
    }
}

/// Create an ask/tell MODE handle. Evaluations happen on the caller's
/// side; the embedded objective is never invoked.
///
/// # Safety
/// `lower`, `upper` and `ints` must point to `dim` values.
#[no_mangle]
pub unsafe extern "C" fn initMODE(
    runid: i64,
    dim: c_int,
    nobj: c_int,
    ncon: c_int,
    seed: i64,
    lower: *const f64,
    upper: *const f64,
    ints: *const bool,
    maxEvals: c_int,
    popsize: c_int,
    F: f64,
    CR: f64,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    nsga_update: bool,
    pareto_update: f64,
    min_mutate: f64,
    max_mutate: f64,
) -> *mut ModeOptimizer {
    let n = dim as usize;
    let nres = (nobj + ncon) as usize;
    let lo = read_vec(lower, n);
    let up = read_vec(upper, n);
    let ints_slice = slice::from_raw_parts(ints, n);
    let ints_opt = ints_slice
        .iter()
        .any(|&b| b)
        .then(|| ints_slice.to_vec());
    let mut config = mode_config(
        seed, maxEvals, popsize, F, CR, pro_c, dis_c, pro_m, dis_m, nsga_update, pareto_update,
        min_mutate, max_mutate, 0,
    );
    // never fire the progress callback on an externally driven handle
    config.log_period = usize::MAX;

    log::debug!("initMODE run {runid} dim {n}");
    let obj: Objective = Arc::new(move |_x: &Array1<f64>| Array1::from_elem(nres, COERCED_INFINITY));
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        ModeOptimizer::new(
            obj,
            n,
            nobj as usize,
            ncon as usize,
            Some(lo),
            Some(up),
            ints_opt,
            config,
        )
    }));
    match outcome {
        Ok(opt) => Box::into_raw(Box::new(opt)),
        Err(payload) => {
            eprintln!("initMODE run {}: {}", runid, panic_message(&payload));
            std::ptr::null_mut()
        }
    }
}

/// Fill `xs` with the next generation of trial vectors, `popsize` vectors
/// of `dim` values each.
///
/// # Safety
/// `handle` must come from [`initMODE`]; `xs` must hold
/// `dim * popsize` values.
#[no_mangle]
pub unsafe extern "C" fn askMODE(handle: *mut ModeOptimizer, xs: *mut f64) {
    let opt = &mut *handle;
    let n = opt.dim();
    let pop = opt.ask_all();
    let out = slice::from_raw_parts_mut(xs, opt.popsize() * n);
    for (p, row) in pop.rows().into_iter().enumerate() {
        for (i, &v) in row.iter().enumerate() {
            out[p * n + i] = v;
        }
    }
}

unsafe fn read_ys(opt: &ModeOptimizer, ys: *const f64) -> Array2<f64> {
    let nres = opt.nobj() + opt.ncon();
    let vals = slice::from_raw_parts(ys, opt.popsize() * nres);
    Array2::from_shape_fn((opt.popsize(), nres), |(p, i)| vals[p * nres + i])
}

/// Accept fitness values for the vectors returned by the last [`askMODE`]:
/// `popsize` tuples of `nobj + ncon` values each.
///
/// # Safety
/// `handle` must come from [`initMODE`]; `ys` must hold
/// `(nobj + ncon) * popsize` values.
#[no_mangle]
pub unsafe extern "C" fn tellMODE(handle: *mut ModeOptimizer, ys: *const f64) -> c_int {
    let opt = &mut *handle;
    let vals = read_ys(opt, ys);
    opt.tell_all(&vals) as c_int
}

/// Like [`tellMODE`], switching the population update regime first.
///
/// # Safety
/// Same contract as [`tellMODE`].
#[no_mangle]
pub unsafe extern "C" fn tellMODE_switch(
    handle: *mut ModeOptimizer,
    ys: *const f64,
    nsga_update: bool,
    pareto_update: f64,
) -> c_int {
    let opt = &mut *handle;
    let vals = read_ys(opt, ys);
    opt.tell_all_switch(&vals, nsga_update, pareto_update) as c_int
}

/// Write the current population to `xs`, `popsize` vectors of `dim`
/// values. Returns the stop flag.
///
/// # Safety
/// `handle` must come from [`initMODE`]; `xs` must hold
/// `dim * popsize` values.
#[no_mangle]
pub unsafe extern "C" fn populationMODE(handle: *mut ModeOptimizer, xs: *mut f64) -> c_int {
    let opt = &*handle;
    let n = opt.dim();
    let pop = opt.population();
    let out = slice::from_raw_parts_mut(xs, opt.popsize() * n);
    for (p, row) in pop.rows().into_iter().enumerate() {
        for (i, &v) in row.iter().enumerate() {
            out[p * n + i] = v;
        }
    }
    opt.stop() as c_int
}

/// Destroy an ask/tell handle.
///
/// # Safety
/// `handle` must come from [`initMODE`] and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn destroyMODE(handle: *mut ModeOptimizer) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}
