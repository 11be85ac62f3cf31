//! Exercises the C entry points through the same calling convention a
//! foreign host would use.

use std::os::raw::c_int;
use std::slice;

use diffevo_de::ffi::{
    askMODE, destroyMODE, initMODE, optimizeLDE, optimizeMODE, populationMODE, tellMODE,
};

extern "C" fn sphere_obj(n: c_int, x: *const f64, y: *mut f64) -> bool {
    unsafe {
        let xs = slice::from_raw_parts(x, n as usize);
        *y = xs.iter().map(|v| v * v).sum();
    }
    false
}

extern "C" fn biobj(n: c_int, x: *const f64, y: *mut f64) -> bool {
    unsafe {
        let xs = slice::from_raw_parts(x, n as usize);
        let ys = slice::from_raw_parts_mut(y, 2);
        ys[0] = xs.iter().map(|v| v * v).sum();
        ys[1] = xs.iter().map(|v| (v - 2.0) * (v - 2.0)).sum();
    }
    false
}

extern "C" fn noop_log(_n: c_int, _x: *const f64, _y: *mut f64) -> bool {
    false
}

#[test]
fn test_optimize_lde_c_surface() {
    const DIM: usize = 3;
    let init = [1.5; DIM];
    let sigma = [0.3; DIM];
    let lower = [-4.0; DIM];
    let upper = [4.0; DIM];
    let ints = [false; DIM];
    let mut res = [0.0f64; DIM + 4];
    unsafe {
        optimizeLDE(
            1,
            sphere_obj,
            DIM as c_int,
            init.as_ptr(),
            sigma.as_ptr(),
            42,
            lower.as_ptr(),
            upper.as_ptr(),
            10000,
            0.0,
            f64::NEG_INFINITY,
            0,
            0.0,
            0.0,
            0.0,
            0.0,
            ints.as_ptr(),
            res.as_mut_ptr(),
        );
    }
    let best_f = res[DIM];
    let evals = res[DIM + 1];
    let stop = res[DIM + 3];
    assert!(best_f < 1e-6, "C LDE run should solve sphere: {:e}", best_f);
    assert!(evals > 0.0 && evals <= 10000.0);
    assert_eq!(stop, 0.0);
    for &v in &res[..DIM] {
        assert!((-4.0..=4.0).contains(&v));
    }
}

#[test]
fn test_optimize_mode_c_surface() {
    const DIM: usize = 2;
    const POPSIZE: usize = 24;
    let lower = [-4.0; DIM];
    let upper = [4.0; DIM];
    let ints = [false; DIM];
    let mut res = [0.0f64; DIM * 2 * POPSIZE];
    unsafe {
        optimizeMODE(
            2,
            biobj,
            noop_log,
            DIM as c_int,
            2,
            0,
            7,
            lower.as_ptr(),
            upper.as_ptr(),
            ints.as_ptr(),
            3000,
            POPSIZE as c_int,
            1,
            0.0,
            0.0,
            1.0,
            20.0,
            1.0,
            20.0,
            true,
            0.0,
            0.0,
            0.0,
            0,
            res.as_mut_ptr(),
        );
    }
    for &v in res.iter() {
        assert!((-4.0..=4.0).contains(&v), "population escaped bounds: {}", v);
    }
}

#[test]
fn test_mode_ask_tell_c_surface() {
    const DIM: usize = 2;
    const POPSIZE: usize = 16;
    let lower = [-4.0; DIM];
    let upper = [4.0; DIM];
    let ints = [false; DIM];
    let handle = unsafe {
        initMODE(
            3,
            DIM as c_int,
            2,
            0,
            11,
            lower.as_ptr(),
            upper.as_ptr(),
            ints.as_ptr(),
            0,
            POPSIZE as c_int,
            0.0,
            0.0,
            1.0,
            20.0,
            1.0,
            20.0,
            false,
            0.0,
            0.0,
            0.0,
        )
    };
    assert!(!handle.is_null());

    let mut xs = [0.0f64; DIM * POPSIZE];
    let mut ys = [0.0f64; 2 * POPSIZE];
    for _ in 0..50 {
        unsafe { askMODE(handle, xs.as_mut_ptr()) };
        for p in 0..POPSIZE {
            let x = &xs[p * DIM..(p + 1) * DIM];
            ys[p * 2] = x.iter().map(|v| v * v).sum();
            ys[p * 2 + 1] = x.iter().map(|v| (v - 2.0) * (v - 2.0)).sum();
        }
        let stop = unsafe { tellMODE(handle, ys.as_ptr()) };
        assert_eq!(stop, 0);
    }
    let stop = unsafe { populationMODE(handle, xs.as_mut_ptr()) };
    assert_eq!(stop, 0);
    for &v in xs.iter() {
        assert!((-4.0..=4.0).contains(&v));
    }
    unsafe { destroyMODE(handle) };
}
