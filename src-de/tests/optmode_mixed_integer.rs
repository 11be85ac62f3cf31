use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use diffevo_de::{optimize_mode, ModeConfigBuilder};
use ndarray::Array1;

#[test]
fn test_mode_integer_coords_integral_at_every_evaluation() {
    let violated = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let v = violated.clone();
    let c = calls.clone();

    let config = ModeConfigBuilder::new()
        .seed(31)
        .popsize(32)
        .max_evaluations(4000)
        .nsga_update(false)
        .build();
    let report = optimize_mode(
        move |x: &Array1<f64>| {
            c.fetch_add(1, Ordering::Relaxed);
            if x[0].fract() != 0.0 || x[2].fract() != 0.0 {
                v.store(true, Ordering::Relaxed);
            }
            let f1 = x.iter().map(|xi| xi * xi).sum();
            let f2 = x.iter().map(|xi| (xi - 1.0).powi(2)).sum();
            Array1::from(vec![f1, f2])
        },
        4,
        2,
        0,
        Some(Array1::from_elem(4, -5.0)),
        Some(Array1::from_elem(4, 5.0)),
        Some(vec![true, false, true, false]),
        config,
    );

    assert!(
        !violated.load(Ordering::Relaxed),
        "integer coordinates must be integral at evaluation time"
    );
    assert_eq!(calls.load(Ordering::Relaxed), report.nfev);
    assert!(report.nfev <= 4000);
}

#[test]
fn test_mode_integer_nsga_update() {
    let violated = Arc::new(AtomicBool::new(false));
    let v = violated.clone();

    let config = ModeConfigBuilder::new()
        .seed(37)
        .popsize(32)
        .max_evaluations(4000)
        .nsga_update(true)
        .build();
    optimize_mode(
        move |x: &Array1<f64>| {
            if x[0].fract() != 0.0 || x[2].fract() != 0.0 {
                v.store(true, Ordering::Relaxed);
            }
            let f1 = x.iter().map(|xi| xi * xi).sum();
            let f2 = x.iter().map(|xi| (xi + 2.0).powi(2)).sum();
            Array1::from(vec![f1, f2])
        },
        4,
        2,
        0,
        Some(Array1::from_elem(4, -5.0)),
        Some(Array1::from_elem(4, 5.0)),
        Some(vec![true, false, true, false]),
        config,
    );

    assert!(!violated.load(Ordering::Relaxed));
}
