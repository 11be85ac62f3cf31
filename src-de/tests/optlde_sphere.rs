use diffevo_de::{optimize_lde, LdeConfigBuilder};
use diffevo_testfunctions::sphere;
use ndarray::Array1;

fn run_sphere(seed: u64, max_evaluations: usize) -> diffevo_de::LdeReport {
    let config = LdeConfigBuilder::new()
        .seed(seed)
        .max_evaluations(max_evaluations)
        .build();
    optimize_lde(
        sphere,
        Array1::from_elem(5, 2.0),
        Array1::from_elem(5, 0.5),
        Some((Array1::from_elem(5, -5.0), Array1::from_elem(5, 5.0))),
        None,
        config,
    )
}

#[test]
fn test_lde_sphere() {
    let report = run_sphere(42, 20000);

    assert!(
        report.fun < 1e-8,
        "sphere should be solved to 1e-8, got {:e}",
        report.fun
    );
    assert!(
        report.nfev <= 20000,
        "evaluation budget exceeded: {}",
        report.nfev
    );
    for &xi in report.x.iter() {
        assert!((-5.0..=5.0).contains(&xi), "best x out of bounds: {}", xi);
    }
    // every population member must respect the bounds as well
    for row in report.population.rows() {
        for &xi in row.iter() {
            assert!((-5.0..=5.0).contains(&xi));
        }
    }
}

#[test]
fn test_lde_sphere_deterministic() {
    let a = run_sphere(7, 5000);
    let b = run_sphere(7, 5000);

    assert_eq!(a.fun.to_bits(), b.fun.to_bits());
    assert_eq!(a.nfev, b.nfev);
    assert_eq!(a.nit, b.nit);
    for (va, vb) in a.x.iter().zip(b.x.iter()) {
        assert_eq!(va.to_bits(), vb.to_bits());
    }
    for (va, vb) in a.population.iter().zip(b.population.iter()) {
        assert_eq!(va.to_bits(), vb.to_bits());
    }
}

#[test]
fn test_lde_sphere_stop_fitness() {
    let config = LdeConfigBuilder::new()
        .seed(42)
        .max_evaluations(20000)
        .stop_fitness(1e-4)
        .build();
    let report = optimize_lde(
        sphere,
        Array1::from_elem(5, 2.0),
        Array1::from_elem(5, 0.5),
        Some((Array1::from_elem(5, -5.0), Array1::from_elem(5, 5.0))),
        None,
        config,
    );

    assert!(report.success, "stop fitness should trigger: {}", report.message);
    assert!(report.fun < 1e-4);
    assert!(report.nfev < 20000, "early exit should save evaluations");
}

#[test]
fn test_lde_unbounded_sphere() {
    // without bounds the search samples from the incumbent-anchored normal
    let config = LdeConfigBuilder::new()
        .seed(11)
        .max_evaluations(20000)
        .build();
    let report = optimize_lde(
        sphere,
        Array1::from_elem(3, 1.0),
        Array1::from_elem(3, 0.3),
        None,
        None,
        config,
    );
    assert!(report.fun < 1e-6, "unbounded sphere: {:e}", report.fun);
}

#[test]
fn test_lde_objective_panic_returns_best_so_far() {
    let config = LdeConfigBuilder::new().seed(3).max_evaluations(10000).build();
    let report = optimize_lde(
        |x: &Array1<f64>| {
            if x.iter().map(|v| v * v).sum::<f64>() < 1e-2 {
                panic!("synthetic objective failure");
            }
            x.iter().map(|v| v * v).sum()
        },
        Array1::from_elem(2, 2.0),
        Array1::from_elem(2, 0.3),
        Some((Array1::from_elem(2, -5.0), Array1::from_elem(2, 5.0))),
        None,
        config,
    );
    // the run ends early but still reports the best solution seen
    assert!(report.fun.is_finite());
    assert!(report.fun >= 1e-2);
    assert!(report.nfev < 10000);
}
