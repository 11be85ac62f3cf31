use diffevo_de::ranking::pareto;
use diffevo_de::{optimize_mode, ModeConfigBuilder};
use ndarray::{s, Array1};

/// Two objectives (x1, x2) under the budget constraint x1 + x2 <= 1.
fn objective(x: &Array1<f64>) -> Array1<f64> {
    Array1::from(vec![x[0], x[1], x[0] + x[1] - 1.0])
}

#[test]
fn test_mode_constrained_feasibility_priority() {
    let config = ModeConfigBuilder::new()
        .seed(17)
        .popsize(64)
        .max_evaluations(5000)
        .nsga_update(false)
        .pareto_update(1.0)
        .build();
    let report = optimize_mode(
        objective,
        2,
        2,
        1,
        Some(Array1::zeros(2)),
        Some(Array1::from_elem(2, 2.0)),
        None,
        config,
    );

    assert!(report.nfev <= 5000);

    // rank the surviving population: every feasible individual must beat
    // every infeasible one
    let survivors = report.y.slice(s![..64, ..]).to_owned();
    let domination = pareto(&survivors.view(), 2, 1);
    let mut worst_feasible = f64::MAX;
    let mut best_infeasible = f64::MIN;
    let mut n_feasible = 0;
    for p in 0..64 {
        let con = survivors[[p, 2]];
        if con <= 0.0 {
            n_feasible += 1;
            worst_feasible = worst_feasible.min(domination[p]);
        } else {
            best_infeasible = best_infeasible.max(domination[p]);
        }
    }
    assert!(n_feasible > 0, "the feasible half of the box should be found");
    if n_feasible < 64 {
        assert!(
            worst_feasible > best_infeasible,
            "feasible rank {} must exceed infeasible rank {}",
            worst_feasible,
            best_infeasible
        );
    }

    // the population should have moved into or near the feasible region
    assert!(n_feasible * 2 >= 64, "expected a mostly feasible population");
}

#[test]
fn test_mode_constrained_bounds_hold() {
    let config = ModeConfigBuilder::new()
        .seed(23)
        .popsize(32)
        .max_evaluations(2000)
        .nsga_update(false)
        .build();
    let report = optimize_mode(
        objective,
        2,
        2,
        1,
        Some(Array1::zeros(2)),
        Some(Array1::from_elem(2, 2.0)),
        None,
        config,
    );
    for p in 0..32 {
        for i in 0..2 {
            let v = report.x[[p, i]];
            assert!((0.0..=2.0).contains(&v), "x out of bounds: {}", v);
        }
    }
}
