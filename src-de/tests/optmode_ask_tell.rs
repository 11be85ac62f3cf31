use std::sync::Arc;

use diffevo_de::{ModeConfigBuilder, ModeOptimizer, Objective};
use diffevo_testfunctions::schaffer_n1;
use ndarray::{Array1, Array2};

const POPSIZE: usize = 16;
const DIM: usize = 2;

fn new_optimizer(seed: u64, nsga_update: bool) -> ModeOptimizer {
    let func: Objective = Arc::new(schaffer_n1);
    let config = ModeConfigBuilder::new()
        .seed(seed)
        .popsize(POPSIZE)
        .nsga_update(nsga_update)
        .build();
    ModeOptimizer::new(
        func,
        DIM,
        2,
        0,
        Some(Array1::from_elem(DIM, -4.0)),
        Some(Array1::from_elem(DIM, 4.0)),
        None,
        config,
    )
}

#[test]
fn test_ask_tell_drives_the_front() {
    let mut opt = new_optimizer(3, false);
    for _ in 0..200 {
        for _ in 0..POPSIZE {
            let (x, p) = opt.ask();
            let y = schaffer_n1(&x);
            opt.tell(&y, &x, p);
        }
    }
    let pop = opt.population();
    assert_eq!(pop.nrows(), POPSIZE);
    let mut best_f1 = f64::MAX;
    let mut best_f2 = f64::MAX;
    for row in pop.rows() {
        let x = row.to_owned();
        for (i, &v) in x.iter().enumerate() {
            assert!((-4.0..=4.0).contains(&v), "coord {} out of bounds: {}", i, v);
        }
        let y = schaffer_n1(&x);
        best_f1 = best_f1.min(y[0]);
        best_f2 = best_f2.min(y[1]);
    }
    // both ends of the trade-off should be approached
    assert!(best_f1 < 1.0, "f1 end not reached: {}", best_f1);
    assert!(best_f2 < 1.0, "f2 end not reached: {}", best_f2);
}

#[test]
fn test_tell_rejects_results_not_better_than_parent_slot() {
    let mut opt = new_optimizer(5, false);
    let initial = opt.population();

    // results that improve on no component of the (unevaluated) parent
    // slots are dropped: the pending buffer never fills, no survival runs
    for _ in 0..POPSIZE {
        let (x, p) = opt.ask();
        let y = Array1::from_elem(2, f64::MAX);
        opt.tell(&y, &x, p);
    }
    let unchanged = opt.population();
    for (a, b) in initial.iter().zip(unchanged.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }

    // accepted results fill the pending buffer and trigger the update
    for _ in 0..POPSIZE {
        let (x, p) = opt.ask();
        let y = schaffer_n1(&x);
        opt.tell(&y, &x, p);
    }
    let updated = opt.population();
    let changed = initial
        .iter()
        .zip(updated.iter())
        .any(|(a, b)| a.to_bits() != b.to_bits());
    assert!(changed, "population update should replace initial samples");
}

#[test]
fn test_ask_all_tell_all_generation() {
    let mut opt = new_optimizer(9, true);
    for _ in 0..100 {
        let xs = opt.ask_all();
        assert_eq!(xs.nrows(), POPSIZE);
        let mut ys = Array2::zeros((POPSIZE, 2));
        for p in 0..POPSIZE {
            let y = schaffer_n1(&xs.row(p).to_owned());
            ys.row_mut(p).assign(&y);
        }
        let stop = opt.tell_all(&ys);
        assert_eq!(stop, 0);
    }
    let pop = opt.population();
    let best: f64 = pop
        .rows()
        .into_iter()
        .map(|row| schaffer_n1(&row.to_owned())[0])
        .fold(f64::MAX, f64::min);
    assert!(best < 1.0, "generation-wise ask/tell should converge: {}", best);
}

#[test]
fn test_tell_all_switch_changes_update_regime() {
    let mut opt = new_optimizer(13, true);
    // a few NSGA generations, then switch to the DE update mid-run
    for gen in 0..60 {
        let xs = opt.ask_all();
        let mut ys = Array2::zeros((POPSIZE, 2));
        for p in 0..POPSIZE {
            ys.row_mut(p).assign(&schaffer_n1(&xs.row(p).to_owned()));
        }
        if gen == 30 {
            opt.tell_all_switch(&ys, false, 1.0);
        } else {
            opt.tell_all(&ys);
        }
    }
    let pop = opt.population();
    for row in pop.rows() {
        for &v in row.iter() {
            assert!((-4.0..=4.0).contains(&v));
        }
    }
}
