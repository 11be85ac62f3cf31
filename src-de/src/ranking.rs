//! Pareto-level assignment, crowding distance and enhanced constraint
//! ranking
//!
//! All functions take matrices with one individual per row; objective
//! columns are minimized, constraint columns are violations when positive.
//! Rankings are returned as scores where higher means better, which is the
//! orientation the survival selection consumes.
//!
//! Constraint handling follows the enhanced multiple-constraint ranking
//! method: per-constraint sort ranks weighted by the number of violated
//! constraints, combined with per-objective ranks and the Pareto levels of
//! the feasible subset.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::sort_index::sort_index;

/// True when no value of row `i` is strictly better (lower) than the
/// corresponding value of row `index`. Weaker than strict Pareto dominance;
/// the selection layer depends on exactly this criterion.
pub(crate) fn is_dominated(y: &ArrayView2<f64>, i: usize, index: usize) -> bool {
    for j in 0..y.ncols() {
        if y[[i, j]] < y[[index, j]] {
            return false;
        }
    }
    true
}

/// Assign each row a domination score: one point for every anchor sweep it
/// survives. Higher score means an earlier (better) front.
pub fn pareto_levels(y: &ArrayView2<f64>) -> Array1<f64> {
    let n = y.nrows();
    let mut domination = Array1::zeros(n);
    let mut mask = vec![true; n];
    let mut index = 0;
    while index < n {
        for i in 0..n {
            if i != index && mask[i] && is_dominated(y, i, index) {
                mask[i] = false;
            }
        }
        for i in 0..n {
            if mask[i] {
                domination[i] += 1.0;
            }
        }
        index += 1;
        while index < n && !mask[index] {
            index += 1;
        }
    }
    domination
}

/// Crowding distance over the first objective only: the sum of the gaps to
/// the left and right neighbours in the first-objective sort, with the two
/// extremes pinned to `f64::MAX`. Returns zeros when the first objective is
/// constant or fewer than two rows are given.
pub fn crowd_dist(y: &ArrayView2<f64>) -> Array1<f64> {
    let n = y.nrows();
    if n < 2 {
        return Array1::zeros(n);
    }
    let y0: Vec<f64> = (0..n).map(|p| y[[p, 0]]).collect();
    let si = sort_index(&y0);
    let d: Vec<f64> = (0..n - 1).map(|i| y0[si[i + 1]] - y0[si[i]]).collect();
    if d.iter().all(|&g| g == 0.0) {
        return Array1::zeros(n);
    }
    let mut dsum = vec![0.0; n];
    for i in 0..n {
        if i > 0 {
            dsum[i] += d[i - 1];
        }
        if i < n - 1 {
            dsum[i] += d[i];
        }
    }
    dsum[0] = f64::MAX;
    dsum[n - 1] = f64::MAX;
    let mut ds = Array1::zeros(n);
    for i in 0..n {
        ds[si[i]] = dsum[i];
    }
    ds
}

/// Per-objective ascending rank positions, summed per individual.
pub fn objranks(objs: &ArrayView2<f64>) -> Array1<f64> {
    let n = objs.nrows();
    let mut rank = Array1::zeros(n);
    for c in 0..objs.ncols() {
        let col: Vec<f64> = (0..n).map(|p| objs[[p, c]]).collect();
        for (i, &p) in sort_index(&col).iter().enumerate() {
            rank[p] += i as f64;
        }
    }
    rank
}

/// Constraint ranks: per constraint, feasible entries (<= 0) rank 0 and
/// infeasible ones their ascending sort position. Each individual's ranks
/// are weighted by `alpha / ncon`, where `alpha` counts the constraints it
/// violates, then summed.
pub fn ranks(cons: &ArrayView2<f64>) -> Array1<f64> {
    let n = cons.nrows();
    let ncon = cons.ncols();
    let mut rank = Array2::<f64>::zeros((n, ncon));
    let mut alpha = vec![0.0f64; n];
    for c in 0..ncon {
        let col: Vec<f64> = (0..n).map(|p| cons[[p, c]]).collect();
        for (i, &p) in sort_index(&col).iter().enumerate() {
            if cons[[p, c]] <= 0.0 {
                rank[[p, c]] = 0.0;
            } else {
                rank[[p, c]] = i as f64;
                alpha[p] += 1.0;
            }
        }
    }
    for p in 0..n {
        for c in 0..ncon {
            rank[[p, c]] *= alpha[p] / ncon as f64;
        }
    }
    rank.sum_axis(Axis(1))
}

/// Enhanced constraint ranking over a `(n x (nobj + ncon))` matrix.
///
/// Without constraints this is plain [`pareto_levels`]. Otherwise feasible
/// individuals receive their Pareto level plus a flat bonus putting them
/// above every infeasible one, and infeasible individuals are ordered by
/// their combined constraint/objective rank sum.
pub fn pareto(ys: &ArrayView2<f64>, nobj: usize, ncon: usize) -> Array1<f64> {
    if ncon == 0 {
        return pareto_levels(ys);
    }
    let n = ys.nrows();
    let yobj = ys.slice(ndarray::s![.., ..nobj]);
    let ycon = ys.slice(ndarray::s![.., nobj..]);
    let mut csum = ranks(&ycon);
    let feasible: Vec<bool> = (0..n)
        .map(|p| (0..ncon).all(|c| ycon[[p, c]] <= 0.0))
        .collect();
    let has_feasible = feasible.iter().any(|&b| b);
    if has_feasible {
        csum = csum + objranks(&yobj);
    }
    let mut domination = Array1::zeros(n);
    let cy: Vec<usize> = (0..n).filter(|&p| feasible[p]).collect();
    if has_feasible {
        // pareto levels of the feasible block only
        let feas = yobj.select(Axis(0), &cy);
        let ypar = pareto_levels(&feas.view());
        for (k, &p) in cy.iter().enumerate() {
            domination[p] += ypar[k];
        }
    }
    let civ: Vec<usize> = sort_index(&csum.to_vec())
        .into_iter()
        .filter(|&p| !feasible[p])
        .collect();
    if !civ.is_empty() {
        let maxcdom = civ.len();
        // higher constraint violation gets a lower domination level
        for (i, &p) in civ.iter().enumerate() {
            domination[p] += (maxcdom - i) as f64;
        }
        for &p in &cy {
            domination[p] += (maxcdom + 1) as f64;
        }
    }
    domination
}
