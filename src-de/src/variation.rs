//! NSGA-II style variation: simulated binary crossover followed by
//! polynomial mutation
//!
//! The distribution indices are rescaled by a uniform factor in
//! `[0.5, 1.0)` on every call, so consecutive generations explore with
//! slightly different spreads. Parents are taken as the first and second
//! half of the surviving population; each pair produces two offspring.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::Rng;

use crate::fitness::Fitness;

pub(crate) fn variation(
    x: &ArrayView2<f64>,
    fitfun: &Fitness,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    rng: &mut StdRng,
) -> Array2<f64> {
    let dim = x.ncols();
    let dis_c = (0.5 * rng.random::<f64>() + 0.5) * dis_c;
    let dis_m = (0.5 * rng.random::<f64>() + 0.5) * dis_m;
    let n2 = x.nrows() / 2;
    let n = 2 * n2;

    // per-dimension crossover gate, only drawn when pro_c < 1
    let to1: Option<Vec<f64>> = if pro_c < 1.0 {
        Some((0..dim).map(|_| rng.random::<f64>()).collect())
    } else {
        None
    };

    // SBX spread factor per (pair, coordinate)
    let mut beta = Array2::<f64>::zeros((n2, dim));
    for p in 0..n2 {
        for i in 0..dim {
            let skip = rng.random::<f64>() > 0.5
                || to1.as_ref().is_some_and(|t| t[i] < pro_c);
            if skip {
                beta[[p, i]] = 1.0;
            } else {
                let r = rng.random::<f64>();
                let mut b = if r <= 0.5 {
                    (2.0 * r).powf(1.0 / (dis_c + 1.0))
                } else {
                    (2.0 * r).powf(-1.0 / (dis_c + 1.0))
                };
                if rng.random::<f64>() > 0.5 {
                    b = -b;
                }
                beta[[p, i]] = b;
            }
        }
    }

    let mut offspring = Array2::<f64>::zeros((n, dim));
    for p in 0..n2 {
        for i in 0..dim {
            let p1 = x[[p, i]];
            let p2 = x[[n2 + p, i]];
            let mean = 0.5 * (p1 + p2);
            let delta = 0.5 * beta[[p, i]] * (p1 - p2);
            offspring[[p, i]] = mean + delta;
            offspring[[n2 + p, i]] = mean - delta;
        }
    }

    // polynomial mutation, expected pro_m sites per individual
    let limit = pro_m / dim as f64;
    let scale = fitfun.scale();
    for p in 0..n {
        for i in 0..dim {
            if rng.random::<f64>() < limit {
                let mu = rng.random::<f64>();
                let norm = fitfun.norm_i(i, offspring[[p, i]]);
                let e = dis_m + 1.0;
                offspring[[p, i]] += if mu <= 0.5 {
                    scale[i]
                        * ((2.0 * mu + (1.0 - 2.0 * mu) * (1.0 - norm).powf(e)).powf(1.0 / e)
                            - 1.0)
                } else {
                    scale[i]
                        * (1.0
                            - (2.0 * (1.0 - mu) + 2.0 * (mu - 0.5) * (1.0 - norm).powf(e))
                                .powf(1.0 / e))
                };
            }
        }
    }
    fitfun.clamp_rows(&mut offspring);
    offspring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::{Fitness, Objective};
    use ndarray::Array1;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn test_offspring_stay_in_bounds() {
        let func: Objective = Arc::new(|_x: &Array1<f64>| Array1::zeros(2));
        let fit = Fitness::new(
            func,
            4,
            2,
            Some(Array1::from_elem(4, -1.0)),
            Some(Array1::from_elem(4, 2.0)),
        );
        let mut rng = StdRng::seed_from_u64(11);
        let parents = Array2::from_shape_fn((10, 4), |_| rng.random_range(-1.0..2.0));
        for _ in 0..20 {
            let off = variation(&parents.view(), &fit, 1.0, 20.0, 1.0, 20.0, &mut rng);
            assert_eq!(off.nrows(), 10);
            for row in off.rows() {
                for (i, &v) in row.iter().enumerate() {
                    assert!(fit.feasible(i, v), "coord {} escaped bounds: {}", i, v);
                }
            }
        }
    }
}
