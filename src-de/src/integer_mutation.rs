//! Extra mutation for discrete decision variables
//!
//! Discrete coordinates tend to get stuck at local minima under plain DE
//! recombination, so they are occasionally resampled outright.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;

use crate::fitness::Fitness;

/// Resample each integer coordinate of `x` with probability
/// `rate / n_ints`, where `rate` is drawn uniformly from
/// `[min_mutate, max_mutate)`. `anchored` selects the incumbent-anchored
/// normal resampler instead of the plain box sampler. No-op when no
/// integrality mask is set.
pub(crate) fn modify(
    x: &mut Array1<f64>,
    fitfun: &Fitness,
    min_mutate: f64,
    max_mutate: f64,
    anchored: bool,
    rng: &mut StdRng,
) {
    let ints = match fitfun.ints() {
        Some(v) => v.to_vec(),
        None => return,
    };
    let n_ints = ints.iter().filter(|&&b| b).count() as f64;
    let to_mutate = min_mutate + rng.random::<f64>() * (max_mutate - min_mutate);
    for i in 0..x.len() {
        if ints[i] && rng.random::<f64>() < to_mutate / n_ints {
            let v = if anchored {
                fitfun.norm_x_i(i, rng)
            } else {
                fitfun.sample_i(i, rng)
            };
            x[i] = v.trunc();
        }
    }
}
