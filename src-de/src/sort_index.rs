use std::cmp::Ordering;

/// Indices that sort `v` ascending. Ties keep their original order.
pub(crate) fn sort_index(v: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|&a, &b| v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal));
    idx
}
