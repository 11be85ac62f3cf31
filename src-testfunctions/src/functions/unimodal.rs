//! Unimodal test functions with a single global optimum

use ndarray::Array1;

/// Sphere function: f(x) = sum(x_i^2)
/// Global minimum f(x) = 0 at x = 0
pub fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

/// Simple quadratic bowl shifted to (1, ..., 1)
pub fn quadratic(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| (xi - 1.0).powi(2)).sum()
}

/// Rosenbrock function: f(x) = sum(100*(x_{i+1} - x_i^2)^2 + (1 - x_i)^2)
/// Global minimum f(x) = 0 at x = (1, ..., 1); narrow curved valley
pub fn rosenbrock(x: &Array1<f64>) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        sum += 100.0 * (x[i + 1] - x[i] * x[i]).powi(2) + (1.0 - x[i]).powi(2);
    }
    sum
}

/// Sum of different powers: f(x) = sum(|x_i|^(i+2))
pub fn sum_of_powers(x: &Array1<f64>) -> f64 {
    x.iter()
        .enumerate()
        .map(|(i, &xi)| xi.abs().powi(i as i32 + 2))
        .sum()
}
