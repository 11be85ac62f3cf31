//! Constraint functions for constrained optimization tests
//!
//! All constraints follow the convention g(x) <= 0 when satisfied; the
//! returned value is the violation amount.

use ndarray::Array1;

/// Binh-Korn constraint 1: (x1 - 5)^2 + x2^2 <= 25
pub fn binh_korn_constraint1(x: &Array1<f64>) -> f64 {
    (x[0] - 5.0).powi(2) + x[1].powi(2) - 25.0
}

/// Binh-Korn constraint 2: (x1 - 8)^2 + (x2 + 3)^2 >= 7.7
pub fn binh_korn_constraint2(x: &Array1<f64>) -> f64 {
    7.7 - ((x[0] - 8.0).powi(2) + (x[1] + 3.0).powi(2))
}

/// Simplex budget constraint: sum(x_i) <= budget
pub fn budget_constraint(x: &Array1<f64>, budget: f64) -> f64 {
    x.iter().sum::<f64>() - budget
}
