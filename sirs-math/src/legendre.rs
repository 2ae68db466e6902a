//! Legendre polynomial evaluation
//!
//! Polynomials are generated with Bonnet's recursion
//! `(n+1) P_{n+1}(x) = (2n+1) x P_n(x) - n P_{n-1}(x)`, starting from
//! `P_0 = 1` and `P_1 = x`.

use nalgebra::DMatrix;

/// Evaluate `P_0(x) ..= P_degree(x)` at a single abscissa.
pub fn legendre_values(x: f64, degree: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(degree + 1);
    values.push(1.0);
    if degree == 0 {
        return values;
    }
    values.push(x);
    for n in 1..degree {
        let nf = n as f64;
        let next = ((2.0 * nf + 1.0) * x * values[n] - nf * values[n - 1]) / (nf + 1.0);
        values.push(next);
    }
    values
}

/// Basis matrix with one row per abscissa and one column per polynomial order.
///
/// Column `k` holds `P_k` evaluated at every entry of `xs`, giving a
/// `[xs.len(), degree + 1]` matrix.
pub fn legendre_basis(xs: &[f64], degree: usize) -> DMatrix<f64> {
    let mut basis = DMatrix::zeros(xs.len(), degree + 1);
    for (row, &x) in xs.iter().enumerate() {
        for (col, value) in legendre_values(x, degree).into_iter().enumerate() {
            basis[(row, col)] = value;
        }
    }
    basis
}
