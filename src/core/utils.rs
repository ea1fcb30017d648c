//! Utility functions shared by the simulation core.
//!
//! This module contains helper functions for:
//! - Matrix operations (Kronecker product, trace, conjugate transpose).
//! - Bit manipulation for basis-state indices.
//! - Amplitude formatting for state dumps.

use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;

/// Computes the Kronecker (Tensor) product of two matrices.
///
/// If `A` is an $m \times n$ matrix and `B` is a $p \times q$ matrix,
/// the result is an $mp \times nq$ matrix.
pub fn kronecker_product(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (m, n) = a.dim();
    let (p, q) = b.dim();

    // Broadcast A as (m, 1, n, 1) against B as (1, p, 1, q), then collapse
    // the paired axes into (m*p, n*q).
    let a_expanded = a.view().insert_axis(Axis(1)).insert_axis(Axis(3));
    let b_expanded = b.view().insert_axis(Axis(0)).insert_axis(Axis(2));

    let tensor_product = &a_expanded * &b_expanded;

    tensor_product
        .into_shape_with_order((m * p, n * q))
        .unwrap()
}

/// Kronecker product of two column vectors.
pub fn kronecker_vector(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array1<Complex64> {
    let (n, m) = (a.len(), b.len());
    let mut out = Array1::<Complex64>::zeros(n * m);
    for i in 0..n {
        if a[i].norm_sqr() < f64::EPSILON {
            continue;
        }
        for j in 0..m {
            out[i * m + j] = a[i] * b[j];
        }
    }
    out
}

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose $U^\dagger$.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|x| x.conj())
}

/// Basis-index mask selecting `qbit` in a `total`-qubit register.
///
/// Qubit 0 is the most significant bit of the basis index.
pub fn qubit_mask(total: usize, qbit: usize) -> u64 {
    1u64 << (total - qbit - 1)
}

/// Find duplicate in a slice of usize
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = std::collections::HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Formats one amplitude the way state dumps print it: fixed three decimals,
/// explicit sign, imaginary part only when it is significant.
pub fn format_amplitude(value: Complex64) -> String {
    if value.im.abs() < 1e-14 {
        format!("{:+.3}       ", value.re)
    } else if value.re.abs() < 1e-14 {
        format!("{:+.3}i      ", value.im)
    } else {
        format!("{:+.3}{:+.3}i", value.re, value.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn kronecker_product_of_identities_is_identity() {
        let eye2 = Array2::<Complex64>::eye(2);
        let result = kronecker_product(&eye2, &eye2);
        let eye4 = Array2::<Complex64>::eye(4);
        for (a, b) in result.iter().zip(eye4.iter()) {
            assert_relative_eq!(a.re, b.re);
            assert_relative_eq!(a.im, b.im);
        }
    }

    #[test]
    fn kronecker_product_orders_factors() {
        let x = array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]];
        let eye = Array2::<Complex64>::eye(2);
        // X ⊗ I flips the most significant qubit: basis 0 -> 2.
        let m = kronecker_product(&x, &eye);
        assert_relative_eq!(m[[2, 0]].re, 1.0);
        assert_relative_eq!(m[[0, 0]].re, 0.0);
    }

    #[test]
    fn kronecker_vector_matches_matrix_form() {
        let a = array![c(1.0, 0.0), c(0.0, 0.0)];
        let b = array![c(0.0, 0.0), c(1.0, 0.0)];
        let v = kronecker_vector(&a, &b);
        assert_relative_eq!(v[1].re, 1.0);
        assert_eq!(v.len(), 4);
        assert_relative_eq!(v[0].re, 0.0);
    }

    #[test]
    fn qubit_zero_is_most_significant() {
        assert_eq!(qubit_mask(3, 0), 0b100);
        assert_eq!(qubit_mask(3, 2), 0b001);
    }

    #[test]
    fn dagger_conjugates_and_transposes() {
        let m = array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]];
        let d = dagger(&m);
        assert_relative_eq!(d[[0, 1]].im, -1.0);
        assert_relative_eq!(d[[1, 0]].im, 1.0);
    }

    #[test]
    fn finds_duplicates() {
        assert_eq!(find_duplicate(&[0, 1, 2, 1]), Some(1));
        assert_eq!(find_duplicate(&[0, 1, 2]), None);
    }
}
