//! Pure builders for parametric and structural gate matrices.
//!
//! Every function here is stateless and returns a `2^span x 2^span` operator.
//! Qubit 0 of a span is the most significant bit of the basis index, matching
//! the register-wide convention.

use crate::core::errors::ArgumentError;
use crate::core::utils::kronecker_product;
use ndarray::{array, Array2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Rotation axis for [`rotation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl TryFrom<char> for Axis {
    type Error = ArgumentError;

    fn try_from(value: char) -> Result<Self, ArgumentError> {
        match value {
            'X' => Ok(Axis::X),
            'Y' => Ok(Axis::Y),
            'Z' => Ok(Axis::Z),
            other => Err(ArgumentError::NotPauli(other)),
        }
    }
}

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Single-qubit rotation of `angle` radians around `axis`.
pub fn rotation(axis: Axis, angle: f64) -> Array2<Complex64> {
    let (cos, sin) = ((angle / 2.0).cos(), (angle / 2.0).sin());
    match axis {
        Axis::X => array![[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]],
        Axis::Y => array![[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]],
        Axis::Z => array![
            [Complex64::from_polar(1.0, -angle / 2.0), c(0.0, 0.0)],
            [c(0.0, 0.0), Complex64::from_polar(1.0, angle / 2.0)]
        ],
    }
}

/// General single-qubit unitary.
///
/// `u3(theta, phi, lambda)` =
/// [[cos(θ/2), -e^{iλ}sin(θ/2)], [e^{iφ}sin(θ/2), e^{i(λ+φ)}cos(θ/2)]].
pub fn u3(theta: f64, phi: f64, lambda: f64) -> Array2<Complex64> {
    let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    array![
        [
            c(cos, 0.0),
            Complex64::from_polar(1.0, lambda) * c(-sin, 0.0)
        ],
        [
            Complex64::from_polar(1.0, phi) * c(sin, 0.0),
            Complex64::from_polar(1.0, lambda + phi) * c(cos, 0.0)
        ]
    ]
}

/// `u3` with theta fixed at π/2.
pub fn u2(phi: f64, lambda: f64) -> Array2<Complex64> {
    u3(PI / 2.0, phi, lambda)
}

/// Diagonal phase gate, `u3` with theta = phi = 0.
pub fn u1(lambda: f64) -> Array2<Complex64> {
    u3(0.0, 0.0, lambda)
}

/// Controlled-not over a `span`-qubit window.
///
/// `target` and `controls` are window-local indices (see [`cut`]). For each
/// basis column whose control bits are all 1 the target bit is flipped,
/// every other column stays on the diagonal.
pub fn controlled_not(target: usize, controls: &[usize], span: usize) -> Array2<Complex64> {
    let dim = 1usize << span;
    let tmask = 1usize << (span - target - 1);
    let mut m = Array2::<Complex64>::zeros((dim, dim));

    for col in 0..dim {
        let cond = controls
            .iter()
            .all(|&ctrl| col & (1usize << (span - ctrl - 1)) != 0);
        let row = if cond { col ^ tmask } else { col };
        m[[row, col]] = c(1.0, 0.0);
    }

    m
}

/// Controlled-phase over a `span`-qubit window.
///
/// Diagonal matrix multiplying by `phase` exactly where all control bits and
/// the target bit are 1. The caller has already validated `|phase| == 1`.
pub fn controlled_phase(
    phase: Complex64,
    target: usize,
    controls: &[usize],
    span: usize,
) -> Array2<Complex64> {
    let dim = 1usize << span;
    let tmask = 1usize << (span - target - 1);
    let mut m = Array2::<Complex64>::zeros((dim, dim));

    for i in 0..dim {
        let cond = controls
            .iter()
            .all(|&ctrl| i & (1usize << (span - ctrl - 1)) != 0);
        m[[i, i]] = if cond && i & tmask != 0 {
            phase
        } else {
            c(1.0, 0.0)
        };
    }

    m
}

/// Permutation matrix exchanging the two boundary qubits of a `span` window.
pub fn swap(span: usize) -> Array2<Complex64> {
    let dim = 1usize << span;
    let hi = 1usize << (span - 1);
    let mut m = Array2::<Complex64>::zeros((dim, dim));

    for i in 0..dim {
        let (a, b) = (i & hi != 0, i & 1 != 0);
        let j = if a == b { i } else { i ^ (hi | 1) };
        m[[j, i]] = c(1.0, 0.0);
    }

    m
}

/// Quantum Fourier transform over `span` qubits.
///
/// Dense matrix with entries `ω^(i·j)/√2^span`, `ω = exp(2πi/2^span)`.
pub fn qft(span: usize) -> Array2<Complex64> {
    let dim = 1usize << span;
    let norm = 1.0 / (dim as f64).sqrt();
    let step = 2.0 * PI / dim as f64;
    let mut m = Array2::<Complex64>::zeros((dim, dim));

    for i in 0..dim {
        for j in 0..dim {
            m[[i, j]] = Complex64::from_polar(norm, step * (i * j) as f64);
        }
    }

    m
}

/// Embeds a local gate at qubit offset `qbit` inside a `total`-qubit system
/// via Kronecker products with identity blocks. Boundary offsets need only
/// one identity factor.
pub fn embed(gate: &Array2<Complex64>, qbit: usize, total: usize) -> Array2<Complex64> {
    let gate_size = gate.nrows().trailing_zeros() as usize;
    if gate_size == total {
        return gate.clone();
    }

    if qbit == 0 {
        let eye = Array2::<Complex64>::eye(1usize << (total - gate_size));
        kronecker_product(gate, &eye)
    } else if qbit == total - gate_size {
        let eye = Array2::<Complex64>::eye(1usize << (total - gate_size));
        kronecker_product(&eye, gate)
    } else {
        let before = Array2::<Complex64>::eye(1usize << qbit);
        let after = Array2::<Complex64>::eye(1usize << (total - qbit - gate_size));
        kronecker_product(&kronecker_product(&before, gate), &after)
    }
}

/// Normalizes a target/controls set to its minimal enclosing window.
///
/// Returns `(span, origin)` plus the target and controls rebased so the
/// window's lowest qubit is index 0.
pub fn cut(target: usize, controls: &[usize]) -> (usize, usize, usize, Vec<usize>) {
    let maxq = controls.iter().copied().fold(target, usize::max);
    let minq = controls.iter().copied().fold(target, usize::min);
    let span = maxq - minq + 1;
    let local_controls = controls.iter().map(|ctrl| ctrl - minq).collect();
    (span, minq, target - minq, local_controls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::dagger;
    use approx::assert_relative_eq;

    fn assert_unitary(m: &Array2<Complex64>) {
        let product = m.dot(&dagger(m));
        let eye = Array2::<Complex64>::eye(m.nrows());
        for (a, b) in product.iter().zip(eye.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn rotations_are_unitary() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            assert_unitary(&rotation(axis, 1.234));
        }
    }

    #[test]
    fn full_x_rotation_is_minus_identity() {
        let m = rotation(Axis::X, 2.0 * PI);
        assert_relative_eq!(m[[0, 0]].re, -1.0, epsilon = 1e-12);
        assert_relative_eq!(m[[1, 1]].re, -1.0, epsilon = 1e-12);
        assert_relative_eq!(m[[0, 1]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn axis_parses_pauli_chars_only() {
        assert_eq!(Axis::try_from('X'), Ok(Axis::X));
        assert_eq!(Axis::try_from('q'), Err(ArgumentError::NotPauli('q')));
    }

    #[test]
    fn u3_covers_special_cases() {
        let h_like = u2(0.0, PI);
        assert_relative_eq!(h_like[[0, 0]].re, (0.5f64).sqrt(), epsilon = 1e-12);
        let phase = u1(PI / 2.0);
        assert_relative_eq!(phase[[1, 1]].im, 1.0, epsilon = 1e-12);
        assert_relative_eq!(phase[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_unitary(&u3(0.3, 0.7, 1.1));
    }

    #[test]
    fn controlled_not_flips_when_controls_set() {
        // Window of 2 qubits, control on qubit 0, target on qubit 1.
        let m = controlled_not(1, &[0], 2);
        // |10> (index 2) -> |11> (index 3).
        assert_relative_eq!(m[[3, 2]].re, 1.0);
        assert_relative_eq!(m[[0, 0]].re, 1.0);
        assert_relative_eq!(m[[1, 1]].re, 1.0);
        assert_unitary(&m);
    }

    #[test]
    fn controlled_phase_is_diagonal() {
        let phase = Complex64::from_polar(1.0, PI / 4.0);
        let m = controlled_phase(phase, 1, &[0], 2);
        assert_relative_eq!(m[[3, 3]].im, phase.im);
        assert_relative_eq!(m[[2, 2]].re, 1.0);
        assert_unitary(&m);
    }

    #[test]
    fn swap_exchanges_boundary_qubits() {
        let m = swap(3);
        // |100> (4) <-> |001> (1), middle qubit untouched.
        assert_relative_eq!(m[[1, 4]].re, 1.0);
        assert_relative_eq!(m[[4, 1]].re, 1.0);
        assert_relative_eq!(m[[5, 5]].re, 1.0);
        assert_unitary(&m);
    }

    #[test]
    fn single_qubit_qft_is_hadamard() {
        let m = qft(1);
        let h = 1.0 / 2f64.sqrt();
        assert_relative_eq!(m[[0, 0]].re, h, epsilon = 1e-12);
        assert_relative_eq!(m[[1, 1]].re, -h, epsilon = 1e-12);
        assert_unitary(&m);
    }

    #[test]
    fn embed_handles_boundaries() {
        let x = array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]];
        // X on qubit 0 of 2: |00> -> |10>.
        let head = embed(&x, 0, 2);
        assert_relative_eq!(head[[2, 0]].re, 1.0);
        // X on qubit 1 of 2: |00> -> |01>.
        let tail = embed(&x, 1, 2);
        assert_relative_eq!(tail[[1, 0]].re, 1.0);
        // Interior embedding keeps both identity factors.
        let mid = embed(&x, 1, 3);
        assert_relative_eq!(mid[[0b010, 0b000]].re, 1.0);
        assert_relative_eq!(mid[[0b111, 0b101]].re, 1.0);
    }

    #[test]
    fn cut_rebases_to_window_origin() {
        let (span, origin, target, controls) = cut(4, &[1, 2]);
        assert_eq!(span, 4);
        assert_eq!(origin, 1);
        assert_eq!(target, 3);
        assert_eq!(controls, vec![0, 1]);
    }
}
