//! Gate catalog injected into the register at construction.
//!
//! The library owns the fixed one-qubit builtin catalog plus every named
//! multi-qubit gate the user registers. Nothing here is global state; two
//! registers can hold different libraries.

use crate::core::errors::{ArgumentError, Result};
use crate::core::utils::{dagger, find_duplicate};
use ndarray::{array, Array2};
use num_complex::Complex64;
use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// The fixed catalog of one-qubit elementary gates, addressed by `char`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    I,
    X,
    Y,
    Z,
    H,
    S,
    T,
}

impl TryFrom<char> for Builtin {
    type Error = ArgumentError;

    fn try_from(value: char) -> std::result::Result<Self, ArgumentError> {
        match value {
            'I' => Ok(Builtin::I),
            'X' => Ok(Builtin::X),
            'Y' => Ok(Builtin::Y),
            'Z' => Ok(Builtin::Z),
            'H' => Ok(Builtin::H),
            'S' => Ok(Builtin::S),
            'T' => Ok(Builtin::T),
            other => Err(ArgumentError::UnknownGate(other)),
        }
    }
}

impl Builtin {
    /// The gate's 2x2 matrix.
    pub fn matrix(self) -> Array2<Complex64> {
        let h = FRAC_1_SQRT_2;
        match self {
            Builtin::I => array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]],
            Builtin::X => array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]],
            Builtin::Y => array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]],
            Builtin::Z => array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]],
            Builtin::H => array![[c(h, 0.0), c(h, 0.0)], [c(h, 0.0), c(-h, 0.0)]],
            Builtin::S => array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]],
            Builtin::T => array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(h, h)]],
        }
    }
}

/// A validated unitary usable as a named multi-qubit gate.
#[derive(Clone, Debug)]
pub struct Gate {
    matrix: Array2<Complex64>,
    num_qubits: usize,
}

impl Gate {
    /// Creates a new `Gate` from a unitary matrix.
    ///
    /// # Errors
    ///
    /// Returns an `ArgumentError` if the matrix is not square, its dimensions
    /// are not a power of 2, or it is not unitary.
    pub fn new(matrix: Array2<Complex64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(ArgumentError::NotSquareMatrix.into());
        }

        if !rows.is_power_of_two() {
            return Err(ArgumentError::InvalidDimensions.into());
        }

        if !Self::check_unitary(&matrix) {
            return Err(ArgumentError::NonUnitary.into());
        }

        let num_qubits = rows.trailing_zeros() as usize;

        Ok(Self { matrix, num_qubits })
    }

    /// Checks if a given matrix is unitary
    fn check_unitary(matrix: &Array2<Complex64>) -> bool {
        let eye = Array2::<Complex64>::eye(matrix.nrows());
        let product = matrix.dot(&dagger(matrix));

        product
            .iter()
            .zip(eye.iter())
            .all(|(a, b)| (*a - *b).norm() < 1e-6)
    }

    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Nonzero `(amplitude, row)` pairs of one matrix column.
    ///
    /// This is the transition table the bitwise representation uses to apply
    /// the gate without touching the full matrix: basis window `column` is
    /// redistributed over the returned rows.
    pub fn transitions(&self, column: u64) -> Vec<(Complex64, u64)> {
        let col = column as usize;
        (0..self.matrix.nrows())
            .filter_map(|row| {
                let val = self.matrix[[row, col]];
                (val.norm_sqr() >= f64::EPSILON).then_some((val, row as u64))
            })
            .collect()
    }

    /// Transition table of the inverse gate, read off the conjugated rows.
    pub fn inverse_transitions(&self, column: u64) -> Vec<(Complex64, u64)> {
        let col = column as usize;
        (0..self.matrix.ncols())
            .filter_map(|row| {
                let val = self.matrix[[col, row]].conj();
                (val.norm_sqr() >= f64::EPSILON).then_some((val, row as u64))
            })
            .collect()
    }
}

/// Holds the builtin catalog and the user-registered named gates.
#[derive(Clone, Debug, Default)]
pub struct GateLibrary {
    named: HashMap<String, Arc<Gate>>,
}

impl GateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix of a builtin one-qubit gate.
    pub fn get_builtin(&self, name: char) -> Result<Array2<Complex64>> {
        Ok(Builtin::try_from(name)?.matrix())
    }

    /// Looks up a registered named gate.
    pub fn get_named(&self, name: &str) -> Result<Arc<Gate>> {
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| ArgumentError::UnknownNamedGate(name.into()).into())
    }

    /// Transition table of a named gate for one basis column, as consumed by
    /// the bitwise fast path.
    pub fn bitwise_transitions(&self, name: &str, column: u64) -> Result<Vec<(Complex64, u64)>> {
        Ok(self.get_named(name)?.transitions(column))
    }

    /// Registers a pre-built gate under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, gate: Gate) -> Arc<Gate> {
        let gate = Arc::new(gate);
        self.named.insert(name.into(), Arc::clone(&gate));
        gate
    }

    /// Creates a one-qubit gate from `[a00, a01, a10, a11]`.
    pub fn make_gate(&mut self, name: &str, matrix: [Complex64; 4]) -> Result<Arc<Gate>> {
        let gate = Gate::new(array![[matrix[0], matrix[1]], [matrix[2], matrix[3]]])?;
        Ok(self.register(name, gate))
    }

    /// Creates a `size`-qubit gate from sparse coordinates:
    /// `U(rows[i], cols[i]) = values[i]`.
    pub fn make_mgate(
        &mut self,
        name: &str,
        size: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[Complex64],
    ) -> Result<Arc<Gate>> {
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(ArgumentError::CoordinateCountMismatch.into());
        }

        let dim = 1usize << size;
        let mut m = Array2::<Complex64>::zeros((dim, dim));
        for ((&row, &col), &value) in rows.iter().zip(cols).zip(values) {
            for index in [row, col] {
                if index >= dim {
                    return Err(ArgumentError::CoordinateOutOfRange { index, dim }.into());
                }
            }
            m[[row, col]] = value;
        }

        Ok(self.register(name, Gate::new(m)?))
    }

    /// Creates a controlled X/Z string gate.
    ///
    /// When every control qubit is 1, applies the sequence `gates` (one char
    /// per qubit, `'X'`, `'Z'` or `'I'`); the Z part contributes the parity
    /// phase `(-1)^popcount(i & z)`.
    pub fn make_cgate(&mut self, name: &str, gates: &str, control: &[usize]) -> Result<Arc<Gate>> {
        let size = gates.chars().count();
        let mut x = 0usize;
        let mut z = 0usize;
        for (i, gate) in gates.chars().enumerate() {
            match gate {
                'X' => x |= 1 << (size - i - 1),
                'Z' => z |= 1 << (size - i - 1),
                'I' => {}
                other => return Err(ArgumentError::UnknownGate(other).into()),
            }
        }

        if let Some(dup) = find_duplicate(control) {
            return Err(ArgumentError::DuplicateQubit(dup).into());
        }
        for &ctrl in control {
            if ctrl >= size {
                return Err(ArgumentError::ControlOutOfRange { index: ctrl, size }.into());
            }
        }

        let dim = 1usize << size;
        let mut m = Array2::<Complex64>::zeros((dim, dim));
        for i in 0..dim {
            let cond = control.iter().all(|&ctrl| i & (1 << (size - ctrl - 1)) != 0);
            if cond {
                let sign = if (i & z).count_ones() % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                m[[i ^ x, i]] = c(sign, 0.0);
            } else {
                m[[i, i]] = c(1.0, 0.0);
            }
        }

        Ok(self.register(name, Gate::new(m)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn builtin_catalog_is_unitary() {
        for name in ['I', 'X', 'Y', 'Z', 'H', 'S', 'T'] {
            let m = Builtin::try_from(name).unwrap().matrix();
            let product = m.dot(&dagger(&m));
            assert_relative_eq!(product[[0, 0]].re, 1.0, epsilon = 1e-12);
            assert_relative_eq!(product[[1, 1]].re, 1.0, epsilon = 1e-12);
            assert_relative_eq!(product[[0, 1]].norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn unknown_builtin_is_rejected() {
        let lib = GateLibrary::new();
        assert!(lib.get_builtin('Q').is_err());
    }

    #[test]
    fn gate_rejects_non_unitary_matrix() {
        let m = array![
            [c(1.0, 0.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(1.0, 0.0)]
        ];
        assert!(Gate::new(m).is_err());
    }

    #[test]
    fn transitions_list_nonzero_rows() {
        let mut lib = GateLibrary::new();
        lib.make_gate(
            "flip",
            [c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)],
        )
        .unwrap();
        let t = lib.bitwise_transitions("flip", 0).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].1, 1);
        assert_relative_eq!(t[0].0.re, 1.0);
    }

    #[test]
    fn inverse_transitions_conjugate_the_rows() {
        let mut lib = GateLibrary::new();
        // S gate: inverse sends |1> -> -i|1>.
        let s = lib
            .make_gate(
                "s",
                [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 1.0)],
            )
            .unwrap();
        let t = s.inverse_transitions(1);
        assert_eq!(t.len(), 1);
        assert_relative_eq!(t[0].0.im, -1.0);
    }

    #[test]
    fn cgate_builds_controlled_pauli_string() {
        let mut lib = GateLibrary::new();
        // Controlled on qubit 0, X on qubit 1: a CNOT.
        let gate = lib.make_cgate("cx", "IX", &[0]).unwrap();
        let m = gate.matrix();
        assert_relative_eq!(m[[0b11, 0b10]].re, 1.0);
        assert_relative_eq!(m[[0b00, 0b00]].re, 1.0);
        // Z strings pick up the parity phase.
        let zz = lib.make_cgate("cz", "IZ", &[0]).unwrap();
        assert_relative_eq!(zz.matrix()[[0b11, 0b11]].re, -1.0);
    }

    #[test]
    fn mgate_checks_coordinates() {
        let mut lib = GateLibrary::new();
        let err = lib.make_mgate("bad", 1, &[5], &[0], &[c(1.0, 0.0)]);
        assert!(err.is_err());
    }
}
