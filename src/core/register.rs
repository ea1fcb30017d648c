//! The quantum register aggregate.
//!
//! Owns the state store, the operation queue, the classical bit record and
//! the seeded PRNG. Every amplitude read goes through [`QuantumRegister::sync`]
//! first, so callers never observe a state the pending operations have not
//! been folded into.

use crate::core::errors::{ArgumentError, Result, StateError};
use crate::core::library::GateLibrary;
use crate::core::queue::OperationQueue;
use crate::core::store::StateStore;
use crate::core::utils::format_amplitude;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Which backing form holds the amplitudes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    Vector,
    DensityMatrix,
    BitwiseSparse,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Representation::Vector => "vector",
            Representation::DensityMatrix => "matrix",
            Representation::BitwiseSparse => "bitwise",
        };
        f.write_str(name)
    }
}

impl FromStr for Representation {
    type Err = ArgumentError;

    fn from_str(s: &str) -> std::result::Result<Self, ArgumentError> {
        match s {
            "vector" => Ok(Representation::Vector),
            "matrix" | "density" => Ok(Representation::DensityMatrix),
            "bitwise" => Ok(Representation::BitwiseSparse),
            other => Err(ArgumentError::UnknownRepresentation(other.into())),
        }
    }
}

/// Sparse coordinate dump of a register state, the crate's serialization
/// boundary. Vector and bitwise states carry `cols` of zeros.
#[derive(Clone, Debug)]
pub struct StateExport {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<Complex64>,
    pub num_qubits: usize,
    pub representation: Representation,
}

#[derive(Clone, Debug)]
pub struct QuantumRegister {
    pub(crate) library: GateLibrary,
    pub(crate) size: usize,
    pub(crate) an_size: usize,
    pub(crate) store: StateStore,
    pub(crate) queue: OperationQueue,
    pub(crate) bits: Vec<Option<bool>>,
    pub(crate) rng: StdRng,
}

impl QuantumRegister {
    /// Creates a register of `nqbits` qubits in the all-zero basis state.
    pub fn new(
        nqbits: usize,
        seed: u64,
        library: GateLibrary,
        representation: Representation,
    ) -> Result<Self> {
        Self::with_init(nqbits, seed, library, representation, 0)
    }

    /// Creates a register initialized to the computational basis state
    /// `|init>`.
    pub fn with_init(
        nqbits: usize,
        seed: u64,
        library: GateLibrary,
        representation: Representation,
        init: u64,
    ) -> Result<Self> {
        if nqbits == 0 {
            return Err(ArgumentError::CountOutOfRange {
                qbit: 0,
                count: 0,
                size: 0,
            }
            .into());
        }
        if nqbits > 30 {
            return Err(ArgumentError::TooManyQubits(nqbits).into());
        }
        if init >> nqbits != 0 {
            return Err(ArgumentError::InitOutOfRange {
                init,
                count: nqbits,
            }
            .into());
        }

        Ok(Self {
            library,
            size: nqbits,
            an_size: 0,
            store: StateStore::new(representation, nqbits, init),
            queue: OperationQueue::new(nqbits),
            bits: vec![None; nqbits],
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of logical qubits, ancillas excluded.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of ancilla qubits currently attached.
    pub fn ancilla_size(&self) -> usize {
        self.an_size
    }

    /// Logical plus ancilla qubits.
    pub fn total_size(&self) -> usize {
        self.size + self.an_size
    }

    pub fn representation(&self) -> Representation {
        self.store.representation()
    }

    pub fn library(&self) -> &GateLibrary {
        &self.library
    }

    /// Mutable library access, for registering user gates after construction.
    pub fn library_mut(&mut self) -> &mut GateLibrary {
        &mut self.library
    }

    /// The classical bit record, one tri-state entry per qubit (ancillas
    /// included), in qubit order. `None` means not yet measured.
    pub fn bits(&self) -> &[Option<bool>] {
        &self.bits
    }

    pub(crate) fn n(&self) -> usize {
        self.size + self.an_size
    }

    /// Folds every pending operation into one batched operator and applies
    /// it. No-op when nothing is pending or the state is bitwise (which never
    /// queues).
    pub(crate) fn sync(&mut self) {
        if self.queue.is_synced() {
            return;
        }

        let u = self.queue.compose();
        debug!(dim = u.nrows(), "syncing batched operator");
        self.store.apply_operator(&u);
        self.queue.reset();
    }

    /// Syncs if any qubit in `[begin, end)` holds a pending operation.
    /// Pending gates elsewhere may entangle into this range through earlier
    /// batches, so the flush is always a full sync.
    pub(crate) fn sync_range(&mut self, begin: usize, end: usize) {
        if self.queue.busy_in(begin, end) {
            self.sync();
        }
    }

    /* argument validation */

    pub(crate) fn valid_qbit(&self, index: usize) -> Result<()> {
        if index >= self.n() {
            return Err(ArgumentError::QubitOutOfRange {
                index,
                size: self.n(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn valid_count(&self, qbit: usize, count: usize, span: usize) -> Result<()> {
        if count == 0 || qbit + count * span > self.n() {
            return Err(ArgumentError::CountOutOfRange {
                qbit,
                count,
                size: self.n(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn valid_range(&self, begin: usize, end: usize) -> Result<()> {
        if begin >= end || end > self.n() {
            return Err(ArgumentError::EmptyRange {
                begin,
                end,
                size: self.n(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn valid_p(&self, p: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ArgumentError::ProbabilityOutOfRange(p).into());
        }
        Ok(())
    }

    pub(crate) fn require_density(&self) -> Result<()> {
        if self.representation() != Representation::DensityMatrix {
            return Err(StateError::RepresentationRequired {
                required: Representation::DensityMatrix,
                actual: self.representation(),
            }
            .into());
        }
        Ok(())
    }

    /// Full dump of the nonzero amplitudes.
    ///
    /// Vector and bitwise states print one `amplitude|logical>|ancilla>` line
    /// per basis state; the density matrix prints `(row, col) value` entries.
    /// Debug/test aid, not a stable format.
    pub fn render(&mut self) -> String {
        self.sync();

        let n = self.n();
        let to_bits = |index: usize| {
            let mut s = String::from("|");
            for q in 0..self.size {
                s.push(if index & (1 << (n - q - 1)) != 0 { '1' } else { '0' });
            }
            s.push('>');
            if self.an_size > 0 {
                s.push('|');
                for q in self.size..n {
                    s.push(if index & (1 << (n - q - 1)) != 0 { '1' } else { '0' });
                }
                s.push('>');
            }
            s
        };

        let mut out = String::new();
        match self.representation() {
            Representation::Vector | Representation::BitwiseSparse => {
                for (row, _, value) in self.store.nonzeros() {
                    out.push_str(&format_amplitude(value));
                    out.push_str(&to_bits(row));
                    out.push('\n');
                }
            }
            Representation::DensityMatrix => {
                for (row, col, value) in self.store.nonzeros() {
                    out.push_str(&format!("({}, {})    {}\n", row, col, format_amplitude(value)));
                }
            }
        }
        out
    }

    /// Exports the synced state as a sparse coordinate list.
    pub fn export_state(&mut self) -> StateExport {
        self.sync();
        let entries = self.store.nonzeros();
        StateExport {
            rows: entries.iter().map(|e| e.0).collect(),
            cols: entries.iter().map(|e| e.1).collect(),
            values: entries.iter().map(|e| e.2).collect(),
            num_qubits: self.n(),
            representation: self.representation(),
        }
    }

    /// Replaces the whole state from a coordinate list.
    ///
    /// The register resizes to `export.num_qubits` with no ancillas; pending
    /// operations and classical bits are discarded, gate history is not
    /// revalidated.
    pub fn import_state(&mut self, export: &StateExport) -> Result<()> {
        if export.rows.len() != export.cols.len() || export.rows.len() != export.values.len() {
            return Err(ArgumentError::CoordinateCountMismatch.into());
        }

        let dim = 1usize << export.num_qubits;
        let col_dim = match export.representation {
            Representation::DensityMatrix => dim,
            _ => 1,
        };
        for (&row, &col) in export.rows.iter().zip(&export.cols) {
            if row >= dim {
                return Err(ArgumentError::CoordinateOutOfRange { index: row, dim }.into());
            }
            if col >= col_dim {
                return Err(ArgumentError::CoordinateOutOfRange {
                    index: col,
                    dim: col_dim,
                }
                .into());
            }
        }

        self.store = StateStore::from_coordinates(
            export.representation,
            export.num_qubits,
            &export.rows,
            &export.cols,
            &export.values,
        );
        self.size = export.num_qubits;
        self.an_size = 0;
        self.queue = OperationQueue::new(self.size);
        self.bits = vec![None; self.size];
        Ok(())
    }

    /// Explicit reconstruction between the matrix-backed representations.
    ///
    /// Vector to density builds `ρ = |ψ><ψ|`; density to vector keeps only
    /// the diagonal magnitudes, which is lossy for mixed states. The bitwise
    /// representation takes part in neither direction.
    pub fn change_to(&mut self, representation: Representation) -> Result<()> {
        if representation == self.representation() {
            return Ok(());
        }

        self.sync();
        let dim = 1usize << self.n();

        match (&self.store, representation) {
            (StateStore::Vector(v), Representation::DensityMatrix) => {
                let mut rho = Array2::<Complex64>::zeros((dim, dim));
                for ((r, c), value) in rho.indexed_iter_mut() {
                    *value = v[r] * v[c].conj();
                }
                self.store = StateStore::Density(rho);
            }
            (StateStore::Density(rho), Representation::Vector) => {
                let mut v = Array1::<Complex64>::zeros(dim);
                for i in 0..dim {
                    v[i] = Complex64::new(rho[[i, i]].re.max(0.0).sqrt(), 0.0);
                }
                self.store = StateStore::Vector(v);
            }
            _ => {
                return Err(StateError::UnsupportedConversion {
                    from: self.representation(),
                    to: representation,
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn register(representation: Representation) -> QuantumRegister {
        QuantumRegister::new(2, 42, GateLibrary::new(), representation).unwrap()
    }

    #[test]
    fn representation_parses_known_strings() {
        assert_eq!("vector".parse(), Ok(Representation::Vector));
        assert_eq!("matrix".parse(), Ok(Representation::DensityMatrix));
        assert_eq!("bitwise".parse(), Ok(Representation::BitwiseSparse));
        assert!("qutrit".parse::<Representation>().is_err());
    }

    #[test]
    fn rejects_empty_register_and_oversized_init() {
        let lib = GateLibrary::new();
        assert!(QuantumRegister::new(0, 1, lib.clone(), Representation::Vector).is_err());
        assert!(
            QuantumRegister::with_init(2, 1, lib, Representation::Vector, 4).is_err()
        );
    }

    #[test]
    fn render_shows_basis_label() {
        let mut reg = register(Representation::Vector);
        assert_eq!(reg.render(), "+1.000       |00>\n");
    }

    #[test]
    fn export_import_round_trip() {
        let mut reg = register(Representation::Vector);
        reg.evol('H', 0, 1, false).unwrap();
        let export = reg.export_state();

        let mut other = register(Representation::DensityMatrix);
        other.import_state(&export).unwrap();
        assert_eq!(other.representation(), Representation::Vector);
        assert_eq!(other.size(), 2);
        assert_relative_eq!(other.store.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn import_checks_coordinates() {
        let mut reg = register(Representation::Vector);
        let bad = StateExport {
            rows: vec![9],
            cols: vec![0],
            values: vec![Complex64::new(1.0, 0.0)],
            num_qubits: 2,
            representation: Representation::Vector,
        };
        assert!(reg.import_state(&bad).is_err());
    }

    #[test]
    fn change_to_density_preserves_probabilities() {
        let mut reg = register(Representation::Vector);
        reg.evol('H', 0, 1, false).unwrap();
        reg.change_to(Representation::DensityMatrix).unwrap();
        assert_eq!(reg.representation(), Representation::DensityMatrix);
        assert_relative_eq!(reg.store.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bitwise_does_not_convert() {
        let mut reg = register(Representation::BitwiseSparse);
        assert!(reg.change_to(Representation::Vector).is_err());
    }
}
