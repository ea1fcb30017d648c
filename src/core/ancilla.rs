//! Ancilla lifecycle.
//!
//! Ancillas are one generation of scratch qubits appended below the logical
//! register. They are addressed either globally (`logical_size + i`) or
//! through the `an_*` helpers, and removed by partial trace.

use crate::core::errors::{ArgumentError, LogicError, Result};
use crate::core::register::{QuantumRegister, Representation};
use tracing::debug;

impl QuantumRegister {
    /// Appends `count` ancilla qubits in basis state `|init>`.
    ///
    /// Only one ancilla generation may exist at a time; remove the current
    /// one before adding again.
    pub fn add_ancillas(&mut self, count: usize, init: u64) -> Result<()> {
        if count == 0 {
            return Err(ArgumentError::CountOutOfRange {
                qbit: self.n(),
                count,
                size: self.n(),
            }
            .into());
        }
        if self.n() + count > 30 {
            return Err(ArgumentError::TooManyQubits(self.n() + count).into());
        }
        if init >> count != 0 {
            return Err(ArgumentError::InitOutOfRange { init, count }.into());
        }
        if self.an_size != 0 {
            return Err(LogicError::AncillasPresent.into());
        }

        self.sync();
        self.store.extend(count, init);
        self.an_size = count;
        self.bits.resize(self.n(), None);
        self.queue.extend(count);
        debug!(count, init, "ancillas added");
        Ok(())
    }

    /// Removes every ancilla, last to first.
    ///
    /// Vector form: a still-unmeasured last ancilla is measured first, so the
    /// amplitude pair-sum of the partial trace is over a definite bit.
    /// Density form: genuine partial trace, no measurement needed. Bitwise
    /// form: all ancillas are measured, then every key drops its low bits.
    pub fn rm_ancillas(&mut self) -> Result<()> {
        if self.an_size == 0 {
            return Err(LogicError::NoAncillas.into());
        }

        self.sync();

        match self.representation() {
            Representation::BitwiseSparse => {
                let count = self.an_size;
                self.measure(self.size, count)?;
                self.store.shift_right(count);
                self.an_size = 0;
            }
            Representation::Vector => {
                while self.an_size > 0 {
                    let last = self.n() - 1;
                    if self.bits[last].is_none() {
                        self.measure_one(last);
                    }
                    self.store.trace_out_last();
                    self.an_size -= 1;
                }
            }
            Representation::DensityMatrix => {
                while self.an_size > 0 {
                    self.store.trace_out_last();
                    self.an_size -= 1;
                }
            }
        }

        self.bits.truncate(self.size);
        self.queue.truncate(self.size);
        debug!("ancillas removed");
        Ok(())
    }

    /// [`evol`](Self::evol) addressed relative to the first ancilla.
    pub fn an_evol(&mut self, gate: char, qbit: usize, count: usize, invert: bool) -> Result<()> {
        self.valid_ancilla(qbit, count)?;
        self.evol(gate, self.size + qbit, count, invert)
    }

    /// [`measure`](Self::measure) addressed relative to the first ancilla.
    pub fn an_measure(&mut self, qbit: usize, count: usize) -> Result<()> {
        self.valid_ancilla(qbit, count)?;
        self.measure(self.size + qbit, count)
    }

    /// Classical bits of the ancilla block only.
    pub fn an_bits(&self) -> &[Option<bool>] {
        &self.bits[self.size..]
    }

    fn valid_ancilla(&self, qbit: usize, count: usize) -> Result<()> {
        if qbit >= self.an_size {
            return Err(ArgumentError::QubitOutOfRange {
                index: qbit,
                size: self.an_size,
            }
            .into());
        }
        if count == 0 || qbit + count > self.an_size {
            return Err(ArgumentError::CountOutOfRange {
                qbit,
                count,
                size: self.an_size,
            }
            .into());
        }
        Ok(())
    }
}
