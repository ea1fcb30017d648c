//! Projective measurement in the computational basis.

use crate::core::errors::Result;
use crate::core::register::QuantumRegister;
use crate::core::utils::qubit_mask;
use rand::Rng;
use tracing::debug;

impl QuantumRegister {
    /// Measures `count` adjacent qubits starting at `qbit`, recording each
    /// outcome in the classical bit register and collapsing the state.
    pub fn measure(&mut self, qbit: usize, count: usize) -> Result<()> {
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, 1)?;

        for i in qbit..qbit + count {
            self.measure_one(i);
        }
        Ok(())
    }

    /// Measures every qubit, ancillas included.
    pub fn measure_all(&mut self) -> Result<()> {
        self.measure(0, self.n())
    }

    /// One-qubit collapse. Arguments were validated by the caller.
    ///
    /// Samples against the marginal probability of reading 0; `p0 == 0` is
    /// guarded so a dead branch can never be selected by the `r <= p0`
    /// comparison.
    pub(crate) fn measure_one(&mut self, qbit: usize) {
        self.sync();

        let mask = qubit_mask(self.n(), qbit);
        let p0 = self.store.prob_zero(mask);
        let roll: f64 = self.rng.random();
        let one = !(p0 != 0.0 && roll <= p0);
        let p = if one { 1.0 - p0 } else { p0 };

        self.store.project(mask, one, p);
        self.bits[qbit] = Some(one);
        debug!(qbit, outcome = u8::from(one), "measured qubit");
    }
}
