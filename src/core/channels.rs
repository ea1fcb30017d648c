//! Noise channels.
//!
//! The density matrix gets full Kraus-operator sums `Σ E·ρ·E†`; the vector
//! and bitwise forms only support the probabilistic flip, realized as a
//! single PRNG draw followed by an ordinary gate application.

use crate::core::algebra::embed;
use crate::core::errors::{ArgumentError, Result};
use crate::core::register::{QuantumRegister, Representation};
use crate::core::store::StateStore;
use crate::core::utils::dagger;
use ndarray::{array, Array2};
use num_complex::Complex64;
use rand::Rng;
use tracing::debug;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// One Kraus term `E·ρ·E†`.
fn kraus_term(rho: &Array2<Complex64>, e: &Array2<Complex64>) -> Array2<Complex64> {
    e.dot(rho).dot(&dagger(e))
}

impl QuantumRegister {
    fn density_mut(&mut self) -> &mut Array2<Complex64> {
        match &mut self.store {
            StateStore::Density(rho) => rho,
            _ => unreachable!("density channel on non-density state"),
        }
    }

    /// Pauli flip error: applies `gate` to `qbit` with probability `p`.
    ///
    /// On the vector and bitwise representations this is one Monte-Carlo
    /// draw; on the density matrix it is the Kraus pair
    /// `E0 = √p·G`, `E1 = √(1-p)·I`.
    pub fn flip(&mut self, gate: char, qbit: usize, p: f64) -> Result<()> {
        if !matches!(gate, 'X' | 'Y' | 'Z') {
            return Err(ArgumentError::NotPauli(gate).into());
        }
        self.valid_qbit(qbit)?;
        self.valid_p(p)?;

        if self.representation() != Representation::DensityMatrix {
            let roll: f64 = self.rng.random();
            if p != 0.0 && roll <= p {
                debug!(gate = %gate, qbit, "flip fired");
                self.evol(gate, qbit, 1, false)?;
            }
            return Ok(());
        }

        self.sync();
        let n = self.n();
        let g = embed(&self.library.get_builtin(gate)?, qbit, n);
        let rho = self.density_mut();
        let flipped = kraus_term(rho, &g);
        *rho = rho.mapv(|v| v * (1.0 - p)) + flipped.mapv(|v| v * p);
        Ok(())
    }

    /// Amplitude damping: decays `|1>` toward `|0>` with probability `p`.
    pub fn amp_damping(&mut self, qbit: usize, p: f64) -> Result<()> {
        self.require_density()?;
        self.valid_qbit(qbit)?;
        self.valid_p(p)?;
        self.sync();

        let n = self.n();
        let e0 = embed(
            &array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c((1.0 - p).sqrt(), 0.0)]],
            qbit,
            n,
        );
        let e1 = embed(
            &array![[c(0.0, 0.0), c(p.sqrt(), 0.0)], [c(0.0, 0.0), c(0.0, 0.0)]],
            qbit,
            n,
        );

        let rho = self.density_mut();
        *rho = kraus_term(rho, &e0) + kraus_term(rho, &e1);
        Ok(())
    }

    /// Depolarizing channel:
    /// `ρ' = (1-p)·ρ + p/3·(XρX + YρY + ZρZ)` embedded at `qbit`.
    pub fn dpl_channel(&mut self, qbit: usize, p: f64) -> Result<()> {
        self.require_density()?;
        self.valid_qbit(qbit)?;
        self.valid_p(p)?;
        self.sync();

        let n = self.n();
        let mut paulis = Vec::with_capacity(3);
        for gate in ['X', 'Y', 'Z'] {
            paulis.push(embed(&self.library.get_builtin(gate)?, qbit, n));
        }

        let rho = self.density_mut();
        let mut mixed = Array2::<Complex64>::zeros(rho.raw_dim());
        for g in &paulis {
            mixed = mixed + kraus_term(rho, g);
        }
        *rho = rho.mapv(|v| v * (1.0 - p)) + mixed.mapv(|v| v * (p / 3.0));
        Ok(())
    }

    /// General operator-sum channel `ρ' = Σ pᵢ·Eᵢ·ρ·Eᵢ†`.
    ///
    /// Each `kraus[i]` is a string of builtin gate names tensored together;
    /// operators shorter than the register are embedded at `qbit`. The
    /// probabilities must sum to 1.
    pub fn sum(&mut self, qbit: usize, kraus: &[String], p: &[f64]) -> Result<()> {
        self.require_density()?;
        self.valid_qbit(qbit)?;

        if kraus.len() != p.len() {
            return Err(ArgumentError::KrausCountMismatch {
                ops: kraus.len(),
                probs: p.len(),
            }
            .into());
        }
        let total: f64 = p.iter().sum();
        if (total - 1.0).abs() > 1e-14 {
            return Err(ArgumentError::KrausProbabilitySum(total).into());
        }

        let ksize = kraus.first().map_or(0, |k| k.chars().count());
        for k in kraus {
            if k.chars().count() != ksize {
                return Err(ArgumentError::KrausLengthMismatch.into());
            }
        }
        self.valid_count(qbit, 1, ksize)?;

        // Resolve every operator before touching the state.
        let n = self.n();
        let mut operators = Vec::with_capacity(kraus.len());
        for names in kraus {
            let mut op: Option<Array2<Complex64>> = None;
            for name in names.chars() {
                let g = self.library.get_builtin(name)?;
                op = Some(match op {
                    None => g,
                    Some(acc) => crate::core::utils::kronecker_product(&acc, &g),
                });
            }
            let op = op.unwrap_or_else(|| Array2::eye(1));
            operators.push(embed(&op, qbit, n));
        }

        self.sync();
        debug!(operators = operators.len(), qbit, "applying operator-sum channel");

        let rho = self.density_mut();
        let mut next = Array2::<Complex64>::zeros(rho.raw_dim());
        for (op, &weight) in operators.iter().zip(p) {
            next = next + kraus_term(rho, op).mapv(|v| v * weight);
        }
        *rho = next;
        Ok(())
    }
}
