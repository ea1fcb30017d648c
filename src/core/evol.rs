//! Gate application.
//!
//! Matrix-backed representations never apply a gate eagerly: calls claim a
//! qubit range in the operation queue and the batched operator lands on the
//! state at the next sync. The bitwise representation instead rewrites its
//! sparse amplitude map immediately, using closed-form index and phase
//! transformations, and must agree with the matrix path to floating-point
//! tolerance.

use crate::core::algebra::{self, Axis};
use crate::core::errors::{ArgumentError, Result};
use crate::core::library::{Builtin, Gate};
use crate::core::queue::PendingOp;
use crate::core::register::{QuantumRegister, Representation};
use crate::core::store::AMP_EPS;
use crate::core::utils::{find_duplicate, qubit_mask};
use ahash::AHashMap;
use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::Arc;

/// Accumulates `value` into `map[key]`, dropping the entry again if the
/// result is numerically zero.
fn add_amp(map: &mut AHashMap<u64, Complex64>, key: u64, value: Complex64) {
    let entry = map.entry(key).or_default();
    *entry += value;
    if entry.norm() < AMP_EPS {
        map.remove(&key);
    }
}

impl QuantumRegister {
    fn is_bitwise(&self) -> bool {
        self.representation() == Representation::BitwiseSparse
    }

    fn valid_controls(&self, target: usize, controls: &[usize]) -> Result<()> {
        if controls.is_empty() {
            return Err(ArgumentError::EmptyControls.into());
        }
        for &ctrl in controls {
            if ctrl >= self.n() {
                return Err(ArgumentError::ControlOutOfRange {
                    index: ctrl,
                    size: self.n(),
                }
                .into());
            }
        }
        if let Some(dup) = find_duplicate(controls) {
            return Err(ArgumentError::DuplicateQubit(dup).into());
        }
        if controls.contains(&target) {
            return Err(ArgumentError::ControlTargetOverlap(target).into());
        }
        Ok(())
    }

    fn valid_phase(&self, phase: Complex64) -> Result<()> {
        if (phase.norm() - 1.0).abs() > 1e-14 {
            return Err(ArgumentError::PhaseNotUnit(phase.norm()).into());
        }
        Ok(())
    }

    /// Applies `count` copies of a builtin one-qubit gate starting at `qbit`.
    pub fn evol(&mut self, gate: char, qbit: usize, count: usize, invert: bool) -> Result<()> {
        let gate = Builtin::try_from(gate)?;
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, 1)?;

        if !self.is_bitwise() {
            self.sync_range(qbit, qbit + count);
            for i in 0..count {
                self.queue.place(qbit + i, PendingOp::Single { gate, invert });
            }
            return Ok(());
        }

        for k in 0..count {
            let mask = qubit_mask(self.n(), qbit + k);
            let map = self.store.bitwise_mut();
            match gate {
                Builtin::I => {}
                Builtin::X => bw_x(map, mask),
                Builtin::Y => bw_y(map, mask),
                Builtin::Z => bw_phase(map, mask, Complex64::new(-1.0, 0.0)),
                Builtin::H => bw_h(map, mask),
                Builtin::S => {
                    let phase = if invert {
                        Complex64::new(0.0, -1.0)
                    } else {
                        Complex64::new(0.0, 1.0)
                    };
                    bw_phase(map, mask, phase);
                }
                Builtin::T => {
                    let sign = if invert { -1.0 } else { 1.0 };
                    bw_phase(map, mask, Complex64::new(FRAC_1_SQRT_2, sign * FRAC_1_SQRT_2));
                }
            }
        }
        Ok(())
    }

    /// Applies a gate registered in the library under `name`.
    pub fn evol_named(&mut self, name: &str, qbit: usize, count: usize, invert: bool) -> Result<()> {
        let gate = self.library.get_named(name)?;
        self.apply(gate, qbit, count, invert)
    }

    /// Applies `count` adjacent copies of an externally supplied gate.
    pub fn apply(&mut self, gate: Arc<Gate>, qbit: usize, count: usize, invert: bool) -> Result<()> {
        let span = gate.num_qubits();
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, span)?;

        if !self.is_bitwise() {
            self.sync_range(qbit, qbit + count * span);
            for i in 0..count {
                self.queue.place(
                    qbit + i * span,
                    PendingOp::Named {
                        gate: Arc::clone(&gate),
                        invert,
                    },
                );
            }
            return Ok(());
        }

        for i in 0..count {
            let n = self.n();
            let suffix = n - (qbit + i * span) - span;
            let wmask = ((1u64 << span) - 1) << suffix;
            let map = self.store.bitwise_mut();

            let mut next = AHashMap::with_capacity(map.len());
            for (&key, &amp) in map.iter() {
                let window = (key & wmask) >> suffix;
                let rest = key & !wmask;
                let transitions = if invert {
                    gate.inverse_transitions(window)
                } else {
                    gate.transitions(window)
                };
                for (value, row) in transitions {
                    add_amp(&mut next, rest | (row << suffix), amp * value);
                }
            }
            *map = next;
        }
        Ok(())
    }

    /// Rotation of `angle` radians around `axis` on `count` qubits.
    pub fn rot(&mut self, axis: char, angle: f64, qbit: usize, count: usize) -> Result<()> {
        let axis = Axis::try_from(axis)?;
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, 1)?;

        if !self.is_bitwise() {
            self.sync_range(qbit, qbit + count);
            for i in 0..count {
                self.queue.place(qbit + i, PendingOp::Rotation { axis, angle });
            }
            return Ok(());
        }

        let (cos, sin) = ((angle / 2.0).cos(), (angle / 2.0).sin());
        for k in 0..count {
            let mask = qubit_mask(self.n(), qbit + k);
            let map = self.store.bitwise_mut();
            match axis {
                Axis::X => {
                    let mut next = AHashMap::with_capacity(map.len() * 2);
                    for (&key, &amp) in map.iter() {
                        add_amp(&mut next, key, amp * cos);
                        add_amp(&mut next, key ^ mask, amp * Complex64::new(0.0, -sin));
                    }
                    *map = next;
                }
                Axis::Y => {
                    let mut next = AHashMap::with_capacity(map.len() * 2);
                    for (&key, &amp) in map.iter() {
                        add_amp(&mut next, key, amp * cos);
                        let sign = if key & mask != 0 { -sin } else { sin };
                        add_amp(&mut next, key ^ mask, amp * sign);
                    }
                    *map = next;
                }
                Axis::Z => {
                    let up = Complex64::from_polar(1.0, angle / 2.0);
                    let down = Complex64::from_polar(1.0, -angle / 2.0);
                    for (key, amp) in map.iter_mut() {
                        *amp *= if key & mask != 0 { up } else { down };
                    }
                }
            }
        }
        Ok(())
    }

    /// General one-qubit unitary on `count` qubits.
    pub fn u3(&mut self, theta: f64, phi: f64, lambda: f64, qbit: usize, count: usize) -> Result<()> {
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, 1)?;

        if !self.is_bitwise() {
            self.sync_range(qbit, qbit + count);
            for i in 0..count {
                self.queue.place(qbit + i, PendingOp::U3 { theta, phi, lambda });
            }
            return Ok(());
        }

        let (cos, sin) = ((theta / 2.0).cos(), (theta / 2.0).sin());
        let stay_one = Complex64::from_polar(cos, lambda + phi);
        let leave_one = Complex64::from_polar(sin, lambda) * -1.0;
        let leave_zero = Complex64::from_polar(sin, phi);

        for k in 0..count {
            let mask = qubit_mask(self.n(), qbit + k);
            let map = self.store.bitwise_mut();
            let mut next = AHashMap::with_capacity(map.len() * 2);
            for (&key, &amp) in map.iter() {
                let flipped = key ^ mask;
                if key & mask != 0 {
                    add_amp(&mut next, key, amp * stay_one);
                    add_amp(&mut next, flipped, amp * leave_one);
                } else {
                    add_amp(&mut next, key, amp * cos);
                    add_amp(&mut next, flipped, amp * leave_zero);
                }
            }
            *map = next;
        }
        Ok(())
    }

    /// `u3` with theta fixed at π/2.
    pub fn u2(&mut self, phi: f64, lambda: f64, qbit: usize, count: usize) -> Result<()> {
        self.u3(PI / 2.0, phi, lambda, qbit, count)
    }

    /// Diagonal phase gate, `u3(0, 0, lambda)`. The bitwise path multiplies
    /// phases in place instead of rebuilding the map.
    pub fn u1(&mut self, lambda: f64, qbit: usize, count: usize) -> Result<()> {
        self.valid_qbit(qbit)?;
        self.valid_count(qbit, count, 1)?;

        if !self.is_bitwise() {
            self.sync_range(qbit, qbit + count);
            for i in 0..count {
                self.queue.place(
                    qbit + i,
                    PendingOp::U3 {
                        theta: 0.0,
                        phi: 0.0,
                        lambda,
                    },
                );
            }
            return Ok(());
        }

        let phase = Complex64::from_polar(1.0, lambda);
        for k in 0..count {
            let mask = qubit_mask(self.n(), qbit + k);
            bw_phase(self.store.bitwise_mut(), mask, phase);
        }
        Ok(())
    }

    /// Controlled-not on `target`, conditioned on every qubit in `controls`.
    pub fn cnot(&mut self, target: usize, controls: &[usize]) -> Result<()> {
        self.valid_qbit(target)?;
        self.valid_controls(target, controls)?;

        if !self.is_bitwise() {
            let (span, origin, local_target, local_controls) = algebra::cut(target, controls);
            self.sync_range(origin, origin + span);
            self.queue.place(
                origin,
                PendingOp::Cnot {
                    target: local_target,
                    controls: local_controls,
                    span,
                },
            );
            return Ok(());
        }

        let n = self.n();
        let tmask = qubit_mask(n, target);
        let cmask: u64 = controls.iter().map(|&ctrl| qubit_mask(n, ctrl)).sum();
        let map = self.store.bitwise_mut();
        let mut next = AHashMap::with_capacity(map.len());
        for (&key, &amp) in map.iter() {
            let dest = if key & cmask == cmask { key ^ tmask } else { key };
            next.insert(dest, amp);
        }
        *map = next;
        Ok(())
    }

    /// Controlled phase: multiplies by `phase` where the target and every
    /// control bit are 1. `|phase|` must be 1.
    pub fn cphase(&mut self, phase: Complex64, target: usize, controls: &[usize]) -> Result<()> {
        self.valid_qbit(target)?;
        self.valid_phase(phase)?;
        self.valid_controls(target, controls)?;

        if !self.is_bitwise() {
            let (span, origin, local_target, local_controls) = algebra::cut(target, controls);
            self.sync_range(origin, origin + span);
            self.queue.place(
                origin,
                PendingOp::CPhase {
                    phase,
                    target: local_target,
                    controls: local_controls,
                    span,
                },
            );
            return Ok(());
        }

        let n = self.n();
        let select = qubit_mask(n, target)
            + controls.iter().map(|&ctrl| qubit_mask(n, ctrl)).sum::<u64>();
        bw_phase_selected(self.store.bitwise_mut(), select, phase);
        Ok(())
    }

    /// Exchanges two qubits. No-op when `qbit_a == qbit_b`.
    pub fn swap(&mut self, qbit_a: usize, qbit_b: usize) -> Result<()> {
        self.valid_qbit(qbit_a)?;
        self.valid_qbit(qbit_b)?;
        if qbit_a == qbit_b {
            return Ok(());
        }

        if !self.is_bitwise() {
            let (low, high) = (qbit_a.min(qbit_b), qbit_a.max(qbit_b));
            let span = high - low + 1;
            self.sync_range(low, low + span);
            self.queue.place(low, PendingOp::Swap { span });
            return Ok(());
        }

        let n = self.n();
        let mask_a = qubit_mask(n, qbit_a);
        let mask_b = qubit_mask(n, qbit_b);
        let map = self.store.bitwise_mut();
        let mut next = AHashMap::with_capacity(map.len());
        for (&key, &amp) in map.iter() {
            let dest = if (key & mask_a != 0) != (key & mask_b != 0) {
                key ^ mask_a ^ mask_b
            } else {
                key
            };
            next.insert(dest, amp);
        }
        *map = next;
        Ok(())
    }

    /// Quantum Fourier transform over `[begin, end)`.
    pub fn qft(&mut self, begin: usize, end: usize, invert: bool) -> Result<()> {
        self.valid_range(begin, end)?;
        let span = end - begin;

        if !self.is_bitwise() {
            self.sync_range(begin, end);
            self.queue.place(begin, PendingOp::Qft { span, invert });
            return Ok(());
        }

        let n = self.n();
        let dim = 1u64 << span;
        let norm = 1.0 / (dim as f64).sqrt();
        let step = 2.0 * PI / dim as f64 * if invert { -1.0 } else { 1.0 };
        let suffix = n - begin - span;
        let wmask = (dim - 1) << suffix;

        let map = self.store.bitwise_mut();
        let mut next = AHashMap::with_capacity(map.len());
        for (&key, &amp) in map.iter() {
            let window = (key & wmask) >> suffix;
            let rest = key & !wmask;
            for j in 0..dim {
                let value = Complex64::from_polar(norm, step * (window * j) as f64);
                add_amp(&mut next, rest | (j << suffix), amp * value);
            }
        }
        *map = next;
        Ok(())
    }
}

/* bitwise kernels for the fixed one-qubit gates */

fn bw_x(map: &mut AHashMap<u64, Complex64>, mask: u64) {
    *map = map.iter().map(|(&key, &amp)| (key ^ mask, amp)).collect();
}

fn bw_y(map: &mut AHashMap<u64, Complex64>, mask: u64) {
    *map = map
        .iter()
        .map(|(&key, &amp)| {
            let i = if key & mask != 0 {
                Complex64::new(0.0, -1.0)
            } else {
                Complex64::new(0.0, 1.0)
            };
            (key ^ mask, amp * i)
        })
        .collect();
}

fn bw_h(map: &mut AHashMap<u64, Complex64>, mask: u64) {
    let h = FRAC_1_SQRT_2;
    let mut next = AHashMap::with_capacity(map.len() * 2);
    for (&key, &amp) in map.iter() {
        let sign = if key & mask != 0 { -h } else { h };
        add_amp(&mut next, key, amp * sign);
        add_amp(&mut next, key ^ mask, amp * h);
    }
    *map = next;
}

/// Multiplies by `phase` every amplitude whose `mask` bit is 1.
fn bw_phase(map: &mut AHashMap<u64, Complex64>, mask: u64, phase: Complex64) {
    for (key, amp) in map.iter_mut() {
        if key & mask != 0 {
            *amp *= phase;
        }
    }
}

/// Multiplies by `phase` every amplitude with all `select` bits set.
fn bw_phase_selected(map: &mut AHashMap<u64, Complex64>, select: u64, phase: Complex64) {
    for (key, amp) in map.iter_mut() {
        if key & select == select {
            *amp *= phase;
        }
    }
}
