//! Lazy-batching operation queue.
//!
//! Gate calls on the matrix-backed representations do not touch the state.
//! They claim a contiguous qubit range here; a sync composes every pending
//! operator into one Kronecker product and applies it to the state in a
//! single pass. A range conflict (two operations over the same qubit) forces
//! the sync before the second operation is placed.

use crate::core::algebra::{self, Axis};
use crate::core::library::{Builtin, Gate};
use crate::core::utils::{dagger, kronecker_product};
use ndarray::Array2;
use num_complex::Complex64;
use std::sync::Arc;

/// One pending operation. The payload sits on the first qubit of its range;
/// the remaining qubits hold `Covered` markers.
#[derive(Clone, Debug)]
pub(crate) enum PendingOp {
    Identity,
    Covered,
    Single {
        gate: Builtin,
        invert: bool,
    },
    Named {
        gate: Arc<Gate>,
        invert: bool,
    },
    Rotation {
        axis: Axis,
        angle: f64,
    },
    U3 {
        theta: f64,
        phi: f64,
        lambda: f64,
    },
    Cnot {
        target: usize,
        controls: Vec<usize>,
        span: usize,
    },
    CPhase {
        phase: Complex64,
        target: usize,
        controls: Vec<usize>,
        span: usize,
    },
    Swap {
        span: usize,
    },
    Qft {
        span: usize,
        invert: bool,
    },
}

impl PendingOp {
    /// Number of contiguous qubits the operation occupies.
    pub(crate) fn span(&self) -> usize {
        match self {
            PendingOp::Named { gate, .. } => gate.num_qubits(),
            PendingOp::Cnot { span, .. }
            | PendingOp::CPhase { span, .. }
            | PendingOp::Swap { span }
            | PendingOp::Qft { span, .. } => *span,
            _ => 1,
        }
    }

    fn is_identity(&self) -> bool {
        matches!(
            self,
            PendingOp::Identity
                | PendingOp::Single {
                    gate: Builtin::I,
                    ..
                }
        )
    }

    /// Materializes the operator for this slot. Inversion conjugate-transposes
    /// the forward matrix instead of needing separate inverse builders.
    fn operator(&self) -> Array2<Complex64> {
        let (matrix, invert) = match self {
            PendingOp::Identity => (Builtin::I.matrix(), false),
            PendingOp::Covered => unreachable!("span marker at payload position"),
            PendingOp::Single { gate, invert } => (gate.matrix(), *invert),
            PendingOp::Named { gate, invert } => (gate.matrix().clone(), *invert),
            PendingOp::Rotation { axis, angle } => (algebra::rotation(*axis, *angle), false),
            PendingOp::U3 { theta, phi, lambda } => (algebra::u3(*theta, *phi, *lambda), false),
            PendingOp::Cnot {
                target,
                controls,
                span,
            } => (algebra::controlled_not(*target, controls, *span), false),
            PendingOp::CPhase {
                phase,
                target,
                controls,
                span,
            } => (
                algebra::controlled_phase(*phase, *target, controls, *span),
                false,
            ),
            PendingOp::Swap { span } => (algebra::swap(*span), false),
            PendingOp::Qft { span, invert } => (algebra::qft(*span), *invert),
        };

        if invert {
            dagger(&matrix)
        } else {
            matrix
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct OperationQueue {
    slots: Vec<PendingOp>,
    synced: bool,
}

impl OperationQueue {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            slots: vec![PendingOp::Identity; size],
            synced: true,
        }
    }

    pub(crate) fn is_synced(&self) -> bool {
        self.synced
    }

    /// True when any qubit in `[begin, end)` already holds a pending
    /// operation. Such a slot must be flushed before a new claim.
    pub(crate) fn busy_in(&self, begin: usize, end: usize) -> bool {
        self.slots[begin..end].iter().any(|op| !op.is_identity())
    }

    /// Claims `[qbit, qbit + op.span())` for `op`. The caller has already
    /// synced any conflicting range.
    pub(crate) fn place(&mut self, qbit: usize, op: PendingOp) {
        let span = op.span();
        debug_assert!(!self.busy_in(qbit, qbit + span));

        if op.is_identity() {
            return;
        }

        self.slots[qbit] = op;
        for slot in &mut self.slots[qbit + 1..qbit + span] {
            *slot = PendingOp::Covered;
        }
        self.synced = false;
    }

    /// Folds every pending operator into the full-register batched operator,
    /// walking the slots once and Kronecker-accumulating per range.
    pub(crate) fn compose(&self) -> Array2<Complex64> {
        let mut result: Option<Array2<Complex64>> = None;
        let mut i = 0;

        while i < self.slots.len() {
            let op = &self.slots[i];
            let m = op.operator();
            result = Some(match result {
                None => m,
                Some(acc) => kronecker_product(&acc, &m),
            });
            i += op.span();
        }

        result.unwrap_or_else(|| Array2::eye(1))
    }

    /// Returns every slot to the identity marker after a sync.
    pub(crate) fn reset(&mut self) {
        self.slots.fill(PendingOp::Identity);
        self.synced = true;
    }

    /// Grows the queue for newly added ancilla qubits.
    pub(crate) fn extend(&mut self, count: usize) {
        self.slots
            .extend(std::iter::repeat_with(|| PendingOp::Identity).take(count));
    }

    /// Shrinks the queue when ancillas are removed.
    pub(crate) fn truncate(&mut self, size: usize) {
        self.slots.truncate(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_queue_composes_to_identity() {
        let queue = OperationQueue::new(2);
        let u = queue.compose();
        assert_eq!(u.nrows(), 4);
        assert_relative_eq!(u[[0, 0]].re, 1.0);
        assert_relative_eq!(u[[3, 3]].re, 1.0);
        assert_relative_eq!(u[[1, 0]].norm(), 0.0);
    }

    #[test]
    fn identity_placement_keeps_queue_synced() {
        let mut queue = OperationQueue::new(2);
        queue.place(
            0,
            PendingOp::Single {
                gate: Builtin::I,
                invert: false,
            },
        );
        assert!(queue.is_synced());
        assert!(!queue.busy_in(0, 2));
    }

    #[test]
    fn busy_detection_covers_span_markers() {
        let mut queue = OperationQueue::new(3);
        queue.place(0, PendingOp::Swap { span: 3 });
        assert!(queue.busy_in(1, 2));
        assert!(!queue.is_synced());
        queue.reset();
        assert!(!queue.busy_in(0, 3));
    }

    #[test]
    fn compose_batches_disjoint_singles() {
        let mut queue = OperationQueue::new(2);
        queue.place(
            0,
            PendingOp::Single {
                gate: Builtin::X,
                invert: false,
            },
        );
        queue.place(
            1,
            PendingOp::Single {
                gate: Builtin::X,
                invert: false,
            },
        );
        let u = queue.compose();
        // X ⊗ X maps |00> to |11>.
        assert_relative_eq!(u[[3, 0]].re, 1.0);
        assert_relative_eq!(u[[0, 0]].norm(), 0.0);
    }

    #[test]
    fn inverted_slot_is_conjugate_transposed() {
        let mut queue = OperationQueue::new(1);
        queue.place(
            0,
            PendingOp::Single {
                gate: Builtin::S,
                invert: true,
            },
        );
        let u = queue.compose();
        assert_relative_eq!(u[[1, 1]].im, -1.0);
    }

    #[test]
    fn multi_qubit_payload_advances_the_walk() {
        let mut queue = OperationQueue::new(3);
        queue.place(
            0,
            PendingOp::Cnot {
                target: 1,
                controls: vec![0],
                span: 2,
            },
        );
        queue.place(
            2,
            PendingOp::Single {
                gate: Builtin::X,
                invert: false,
            },
        );
        let u = queue.compose();
        // CNOT(0->1) ⊗ X: |000> -> |001>, |100> -> |111>.
        assert_relative_eq!(u[[0b001, 0b000]].re, 1.0);
        assert_relative_eq!(u[[0b111, 0b100]].re, 1.0);
    }
}
