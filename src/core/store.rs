//! Amplitude storage for the three state representations.
//!
//! Exactly one variant is active for a register's whole life unless the
//! caller explicitly reconstructs (`change_to`). Everything here assumes the
//! operation queue has been synced; the register enforces that before any
//! amplitude read.

use crate::core::register::Representation;
use crate::core::utils::{dagger, kronecker_product, kronecker_vector, trace};
use ahash::AHashMap;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Amplitudes with squared magnitude below this are dropped from the sparse
/// bitwise map to bound its growth.
pub(crate) const AMP_EPS: f64 = 1e-10;

#[derive(Clone, Debug)]
pub(crate) enum StateStore {
    Vector(Array1<Complex64>),
    Density(Array2<Complex64>),
    Bitwise(AHashMap<u64, Complex64>),
}

impl StateStore {
    /// Builds the basis state `|init>` over `nqbits` qubits.
    pub(crate) fn new(representation: Representation, nqbits: usize, init: u64) -> Self {
        let dim = 1usize << nqbits;
        match representation {
            Representation::Vector => {
                let mut v = Array1::<Complex64>::zeros(dim);
                v[init as usize] = Complex64::new(1.0, 0.0);
                StateStore::Vector(v)
            }
            Representation::DensityMatrix => {
                let mut m = Array2::<Complex64>::zeros((dim, dim));
                m[[init as usize, init as usize]] = Complex64::new(1.0, 0.0);
                StateStore::Density(m)
            }
            Representation::BitwiseSparse => {
                let mut map = AHashMap::new();
                map.insert(init, Complex64::new(1.0, 0.0));
                StateStore::Bitwise(map)
            }
        }
    }

    pub(crate) fn representation(&self) -> Representation {
        match self {
            StateStore::Vector(_) => Representation::Vector,
            StateStore::Density(_) => Representation::DensityMatrix,
            StateStore::Bitwise(_) => Representation::BitwiseSparse,
        }
    }

    /// Applies a full-register operator: `U·v` or `U·ρ·U†`.
    pub(crate) fn apply_operator(&mut self, u: &Array2<Complex64>) {
        match self {
            StateStore::Vector(v) => *v = u.dot(&*v),
            StateStore::Density(rho) => *rho = u.dot(&*rho).dot(&dagger(u)),
            // The bitwise representation never queues operators.
            StateStore::Bitwise(_) => unreachable!("operator applied to bitwise state"),
        }
    }

    /// Direct access to the sparse amplitude map for the bitwise kernels.
    pub(crate) fn bitwise_mut(&mut self) -> &mut AHashMap<u64, Complex64> {
        match self {
            StateStore::Bitwise(map) => map,
            _ => unreachable!("bitwise kernel on matrix-backed state"),
        }
    }

    /// Σ|amplitude|² for vector forms, `Re(trace)` for the density matrix.
    pub(crate) fn norm(&self) -> f64 {
        match self {
            StateStore::Vector(v) => v.iter().map(|a| a.norm_sqr()).sum(),
            StateStore::Density(rho) => trace(rho).re,
            StateStore::Bitwise(map) => map.values().map(|a| a.norm_sqr()).sum(),
        }
    }

    /// Probability mass on basis states whose `mask` bit is 0.
    pub(crate) fn prob_zero(&self, mask: u64) -> f64 {
        match self {
            StateStore::Vector(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| *i as u64 & mask == 0)
                .map(|(_, a)| a.norm_sqr())
                .sum(),
            StateStore::Density(rho) => rho
                .diag()
                .iter()
                .enumerate()
                .filter(|(i, _)| *i as u64 & mask == 0)
                .map(|(_, a)| a.re)
                .sum(),
            StateStore::Bitwise(map) => map
                .iter()
                .filter(|(&k, _)| k & mask == 0)
                .map(|(_, a)| a.norm_sqr())
                .sum(),
        }
    }

    /// Projects onto the subspace where the `mask` bit equals `one`, then
    /// renormalizes: amplitudes scale by `1/√p`, the density matrix by `1/p`
    /// so its trace returns to 1.
    pub(crate) fn project(&mut self, mask: u64, one: bool, p: f64) {
        match self {
            StateStore::Vector(v) => {
                let scale = Complex64::new(1.0 / p.sqrt(), 0.0);
                for (i, a) in v.iter_mut().enumerate() {
                    if (i as u64 & mask != 0) == one {
                        *a *= scale;
                    } else {
                        *a = Complex64::new(0.0, 0.0);
                    }
                }
            }
            StateStore::Density(rho) => {
                let scale = Complex64::new(1.0 / p, 0.0);
                for ((r, c), a) in rho.indexed_iter_mut() {
                    if (r as u64 & mask != 0) == one && (c as u64 & mask != 0) == one {
                        *a *= scale;
                    } else {
                        *a = Complex64::new(0.0, 0.0);
                    }
                }
            }
            StateStore::Bitwise(map) => {
                let scale = Complex64::new(1.0 / p.sqrt(), 0.0);
                map.retain(|&k, _| (k & mask != 0) == one);
                for a in map.values_mut() {
                    *a *= scale;
                }
            }
        }
    }

    /// Tensors `count` fresh qubits in state `|init>` onto the low end of the
    /// register.
    pub(crate) fn extend(&mut self, count: usize, init: u64) {
        match self {
            StateStore::Vector(v) => {
                let mut block = Array1::<Complex64>::zeros(1usize << count);
                block[init as usize] = Complex64::new(1.0, 0.0);
                *v = kronecker_vector(&*v, &block);
            }
            StateStore::Density(rho) => {
                let dim = 1usize << count;
                let mut block = Array2::<Complex64>::zeros((dim, dim));
                block[[init as usize, init as usize]] = Complex64::new(1.0, 0.0);
                *rho = kronecker_product(&*rho, &block);
            }
            StateStore::Bitwise(map) => {
                *map = map
                    .iter()
                    .map(|(&k, &a)| ((k << count) | init, a))
                    .collect();
            }
        }
    }

    /// Removes the least significant qubit.
    ///
    /// The vector form sums amplitude pairs differing only in that bit; the
    /// caller guarantees the bit is definite (measured) or separable. The
    /// density form is a partial trace over the matching-parity blocks.
    pub(crate) fn trace_out_last(&mut self) {
        match self {
            StateStore::Vector(v) => {
                let half = v.len() / 2;
                let mut out = Array1::<Complex64>::zeros(half);
                for (i, a) in v.iter().enumerate() {
                    out[i >> 1] += *a;
                }
                *v = out;
            }
            StateStore::Density(rho) => {
                let half = rho.nrows() / 2;
                let mut out = Array2::<Complex64>::zeros((half, half));
                for ((r, c), a) in rho.indexed_iter() {
                    if r % 2 == c % 2 {
                        out[[r >> 1, c >> 1]] += *a;
                    }
                }
                *rho = out;
            }
            StateStore::Bitwise(_) => unreachable!("bitwise ancillas are removed by key shift"),
        }
    }

    /// Drops the `count` least significant (measured) bits of every key.
    pub(crate) fn shift_right(&mut self, count: usize) {
        let map = self.bitwise_mut();
        *map = map.iter().map(|(&k, &a)| (k >> count, a)).collect();
    }

    /// Nonzero entries as `(row, col, value)`, ordered for stable output.
    /// Vector and bitwise forms report `col = 0`.
    pub(crate) fn nonzeros(&self) -> Vec<(usize, usize, Complex64)> {
        match self {
            StateStore::Vector(v) => v
                .iter()
                .enumerate()
                .filter(|(_, a)| a.norm() >= 1e-14)
                .map(|(i, &a)| (i, 0, a))
                .collect(),
            StateStore::Density(rho) => rho
                .indexed_iter()
                .filter(|(_, a)| a.norm() >= 1e-14)
                .map(|((r, c), &a)| (r, c, a))
                .collect(),
            StateStore::Bitwise(map) => {
                let mut entries: Vec<_> = map
                    .iter()
                    .filter(|(_, a)| a.norm() >= 1e-14)
                    .map(|(&k, &a)| (k as usize, 0, a))
                    .collect();
                entries.sort_by_key(|&(k, _, _)| k);
                entries
            }
        }
    }

    /// Rebuilds a store from a sparse coordinate list. Coordinates have been
    /// validated against `2^nqbits` by the caller.
    pub(crate) fn from_coordinates(
        representation: Representation,
        nqbits: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[Complex64],
    ) -> Self {
        let dim = 1usize << nqbits;
        match representation {
            Representation::Vector => {
                let mut v = Array1::<Complex64>::zeros(dim);
                for (&row, &value) in rows.iter().zip(values) {
                    v[row] = value;
                }
                StateStore::Vector(v)
            }
            Representation::DensityMatrix => {
                let mut m = Array2::<Complex64>::zeros((dim, dim));
                for ((&row, &col), &value) in rows.iter().zip(cols).zip(values) {
                    m[[row, col]] = value;
                }
                StateStore::Density(m)
            }
            Representation::BitwiseSparse => {
                let map = rows
                    .iter()
                    .zip(values)
                    .map(|(&row, &value)| (row as u64, value))
                    .collect();
                StateStore::Bitwise(map)
            }
        }
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
    fn fresh_stores_are_normalized() {
        for representation in [
            Representation::Vector,
            Representation::DensityMatrix,
            Representation::BitwiseSparse,
        ] {
            let store = StateStore::new(representation, 3, 5);
            assert_relative_eq!(store.norm(), 1.0);
            let entries = store.nonzeros();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].0, 5);
        }
    }

    #[test]
    fn prob_zero_reads_the_masked_bit() {
        let v = array![c(0.6, 0.0), c(0.0, 0.0), c(0.0, 0.8), c(0.0, 0.0)];
        let store = StateStore::Vector(v);
        // Mask for the most significant of 2 qubits.
        assert_relative_eq!(store.prob_zero(0b10), 0.36);
        assert_relative_eq!(store.prob_zero(0b01), 1.0);
    }

    #[test]
    fn projection_renormalizes_vector() {
        let h = 1.0 / 2f64.sqrt();
        let mut store = StateStore::Vector(array![c(h, 0.0), c(h, 0.0)]);
        store.project(1, false, 0.5);
        assert_relative_eq!(store.norm(), 1.0, epsilon = 1e-12);
        let entries = store.nonzeros();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, 0);
    }

    #[test]
    fn projection_scales_density_by_p() {
        let mut rho = Array2::<Complex64>::zeros((2, 2));
        rho[[0, 0]] = c(0.5, 0.0);
        rho[[1, 1]] = c(0.5, 0.0);
        let mut store = StateStore::Density(rho);
        store.project(1, true, 0.5);
        assert_relative_eq!(store.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn extend_appends_low_qubits() {
        let mut store = StateStore::new(Representation::Vector, 1, 1);
        store.extend(2, 0b10);
        // |1> ⊗ |10> = |110> = index 6.
        assert_eq!(store.nonzeros(), vec![(6, 0, c(1.0, 0.0))]);

        let mut bw = StateStore::new(Representation::BitwiseSparse, 1, 1);
        bw.extend(2, 0b10);
        assert_eq!(bw.nonzeros(), vec![(6, 0, c(1.0, 0.0))]);
    }

    #[test]
    fn trace_out_last_halves_the_state() {
        let mut store = StateStore::new(Representation::Vector, 2, 0b10);
        store.trace_out_last();
        assert_eq!(store.nonzeros(), vec![(1, 0, c(1.0, 0.0))]);

        let mut rho = StateStore::new(Representation::DensityMatrix, 2, 0b11);
        rho.trace_out_last();
        assert_eq!(rho.nonzeros(), vec![(1, 1, c(1.0, 0.0))]);
        assert_relative_eq!(rho.norm(), 1.0);
    }

    #[test]
    fn coordinate_round_trip() {
        let store = StateStore::new(Representation::DensityMatrix, 1, 1);
        let entries = store.nonzeros();
        let rows: Vec<_> = entries.iter().map(|e| e.0).collect();
        let cols: Vec<_> = entries.iter().map(|e| e.1).collect();
        let values: Vec<_> = entries.iter().map(|e| e.2).collect();
        let rebuilt =
            StateStore::from_coordinates(Representation::DensityMatrix, 1, &rows, &cols, &values);
        assert_eq!(rebuilt.nonzeros(), entries);
    }
}
