// SPDX-License-Identifier: MIT
//! Witness-mode host: every variable is a concrete field element.

use ark_ff::{BigInteger, One, PrimeField, Zero};

use crate::{
    Felt,
    api::{CircuitApi, Op, OpCounts},
};

/// A constraint the evaluated witness violates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsatisfied {
    /// `assert_is_equal(left, right)` with `left != right`.
    NotEqual { left: Felt, right: Felt },
    /// A selector or bit that is neither 0 nor 1.
    NonBoolean { value: Felt },
    /// `to_binary(value, bits)` with `value >= 2^bits`.
    BitOverflow { value: Felt, bits: usize },
}

/// Evaluates gates directly over [`Felt`].
///
/// Unsatisfied constraints are collected rather than raised, so a wrong
/// witness yields the same gate sequence as a correct one.
#[derive(Debug, Clone, Default)]
pub struct NativeApi {
    counts: OpCounts,
    failures: Vec<Unsatisfied>,
}

impl NativeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` iff no emitted constraint is violated.
    pub fn is_satisfied(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Unsatisfied] {
        &self.failures
    }

    fn fail(&mut self, failure: Unsatisfied) {
        tracing::debug!(?failure, "constraint unsatisfied");
        self.failures.push(failure);
    }

    fn check_boolean(&mut self, bit: &Felt) -> bool {
        if bit.is_one() {
            true
        } else {
            if !bit.is_zero() {
                self.fail(Unsatisfied::NonBoolean { value: *bit });
            }
            false
        }
    }
}

impl CircuitApi for NativeApi {
    type Var = Felt;

    fn constant(&mut self, value: Felt) -> Felt {
        self.counts.record(Op::Constant);
        value
    }

    fn add(&mut self, a: &Felt, b: &Felt) -> Felt {
        self.counts.record(Op::Add);
        *a + b
    }

    fn sub(&mut self, a: &Felt, b: &Felt) -> Felt {
        self.counts.record(Op::Sub);
        *a - b
    }

    fn mul(&mut self, a: &Felt, b: &Felt) -> Felt {
        self.counts.record(Op::Mul);
        *a * b
    }

    fn select(&mut self, bit: &Felt, a: &Felt, b: &Felt) -> Felt {
        self.counts.record(Op::Select);
        if self.check_boolean(bit) { *a } else { *b }
    }

    fn is_zero(&mut self, x: &Felt) -> Felt {
        self.counts.record(Op::IsZero);
        if x.is_zero() { Felt::one() } else { Felt::zero() }
    }

    fn to_binary(&mut self, x: &Felt, n_bits: usize) -> Vec<Felt> {
        self.counts.record(Op::ToBinary);
        let bits = x.into_bigint().to_bits_le();
        if bits.iter().skip(n_bits).any(|b| *b) {
            self.fail(Unsatisfied::BitOverflow {
                value: *x,
                bits: n_bits,
            });
        }
        (0..n_bits)
            .map(|i| Felt::from(bits.get(i).copied().unwrap_or(false)))
            .collect()
    }

    fn assert_is_equal(&mut self, a: &Felt, b: &Felt) {
        self.counts.record(Op::AssertIsEqual);
        if a != b {
            self.fail(Unsatisfied::NotEqual {
                left: *a,
                right: *b,
            });
        }
    }

    fn op_counts(&self) -> &OpCounts {
        &self.counts
    }
}
