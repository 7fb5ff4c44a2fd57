// SPDX-License-Identifier: MIT
//! The gate interface the hash and Merkle gadgets are written against.
//!
//! Hosts decide what a variable is: [`crate::NativeApi`] evaluates field
//! values eagerly, [`crate::GateRecorder`] only records the gate sequence.
//! Gadgets never branch on values, so every host sees the same sequence of
//! calls for a given circuit shape.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::Felt;

/// Gate kinds, used for cost accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Constant,
    Add,
    Sub,
    Mul,
    Select,
    IsZero,
    ToBinary,
    AssertIsEqual,
}

impl Op {
    pub const ALL: [Op; 8] = [
        Op::Constant,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Select,
        Op::IsZero,
        Op::ToBinary,
        Op::AssertIsEqual,
    ];
}

/// Per-[`Op`] tally of emitted gates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpCounts(BTreeMap<Op, u64>);

impl OpCounts {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&mut self, op: Op) {
        *self.0.entry(op).or_insert(0) += 1;
    }

    pub fn get(&self, op: Op) -> u64 {
        self.0.get(&op).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate `(op, count)` pairs in [`Op`] order, skipping zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (Op, u64)> + '_ {
        self.0.iter().map(|(op, n)| (*op, *n))
    }
}

/// Capability set required from a constraint-building host.
///
/// All methods take `&mut self` because every call corresponds to one emitted
/// gate; the order of calls is the order of gates.
pub trait CircuitApi {
    /// Opaque handle to a circuit value.
    type Var: Clone + Debug + Default;

    /// Embed a field constant.
    fn constant(&mut self, value: Felt) -> Self::Var;

    fn add(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;

    fn sub(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;

    fn mul(&mut self, a: &Self::Var, b: &Self::Var) -> Self::Var;

    /// Returns `a` if `bit = 1` and `b` if `bit = 0`. `bit` is constrained to
    /// be boolean.
    fn select(&mut self, bit: &Self::Var, a: &Self::Var, b: &Self::Var) -> Self::Var;

    /// Boolean variable equal to 1 iff `x = 0`.
    fn is_zero(&mut self, x: &Self::Var) -> Self::Var;

    /// Little-endian decomposition of `x` into `n_bits` boolean variables.
    /// `x` is constrained to fit in `n_bits` bits.
    fn to_binary(&mut self, x: &Self::Var, n_bits: usize) -> Vec<Self::Var>;

    /// Terminal equality constraint.
    fn assert_is_equal(&mut self, a: &Self::Var, b: &Self::Var);

    /// Gates emitted so far, by kind.
    fn op_counts(&self) -> &OpCounts;
}
