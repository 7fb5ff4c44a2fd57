// SPDX-License-Identifier: MIT
//! Structure-mode host: records the gate sequence without evaluating it.

use std::collections::HashMap;

use crate::{
    Felt,
    api::{CircuitApi, Op, OpCounts},
};

/// Index of a value in the recorded circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wire(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Secret,
}

/// One recorded gate. Output wires are allocated in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Input { out: Wire, visibility: Visibility },
    Constant { out: Wire, value: Felt },
    Add { out: Wire, a: Wire, b: Wire },
    Sub { out: Wire, a: Wire, b: Wire },
    Mul { out: Wire, a: Wire, b: Wire },
    Select { out: Wire, bit: Wire, a: Wire, b: Wire },
    IsZero { out: Wire, x: Wire },
    ToBinary { x: Wire, bits: Vec<Wire> },
    AssertIsEqual { a: Wire, b: Wire },
}

/// Records every [`CircuitApi`] call as a [`Gate`].
///
/// Constants are interned: the first use of a value emits a `Constant` gate,
/// later uses reuse its wire.
#[derive(Debug, Clone, Default)]
pub struct GateRecorder {
    gates: Vec<Gate>,
    next_wire: usize,
    constants: HashMap<Felt, Wire>,
    counts: OpCounts,
}

impl GateRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public_input(&mut self) -> Wire {
        self.input(Visibility::Public)
    }

    pub fn secret_input(&mut self) -> Wire {
        self.input(Visibility::Secret)
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn num_wires(&self) -> usize {
        self.next_wire
    }

    pub fn num_public_inputs(&self) -> usize {
        self.gates
            .iter()
            .filter(|g| {
                matches!(
                    g,
                    Gate::Input {
                        visibility: Visibility::Public,
                        ..
                    }
                )
            })
            .count()
    }

    fn input(&mut self, visibility: Visibility) -> Wire {
        let out = self.fresh();
        self.gates.push(Gate::Input { out, visibility });
        out
    }

    fn fresh(&mut self) -> Wire {
        let w = Wire(self.next_wire);
        self.next_wire += 1;
        w
    }

    fn binary(&mut self, op: Op, a: Wire, b: Wire) -> Wire {
        let out = self.fresh();
        self.counts.record(op);
        self.gates.push(match op {
            Op::Add => Gate::Add { out, a, b },
            Op::Sub => Gate::Sub { out, a, b },
            _ => Gate::Mul { out, a, b },
        });
        out
    }
}

impl CircuitApi for GateRecorder {
    type Var = Wire;

    fn constant(&mut self, value: Felt) -> Wire {
        if let Some(w) = self.constants.get(&value) {
            return *w;
        }
        let out = self.fresh();
        self.counts.record(Op::Constant);
        self.gates.push(Gate::Constant { out, value });
        self.constants.insert(value, out);
        out
    }

    fn add(&mut self, a: &Wire, b: &Wire) -> Wire {
        self.binary(Op::Add, *a, *b)
    }

    fn sub(&mut self, a: &Wire, b: &Wire) -> Wire {
        self.binary(Op::Sub, *a, *b)
    }

    fn mul(&mut self, a: &Wire, b: &Wire) -> Wire {
        self.binary(Op::Mul, *a, *b)
    }

    fn select(&mut self, bit: &Wire, a: &Wire, b: &Wire) -> Wire {
        let out = self.fresh();
        self.counts.record(Op::Select);
        self.gates.push(Gate::Select {
            out,
            bit: *bit,
            a: *a,
            b: *b,
        });
        out
    }

    fn is_zero(&mut self, x: &Wire) -> Wire {
        let out = self.fresh();
        self.counts.record(Op::IsZero);
        self.gates.push(Gate::IsZero { out, x: *x });
        out
    }

    fn to_binary(&mut self, x: &Wire, n_bits: usize) -> Vec<Wire> {
        let bits: Vec<Wire> = (0..n_bits).map(|_| self.fresh()).collect();
        self.counts.record(Op::ToBinary);
        self.gates.push(Gate::ToBinary {
            x: *x,
            bits: bits.clone(),
        });
        bits
    }

    fn assert_is_equal(&mut self, a: &Wire, b: &Wire) {
        self.counts.record(Op::AssertIsEqual);
        self.gates.push(Gate::AssertIsEqual { a: *a, b: *b });
    }

    fn op_counts(&self) -> &OpCounts {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_interned() {
        let mut rec = GateRecorder::new();
        let a = rec.constant(Felt::from(3u64));
        let b = rec.constant(Felt::from(3u64));
        let c = rec.constant(Felt::from(4u64));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(rec.op_counts().get(Op::Constant), 2);
        assert_eq!(rec.gates().len(), 2);
    }

    #[test]
    fn wires_follow_emission_order() {
        let mut rec = GateRecorder::new();
        let x = rec.public_input();
        let y = rec.secret_input();
        let s = rec.add(&x, &y);
        let bits = rec.to_binary(&s, 3);
        assert_eq!(x, Wire(0));
        assert_eq!(y, Wire(1));
        assert_eq!(s, Wire(2));
        assert_eq!(bits, vec![Wire(3), Wire(4), Wire(5)]);
        assert_eq!(rec.num_wires(), 6);
        assert_eq!(rec.num_public_inputs(), 1);
        assert_eq!(
            rec.gates()[2],
            Gate::Add {
                out: Wire(2),
                a: Wire(0),
                b: Wire(1)
            }
        );
    }
}
