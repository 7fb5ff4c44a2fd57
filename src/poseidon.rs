// SPDX-License-Identifier: MIT
//! Poseidon sponge (circomlib flavour) as a gate sequence.
//!
//! For `n` inputs the state has `t = n + 1` lanes, lane 0 being the zero
//! capacity lane. The round schedule is the optimised one: four full rounds
//! (the last of them mixing with the transition matrix `P`), `R_P` partial
//! rounds using sparse rows, four full rounds, then a single-lane projection of
//! the final mix.

use ark_ff::Zero;
use tinyvec::ArrayVec;

use crate::{
    Felt,
    api::CircuitApi,
    error::ConfigError,
    native::NativeApi,
    params::{FULL_ROUNDS, MAX_WIDTH, params},
    recorder::{GateRecorder, Wire},
};

type State<V> = ArrayVec<[V; MAX_WIDTH]>;

//  ---------------------------------------------------------------------------
//  Builder
//  ---------------------------------------------------------------------------

/// Owned hashing builder. Inputs are buffered by [`Poseidon::write`] and
/// consumed by [`Poseidon::sum`], which leaves the builder empty and ready for
/// another computation.
#[derive(Debug, Clone)]
pub struct Poseidon<V> {
    data: Vec<V>,
}

impl<V> Default for Poseidon<V> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<V: Clone> Poseidon<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append inputs to the pending buffer.
    pub fn write(&mut self, inputs: &[V]) {
        self.data.extend_from_slice(inputs);
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Hash the pending buffer and clear it.
    ///
    /// The width is checked before any gate is emitted.
    pub fn sum<A: CircuitApi<Var = V>>(&mut self, api: &mut A) -> Result<V, ConfigError> {
        let data = std::mem::take(&mut self.data);
        permute(api, &data)
    }

    /// Consuming variant of [`Poseidon::sum`].
    pub fn finalize<A: CircuitApi<Var = V>>(mut self, api: &mut A) -> Result<V, ConfigError> {
        self.sum(api)
    }
}

/// `Hash(inputs)` for `1..=16` inputs.
pub fn poseidon_hash<A: CircuitApi>(api: &mut A, inputs: &[A::Var]) -> Result<A::Var, ConfigError> {
    let mut hasher = Poseidon::new();
    hasher.write(inputs);
    hasher.finalize(api)
}

/// Off-circuit evaluation through [`NativeApi`].
pub fn poseidon_hash_native(inputs: &[Felt]) -> Result<Felt, ConfigError> {
    let mut api = NativeApi::new();
    poseidon_hash(&mut api, inputs)
}

//  ---------------------------------------------------------------------------
//  Permutation
//  ---------------------------------------------------------------------------

fn permute<A: CircuitApi>(api: &mut A, inputs: &[A::Var]) -> Result<A::Var, ConfigError> {
    let t = inputs.len() + 1;
    let params = params(t)?;
    let _span = tracing::trace_span!("poseidon", width = t).entered();

    let half = FULL_ROUNDS / 2;
    let rp = params.partial_rounds;
    let c = &params.c;
    let row_len = 2 * t - 1;

    let mut state: State<A::Var> = ArrayVec::new();
    state.push(api.constant(Felt::zero()));
    state.extend(inputs.iter().cloned());
    ark(api, &mut state, c, 0);

    for r in 0..half - 1 {
        sbox_full(api, &mut state);
        ark(api, &mut state, c, (r + 1) * t);
        mix(api, &mut state, &params.m);
    }

    sbox_full(api, &mut state);
    ark(api, &mut state, c, half * t);
    mix(api, &mut state, &params.p);

    for r in 0..rp {
        state[0] = sigma(api, &state[0]);
        let rc = api.constant(c[(half + 1) * t + r]);
        state[0] = api.add(&state[0], &rc);

        let row = &params.s[row_len * r..row_len * (r + 1)];
        let lane0 = lin_comb(api, row[..t].iter().copied(), &state);
        // Lanes 1.. use the pre-update lane 0.
        for k in 1..t {
            let w = api.constant(row[t + k - 1]);
            let term = api.mul(&state[0], &w);
            state[k] = api.add(&state[k], &term);
        }
        state[0] = lane0;
    }

    for r in 0..half - 1 {
        sbox_full(api, &mut state);
        ark(api, &mut state, c, (half + 1) * t + rp + r * t);
        mix(api, &mut state, &params.m);
    }

    sbox_full(api, &mut state);
    Ok(mix_last(api, &state, &params.m))
}

/// x⁵ as x² → x⁴ → x⁵: exactly three multiplications.
#[inline]
fn sigma<A: CircuitApi>(api: &mut A, x: &A::Var) -> A::Var {
    let x2 = api.mul(x, x);
    let x4 = api.mul(&x2, &x2);
    api.mul(&x4, x)
}

fn sbox_full<A: CircuitApi>(api: &mut A, state: &mut State<A::Var>) {
    for lane in state.iter_mut() {
        *lane = sigma(api, lane);
    }
}

fn ark<A: CircuitApi>(api: &mut A, state: &mut State<A::Var>, c: &[Felt], offset: usize) {
    for (i, lane) in state.iter_mut().enumerate() {
        let k = api.constant(c[offset + i]);
        *lane = api.add(lane, &k);
    }
}

/// `out[i] = Σ_j m[j][i] · in[j]`.
fn mix<A: CircuitApi>(api: &mut A, state: &mut State<A::Var>, m: &[Vec<Felt>]) {
    let t = state.len();
    let mixed: State<A::Var> = (0..t)
        .map(|i| lin_comb(api, m.iter().map(|row| row[i]), &state[..]))
        .collect();
    *state = mixed;
}

fn mix_last<A: CircuitApi>(api: &mut A, state: &State<A::Var>, m: &[Vec<Felt>]) -> A::Var {
    lin_comb(api, m.iter().map(|row| row[0]), state)
}

fn lin_comb<A: CircuitApi>(
    api: &mut A,
    coeffs: impl Iterator<Item = Felt>,
    lanes: &[A::Var],
) -> A::Var {
    let mut acc: Option<A::Var> = None;
    for (coeff, lane) in coeffs.zip(lanes) {
        let k = api.constant(coeff);
        let term = api.mul(&k, lane);
        acc = Some(match acc {
            Some(sum) => api.add(&sum, &term),
            None => term,
        });
    }
    match acc {
        Some(sum) => sum,
        None => api.constant(Felt::zero()),
    }
}

//  ---------------------------------------------------------------------------
//  Circuit
//  ---------------------------------------------------------------------------

/// Proves knowledge of a preimage: `hash == Poseidon(data)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseidonCircuit<V> {
    pub data: Vec<V>,
    pub hash: V,
}

impl PoseidonCircuit<Wire> {
    /// Wires for a circuit over `n_inputs` secret inputs and a public hash.
    pub fn allocate(rec: &mut GateRecorder, n_inputs: usize) -> Self {
        let hash = rec.public_input();
        let data = (0..n_inputs).map(|_| rec.secret_input()).collect();
        Self { data, hash }
    }
}

impl<V: Clone> PoseidonCircuit<V> {
    pub fn define<A: CircuitApi<Var = V>>(&self, api: &mut A) -> Result<(), ConfigError> {
        let digest = poseidon_hash(api, &self.data)?;
        api.assert_is_equal(&digest, &self.hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::Op,
        params::{ALPHA, PARTIAL_ROUNDS, RawParams},
    };
    use ark_ff::{Field, UniformRand};
    use rand::{SeedableRng, rngs::SmallRng};
    use std::str::FromStr;

    fn felt(s: &str) -> Felt {
        Felt::from_str(s).unwrap()
    }

    fn felts(xs: &[u64]) -> Vec<Felt> {
        xs.iter().copied().map(Felt::from).collect()
    }

    /// Textbook Poseidon: ARK, S-box, dense MDS each round.
    fn dense_reference(inputs: &[Felt]) -> Felt {
        let t = inputs.len() + 1;
        let raw = RawParams::generate(t).unwrap();
        let half = FULL_ROUNDS / 2;
        let mut state = vec![Felt::zero()];
        state.extend_from_slice(inputs);
        for k in 0..FULL_ROUNDS + raw.partial_rounds {
            for (i, lane) in state.iter_mut().enumerate() {
                *lane += raw.round_constants[k * t + i];
            }
            let full = k < half || k >= half + raw.partial_rounds;
            let lanes = if full { t } else { 1 };
            for lane in state.iter_mut().take(lanes) {
                *lane = lane.pow([ALPHA]);
            }
            state = raw
                .mds
                .iter()
                .map(|row| row.iter().zip(&state).map(|(m, s)| *m * s).sum())
                .collect();
        }
        state[0]
    }

    #[test]
    fn circomlib_vectors() {
        assert_eq!(
            poseidon_hash_native(&felts(&[1])).unwrap(),
            felt("18586133768512220936620570745912940619677854269274689475585506675881198879027")
        );
        assert_eq!(
            poseidon_hash_native(&felts(&[1, 2])).unwrap(),
            felt("7853200120776062878684798364095072458815029376092732009249414926327459813530")
        );
        assert_eq!(
            poseidon_hash_native(&felts(&[1, 2, 3, 4])).unwrap(),
            felt("18821383157269793795438455681495246036402687001665670618754263018637548127333")
        );
        assert_eq!(
            poseidon_hash_native(&felts(&[0, 0])).unwrap(),
            felt("14744269619966411208579211824598458697587494354926760081771325075741142829156")
        );
    }

    #[test]
    fn sparse_rounds_match_dense_permutation() {
        let mut rng = SmallRng::seed_from_u64(7);
        for n in [1usize, 2, 4, 8, 12, 16] {
            let inputs: Vec<Felt> = (0..n).map(|_| Felt::rand(&mut rng)).collect();
            assert_eq!(
                poseidon_hash_native(&inputs).unwrap(),
                dense_reference(&inputs),
                "width {}",
                n + 1
            );
        }
    }

    #[test]
    fn sum_clears_the_buffer() {
        let mut api = NativeApi::new();
        let mut h = Poseidon::new();
        h.write(&felts(&[1]));
        h.write(&felts(&[2]));
        assert_eq!(h.len(), 2);
        let first = h.sum(&mut api).unwrap();
        assert!(h.is_empty());

        h.write(&felts(&[1, 2]));
        assert_eq!(h.sum(&mut api).unwrap(), first);

        h.write(&felts(&[9, 9, 9]));
        h.reset();
        h.write(&felts(&[2, 1]));
        assert_ne!(h.sum(&mut api).unwrap(), first);
    }

    #[test]
    fn width_errors_emit_no_gates() {
        let mut rec = GateRecorder::new();
        let empty: Vec<Wire> = Vec::new();
        assert_eq!(
            poseidon_hash(&mut rec, &empty),
            Err(ConfigError::UnsupportedWidth { width: 1 })
        );
        let wide: Vec<Wire> = (0..17).map(|_| rec.secret_input()).collect();
        let before = rec.gates().len();
        assert_eq!(
            poseidon_hash(&mut rec, &wide),
            Err(ConfigError::UnsupportedWidth { width: 18 })
        );
        assert_eq!(rec.gates().len(), before);
        assert_eq!(rec.op_counts().total(), 0);
    }

    #[test]
    fn gate_counts_follow_round_schedule() {
        for t in [2usize, 3, 6] {
            let rp = PARTIAL_ROUNDS[t - 2] as u64;
            let tt = t as u64;
            let mut api = NativeApi::new();
            poseidon_hash(&mut api, &vec![Felt::from(3u64); t - 1]).unwrap();
            let counts = api.op_counts();
            let muls = 3 * (FULL_ROUNDS as u64 * tt + rp) + 7 * tt * tt + tt + rp * (2 * tt - 1);
            let adds = (FULL_ROUNDS as u64 * tt + rp)
                + 7 * tt * (tt - 1)
                + (tt - 1)
                + rp * 2 * (tt - 1);
            assert_eq!(counts.get(Op::Mul), muls, "t = {t}");
            assert_eq!(counts.get(Op::Add), adds, "t = {t}");
            assert_eq!(counts.get(Op::Select), 0);
        }
    }

    #[test]
    fn circuit_accepts_only_matching_hash() {
        let data = felts(&[5, 6, 7]);
        let hash = poseidon_hash_native(&data).unwrap();

        let mut api = NativeApi::new();
        PoseidonCircuit { data: data.clone(), hash }.define(&mut api).unwrap();
        assert!(api.is_satisfied());

        let mut api = NativeApi::new();
        PoseidonCircuit {
            data,
            hash: hash + Felt::from(1u64),
        }
        .define(&mut api)
        .unwrap();
        assert!(!api.is_satisfied());
    }

    #[test]
    fn recorded_circuit_is_stable() {
        let build = || {
            let mut rec = GateRecorder::new();
            let circuit = PoseidonCircuit::allocate(&mut rec, 2);
            circuit.define(&mut rec).unwrap();
            rec
        };
        let a = build();
        let b = build();
        assert_eq!(a.gates(), b.gates());
        assert_eq!(a.num_public_inputs(), 1);
        assert_eq!(a.op_counts().get(Op::AssertIsEqual), 1);
    }
}
