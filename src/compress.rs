// SPDX-License-Identifier: MIT
//! Two-to-one compression functions used as Merkle node hashes.
//!
//! A compressor provides two entry points: a single-input hash applied to
//! leaves, and the two-input compression applied to every internal node.

use ark_ff::{PrimeField, Zero};
use digest::Digest;
use once_cell::sync::Lazy;
use sha3::Keccak256;

use crate::{Felt, api::CircuitApi, error::ConfigError, poseidon::poseidon_hash};

pub const MIMC_ROUNDS: usize = 110;
const MIMC_SEED: &[u8] = b"seed";

pub trait TwoToOne {
    /// Digest of a leaf value.
    fn hash_leaf<A: CircuitApi>(&self, api: &mut A, leaf: &A::Var) -> Result<A::Var, ConfigError>;

    /// Digest of an ordered `(left, right)` pair.
    fn compress<A: CircuitApi>(
        &self,
        api: &mut A,
        left: &A::Var,
        right: &A::Var,
    ) -> Result<A::Var, ConfigError>;
}

impl<T: TwoToOne> TwoToOne for &T {
    fn hash_leaf<A: CircuitApi>(&self, api: &mut A, leaf: &A::Var) -> Result<A::Var, ConfigError> {
        (**self).hash_leaf(api, leaf)
    }

    fn compress<A: CircuitApi>(
        &self,
        api: &mut A,
        left: &A::Var,
        right: &A::Var,
    ) -> Result<A::Var, ConfigError> {
        (**self).compress(api, left, right)
    }
}

/// Builder over a [`TwoToOne`] with the same `write`/`sum`/`reset` shape as
/// [`crate::Poseidon`], limited to one or two pending inputs.
#[derive(Debug, Clone)]
pub struct Compression<C, V> {
    compressor: C,
    data: Vec<V>,
}

impl<C: TwoToOne, V: Clone> Compression<C, V> {
    pub fn new(compressor: C) -> Self {
        Self {
            compressor,
            data: Vec::with_capacity(2),
        }
    }

    pub fn write(&mut self, inputs: &[V]) {
        self.data.extend_from_slice(inputs);
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Leaf hash for one pending input, node compression for two. The buffer
    /// is cleared in every case.
    pub fn sum<A: CircuitApi<Var = V>>(&mut self, api: &mut A) -> Result<V, ConfigError> {
        let data = std::mem::take(&mut self.data);
        match data.as_slice() {
            [leaf] => self.compressor.hash_leaf(api, leaf),
            [left, right] => self.compressor.compress(api, left, right),
            other => Err(ConfigError::CompressionArity { got: other.len() }),
        }
    }
}

//  ---------------------------------------------------------------------------
//  Poseidon
//  ---------------------------------------------------------------------------

/// Poseidon at width 2 for leaves and width 3 for nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoseidonCompressor;

impl TwoToOne for PoseidonCompressor {
    fn hash_leaf<A: CircuitApi>(&self, api: &mut A, leaf: &A::Var) -> Result<A::Var, ConfigError> {
        poseidon_hash(api, std::slice::from_ref(leaf))
    }

    fn compress<A: CircuitApi>(
        &self,
        api: &mut A,
        left: &A::Var,
        right: &A::Var,
    ) -> Result<A::Var, ConfigError> {
        poseidon_hash(api, &[left.clone(), right.clone()])
    }
}

//  ---------------------------------------------------------------------------
//  MiMC
//  ---------------------------------------------------------------------------

/// Round constants: a Keccak-256 chain started from `keccak256("seed")`, each
/// digest read big-endian and reduced mod p.
static MIMC_CONSTANTS: Lazy<Vec<Felt>> = Lazy::new(|| {
    let mut rnd: [u8; 32] = Keccak256::digest(MIMC_SEED).into();
    (0..MIMC_ROUNDS)
        .map(|_| {
            rnd = Keccak256::digest(rnd).into();
            Felt::from_be_bytes_mod_order(&rnd)
        })
        .collect()
});

/// MiMC-x⁵ in Miyaguchi–Preneel mode: every absorbed `x` updates the chaining
/// value as `h ← E_h(x) + h + x`, starting from `h = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MimcCompressor;

impl MimcCompressor {
    pub fn constants() -> &'static [Felt] {
        &MIMC_CONSTANTS
    }

    fn encrypt<A: CircuitApi>(api: &mut A, h: &A::Var, m: &A::Var) -> A::Var {
        let mut m = m.clone();
        for c in MIMC_CONSTANTS.iter() {
            let k = api.constant(*c);
            let t = api.add(&m, h);
            let t = api.add(&t, &k);
            let t2 = api.mul(&t, &t);
            let t4 = api.mul(&t2, &t2);
            m = api.mul(&t4, &t);
        }
        api.add(&m, h)
    }

    fn absorb<A: CircuitApi>(api: &mut A, inputs: &[&A::Var]) -> A::Var {
        let mut h = api.constant(Felt::zero());
        for x in inputs {
            let e = Self::encrypt(api, &h, x);
            let e = api.add(&e, &h);
            h = api.add(&e, x);
        }
        h
    }
}

impl TwoToOne for MimcCompressor {
    fn hash_leaf<A: CircuitApi>(&self, api: &mut A, leaf: &A::Var) -> Result<A::Var, ConfigError> {
        Ok(Self::absorb(api, &[leaf]))
    }

    fn compress<A: CircuitApi>(
        &self,
        api: &mut A,
        left: &A::Var,
        right: &A::Var,
    ) -> Result<A::Var, ConfigError> {
        Ok(Self::absorb(api, &[left, right]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::Op, native::NativeApi, poseidon::poseidon_hash_native};
    use std::str::FromStr;

    fn felt(s: &str) -> Felt {
        Felt::from_str(s).unwrap()
    }

    #[test]
    fn mimc_constant_chain() {
        let c = MimcCompressor::constants();
        assert_eq!(c.len(), MIMC_ROUNDS);
        assert_eq!(
            c[0],
            felt("227063593160049201514509818732644766896230235191445544141110657236065169432")
        );
    }

    #[test]
    fn mimc_vectors() {
        let mut api = NativeApi::new();
        let one = Felt::from(1u64);
        let two = Felt::from(2u64);
        assert_eq!(
            MimcCompressor.hash_leaf(&mut api, &one).unwrap(),
            felt("18045289051299654077710208499747278752099041449041972372412271818361923969579")
        );
        assert_eq!(
            MimcCompressor.compress(&mut api, &one, &two).unwrap(),
            felt("3603165980089455451357404308887091638931600328866147122487556210589417494548")
        );
        assert_eq!(api.op_counts().get(Op::Mul), 3 * 3 * MIMC_ROUNDS as u64);
    }

    #[test]
    fn poseidon_compressor_matches_sponge() {
        let mut api = NativeApi::new();
        let (a, b) = (Felt::from(1u64), Felt::from(2u64));
        assert_eq!(
            PoseidonCompressor.hash_leaf(&mut api, &a).unwrap(),
            poseidon_hash_native(&[a]).unwrap()
        );
        assert_eq!(
            PoseidonCompressor.compress(&mut api, &a, &b).unwrap(),
            poseidon_hash_native(&[a, b]).unwrap()
        );
        assert_ne!(
            PoseidonCompressor.compress(&mut api, &b, &a).unwrap(),
            poseidon_hash_native(&[a, b]).unwrap()
        );
    }

    #[test]
    fn builder_dispatches_on_arity() {
        let mut api = NativeApi::new();
        let (a, b) = (Felt::from(1u64), Felt::from(2u64));
        let mut c = Compression::new(PoseidonCompressor);

        c.write(&[a]);
        assert_eq!(c.sum(&mut api).unwrap(), poseidon_hash_native(&[a]).unwrap());

        c.write(&[a, b]);
        assert_eq!(c.sum(&mut api).unwrap(), poseidon_hash_native(&[a, b]).unwrap());

        assert_eq!(c.sum(&mut api), Err(ConfigError::CompressionArity { got: 0 }));
        c.write(&[a, b, a]);
        assert_eq!(c.sum(&mut api), Err(ConfigError::CompressionArity { got: 3 }));

        // the failed call still consumed the buffer
        c.write(&[b]);
        assert_eq!(c.sum(&mut api).unwrap(), poseidon_hash_native(&[b]).unwrap());
    }
}
