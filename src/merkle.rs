// SPDX-License-Identifier: MIT
//! Merkle authentication-path verification.
//!
//! A path of depth `D` consists of `D` sibling digests and a path index whose
//! little-endian bits say, level by level, whether the running digest is the
//! right (`1`) or left (`0`) child. Leaves enter the tree as
//! [`TwoToOne::hash_leaf`] of the leaf value.

use ark_ff::Zero;

use crate::{
    Felt,
    api::CircuitApi,
    compress::TwoToOne,
    error::ConfigError,
    native::NativeApi,
    recorder::{GateRecorder, Wire},
};

/// Largest supported depth: the path index must decompose into fewer bits
/// than the field modulus has.
pub const MAX_DEPTH: usize = 253;

fn check_depth(depth: usize) -> Result<(), ConfigError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(ConfigError::InvalidDepth { depth });
    }
    Ok(())
}

/// `index >> shift`, zero once the shift passes the word size.
#[inline]
fn shr(index: usize, shift: usize) -> usize {
    u32::try_from(shift)
        .ok()
        .and_then(|s| index.checked_shr(s))
        .unwrap_or(0)
}

//  ---------------------------------------------------------------------------
//  Verifier
//  ---------------------------------------------------------------------------

/// Path verifier with the depth fixed at construction.
#[derive(Debug, Clone)]
pub struct MerkleVerifier<C> {
    depth: usize,
    compressor: C,
}

impl<C: TwoToOne> MerkleVerifier<C> {
    pub fn new(depth: usize, compressor: C) -> Result<Self, ConfigError> {
        check_depth(depth)?;
        Ok(Self { depth, compressor })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    /// Constrain `root` to be the root of a tree holding `leaf` at
    /// `path_index`, authenticated by `proof_elements` (leaf level first).
    ///
    /// A proof of the wrong length fails before any gate is emitted. Wrong
    /// values only show up as unsatisfied constraints in the host.
    pub fn verify_path<A: CircuitApi>(
        &self,
        api: &mut A,
        root: &A::Var,
        leaf: &A::Var,
        proof_elements: &[A::Var],
        path_index: &A::Var,
    ) -> Result<(), ConfigError> {
        if proof_elements.len() != self.depth {
            return Err(ConfigError::DepthMismatch {
                expected: self.depth,
                actual: proof_elements.len(),
            });
        }
        let _span = tracing::trace_span!("verify_path", depth = self.depth).entered();

        let mut running = self.compressor.hash_leaf(api, leaf)?;
        let bits = api.to_binary(path_index, self.depth);
        for (bit, element) in bits.iter().zip(proof_elements) {
            let left = api.select(bit, element, &running);
            let right = api.select(bit, &running, element);
            running = self.compressor.compress(api, &left, &right)?;
        }
        api.assert_is_equal(&running, root);
        Ok(())
    }

    /// Run [`Self::verify_path`] on concrete values.
    pub fn verify_native(&self, root: Felt, proof: &MerkleProof) -> Result<bool, ConfigError> {
        let mut api = NativeApi::new();
        self.verify_path(
            &mut api,
            &root,
            &proof.leaf,
            &proof.proof_elements,
            &proof.path_index,
        )?;
        Ok(api.is_satisfied())
    }
}

//  ---------------------------------------------------------------------------
//  Off-circuit tree
//  ---------------------------------------------------------------------------

/// Witness for one leaf: the leaf value, its siblings (leaf level first) and
/// the path index as a field element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: Felt,
    pub proof_elements: Vec<Felt>,
    pub path_index: Felt,
}

/// Fixed-depth tree over `2^depth` leaves, the ones not supplied being zero.
///
/// Only the populated prefix of each level is stored; everything to its right
/// is the digest of an all-zero subtree of that height.
#[derive(Debug, Clone)]
pub struct MerkleTree<C> {
    compressor: C,
    depth: usize,
    leaves: Vec<Felt>,
    /// `levels[0]` holds the leaf digests, `levels[depth]` the root if any leaf
    /// was supplied.
    levels: Vec<Vec<Felt>>,
    zeros: Vec<Felt>,
}

impl<C: TwoToOne> MerkleTree<C> {
    pub fn from_leaves(compressor: C, depth: usize, leaves: &[Felt]) -> Result<Self, ConfigError> {
        check_depth(depth)?;
        if shr(leaves.len().saturating_sub(1), depth) != 0 {
            return Err(ConfigError::TooManyLeaves {
                depth,
                leaves: leaves.len(),
            });
        }

        let mut api = NativeApi::new();
        let mut zeros = Vec::with_capacity(depth + 1);
        let mut zero = compressor.hash_leaf(&mut api, &Felt::zero())?;
        zeros.push(zero);
        for _ in 0..depth {
            zero = compressor.compress(&mut api, &zero, &zero)?;
            zeros.push(zero);
        }

        let mut level = leaves
            .iter()
            .map(|x| compressor.hash_leaf(&mut api, x))
            .collect::<Result<Vec<_>, _>>()?;
        let mut levels = Vec::with_capacity(depth + 1);
        for pad in zeros.iter().take(depth) {
            let next = level
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(pad);
                    compressor.compress(&mut api, &pair[0], right)
                })
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(std::mem::replace(&mut level, next));
        }
        levels.push(level);

        tracing::debug!(depth, leaves = leaves.len(), "built merkle tree");
        Ok(Self {
            compressor,
            depth,
            leaves: leaves.to_vec(),
            levels,
            zeros,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    pub fn root(&self) -> Felt {
        self.node(self.depth, 0)
    }

    /// Digest stored at leaf position `index`, or `None` past `2^depth`.
    pub fn leaf_digest(&self, index: usize) -> Option<Felt> {
        self.in_range(index).then(|| self.node(0, index))
    }

    /// Authentication path for leaf position `index`, or `None` past
    /// `2^depth`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if !self.in_range(index) {
            return None;
        }
        let proof_elements = (0..self.depth)
            .map(|level| self.node(level, shr(index, level) ^ 1))
            .collect();
        Some(MerkleProof {
            leaf: self.leaves.get(index).copied().unwrap_or_default(),
            proof_elements,
            path_index: Felt::from(index as u64),
        })
    }

    fn in_range(&self, index: usize) -> bool {
        shr(index, self.depth) == 0
    }

    fn node(&self, level: usize, index: usize) -> Felt {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }
}

//  ---------------------------------------------------------------------------
//  Circuit
//  ---------------------------------------------------------------------------

/// Membership circuit: public `root`, secret leaf, path and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProofCircuit<V> {
    pub root: V,
    pub leaf: V,
    pub proof_elements: Vec<V>,
    pub proof_index: V,
}

impl MerkleProofCircuit<Wire> {
    pub fn allocate(rec: &mut GateRecorder, depth: usize) -> Self {
        let root = rec.public_input();
        let leaf = rec.secret_input();
        let proof_elements = (0..depth).map(|_| rec.secret_input()).collect();
        let proof_index = rec.secret_input();
        Self {
            root,
            leaf,
            proof_elements,
            proof_index,
        }
    }
}

impl MerkleProofCircuit<Felt> {
    pub fn assign(root: Felt, proof: MerkleProof) -> Self {
        Self {
            root,
            leaf: proof.leaf,
            proof_elements: proof.proof_elements,
            proof_index: proof.path_index,
        }
    }
}

impl<V: Clone> MerkleProofCircuit<V> {
    pub fn define<A, C>(&self, api: &mut A, verifier: &MerkleVerifier<C>) -> Result<(), ConfigError>
    where
        A: CircuitApi<Var = V>,
        C: TwoToOne,
    {
        verifier.verify_path(
            api,
            &self.root,
            &self.leaf,
            &self.proof_elements,
            &self.proof_index,
        )
    }
}
