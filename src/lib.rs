// SPDX-License-Identifier: MIT
//! # `poseidon-mtp-bn254`
//!
//! Circuit gadgets for the **Poseidon** sponge hash (circomlib parameters) and
//! a **Merkle authentication-path verifier** over the BN254 scalar field.
//!
//! ## High-level architecture
//! * **Field arithmetic** – delegated to `ark-bn254` / `ark-ff`; the scalar
//!   field is re-exported as [`Felt`].
//! * **Gate interface** – gadgets are generic over [`CircuitApi`]. Two hosts
//!   ship with the crate: [`NativeApi`] evaluates every gate on concrete values
//!   and collects unsatisfied constraints, [`GateRecorder`] records the gate
//!   sequence and allocates wires.
//! * **Parameters** – round constants and MDS matrices are derived once per
//!   width from the Grain LFSR and turned into the sparse "optimised" form
//!   ([`params`]).
//! * **Permutation core** – [`Poseidon`] builder and [`poseidon_hash`] for
//!   `1..=16` inputs.
//! * **Merkle** – [`TwoToOne`] compressors ([`PoseidonCompressor`],
//!   [`MimcCompressor`]), [`MerkleVerifier`] for in-circuit path checks and
//!   [`MerkleTree`] to produce matching witnesses off-circuit.
//!
//! ```
//! use poseidon_mtp_bn254::{Felt, MerkleTree, MerkleVerifier, PoseidonCompressor};
//!
//! let leaves: Vec<Felt> = (1u64..=4).map(Felt::from).collect();
//! let tree = MerkleTree::from_leaves(PoseidonCompressor, 2, &leaves)?;
//! let verifier = MerkleVerifier::new(2, PoseidonCompressor)?;
//! let proof = tree.proof(3).expect("index in range");
//! assert!(verifier.verify_native(tree.root(), &proof)?);
//! # Ok::<(), poseidon_mtp_bn254::ConfigError>(())
//! ```

//  ---------------------------------------------------------------------------
//  Modules
//  ---------------------------------------------------------------------------
pub mod api;
pub mod compress;
pub mod error;
pub mod merkle;
pub mod native;
pub mod params;
pub mod poseidon;
pub mod recorder;
pub mod witness;

/// Scalar field of BN254.
pub use ark_bn254::Fr as Felt;

pub use api::{CircuitApi, Op, OpCounts};
pub use compress::{Compression, MIMC_ROUNDS, MimcCompressor, PoseidonCompressor, TwoToOne};
pub use error::{ConfigError, WitnessError};
pub use merkle::{MAX_DEPTH, MerkleProof, MerkleProofCircuit, MerkleTree, MerkleVerifier};
pub use native::{NativeApi, Unsatisfied};
pub use params::{
    FULL_ROUNDS, MAX_WIDTH, MIN_WIDTH, PARTIAL_ROUNDS, PoseidonParams, RawParams, params,
};
pub use poseidon::{Poseidon, PoseidonCircuit, poseidon_hash, poseidon_hash_native};
pub use recorder::{Gate, GateRecorder, Visibility, Wire};
pub use witness::{MerkleWitness, PoseidonWitness};
