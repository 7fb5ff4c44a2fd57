// SPDX-License-Identifier: MIT
//! JSON witness documents.
//!
//! Field elements are written as decimal strings (plain JSON integers are
//! accepted too when they fit in a `u64`):
//!
//! ```json
//! { "Root": "…", "Leaf": "…", "ProofIndex": "5", "ProofElements": "[1, 2, 3]" }
//! { "PreImage": "297262668938251460872476410954775437897592223497" }
//! ```
//!
//! `ProofElements` may also be a JSON array. `PreImage` may be a single value
//! or an array of up to 16 values.

use std::{fs, path::Path};

use ark_ff::PrimeField;
use num_bigint::BigUint;
use num_traits::Num;
use serde::Deserialize;

use crate::{
    Felt,
    error::WitnessError,
    merkle::MerkleProofCircuit,
    poseidon::{PoseidonCircuit, poseidon_hash_native},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Decimal(String),
    Integer(u64),
}

impl Scalar {
    fn to_felt(&self, field: &'static str) -> Result<Felt, WitnessError> {
        match self {
            Scalar::Integer(n) => Ok(Felt::from(*n)),
            Scalar::Decimal(s) => parse_decimal(field, s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum ScalarList {
    /// `"[a, b, c]"`
    Packed(String),
    List(Vec<Scalar>),
    Single(Scalar),
}

impl ScalarList {
    fn to_felts(&self, field: &'static str) -> Result<Vec<Felt>, WitnessError> {
        match self {
            ScalarList::Packed(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| parse_decimal(field, v))
                .collect(),
            ScalarList::List(xs) => xs.iter().map(|x| x.to_felt(field)).collect(),
            ScalarList::Single(x) => Ok(vec![x.to_felt(field)?]),
        }
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Felt, WitnessError> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WitnessError::InvalidNumber {
            field,
            value: value.to_owned(),
        });
    }
    let n = BigUint::from_str_radix(digits, 10).map_err(|_| WitnessError::InvalidNumber {
        field,
        value: value.to_owned(),
    })?;
    if n >= BigUint::from(Felt::MODULUS) {
        return Err(WitnessError::OutOfRange {
            field,
            value: digits.to_owned(),
        });
    }
    Ok(Felt::from(n))
}

/// Witness for [`MerkleProofCircuit`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MerkleWitness {
    root: Scalar,
    leaf: Scalar,
    proof_index: Scalar,
    proof_elements: ScalarList,
}

impl MerkleWitness {
    pub fn from_json_str(json: &str) -> Result<Self, WitnessError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WitnessError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn into_assignment(self) -> Result<MerkleProofCircuit<Felt>, WitnessError> {
        Ok(MerkleProofCircuit {
            root: self.root.to_felt("Root")?,
            leaf: self.leaf.to_felt("Leaf")?,
            proof_elements: self.proof_elements.to_felts("ProofElements")?,
            proof_index: self.proof_index.to_felt("ProofIndex")?,
        })
    }
}

/// Witness for [`PoseidonCircuit`]. The public hash is computed from the
/// preimage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PoseidonWitness {
    pre_image: ScalarList,
}

impl PoseidonWitness {
    pub fn from_json_str(json: &str) -> Result<Self, WitnessError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WitnessError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn into_assignment(self) -> Result<PoseidonCircuit<Felt>, WitnessError> {
        let data = self.pre_image.to_felts("PreImage")?;
        let hash = poseidon_hash_native(&data)?;
        Ok(PoseidonCircuit { data, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    const P: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn merkle_packed_elements() {
        let w = MerkleWitness::from_json_str(
            r#"{"Root": "7", "Leaf": "3", "ProofIndex": "2", "ProofElements": "[1, 2,3]"}"#,
        )
        .unwrap()
        .into_assignment()
        .unwrap();
        assert_eq!(w.root, Felt::from(7u64));
        assert_eq!(w.leaf, Felt::from(3u64));
        assert_eq!(w.proof_index, Felt::from(2u64));
        assert_eq!(
            w.proof_elements,
            vec![Felt::from(1u64), Felt::from(2u64), Felt::from(3u64)]
        );
    }

    #[test]
    fn merkle_array_elements() {
        let w = MerkleWitness::from_json_str(
            r#"{"Root": 7, "Leaf": "3", "ProofIndex": 0, "ProofElements": ["1", 2]}"#,
        )
        .unwrap()
        .into_assignment()
        .unwrap();
        assert_eq!(w.proof_elements, vec![Felt::from(1u64), Felt::from(2u64)]);
    }

    #[test]
    fn malformed_documents() {
        assert!(matches!(
            MerkleWitness::from_json_str(r#"{"Root": "7"}"#),
            Err(WitnessError::Json(_))
        ));
        let bad_number = MerkleWitness::from_json_str(
            r#"{"Root": "0x07", "Leaf": "3", "ProofIndex": "2", "ProofElements": "[]"}"#,
        )
        .unwrap()
        .into_assignment();
        assert!(matches!(
            bad_number,
            Err(WitnessError::InvalidNumber { field: "Root", .. })
        ));
        let bad_element = MerkleWitness::from_json_str(
            r#"{"Root": "1", "Leaf": "3", "ProofIndex": "2", "ProofElements": "[1, x]"}"#,
        )
        .unwrap()
        .into_assignment();
        assert!(matches!(
            bad_element,
            Err(WitnessError::InvalidNumber {
                field: "ProofElements",
                ..
            })
        ));
    }

    #[test]
    fn modulus_is_out_of_range() {
        let json = format!(r#"{{"PreImage": "{P}"}}"#);
        let err = PoseidonWitness::from_json_str(&json)
            .unwrap()
            .into_assignment()
            .unwrap_err();
        assert!(matches!(err, WitnessError::OutOfRange { field: "PreImage", .. }));
    }

    #[test]
    fn preimage_hash_is_filled_in() {
        let w = PoseidonWitness::from_json_str(r#"{"PreImage": "1"}"#)
            .unwrap()
            .into_assignment()
            .unwrap();
        assert_eq!(w.data, vec![Felt::from(1u64)]);
        assert_eq!(w.hash, poseidon_hash_native(&[Felt::from(1u64)]).unwrap());
    }

    #[test]
    fn oversized_preimage_is_a_config_error() {
        let values: Vec<String> = (0..17).map(|i| format!("\"{i}\"")).collect();
        let json = format!(r#"{{"PreImage": [{}]}}"#, values.join(","));
        let err = PoseidonWitness::from_json_str(&json)
            .unwrap()
            .into_assignment()
            .unwrap_err();
        assert!(matches!(
            err,
            WitnessError::Config(ConfigError::UnsupportedWidth { width: 18 })
        ));
    }

    #[test]
    fn missing_file_is_io() {
        assert!(matches!(
            PoseidonWitness::from_path("/nonexistent/witness.json"),
            Err(WitnessError::Io(_))
        ));
    }
}
