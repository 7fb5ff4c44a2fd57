// SPDX-License-Identifier: MIT
//! Error types.
//!
//! Only configuration problems are errors. A witness that does not satisfy the
//! emitted constraints is reported by the host API (see
//! [`crate::native::Unsatisfied`]), never through these types.

use thiserror::Error;

/// Fatal configuration errors, always raised before the first gate is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported Poseidon width t={width} (supported: 2..=17)")]
    UnsupportedWidth { width: usize },

    #[error("{table} table for t={width} has {actual} entries, expected {expected}")]
    TableLength {
        table: &'static str,
        width: usize,
        expected: usize,
        actual: usize,
    },

    #[error("matrix for t={width} is not invertible")]
    SingularMatrix { width: usize },

    #[error("no valid MDS candidate for t={width}")]
    ParameterSearch { width: usize },

    #[error("invalid Merkle depth {depth} (supported: 1..=253)")]
    InvalidDepth { depth: usize },

    #[error("proof has {actual} elements but the verifier depth is {expected}")]
    DepthMismatch { expected: usize, actual: usize },

    #[error("two-to-one compression takes one or two inputs, got {got}")]
    CompressionArity { got: usize },

    #[error("{leaves} leaves do not fit in a tree of depth {depth}")]
    TooManyLeaves { depth: usize, leaves: usize },
}

/// Errors raised while turning a JSON witness document into a circuit
/// assignment.
#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("failed to read witness file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed witness JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{field}` is not a decimal integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field `{field}` is not below the BN254 scalar modulus: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
