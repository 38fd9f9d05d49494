//! Error kinds surfaced across the public boundary of the crate.
//!
//! Every fallible operation reports one of these kinds rather than a
//! collection of ad-hoc error types; the kind is the stable contract,
//! the payload is whatever context is cheap to attach.

use std::fmt;

/// Errors produced by the voxel volume and its persistence layer.
#[derive(Debug)]
pub enum VoxError {
    /// An (i, j, k) coordinate fell outside the addressable range of the
    /// cell, node, or bitfield it was presented to.
    InvalidIndex { i: i64, j: i64, k: i64 },
    /// A volume's element-type tag did not match the requested `T`, or a
    /// typed attribute lookup used the wrong static type.
    TypeMismatch { expected: String, found: String },
    /// An attribute type name was registered twice, or looked up before
    /// any registration occurred.
    InvalidType { name: String },
    /// The underlying store failed a read/write/exists/delete.
    IoFailure { key: String, source: std::io::Error },
    /// A persisted payload did not round-trip: tag mismatch, unknown
    /// container type, or a truncated stream.
    InputMalformed { reason: String },
    /// An invariant was broken by the caller, e.g. asking a non-value
    /// iterator for a value. Recoverable, never a panic in release.
    LogicViolation { reason: String },
    /// An open mode forbade the operation attempted (e.g. a write
    /// against a store opened `READ_ONLY`).
    InvalidMode { reason: String },
}

impl fmt::Display for VoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoxError::InvalidIndex { i, j, k } => {
                write!(f, "index ({i}, {j}, {k}) is out of range")
            }
            VoxError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected `{expected}`, found `{found}`")
            }
            VoxError::InvalidType { name } => {
                write!(f, "attribute type `{name}` is not registered, or was registered twice")
            }
            VoxError::IoFailure { key, source } => {
                write!(f, "i/o failure on `{key}`: {source}")
            }
            VoxError::InputMalformed { reason } => {
                write!(f, "malformed input: {reason}")
            }
            VoxError::LogicViolation { reason } => {
                write!(f, "logic violation: {reason}")
            }
            VoxError::InvalidMode { reason } => {
                write!(f, "invalid open mode: {reason}")
            }
        }
    }
}

impl std::error::Error for VoxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VoxError::IoFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type VoxResult<T> = Result<T, VoxError>;
