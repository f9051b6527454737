//! Unified error types for the move-stamp toolkit.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while decoding, patching or encoding a module.
#[derive(Error, Debug)]
pub enum StampError {
    // --- Decoding ---

    /// The input bytes are not a structurally valid module.
    #[error("malformed module at byte {offset}: {reason}")]
    Format { offset: usize, reason: String },

    /// The version word names a bytecode version this crate cannot carry.
    #[error("unsupported bytecode version {version} (supported: 1..={max})")]
    UnsupportedVersion { version: u32, max: u32 },

    // --- Patching ---

    /// A constant edit points past the end of the constant pool.
    #[error("constant index {index} out of range (pool has {len} entries)")]
    ConstantIndex { index: usize, len: usize },

    /// The constant at `index` is declared with a different type than the edit.
    #[error("constant {index} is declared as {found}, edit targets {expected}")]
    TypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// The constant's current value is not the value the caller asserted.
    #[error("constant {index} holds {found:?}, expected {expected:?}")]
    Mismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// A literal parsed fine but does not fit the target type's width.
    #[error("value {value} does not fit in {ty}")]
    EncodingRange { ty: String, value: String },

    /// A literal cannot be read as a value of the target type at all.
    #[error("invalid {ty} literal: {value:?}")]
    InvalidLiteral { ty: String, value: String },

    /// A replacement identifier is not a legal Move identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A rename would leave two identical entries in the identifier pool.
    #[error("identifier {0:?} would appear twice in the identifier pool")]
    DuplicateIdentifier(String),

    /// A handle points outside the pool it indexes into.
    #[error("reference integrity violated: {0}")]
    ReferenceIntegrity(String),

    // --- Config ---

    /// An edit plan or bundle file was not found.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An edit plan or bundle file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StampError {
    pub(crate) fn format(offset: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            offset,
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, StampError>`.
pub type Result<T> = std::result::Result<T, StampError>;
