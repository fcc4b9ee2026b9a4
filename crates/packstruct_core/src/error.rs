//! # Error Types
//!
//! Three families, matching when they can occur:
//!
//! - [`SchemaError`]: raised once while a schema is built or a typed field
//!   accessor is resolved. Never on the hot path.
//! - [`StoreError`]: raised by `alloc`/`free`/field access when a record is
//!   addressed that is not live, or by by-name access to a bad field.
//! - [`ConfigError`]: raised while loading a schema document from TOML.
//!
//! Numeric field writes never produce an error. Out-of-range values wrap,
//! truncate, or saturate to infinity instead.

use thiserror::Error;

use crate::layout::StorageClass;

/// Errors raised while parsing specs or building a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The spec string does not match the grammar.
    #[error("malformed spec {spec:?} for field {field:?}")]
    MalformedSpec {
        /// Field the spec belongs to.
        field: String,
        /// The offending spec string.
        spec: String,
    },

    /// An integer width outside `1..=32`.
    #[error("width {width} out of range 1..=32 for field {field:?}")]
    WidthOutOfRange {
        /// Field the spec belongs to.
        field: String,
        /// The requested width.
        width: u32,
    },

    /// A fixed-point scale that is zero or not a positive integer.
    #[error("scale in {spec:?} for field {field:?} must be a positive integer")]
    InvalidScale {
        /// Field the spec belongs to.
        field: String,
        /// The offending spec string.
        spec: String,
    },

    /// The same field name appears twice.
    #[error("duplicate field {0:?}")]
    DuplicateField(String),

    /// The reserved handle field is absent.
    #[error("schema is missing the reserved handle field {:?}", crate::schema::HANDLE_FIELD)]
    MissingHandleField,

    /// The reserved handle field exists but is not declared as `sid`.
    #[error("reserved handle field must be declared \"sid\", found {spec:?}")]
    HandleFieldType {
        /// The spec string found on the reserved field.
        spec: String,
    },

    /// Lookup of a field name that the schema does not declare.
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// A typed accessor was requested for a field of another storage class.
    #[error("field {field:?} is stored as {actual:?}, expected {expected}")]
    FieldKind {
        /// Field name.
        field: String,
        /// Description of the accessor kind that was requested.
        expected: &'static str,
        /// The storage class the layout assigned.
        actual: StorageClass,
    },
}

/// Errors raised by record storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `free()` with no live records.
    #[error("free() called on an empty store")]
    Underflow,

    /// The handle is not live (double free, stale handle, or never issued).
    #[error("handle {0} is not live")]
    NotFound(u32),

    /// A cursor-level free of an instance that currently sits outside the live prefix.
    #[error("instance at slot {slot} is not live (len {len})")]
    StaleInstance {
        /// Slot the instance currently represents.
        slot: usize,
        /// Number of live records.
        len: usize,
    },

    /// Every 32-bit handle has been issued once. Handles are never reused.
    #[error("handle space exhausted")]
    HandlesExhausted,

    /// A store was configured with zero slots per page.
    #[error("page size must be greater than zero")]
    ZeroPageSize,

    /// A field token resolved from a struct type of another schema.
    #[error("field token of struct type {owner:#018x} used on a store of {expected:#018x}")]
    ForeignField {
        /// Fingerprint carried by the token.
        owner: u64,
        /// Fingerprint of the store's struct type.
        expected: u64,
    },

    /// A by-name field access named an unknown field or passed a value of
    /// the wrong kind.
    #[error(transparent)]
    Field(#[from] SchemaError),
}

/// Errors raised while loading a struct document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML for a struct definition.
    #[error("invalid struct document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The declared fields do not form a valid schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The store settings are invalid.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
