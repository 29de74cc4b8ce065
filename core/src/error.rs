//! Error types for the configuration object model.
//!
//! A single enum covers every failure mode of the engine: type
//! validation, field lifecycle, frozen-instance writes, unknown keys,
//! file formats, schema construction, and the underlying I/O and codec
//! errors. All errors are returned synchronously to the immediate
//! caller; nothing is retried internally.

use thiserror::Error;

/// Errors raised by schema construction, instance operations, and the
/// serialization adapters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value does not satisfy its field's declared type.
    #[error("`{type_name}.{field}` requires {expected}, given {actual}")]
    TypeMismatch {
        /// Name of the schema that owns the field.
        type_name: String,
        /// Field being assigned.
        field: String,
        /// Rendered declared type.
        expected: String,
        /// Rendered offending value.
        actual: String,
    },

    /// A field without a default was not provided at construction.
    #[error("missing required field `{type_name}.{field}`")]
    MissingField {
        /// Name of the schema that owns the field.
        type_name: String,
        /// Field that was not provided.
        field: String,
    },

    /// A mapping was expected (instance construction or nested update).
    #[error("{type_name} expects a mapping, given {actual}")]
    NotAMapping {
        /// Name of the schema being constructed or updated.
        type_name: String,
        /// Rendered offending value.
        actual: String,
    },

    /// Access to a field that does not exist yet at the bound version.
    #[error("`{type_name}.{field}` is not added until {added}, current is {bound}")]
    NotYetAdded {
        /// Name of the schema that owns the field.
        type_name: String,
        /// Field being accessed.
        field: String,
        /// Version the field is added in.
        added: String,
        /// The instance's bound version.
        bound: String,
    },

    /// Access to a field that was deleted at or before the bound version.
    #[error("`{type_name}.{field}` was deleted in {deleted}, current is {bound}")]
    Deleted {
        /// Name of the schema that owns the field.
        type_name: String,
        /// Field being accessed.
        field: String,
        /// Version the field was deleted in.
        deleted: String,
        /// The instance's bound version.
        bound: String,
    },

    /// Write attempted on a frozen instance.
    #[error("cannot modify `{0}` on a frozen instance; call `unfreeze` if this is intended")]
    Frozen(String),

    /// Key not present in the instance's field set.
    #[error("`{key}` is not a field of {type_name} and `allow_new_key` is disabled")]
    UnknownKey {
        /// Name of the schema that owns the instance.
        type_name: String,
        /// The unknown key.
        key: String,
    },

    /// File suffix not handled by any codec.
    #[error("unsupported config format: `{0}` (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    /// Decoded document was null or an empty mapping.
    #[error("unable to load config from `{0}`: document is empty")]
    EmptyDocument(String),

    /// Two instances of different schemas were combined.
    #[error("schema mismatch: expected `{expected}`, given `{given}`")]
    SchemaMismatch {
        /// Schema name of the receiver.
        expected: String,
        /// Schema name of the other operand.
        given: String,
    },

    /// Two fields in one schema share a name.
    #[error("duplicate field `{0}` in schema")]
    DuplicateField(String),

    /// A field was declared with an empty name.
    #[error("schema field name cannot be empty")]
    EmptyFieldName,

    /// A version string could not be parsed.
    #[error("invalid version string: `{0}`")]
    InvalidVersion(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
