//! Schema definitions for configuration types.
//!
//! A [`Schema`] is the immutable, shared field-shape definition for one
//! configuration type: an ordered sequence of fields, each carrying a
//! declared [`FieldType`], an optional default, and an optional
//! [`VersionSpec`]. Schemas are built once per configuration type via
//! [`Schema::builder`] and shared as `Arc<Schema>` by every instance.
//!
//! # Examples
//!
//! ```
//! use cfgmodel_core::{FieldDescriptor, FieldType, Schema};
//!
//! let train = Schema::builder("TrainConfig")
//!     .version("0.1")
//!     .field(FieldDescriptor::new("batch_size", FieldType::Int).with_default(32))
//!     .field(
//!         FieldDescriptor::new("lr", FieldType::Float)
//!             .with_default(1e-3)
//!             .deprecated("0.1")
//!             .deleted("0.3"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(train.name(), "TrainConfig");
//! assert_eq!(train.fields().len(), 2);
//! assert!(train.contains("batch_size"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::version::{Version, VersionSpec};

/// Declared type of a field.
///
/// Leaf values are represented as [`serde_json::Value`], so the type
/// check operates on decoded scalars and containers. `Float` accepts
/// integer literals because JSON and YAML do not reliably preserve the
/// int/float distinction for whole numbers; `Int` is strict.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Integer (rejects floats).
    Int,
    /// Floating point (accepts integer literals).
    Float,
    /// String.
    Str,
    /// Null, for optional alternatives inside unions.
    Null,
    /// Ordered sequence of any length.
    Seq,
    /// Ordered sequence of exactly the given length.
    FixedSeq(usize),
    /// Any of the listed alternatives.
    Union(Vec<FieldType>),
    /// A nested configuration type.
    Nested(Arc<Schema>),
    /// Dynamically typed; never checked.
    Any,
}

impl FieldType {
    /// Checks a decoded value against this type.
    ///
    /// For `Nested` only the mapping shape is checked here; the field
    /// contents are validated by recursive instance construction.
    ///
    /// # Examples
    ///
    /// ```
    /// use cfgmodel_core::FieldType;
    /// use serde_json::json;
    ///
    /// assert!(FieldType::Int.accepts(&json!(3)));
    /// assert!(!FieldType::Int.accepts(&json!(3.5)));
    /// assert!(FieldType::Float.accepts(&json!(3)));
    /// assert!(FieldType::FixedSeq(3).accepts(&json!([1, 2, 3])));
    /// assert!(!FieldType::FixedSeq(3).accepts(&json!([1, 2])));
    /// assert!(FieldType::Union(vec![FieldType::Null, FieldType::Str]).accepts(&json!(null)));
    /// ```
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Bool => value.is_boolean(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Str => value.is_string(),
            FieldType::Null => value.is_null(),
            FieldType::Seq => value.is_array(),
            FieldType::FixedSeq(len) => value.as_array().is_some_and(|a| a.len() == *len),
            FieldType::Union(alternatives) => alternatives.iter().any(|t| t.accepts(value)),
            FieldType::Nested(_) => value.is_object(),
            FieldType::Any => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Str => write!(f, "str"),
            FieldType::Null => write!(f, "null"),
            FieldType::Seq => write!(f, "seq"),
            FieldType::FixedSeq(len) => write!(f, "seq[{len}]"),
            FieldType::Union(alternatives) => {
                let rendered = alternatives
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" | ");
                write!(f, "union({rendered})")
            }
            FieldType::Nested(schema) => write!(f, "{}", schema.name()),
            FieldType::Any => write!(f, "any"),
        }
    }
}

/// One field's declaration, consumed by [`SchemaBuilder::field`].
///
/// Version thresholds are given as strings and parsed when the schema
/// is built, so declaration chains stay infallible.
///
/// # Examples
///
/// ```
/// use cfgmodel_core::{FieldDescriptor, FieldType};
///
/// let lr = FieldDescriptor::new("lr", FieldType::Float)
///     .with_default(1e-3)
///     .deprecated("0.1")
///     .deleted("0.3");
/// ```
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    added: Option<String>,
    deprecated: Option<String>,
    deleted: Option<String>,
}

impl FieldDescriptor {
    /// Declares a field with a name and a declared type.
    pub fn new(name: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
            added: None,
            deprecated: None,
            deleted: None,
        }
    }

    /// Declares a field holding a nested configuration type.
    ///
    /// Nested fields default to the nested schema's own defaults when
    /// no explicit default is given.
    pub fn nested(name: &str, schema: &Arc<Schema>) -> Self {
        Self::new(name, FieldType::Nested(Arc::clone(schema)))
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the version the field is added in.
    pub fn added(mut self, version: &str) -> Self {
        self.added = Some(version.to_string());
        self
    }

    /// Sets the version the field is deprecated in.
    pub fn deprecated(mut self, version: &str) -> Self {
        self.deprecated = Some(version.to_string());
        self
    }

    /// Sets the version the field is deleted in.
    pub fn deleted(mut self, version: &str) -> Self {
        self.deleted = Some(version.to_string());
        self
    }
}

/// A resolved field inside a built [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, unique within the schema.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Default value; `None` means the field is required.
    pub default: Option<Value>,
    /// Lifecycle thresholds.
    pub version: VersionSpec,
}

/// Immutable field-shape definition for one configuration type.
///
/// Built once via [`Schema::builder`], then shared as `Arc<Schema>`
/// across instances and threads. Never mutated after construction;
/// per-instance extension fields added by `update` live on the
/// instance, not here.
#[derive(Debug, PartialEq)]
pub struct Schema {
    name: String,
    version: Version,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Returns a builder for a configuration type with the given name.
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            version: None,
            fields: Vec::new(),
        }
    }

    /// The configuration type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema's declared version, used as the default bound
    /// version for its instances.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Returns `true` if the schema declares a field with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Builder for [`Schema`].
///
/// Collects field declarations in order, then validates names and
/// version strings in [`build`](SchemaBuilder::build).
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    version: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Sets the schema's declared version (default `"0.0"`).
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Appends a field declaration.
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Validates the declaration and produces the shared schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyFieldName`] or
    /// [`ConfigError::DuplicateField`] for bad field names, and
    /// [`ConfigError::InvalidVersion`] for unparsable version strings.
    pub fn build(self) -> Result<Arc<Schema>> {
        let version = match &self.version {
            Some(raw) => raw.parse::<Version>()?,
            None => Version::min(),
        };

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::with_capacity(self.fields.len());
        for descriptor in self.fields {
            if descriptor.name.trim().is_empty() {
                return Err(ConfigError::EmptyFieldName);
            }
            if index.contains_key(&descriptor.name) {
                return Err(ConfigError::DuplicateField(descriptor.name));
            }

            let parse = |raw: &Option<String>| -> Result<Option<Version>> {
                raw.as_deref().map(str::parse).transpose()
            };
            let version_spec = VersionSpec {
                added: parse(&descriptor.added)?,
                deprecated: parse(&descriptor.deprecated)?,
                deleted: parse(&descriptor.deleted)?,
            };

            index.insert(descriptor.name.clone(), fields.len());
            fields.push(Field {
                name: descriptor.name,
                ty: descriptor.ty,
                default: descriptor.default,
                version: version_spec,
            });
        }

        Ok(Arc::new(Schema {
            name: self.name,
            version,
            fields,
            index,
        }))
    }
}
