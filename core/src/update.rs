//! Partial updates and copy-on-write merging.
//!
//! [`Instance::update`] applies a heterogeneous source — a nested
//! mapping, another instance of the identical schema, or a serialized
//! config file/stream — to an instance, recursing into nested
//! instances. [`Instance::merge`] is the copy-on-write variant: the
//! receiver is cloned, the clone unfrozen and updated, and the clone
//! returned.
//!
//! Updates are all-or-nothing: changes are staged on a deep copy and
//! committed only when every key applies cleanly.
//!
//! # Examples
//!
//! ```
//! use cfgmodel_core::{FieldDescriptor, FieldType, Instance, Schema, UpdateOptions};
//! use serde_json::json;
//!
//! let train = Schema::builder("TrainConfig")
//!     .field(FieldDescriptor::new("learning_rate", FieldType::Float).with_default(1e-3))
//!     .build()
//!     .unwrap();
//! let schema = Schema::builder("MyExp")
//!     .field(FieldDescriptor::nested("train", &train))
//!     .field(FieldDescriptor::new("num_class", FieldType::Int).with_default(1000))
//!     .build()
//!     .unwrap();
//!
//! let mut exp = Instance::new(&schema).unwrap();
//! exp.update(
//!     &json!({"num_class": 10, "train": {"learning_rate": 1.0}}),
//!     &UpdateOptions::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(exp.get_value("num_class").unwrap(), json!(10));
//! assert_eq!(
//!     exp.nested("train").unwrap().get_value("learning_rate").unwrap(),
//!     json!(1.0)
//! );
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::codec;
use crate::error::{ConfigError, Result};
use crate::instance::{FieldValue, Instance};

/// Key and type policies for [`Instance::update`] and
/// [`Instance::merge`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    keys: Option<Vec<String>>,
    allow_new_key: bool,
    allow_type_change: bool,
}

impl UpdateOptions {
    /// Default policies: no key filter, unknown keys rejected, type
    /// changes rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only applies the listed keys.
    ///
    /// The filter acts on the top nesting level only; it is not
    /// propagated into nested recursive calls. To update a subset of a
    /// nested field, filter the nested mapping itself.
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Accepts keys absent from the schema by extending the instance's
    /// own field set with open `any`-typed fields. The shared schema
    /// is never touched.
    pub fn allow_new_key(mut self, allow: bool) -> Self {
        self.allow_new_key = allow;
        self
    }

    /// Skips the declared-type check on assignments.
    pub fn allow_type_change(mut self, allow: bool) -> Self {
        self.allow_type_change = allow;
        self
    }
}

impl Instance {
    /// Applies a nested mapping to this instance in place.
    ///
    /// Nested instance fields require the incoming value to be a
    /// mapping and recurse; other fields go through
    /// [`set_with`](Instance::set_with) under the options' type
    /// policy. Sequence values are accepted for both variable and
    /// fixed-length sequence fields; fixed-length fields keep their
    /// length invariant.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Frozen`] if this instance (or a touched nested
    /// instance) is frozen, [`ConfigError::UnknownKey`] for keys
    /// outside the field set when `allow_new_key` is off, and
    /// [`ConfigError::TypeMismatch`] under the type policy. On error
    /// the instance is left exactly as it was.
    pub fn update(&mut self, source: &Value, options: &UpdateOptions) -> Result<()> {
        if self.is_frozen() {
            return Err(ConfigError::Frozen(self.schema().name().to_string()));
        }
        let mut staged = self.clone();
        staged.apply(source, options, true)?;
        *self = staged;
        Ok(())
    }

    /// Applies another instance of the identical schema.
    ///
    /// Schema identity is structural; a schema sharing the name but
    /// declaring different fields is a
    /// [`ConfigError::SchemaMismatch`].
    pub fn update_from(&mut self, other: &Instance, options: &UpdateOptions) -> Result<()> {
        if self.schema() != other.schema() {
            return Err(ConfigError::SchemaMismatch {
                expected: self.schema().name().to_string(),
                given: other.schema().name().to_string(),
            });
        }
        self.update(&other.to_value(), options)
    }

    /// Loads a serialized config and applies it.
    ///
    /// The file is decoded into a transient instance of this schema
    /// first, so its contents are validated before any key is applied.
    pub fn update_from_path(&mut self, path: impl AsRef<Path>, options: &UpdateOptions) -> Result<()> {
        let schema = Arc::clone(self.schema());
        let other = codec::load(&schema, path)?;
        self.update(&other.to_value(), options)
    }

    /// Reads a line-oriented config from a stream and applies it.
    pub fn update_from_reader(
        &mut self,
        reader: impl std::io::Read,
        options: &UpdateOptions,
    ) -> Result<()> {
        let schema = Arc::clone(self.schema());
        let other = codec::load_from_reader(&schema, reader)?;
        self.update(&other.to_value(), options)
    }

    /// Copy-on-write variant of [`update`](Instance::update): deep
    /// copies this instance, unfreezes the copy, applies the source,
    /// and returns the copy. The receiver is never mutated.
    pub fn merge(&self, source: &Value, options: &UpdateOptions) -> Result<Instance> {
        let mut copy = self.clone();
        copy.unfreeze();
        copy.update(source, options)?;
        Ok(copy)
    }

    /// Copy-on-write variant of [`update_from`](Instance::update_from).
    pub fn merge_from(&self, other: &Instance, options: &UpdateOptions) -> Result<Instance> {
        let mut copy = self.clone();
        copy.unfreeze();
        copy.update_from(other, options)?;
        Ok(copy)
    }

    fn apply(&mut self, source: &Value, options: &UpdateOptions, top_level: bool) -> Result<()> {
        let Value::Object(map) = source else {
            return Err(ConfigError::NotAMapping {
                type_name: self.schema().name().to_string(),
                actual: source.to_string(),
            });
        };

        for (key, value) in map {
            if top_level {
                if let Some(keys) = &options.keys {
                    if !keys.iter().any(|k| k == key) {
                        continue;
                    }
                }
            }

            if !self.is_public(key) {
                if !options.allow_new_key {
                    return Err(ConfigError::UnknownKey {
                        type_name: self.schema().name().to_string(),
                        key: key.clone(),
                    });
                }
                self.extend_field(key, value.clone());
                continue;
            }

            let is_nested = matches!(self.values.get(key), Some(FieldValue::Nested(_)));
            if is_nested {
                if let Some(FieldValue::Nested(nested)) = self.values.get_mut(key) {
                    if nested.is_frozen() {
                        return Err(ConfigError::Frozen(key.clone()));
                    }
                    // The key filter is not propagated into nested calls.
                    nested.apply(value, options, false)?;
                }
            } else {
                self.set_with(key, value.clone(), options.allow_type_change)?;
            }
        }
        Ok(())
    }
}
