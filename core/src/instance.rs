//! Constructed configuration instances with guarded field access.
//!
//! An [`Instance`] binds an immutable `Arc<Schema>` to one version,
//! owns a type-checked value per public field, and funnels every field
//! touch through [`get`](Instance::get) and [`set`](Instance::set) so
//! lifecycle and freeze guards always apply. Nested configuration
//! values are owned by composition: cloning an instance deep-copies the
//! whole tree, and two instances never alias the same mutable nested
//! object.
//!
//! # Examples
//!
//! ```
//! use cfgmodel_core::{FieldDescriptor, FieldType, Instance, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder("TrainConfig")
//!     .field(FieldDescriptor::new("batch_size", FieldType::Int).with_default(32))
//!     .field(FieldDescriptor::new("learning_rate", FieldType::Float).with_default(1e-3))
//!     .build()
//!     .unwrap();
//!
//! let mut train = Instance::from_value(&schema, json!({"batch_size": 16})).unwrap();
//! assert_eq!(train.get_value("batch_size").unwrap(), json!(16));
//!
//! train.set("batch_size", 128).unwrap();
//! assert!(train.set("batch_size", "not an int").is_err());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{ConfigError, Result};
use crate::schema::{FieldType, Schema};
use crate::version::{LifecycleState, Version};

/// The stored value of one field: a decoded leaf or a nested instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A scalar or container value.
    Leaf(Value),
    /// A nested configuration instance, owned by composition.
    Nested(Instance),
}

impl FieldValue {
    /// Converts to the canonical nested-mapping form.
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Leaf(value) => value.clone(),
            FieldValue::Nested(instance) => instance.to_value(),
        }
    }

    /// Returns the leaf value, if this is a leaf.
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            FieldValue::Leaf(value) => Some(value),
            FieldValue::Nested(_) => None,
        }
    }

    /// Returns the nested instance, if this is one.
    pub fn as_nested(&self) -> Option<&Instance> {
        match self {
            FieldValue::Nested(instance) => Some(instance),
            FieldValue::Leaf(_) => None,
        }
    }
}

/// A constructed, type-checked configuration object bound to one
/// version.
///
/// Equality compares the schema name and the canonical mapping forms,
/// so two instances are equal when they serialize identically.
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) schema: Arc<Schema>,
    pub(crate) bound: Version,
    pub(crate) values: HashMap<String, FieldValue>,
    pub(crate) lifecycle: HashMap<String, LifecycleState>,
    /// Public field order: active and deprecated schema fields in
    /// declaration order, then extension fields in insertion order.
    pub(crate) order: Vec<String>,
    pub(crate) frozen: bool,
    pub(crate) diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Instance {
    /// Constructs an instance from the schema's defaults, bound to the
    /// schema's declared version.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::MissingField`] when a required field
    /// (no default) exists in the schema.
    pub fn new(schema: &Arc<Schema>) -> Result<Self> {
        Self::from_value_at(schema, schema.version().clone(), Value::Object(Map::new()))
    }

    /// Constructs an instance from a nested mapping, bound to the
    /// schema's declared version.
    ///
    /// Keys absent from the schema emit an
    /// [`UnexpectedKey`](DiagnosticKind::UnexpectedKey) diagnostic and
    /// are otherwise ignored; construction does not fail on them.
    pub fn from_value(schema: &Arc<Schema>, value: Value) -> Result<Self> {
        Self::from_value_at(schema, schema.version().clone(), value)
    }

    /// Constructs an instance from a nested mapping at an explicit
    /// bound version.
    ///
    /// Fields resolving to `NotYetAdded` or `Deleted` are excluded
    /// from the public field set without type-checking any provided
    /// value; their lifecycle entries are retained so later access can
    /// fail with the right error. Nested fields are constructed
    /// recursively at the nested schema's own declared version.
    pub fn from_value_at(schema: &Arc<Schema>, bound: Version, value: Value) -> Result<Self> {
        let Value::Object(mut provided) = value else {
            return Err(ConfigError::NotAMapping {
                type_name: schema.name().to_string(),
                actual: render(&value),
            });
        };

        let mut values = HashMap::new();
        let mut lifecycle = HashMap::new();
        let mut order = Vec::new();
        let mut diagnostics = Vec::new();

        for field in schema.fields() {
            let state = field.version.resolve(&bound);
            lifecycle.insert(field.name.clone(), state);
            if matches!(state, LifecycleState::NotYetAdded | LifecycleState::Deleted) {
                provided.remove(&field.name);
                continue;
            }

            let resolved = match (&field.ty, provided.remove(&field.name)) {
                (FieldType::Nested(sub), Some(Value::Object(map))) => {
                    FieldValue::Nested(Instance::from_value(sub, Value::Object(map))?)
                }
                (FieldType::Nested(_), Some(other)) => {
                    return Err(type_mismatch(schema, &field.name, &field.ty, &other));
                }
                (FieldType::Nested(sub), None) => {
                    let nested = match &field.default {
                        Some(Value::Object(map)) => {
                            Instance::from_value(sub, Value::Object(map.clone()))?
                        }
                        Some(other) => {
                            return Err(type_mismatch(schema, &field.name, &field.ty, other));
                        }
                        None => Instance::new(sub)?,
                    };
                    FieldValue::Nested(nested)
                }
                (ty, Some(given)) => {
                    if !ty.accepts(&given) {
                        return Err(type_mismatch(schema, &field.name, ty, &given));
                    }
                    FieldValue::Leaf(given)
                }
                (ty, None) => match &field.default {
                    Some(default) => {
                        if !ty.accepts(default) {
                            return Err(type_mismatch(schema, &field.name, ty, default));
                        }
                        FieldValue::Leaf(default.clone())
                    }
                    None => {
                        return Err(ConfigError::MissingField {
                            type_name: schema.name().to_string(),
                            field: field.name.clone(),
                        });
                    }
                },
            };

            values.insert(field.name.clone(), resolved);
            order.push(field.name.clone());
        }

        for (key, leftover) in provided {
            let message = format!(
                "unexpected `{key}: {}` in {}",
                render(&leftover),
                schema.name()
            );
            tracing::warn!(type_name = schema.name(), field = %key, "{message}");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnexpectedKey,
                schema.name(),
                &key,
                message,
            ));
        }

        Ok(Self {
            schema: Arc::clone(schema),
            bound,
            values,
            lifecycle,
            order,
            frozen: false,
            diagnostics: RefCell::new(diagnostics),
        })
    }

    /// The shared schema this instance was constructed against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The version this instance is bound to.
    pub fn bound_version(&self) -> &Version {
        &self.bound
    }

    /// Public field names: active and deprecated schema fields in
    /// declaration order, then extension fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|name| name.as_str())
    }

    /// The resolved lifecycle state of a declared or extended field.
    pub fn lifecycle(&self, name: &str) -> Option<LifecycleState> {
        self.lifecycle.get(name).copied()
    }

    /// Reads a field through the lifecycle guard.
    ///
    /// Deprecated fields emit one
    /// [`DeprecatedAccess`](DiagnosticKind::DeprecatedAccess)
    /// diagnostic per read and still return the value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotYetAdded`] or [`ConfigError::Deleted`] when
    /// the field is outside its lifecycle window at the bound version;
    /// [`ConfigError::UnknownKey`] when the name is not a field of
    /// this instance.
    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        self.guard_read(name)?;
        self.values.get(name).ok_or_else(|| ConfigError::UnknownKey {
            type_name: self.schema.name().to_string(),
            key: name.to_string(),
        })
    }

    /// Reads a field and converts it to its canonical mapping form.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        self.get(name).map(FieldValue::to_value)
    }

    /// Borrows a nested instance field.
    pub fn nested(&self, name: &str) -> Result<&Instance> {
        match self.get(name)? {
            FieldValue::Nested(instance) => Ok(instance),
            FieldValue::Leaf(value) => Err(ConfigError::TypeMismatch {
                type_name: self.schema.name().to_string(),
                field: name.to_string(),
                expected: "nested config".to_string(),
                actual: render(value),
            }),
        }
    }

    /// Mutably borrows a nested instance field.
    ///
    /// The nested instance carries its own freeze flag; writes through
    /// the returned reference are guarded by the nested instance, not
    /// by this one.
    pub fn nested_mut(&mut self, name: &str) -> Result<&mut Instance> {
        self.guard_read(name)?;
        let type_name = self.schema.name().to_string();
        match self.values.get_mut(name) {
            Some(FieldValue::Nested(instance)) => Ok(instance),
            Some(FieldValue::Leaf(value)) => Err(ConfigError::TypeMismatch {
                type_name,
                field: name.to_string(),
                expected: "nested config".to_string(),
                actual: render(value),
            }),
            None => Err(ConfigError::UnknownKey {
                type_name,
                key: name.to_string(),
            }),
        }
    }

    /// Writes a field through the freeze and type guards.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(name, value.into(), false)
    }

    /// Writes a field, optionally bypassing the declared-type check.
    ///
    /// A mapping assigned to a nested field reconstructs the nested
    /// instance, so nested contents are always validated. Extension
    /// fields added by `update` are open `any`-typed and never
    /// type-checked.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Frozen`] when the instance is frozen,
    /// [`ConfigError::TypeMismatch`] when the value fails the declared
    /// type and `allow_type_change` is `false`, and
    /// [`ConfigError::UnknownKey`] when the name is neither declared
    /// nor an existing extension field.
    pub fn set_with(&mut self, name: &str, value: Value, allow_type_change: bool) -> Result<()> {
        if self.frozen {
            return Err(ConfigError::Frozen(name.to_string()));
        }

        // A lifecycle-hidden declared name in the public field set is an
        // extension overlay added by `update`; overlays are open-typed
        // and the old declared type no longer applies.
        let declared = self.schema.field(name).and_then(|field| {
            let hidden = matches!(
                field.version.resolve(&self.bound),
                LifecycleState::NotYetAdded | LifecycleState::Deleted
            );
            if hidden && self.is_public(name) {
                None
            } else {
                Some(field.ty.clone())
            }
        });
        match declared {
            Some(FieldType::Nested(sub)) => {
                if value.is_object() {
                    let nested = Instance::from_value(&sub, value)?;
                    self.values
                        .insert(name.to_string(), FieldValue::Nested(nested));
                } else if allow_type_change {
                    self.values
                        .insert(name.to_string(), FieldValue::Leaf(value));
                } else {
                    return Err(type_mismatch(
                        &self.schema,
                        name,
                        &FieldType::Nested(sub),
                        &value,
                    ));
                }
            }
            Some(ty) => {
                if !allow_type_change && !ty.accepts(&value) {
                    return Err(type_mismatch(&self.schema, name, &ty, &value));
                }
                self.values
                    .insert(name.to_string(), FieldValue::Leaf(value));
            }
            None => {
                if !self.values.contains_key(name) {
                    return Err(ConfigError::UnknownKey {
                        type_name: self.schema.name().to_string(),
                        key: name.to_string(),
                    });
                }
                self.values
                    .insert(name.to_string(), FieldValue::Leaf(value));
            }
        }
        Ok(())
    }

    /// Disables all writes until [`unfreeze`](Instance::unfreeze).
    ///
    /// Freezing does not cascade into nested instances; each nested
    /// instance must be frozen individually for full-tree immutability.
    pub fn freeze(&mut self) -> &mut Self {
        self.frozen = true;
        self
    }

    /// Re-enables writes.
    pub fn unfreeze(&mut self) -> &mut Self {
        self.frozen = false;
        self
    }

    /// Returns `true` while writes are disabled.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Converts to the canonical nested-mapping form.
    ///
    /// Only public fields (active, deprecated, extensions) appear;
    /// `NotYetAdded` and `Deleted` fields are excluded.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for name in &self.order {
            if let Some(value) = self.values.get(name) {
                map.insert(name.clone(), value.to_value());
            }
        }
        Value::Object(map)
    }

    /// Returns and clears the buffered warning events.
    ///
    /// Nested instances buffer their own diagnostics.
    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Adds a per-instance extension field holding `value`, open
    /// `any`-typed. The shared schema is not touched.
    pub(crate) fn extend_field(&mut self, name: &str, value: Value) {
        self.lifecycle
            .insert(name.to_string(), LifecycleState::Active);
        if !self.values.contains_key(name) && !self.order.iter().any(|n| n == name) {
            self.order.push(name.to_string());
        }
        self.values
            .insert(name.to_string(), FieldValue::Leaf(value));
    }

    /// Whether `name` belongs to the instance's public field set.
    pub(crate) fn is_public(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }

    /// Lifecycle gate shared by the read paths. Emits the deprecation
    /// diagnostic; errors for fields outside their lifecycle window.
    fn guard_read(&self, name: &str) -> Result<()> {
        match self.lifecycle.get(name).copied() {
            Some(LifecycleState::Deprecated) => {
                self.warn_deprecated(name);
                Ok(())
            }
            Some(LifecycleState::NotYetAdded) => {
                let added = self
                    .schema
                    .field(name)
                    .and_then(|f| f.version.added.clone())
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                Err(ConfigError::NotYetAdded {
                    type_name: self.schema.name().to_string(),
                    field: name.to_string(),
                    added,
                    bound: self.bound.to_string(),
                })
            }
            Some(LifecycleState::Deleted) => {
                let deleted = self
                    .schema
                    .field(name)
                    .and_then(|f| f.version.deleted.clone())
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                Err(ConfigError::Deleted {
                    type_name: self.schema.name().to_string(),
                    field: name.to_string(),
                    deleted,
                    bound: self.bound.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn warn_deprecated(&self, name: &str) {
        let Some(field) = self.schema.field(name) else {
            return;
        };
        let deprecated = field
            .version
            .deprecated
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        let deleted = field
            .version
            .deleted
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "a future version".to_string());
        let message = format!(
            "`{}.{name}` is deprecated in {deprecated} and will be deleted in {deleted}, current is {}",
            self.schema.name(),
            self.bound,
        );
        tracing::warn!(type_name = self.schema.name(), field = %name, "{message}");
        self.diagnostics.borrow_mut().push(Diagnostic::new(
            DiagnosticKind::DeprecatedAccess,
            self.schema.name(),
            name,
            message,
        ));
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.to_value() == other.to_value()
    }
}

fn render(value: &Value) -> String {
    value.to_string()
}

fn type_mismatch(schema: &Schema, field: &str, expected: &FieldType, actual: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        type_name: schema.name().to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
        actual: render(actual),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::diagnostics::DiagnosticKind;
    use crate::schema::FieldDescriptor;

    use super::*;

    fn train_schema() -> Arc<Schema> {
        Schema::builder("TrainConfig")
            .version("0.1")
            .field(FieldDescriptor::new("batch_size", FieldType::Int).with_default(32))
            .field(FieldDescriptor::new("learning_rate", FieldType::Float).with_default(1e-3))
            .field(
                FieldDescriptor::new("lr", FieldType::Float)
                    .with_default(1e-3)
                    .deprecated("0.1")
                    .deleted("0.3"),
            )
            .field(
                FieldDescriptor::new("weight_decay", FieldType::Float)
                    .with_default(1e-5)
                    .added("0.1"),
            )
            .build()
            .unwrap()
    }

    fn exp_schema() -> Arc<Schema> {
        Schema::builder("MyExp")
            .field(FieldDescriptor::nested("train", &train_schema()))
            .field(FieldDescriptor::new("num_class", FieldType::Int).with_default(1000))
            .field(FieldDescriptor::new("depth", FieldType::Int).with_default(50))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_and_overrides() {
        let schema = train_schema();
        let train = Instance::from_value(&schema, json!({"batch_size": 16})).unwrap();
        assert_eq!(train.get_value("batch_size").unwrap(), json!(16));
        assert_eq!(train.get_value("learning_rate").unwrap(), json!(1e-3));
    }

    #[test]
    fn test_construction_type_mismatch_names_field() {
        let schema = train_schema();
        let err = Instance::from_value(&schema, json!({"batch_size": "big"})).unwrap_err();
        match err {
            ConfigError::TypeMismatch {
                type_name,
                field,
                expected,
                actual,
            } => {
                assert_eq!(type_name, "TrainConfig");
                assert_eq!(field, "batch_size");
                assert_eq!(expected, "int");
                assert_eq!(actual, "\"big\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let schema = Schema::builder("Strict")
            .field(FieldDescriptor::new("path", FieldType::Str))
            .build()
            .unwrap();
        let err = Instance::new(&schema).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field, .. } if field == "path"));
    }

    #[test]
    fn test_unknown_construction_key_warns_and_is_ignored() {
        let schema = train_schema();
        let train = Instance::from_value(&schema, json!({"batch_size": 16, "bogus": 1})).unwrap();
        assert!(train.get("bogus").is_err());

        let diagnostics = train.drain_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnexpectedKey);
        assert_eq!(diagnostics[0].field, "bogus");
        assert!(train.drain_diagnostics().is_empty());
    }

    #[test]
    fn test_nested_construction_from_mapping() {
        let schema = exp_schema();
        let exp = Instance::from_value(
            &schema,
            json!({"num_class": 10, "train": {"learning_rate": 1.0}}),
        )
        .unwrap();
        assert_eq!(exp.get_value("num_class").unwrap(), json!(10));
        let train = exp.nested("train").unwrap();
        assert_eq!(train.get_value("learning_rate").unwrap(), json!(1.0));
        assert_eq!(train.get_value("batch_size").unwrap(), json!(32));
    }

    #[test]
    fn test_nested_defaults_do_not_alias() {
        let schema = exp_schema();
        let mut a = Instance::new(&schema).unwrap();
        let b = Instance::new(&schema).unwrap();

        a.nested_mut("train").unwrap().set("batch_size", 100).unwrap();
        assert_eq!(
            a.nested("train").unwrap().get_value("batch_size").unwrap(),
            json!(100)
        );
        assert_eq!(
            b.nested("train").unwrap().get_value("batch_size").unwrap(),
            json!(32)
        );
    }

    #[test]
    fn test_deprecated_read_warns_once_and_returns_value() {
        let schema = train_schema();
        let train = Instance::new(&schema).unwrap();
        assert_eq!(train.lifecycle("lr"), Some(LifecycleState::Deprecated));

        assert_eq!(train.get_value("lr").unwrap(), json!(1e-3));
        let diagnostics = train.drain_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DeprecatedAccess);
        assert!(diagnostics[0].message.contains("0.1"));
        assert!(diagnostics[0].message.contains("0.3"));
    }

    #[test]
    fn test_deleted_read_fails_and_is_hidden() {
        let schema = train_schema();
        let train = Instance::from_value_at(
            &schema,
            "0.3".parse().unwrap(),
            json!({"batch_size": 16}),
        )
        .unwrap();

        assert!(matches!(
            train.get("lr").unwrap_err(),
            ConfigError::Deleted { field, .. } if field == "lr"
        ));
        assert!(!train.to_value().as_object().unwrap().contains_key("lr"));
        assert!(train.field_names().all(|n| n != "lr"));
    }

    #[test]
    fn test_not_yet_added_read_fails() {
        let schema = train_schema();
        let train =
            Instance::from_value_at(&schema, "0.0".parse().unwrap(), json!({})).unwrap();
        assert!(matches!(
            train.get("weight_decay").unwrap_err(),
            ConfigError::NotYetAdded { field, .. } if field == "weight_decay"
        ));
        assert!(train.get("lr").is_ok());
        assert!(train.drain_diagnostics().is_empty());
    }

    #[test]
    fn test_set_type_guard() {
        let schema = train_schema();
        let mut train = Instance::new(&schema).unwrap();

        train.set("batch_size", 64).unwrap();
        assert!(train.set("batch_size", json!([1, 2])).is_err());
        train.set_with("batch_size", json!("s"), true).unwrap();
        assert_eq!(train.get_value("batch_size").unwrap(), json!("s"));
    }

    #[test]
    fn test_set_nested_from_mapping_revalidates() {
        let schema = exp_schema();
        let mut exp = Instance::new(&schema).unwrap();

        exp.set("train", json!({"batch_size": 8})).unwrap();
        assert_eq!(
            exp.nested("train").unwrap().get_value("batch_size").unwrap(),
            json!(8)
        );
        assert!(exp.set("train", json!({"batch_size": "x"})).is_err());
        assert!(exp.set("train", 3).is_err());
    }

    #[test]
    fn test_freeze_blocks_writes_until_unfreeze() {
        let schema = train_schema();
        let mut train = Instance::new(&schema).unwrap();

        train.freeze();
        assert!(train.is_frozen());
        assert!(matches!(
            train.set("batch_size", 1).unwrap_err(),
            ConfigError::Frozen(field) if field == "batch_size"
        ));

        train.unfreeze();
        train.set("batch_size", 1).unwrap();
    }

    #[test]
    fn test_freeze_does_not_cascade() {
        let schema = exp_schema();
        let mut exp = Instance::new(&schema).unwrap();
        exp.freeze();

        assert!(!exp.nested("train").unwrap().is_frozen());
    }

    #[test]
    fn test_equality_over_canonical_forms() {
        let schema = exp_schema();
        let a = Instance::from_value(&schema, json!({"num_class": 10})).unwrap();
        let mut b = Instance::new(&schema).unwrap();
        assert_ne!(a, b);
        b.set("num_class", 10).unwrap();
        assert_eq!(a, b);
    }
}
