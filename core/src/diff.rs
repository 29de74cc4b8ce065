//! Structural diffing of two instances' canonical mapping forms.
//!
//! [`diff`] walks two canonical forms in lockstep and reports every
//! difference as a [`DiffRecord`] with a dotted/indexed path label.
//! Comparison is exact; there is no floating-point tolerance.
//!
//! # Examples
//!
//! ```
//! use cfgmodel_core::{FieldDescriptor, FieldType, Instance, Schema, diff};
//! use serde_json::json;
//!
//! let schema = Schema::builder("Exp")
//!     .field(FieldDescriptor::new("depth", FieldType::Int).with_default(50))
//!     .build()
//!     .unwrap();
//!
//! let a = Instance::new(&schema).unwrap();
//! let b = Instance::from_value(&schema, json!({"depth": 18})).unwrap();
//!
//! assert!(diff(&a, &a).unwrap().is_empty());
//! let records = diff(&a, &b).unwrap();
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].path, "root.depth");
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::instance::Instance;

/// One difference between two canonical forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    /// Dotted/indexed location, rooted at `root`.
    pub path: String,
    /// What differs at that location.
    pub kind: DiffKind,
}

/// The kind of mismatch a [`DiffRecord`] reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiffKind {
    /// Mappings with different key sets; the intersection is still
    /// compared recursively.
    KeySetMismatch {
        /// Keys present only on the left side.
        only_left: Vec<String>,
        /// Keys present only on the right side.
        only_right: Vec<String>,
    },
    /// Sequences of different lengths; the common prefix is still
    /// compared index by index.
    LengthMismatch {
        /// Left-side length.
        left: usize,
        /// Right-side length.
        right: usize,
    },
    /// Scalars (or mismatched shapes) that are not exactly equal.
    ValueMismatch {
        /// Left-side value.
        left: Value,
        /// Right-side value.
        right: Value,
    },
}

impl fmt::Display for DiffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiffKind::KeySetMismatch {
                only_left,
                only_right,
            } => write!(
                f,
                "{:<20} + {:?} - {:?}",
                self.path, only_left, only_right
            ),
            DiffKind::LengthMismatch { left, right } => {
                write!(f, "{:<20} len {left} != {right}", self.path)
            }
            DiffKind::ValueMismatch { left, right } => {
                write!(f, "{:<20} {left} != {right}", self.path)
            }
        }
    }
}

/// Compares two instances of the identical schema structurally.
///
/// Records come out in a deterministic order (keys sorted, sequence
/// indices ascending). `diff(x, x)` is empty.
///
/// # Errors
///
/// [`ConfigError::SchemaMismatch`] when the instances belong to
/// different schemas. Identity is structural, not by name: two
/// schemas sharing a name but declaring different fields mismatch.
pub fn diff(left: &Instance, right: &Instance) -> Result<Vec<DiffRecord>> {
    if left.schema() != right.schema() {
        return Err(ConfigError::SchemaMismatch {
            expected: left.schema().name().to_string(),
            given: right.schema().name().to_string(),
        });
    }
    let mut records = Vec::new();
    compare(&left.to_value(), &right.to_value(), "root", &mut records);
    Ok(records)
}

impl Instance {
    /// Structural diff against another instance of the identical
    /// schema. See [`diff`].
    pub fn diff(&self, other: &Instance) -> Result<Vec<DiffRecord>> {
        diff(self, other)
    }
}

fn compare(left: &Value, right: &Value, path: &str, records: &mut Vec<DiffRecord>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let only_left: Vec<String> = l.keys().filter(|k| !r.contains_key(*k)).cloned().collect();
            let only_right: Vec<String> = r.keys().filter(|k| !l.contains_key(*k)).cloned().collect();
            if !only_left.is_empty() || !only_right.is_empty() {
                records.push(DiffRecord {
                    path: path.to_string(),
                    kind: DiffKind::KeySetMismatch {
                        only_left,
                        only_right,
                    },
                });
            }
            for (key, l_value) in l {
                if let Some(r_value) = r.get(key) {
                    compare(l_value, r_value, &format!("{path}.{key}"), records);
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            if l.len() != r.len() {
                records.push(DiffRecord {
                    path: path.to_string(),
                    kind: DiffKind::LengthMismatch {
                        left: l.len(),
                        right: r.len(),
                    },
                });
            }
            for (i, (l_item, r_item)) in l.iter().zip(r.iter()).enumerate() {
                compare(l_item, r_item, &format!("{path}[{i}]"), records);
            }
        }
        _ => {
            if left != right {
                records.push(DiffRecord {
                    path: path.to_string(),
                    kind: DiffKind::ValueMismatch {
                        left: left.clone(),
                        right: right.clone(),
                    },
                });
            }
        }
    }
}
