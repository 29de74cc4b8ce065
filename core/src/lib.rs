//! Schema-driven configuration objects with version-aware field
//! lifecycles.
//!
//! This crate defines a configuration object model built from three
//! layers:
//!
//! - [`Schema`] — immutable, shared field-shape definition for one
//!   configuration type: ordered [`Field`]s with declared
//!   [`FieldType`]s, defaults, and optional [`VersionSpec`] lifecycle
//!   thresholds.
//! - [`Instance`] — a constructed, type-checked configuration object
//!   bound to one version. Every field read and write funnels through
//!   guarded accessors that enforce lifecycle state, declared types,
//!   and the freeze flag.
//! - Engines over instances: in-place [`update`](Instance::update) and
//!   copy-on-write [`merge`](Instance::merge) with key and type
//!   policies ([`UpdateOptions`]), structural [`diff`], and
//!   extension-dispatched JSON/YAML [`save`](Instance::save) /
//!   [`load`](Instance::load).
//!
//! Soft conditions (deprecated reads, unexpected construction keys)
//! are reported as structured [`Diagnostic`] events, logged via
//! `tracing` and buffered per instance.
//!
//! # Example
//!
//! ```
//! use cfgmodel_core::{FieldDescriptor, FieldType, Instance, Schema, UpdateOptions};
//! use serde_json::json;
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
//! let schema = Schema::builder("MyExp")
//!     .field(FieldDescriptor::nested("train", &train))
//!     .field(FieldDescriptor::new("num_class", FieldType::Int).with_default(1000))
//!     .build()
//!     .unwrap();
//!
//! let mut exp = Instance::from_value(&schema, json!({"num_class": 10})).unwrap();
//! exp.update(&json!({"train": {"batch_size": 16}}), &UpdateOptions::new())
//!     .unwrap();
//!
//! // Deprecated fields still read, but emit a structured warning.
//! let train = exp.nested("train").unwrap();
//! assert_eq!(train.get_value("lr").unwrap(), json!(1e-3));
//! assert_eq!(train.drain_diagnostics().len(), 1);
//! ```

mod codec;
mod diagnostics;
mod diff;
mod error;
mod instance;
mod schema;
mod update;
mod version;

pub use codec::{load, load_from_reader, save, save_to_writer};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diff::{DiffKind, DiffRecord, diff};
pub use error::{ConfigError, Result};
pub use instance::{FieldValue, Instance};
pub use schema::{Field, FieldDescriptor, FieldType, Schema, SchemaBuilder};
pub use update::UpdateOptions;
pub use version::{LifecycleState, Version, VersionSpec};
