//! Command-line flag derivation for configuration schemas.
//!
//! [`derive_command`] flattens a [`Schema`] into one flag per leaf
//! field: the flag's id is the field's dotted path and its long name is
//! that path with dots and underscores turned into dashes, so
//! `train.batch_size` becomes `--train-batch-size`. Fields with a
//! default show it in help; fields without one are required. Fields
//! outside their lifecycle window at the owning schema's version get no
//! flag at all.
//!
//! [`parse_from`] runs the derived command over an argument list,
//! converts each token to the field's declared type, reassembles the
//! flat namespace into a nested mapping, and constructs the instance.
//!
//! # Example
//!
//! ```
//! use cfgmodel_cli::parse_from;
//! use cfgmodel_core::{FieldDescriptor, FieldType, Schema};
//! use serde_json::json;
//!
//! let train = Schema::builder("TrainConfig")
//!     .field(FieldDescriptor::new("batch_size", FieldType::Int).with_default(32))
//!     .build()
//!     .unwrap();
//! let schema = Schema::builder("MyExp")
//!     .field(FieldDescriptor::nested("train", &train))
//!     .field(FieldDescriptor::new("depth", FieldType::Int).with_default(50))
//!     .build()
//!     .unwrap();
//!
//! let exp = parse_from(&schema, ["--train-batch-size", "16"]).unwrap();
//! assert_eq!(
//!     exp.nested("train").unwrap().get_value("batch_size").unwrap(),
//!     json!(16)
//! );
//! assert_eq!(exp.get_value("depth").unwrap(), json!(50));
//! ```

mod error;

use std::ffi::OsString;
use std::sync::Arc;

use cfgmodel_core::{FieldType, Instance, LifecycleState, Schema};
use clap::{Arg, Command};
use serde_json::{Map, Value};

pub use error::{CliError, Result};

/// One derived flag for a leaf field.
struct LeafFlag {
    /// Dotted path from the root schema, also the clap arg id.
    path: String,
    /// Long flag name, dots and underscores dashed.
    long: String,
    ty: FieldType,
    default: Option<Value>,
}

/// Builds a `clap::Command` with one flag per leaf field of `schema`.
///
/// The command parses bare argument lists (no binary name). Nested
/// schemas contribute their fields under the parent field's dotted
/// prefix.
pub fn derive_command(schema: &Arc<Schema>) -> Command {
    let mut command = Command::new(schema.name().to_string()).no_binary_name(true);
    for flag in collect_leaves(schema) {
        let mut arg = Arg::new(flag.path.clone())
            .long(flag.long.clone())
            .value_name(flag.ty.to_string())
            .help(format!("Sets `{}`", flag.path));
        arg = match &flag.default {
            Some(value) => arg.default_value(render_token(&flag.ty, value)),
            None => arg.required(true),
        };
        command = command.arg(arg);
    }
    command
}

/// Parses an argument list against the derived command and constructs
/// an instance of `schema` from the result.
///
/// Each matched token is converted to the leaf field's declared type,
/// the dotted keys are reassembled into a nested mapping, and the
/// mapping is handed to instance construction for the usual type and
/// lifecycle validation.
///
/// # Errors
///
/// [`CliError::Clap`] for unknown or missing flags,
/// [`CliError::InvalidValue`] when a token does not parse as the
/// declared type, and [`CliError::Config`] when construction rejects
/// the reassembled mapping.
pub fn parse_from<I, T>(schema: &Arc<Schema>, args: I) -> Result<Instance>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let flags = collect_leaves(schema);
    let matches = derive_command(schema).try_get_matches_from(args)?;

    let mut root = Map::new();
    for flag in &flags {
        let Some(token) = matches.get_one::<String>(&flag.path) else {
            continue;
        };
        let value = convert_token(&flag.long, &flag.ty, token)?;
        insert_path(&mut root, &flag.path, value);
    }
    Ok(Instance::from_value(schema, Value::Object(root))?)
}

fn collect_leaves(schema: &Arc<Schema>) -> Vec<LeafFlag> {
    let mut flags = Vec::new();
    flatten(schema, "", &mut flags);
    flags
}

fn flatten(schema: &Arc<Schema>, prefix: &str, flags: &mut Vec<LeafFlag>) {
    for field in schema.fields() {
        let state = field.version.resolve(schema.version());
        if matches!(state, LifecycleState::NotYetAdded | LifecycleState::Deleted) {
            continue;
        }
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.ty {
            FieldType::Nested(inner) => flatten(inner, &path, flags),
            ty => flags.push(LeafFlag {
                long: path.replace(['.', '_'], "-"),
                path,
                ty: ty.clone(),
                default: field.default.clone(),
            }),
        }
    }
}

/// Renders a default value as the token the parser would accept back.
fn render_token(ty: &FieldType, value: &Value) -> String {
    match (ty, value) {
        (FieldType::Str, Value::String(s)) => s.clone(),
        _ => value.to_string(),
    }
}

fn convert_token(flag: &str, ty: &FieldType, token: &str) -> Result<Value> {
    let invalid = || CliError::InvalidValue {
        flag: flag.to_string(),
        expected: ty.to_string(),
        given: token.to_string(),
    };
    match ty {
        FieldType::Bool => token.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
        FieldType::Int => token.parse::<i64>().map(Value::from).map_err(|_| invalid()),
        FieldType::Float => token.parse::<f64>().map(Value::from).map_err(|_| invalid()),
        FieldType::Str => Ok(Value::String(token.to_string())),
        FieldType::Null => {
            if token == "null" {
                Ok(Value::Null)
            } else {
                Err(invalid())
            }
        }
        // Containers, unions, and open-typed fields take JSON syntax;
        // anything that fails to parse is kept as a bare string.
        _ => Ok(serde_json::from_str(token).unwrap_or_else(|_| Value::String(token.to_string()))),
    }
}

fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            // Leaf paths never collide with a nested prefix: a field is
            // either a nested schema or a leaf, not both.
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
