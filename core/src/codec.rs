//! Saving and loading instances through extension-dispatched codecs.
//!
//! `.json` files use pretty-printed JSON; `.yaml`/`.yml` files use
//! YAML prefixed with a one-line `# TypeName` header comment. Non-path
//! stream sinks and sources default to the YAML codec. Any other file
//! suffix fails with [`ConfigError::UnsupportedFormat`], and a decoded
//! document that is null or an empty mapping fails with
//! [`ConfigError::EmptyDocument`] instead of producing a degenerate
//! instance.
//!
//! Only the instance's public fields (active, deprecated, extensions)
//! are written; `NotYetAdded` and `Deleted` fields never appear.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::instance::Instance;
use crate::schema::Schema;

/// Writes an instance's canonical form to a file, choosing the codec
/// by file extension.
pub fn save(instance: &Instance, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &instance.to_value())?;
            writer.flush()?;
            Ok(())
        }
        Some("yaml") | Some("yml") => {
            let writer = BufWriter::new(File::create(path)?);
            save_to_writer(instance, writer)
        }
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Writes an instance to a stream as YAML with a `# TypeName` header.
pub fn save_to_writer(instance: &Instance, mut writer: impl Write) -> Result<()> {
    writeln!(writer, "# {}", instance.schema().name())?;
    serde_yaml::to_writer(&mut writer, &instance.to_value())?;
    writer.flush()?;
    Ok(())
}

/// Reads a file and constructs an instance of `schema` from it,
/// choosing the codec by file extension.
pub fn load(schema: &Arc<Schema>, path: impl AsRef<Path>) -> Result<Instance> {
    let path = path.as_ref();
    let decoded: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        Some("yaml") | Some("yml") => serde_yaml::from_reader(BufReader::new(File::open(path)?))?,
        _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    };
    finish_load(schema, decoded, &path.display().to_string())
}

/// Reads YAML from a stream and constructs an instance of `schema`.
pub fn load_from_reader(schema: &Arc<Schema>, reader: impl Read) -> Result<Instance> {
    let decoded: Value = serde_yaml::from_reader(reader)?;
    finish_load(schema, decoded, "<stream>")
}

fn finish_load(schema: &Arc<Schema>, decoded: Value, source: &str) -> Result<Instance> {
    if decoded.is_null() || decoded.as_object().is_some_and(|map| map.is_empty()) {
        return Err(ConfigError::EmptyDocument(source.to_string()));
    }
    Instance::from_value(schema, decoded)
}

impl Instance {
    /// Saves this instance to a file. See [`save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save(self, path)
    }

    /// Writes this instance to a stream as YAML. See [`save_to_writer`].
    pub fn save_to_writer(&self, writer: impl Write) -> Result<()> {
        save_to_writer(self, writer)
    }

    /// Loads an instance of `schema` from a file. See [`load`].
    pub fn load(schema: &Arc<Schema>, path: impl AsRef<Path>) -> Result<Instance> {
        load(schema, path)
    }

    /// Loads an instance of `schema` from a YAML stream. See
    /// [`load_from_reader`].
    pub fn load_from_reader(schema: &Arc<Schema>, reader: impl Read) -> Result<Instance> {
        load_from_reader(schema, reader)
    }
}
