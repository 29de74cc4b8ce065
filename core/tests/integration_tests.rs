use std::sync::Arc;

use cfgmodel_core::{
    ConfigError, DiagnosticKind, FieldDescriptor, FieldType, Instance, LifecycleState, Schema,
    UpdateOptions,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

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

// ---------------------------------------------------------------------------
// Lifecycle windows
// ---------------------------------------------------------------------------

#[test]
fn test_active_fields_read_without_warnings() {
    let schema = train_schema();
    let train = Instance::new(&schema).unwrap();

    assert_eq!(train.get_value("batch_size").unwrap(), json!(32));
    assert_eq!(train.get_value("weight_decay").unwrap(), json!(1e-5));
    assert!(train.drain_diagnostics().is_empty());
}

#[test]
fn test_deprecated_field_warns_once_per_read_and_returns_value() {
    // bound 0.1: `lr` is inside its deprecation window.
    let schema = train_schema();
    let train = Instance::new(&schema).unwrap();
    assert_eq!(train.lifecycle("lr"), Some(LifecycleState::Deprecated));

    assert_eq!(train.get_value("lr").unwrap(), json!(1e-3));
    assert_eq!(train.get_value("lr").unwrap(), json!(1e-3));

    let diagnostics = train.drain_diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(
        diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::DeprecatedAccess && d.field == "lr")
    );
}

#[test]
fn test_deleted_field_fails_everywhere() {
    // bound 0.3: `lr` is deleted.
    let schema = train_schema();
    let train = Instance::from_value_at(&schema, "0.3".parse().unwrap(), json!({})).unwrap();

    assert!(matches!(
        train.get("lr").unwrap_err(),
        ConfigError::Deleted { field, .. } if field == "lr"
    ));

    // Excluded from the canonical form, hence from save and diff.
    assert!(!train.to_value().as_object().unwrap().contains_key("lr"));

    let same = Instance::from_value_at(&schema, "0.3".parse().unwrap(), json!({})).unwrap();
    assert!(train.diff(&same).unwrap().is_empty());
}

#[test]
fn test_hidden_field_values_are_ignored_untyped() {
    let schema = train_schema();

    // bound 0.3: `lr` is deleted, so the provided value is never
    // type-checked and stays out of the canonical form.
    let train = Instance::from_value_at(
        &schema,
        "0.3".parse().unwrap(),
        json!({"lr": "not a float"}),
    )
    .unwrap();
    assert!(!train.to_value().as_object().unwrap().contains_key("lr"));
    assert_eq!(train.lifecycle("lr"), Some(LifecycleState::Deleted));

    // bound 0.0: `weight_decay` is not yet added.
    let train = Instance::from_value_at(
        &schema,
        "0.0".parse().unwrap(),
        json!({"weight_decay": {"bogus": true}}),
    )
    .unwrap();
    assert!(
        !train
            .to_value()
            .as_object()
            .unwrap()
            .contains_key("weight_decay")
    );
    assert_eq!(
        train.lifecycle("weight_decay"),
        Some(LifecycleState::NotYetAdded)
    );
}

// ---------------------------------------------------------------------------
// Update and merge
// ---------------------------------------------------------------------------

#[test]
fn test_nested_update_matches_fresh_construction() {
    let schema = exp_schema();
    let mut exp = Instance::new(&schema).unwrap();
    exp.update(
        &json!({"train": {"learning_rate": 1.0}}),
        &UpdateOptions::new(),
    )
    .unwrap();

    let fresh =
        Instance::from_value(&schema, json!({"train": {"learning_rate": 1.0}})).unwrap();
    assert_eq!(exp, fresh);
}

#[test]
fn test_unknown_key_policy() {
    let schema = exp_schema();
    let mut exp = Instance::new(&schema).unwrap();

    assert!(matches!(
        exp.update(&json!({"new_key": 5}), &UpdateOptions::new())
            .unwrap_err(),
        ConfigError::UnknownKey { key, .. } if key == "new_key"
    ));

    exp.update(&json!({"new_key": 5}), &UpdateOptions::new().allow_new_key(true))
        .unwrap();
    assert_eq!(exp.get_value("new_key").unwrap(), json!(5));
}

#[test]
fn test_merge_is_copy_on_write() {
    let schema = exp_schema();
    let base = Instance::new(&schema).unwrap();

    let merged = base
        .merge(
            &json!({"num_class": 10, "train": {"batch_size": 8}}),
            &UpdateOptions::new(),
        )
        .unwrap();

    assert_eq!(merged.get_value("num_class").unwrap(), json!(10));
    assert_eq!(base.get_value("num_class").unwrap(), json!(1000));
    assert_eq!(
        base.nested("train").unwrap().get_value("batch_size").unwrap(),
        json!(32)
    );
}

#[test]
fn test_update_from_saved_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exp.yaml");
    let schema = exp_schema();

    let donor = Instance::from_value(
        &schema,
        json!({"num_class": 100, "train": {"learning_rate": 10.0}}),
    )
    .unwrap();
    donor.save(&path).unwrap();

    let mut exp = Instance::new(&schema).unwrap();
    exp.update_from_path(&path, &UpdateOptions::new()).unwrap();
    assert_eq!(exp, donor);
}

// ---------------------------------------------------------------------------
// Freeze control
// ---------------------------------------------------------------------------

#[test]
fn test_freeze_gates_set_and_update() {
    let schema = exp_schema();
    let mut exp = Instance::new(&schema).unwrap();

    exp.freeze();
    assert!(matches!(
        exp.set("num_class", 100).unwrap_err(),
        ConfigError::Frozen(_)
    ));
    assert!(matches!(
        exp.update(&json!({}), &UpdateOptions::new()).unwrap_err(),
        ConfigError::Frozen(_)
    ));

    exp.unfreeze();
    exp.set("num_class", 100).unwrap();
    assert_eq!(exp.get_value("num_class").unwrap(), json!(100));
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn test_round_trip_json_and_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let schema = exp_schema();
    let exp = Instance::from_value(
        &schema,
        json!({"num_class": 10, "train": {"learning_rate": 1.0, "batch_size": 16}}),
    )
    .unwrap();

    for name in ["exp.json", "exp.yaml", "exp.yml"] {
        let path = dir.path().join(name);
        exp.save(&path).unwrap();
        let loaded = Instance::load(&schema, &path).unwrap();
        assert_eq!(exp, loaded, "round trip failed for {name}");
    }
}

#[test]
fn test_stream_round_trip() {
    let schema = exp_schema();
    let exp = Instance::from_value(&schema, json!({"depth": 18})).unwrap();

    let mut buffer = Vec::new();
    exp.save_to_writer(&mut buffer).unwrap();
    let loaded = Instance::load_from_reader(&schema, buffer.as_slice()).unwrap();
    assert_eq!(exp, loaded);
}
