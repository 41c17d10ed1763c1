// ABOUTME: Tests for validated domain newtypes: slot names, store paths, IDs.
// ABOUTME: Includes property tests for the validation rules.

use proptest::prelude::*;

use relevo::types::{ArtifactId, BackupId, DeploymentId, SlotName, StorePath};

// =============================================================================
// SlotName
// =============================================================================

#[test]
fn valid_slot_names() {
    for name in ["web", "sentiment-model", "a", "model-2", "x9"] {
        assert!(SlotName::new(name).is_ok(), "{name}");
    }
}

#[test]
fn invalid_slot_names() {
    for name in ["", "Web", "-web", "web-", "my_model", "my.model", "a b"] {
        assert!(SlotName::new(name).is_err(), "{name}");
    }
}

#[test]
fn slot_name_length_limit() {
    let long = "a".repeat(63);
    assert!(SlotName::new(&long).is_ok());
    let too_long = "a".repeat(64);
    assert!(SlotName::new(&too_long).is_err());
}

proptest! {
    /// Every accepted slot name is safe as a store path segment: the path
    /// layout derives staging/backup/production roots from it.
    #[test]
    fn accepted_slot_names_embed_into_store_paths(name in "[a-z0-9][a-z0-9-]{0,61}[a-z0-9]") {
        if let Ok(slot) = SlotName::new(&name) {
            let staging = format!("staging/{}", slot);
            let production = format!("production/{}/slot.json", slot);
            prop_assert!(StorePath::parse(&staging).is_ok());
            prop_assert!(StorePath::parse(&production).is_ok());
        }
    }

    /// Validation never panics, whatever the input.
    #[test]
    fn slot_name_validation_is_total(name in "\\PC*") {
        let _ = SlotName::new(&name);
    }
}

// =============================================================================
// StorePath
// =============================================================================

#[test]
fn store_path_accepts_nested_relative_paths() {
    for path in [
        "incoming/model.bin",
        "staging/web/d1.artifact",
        "backups/web/index.json",
        "a/b/c/d.txt",
    ] {
        assert!(StorePath::parse(path).is_ok(), "{path}");
    }
}

#[test]
fn store_path_rejects_escapes() {
    for path in ["", "/etc/passwd", "../secrets", "a/../b", "a/./b", "a//b"] {
        assert!(StorePath::parse(path).is_err(), "{path}");
    }
}

#[test]
fn store_path_join_validates_the_result() {
    let root = StorePath::parse("staging/web").unwrap();
    assert_eq!(root.join("d1.artifact").unwrap().as_str(), "staging/web/d1.artifact");
    assert!(root.join("../escape").is_err());
}

proptest! {
    /// A parsed path round-trips through its string form.
    #[test]
    fn store_path_roundtrips(path in "[a-z0-9_.-]{1,12}(/[a-z0-9_.-]{1,12}){0,3}") {
        if let Ok(parsed) = StorePath::parse(&path) {
            prop_assert_eq!(StorePath::parse(parsed.as_str()).unwrap(), parsed);
        }
    }
}

// =============================================================================
// Phantom-typed IDs
// =============================================================================

#[test]
fn ids_compare_within_their_own_type() {
    assert_eq!(DeploymentId::new("d1"), DeploymentId::new("d1"));
    assert_ne!(DeploymentId::new("d1"), DeploymentId::new("d2"));
    assert_eq!(BackupId::new("b1").as_str(), "b1");
    assert_eq!(ArtifactId::new("m1").to_string(), "m1");
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = DeploymentId::new("web-20260807t120000-0001");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"web-20260807t120000-0001\"");

    let back: DeploymentId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
