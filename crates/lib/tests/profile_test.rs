//! # Profile Store Tests
//!
//! Lookups by id, phone and free text, geolocated store resolution, text store
//! matching, and loading from JSON files.

mod common;

use anyhow::Result;
use concierge::profile::{ProfileError, ProfileStore};
use concierge_test_utils::fixtures::{
    sample_profile_store, sample_stores, sample_users, write_profile_files,
};
use tempfile::TempDir;

#[test]
fn get_user_is_an_exact_key_lookup() {
    let profiles = sample_profile_store();
    assert_eq!(profiles.get_user("USR-001").unwrap().name, "Priya Sharma");
    assert!(profiles.get_user("usr-001").is_none());
    assert!(profiles.get_user("USR-404").is_none());
}

#[test]
fn find_user_id_walks_the_resolution_ladder() {
    let profiles = sample_profile_store();

    // (a) exact id
    assert_eq!(profiles.find_user_id("USR-002").as_deref(), Some("USR-002"));
    // (b) exact phone number
    assert_eq!(
        profiles.find_user_id("+91-98765-43210").as_deref(),
        Some("USR-001")
    );
    // (c) id token in free text, normalized to upper case
    assert_eq!(
        profiles
            .find_user_id("hi, my customer id is usr-002 thanks")
            .as_deref(),
        Some("USR-002")
    );
    // (d) phone token in free text
    assert_eq!(
        profiles
            .find_user_id("please call me back on +91-91234-56789")
            .as_deref(),
        Some("USR-002")
    );
}

#[test]
fn find_user_id_returns_none_for_unknown_identifiers() {
    let profiles = sample_profile_store();
    assert_eq!(profiles.find_user_id("USR-999"), None);
    assert_eq!(profiles.find_user_id("+91-00000-00000"), None);
    assert_eq!(profiles.find_user_id("just a question"), None);
    assert_eq!(profiles.find_user_id(""), None);
}

#[test]
fn nearest_store_uses_degree_space_distance() {
    let profiles = sample_profile_store();

    let (store, distance) = profiles.nearest_store(19.0760, 72.8777).unwrap();
    assert_eq!(store.store_id, "store_1");
    assert_eq!(distance, 0.0);

    let (store, distance) = profiles.nearest_store(18.5304, 73.8567).unwrap();
    assert_eq!(store.store_id, "store_2");
    assert!((distance - 0.01).abs() < 1e-9);
}

#[test]
fn nearest_store_ties_keep_load_order() {
    let mut stores = sample_stores();
    let mut twin = stores[0].clone();
    twin.store_id = "store_twin".to_string();
    stores.push(twin);
    let profiles = ProfileStore::new(sample_users(), stores);

    let (store, _) = profiles.nearest_store(19.0760, 72.8777).unwrap();
    assert_eq!(store.store_id, "store_1");
}

#[test]
fn nearest_store_is_none_without_stores() {
    let profiles = ProfileStore::new(sample_users(), Vec::new());
    assert!(profiles.nearest_store(19.0, 72.0).is_none());
}

#[test]
fn stores_are_found_by_address_segment_name_or_address() {
    let profiles = sample_profile_store();

    let by_city: Vec<_> = profiles
        .find_stores_by_text("Is there an outlet in PUNE?")
        .iter()
        .map(|s| s.store_id.as_str())
        .collect();
    assert_eq!(by_city, vec!["store_2"]);

    let by_name: Vec<_> = profiles
        .find_stores_by_text("what time does chai point - linking road close")
        .iter()
        .map(|s| s.store_id.as_str())
        .collect();
    assert_eq!(by_name, vec!["store_1"]);

    let both: Vec<_> = profiles
        .find_stores_by_text("mumbai or pune, whichever is open")
        .iter()
        .map(|s| s.store_id.as_str())
        .collect();
    assert_eq!(both, vec!["store_1", "store_2"]);
}

#[test]
fn short_segments_and_empty_queries_do_not_match() {
    let profiles = sample_profile_store();
    // "12" and "7" are address segments but too short to count.
    assert!(profiles.find_stores_by_text("table 12 or 7").is_empty());
    assert!(profiles.find_stores_by_text("").is_empty());
}

#[test]
fn load_reads_both_files_and_preserves_stock_order() -> Result<()> {
    let dir = TempDir::new()?;
    let (users_path, stores_path) = write_profile_files(dir.path())?;

    let profiles = ProfileStore::load(&users_path, &stores_path)?;
    assert_eq!(profiles.users().len(), 2);
    assert_eq!(profiles.stores().len(), 2);

    let store = &profiles.stores()[0];
    let items: Vec<_> = store.stock.iter().map(|(item, _)| item.as_str()).collect();
    assert_eq!(items, vec!["Masala Chai", "Vada Pav", "Samosa"]);
    assert_eq!(store.out_of_stock(), vec!["Vada Pav"]);
    Ok(())
}

#[test]
fn load_reports_missing_and_malformed_files() -> Result<()> {
    let dir = TempDir::new()?;
    let (users_path, _) = write_profile_files(dir.path())?;

    let missing = ProfileStore::load(&users_path, dir.path().join("nope.json"));
    assert!(matches!(missing, Err(ProfileError::Io { .. })));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json")?;
    let malformed = ProfileStore::load(&users_path, &broken);
    assert!(matches!(malformed, Err(ProfileError::Parse { .. })));
    Ok(())
}
