//! Integration Tests for the Cache Layer
//!
//! Exercises the public API end to end: record storage, on-demand
//! expiration, compiled live/expired scans, purging, and miss-time
//! fallback resolution.

use std::thread::sleep;
use std::time::Duration;

use serde_json::{json, Value};

use match_cache::cache::{Fallback, FallbackOutcome, Field, Term};
use match_cache::{CacheConfig, CacheError, CacheStore};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("match_cache=debug")
        .with_test_writer()
        .try_init();
}

fn sorted_keys(rows: Vec<Vec<Value>>) -> Vec<String> {
    let mut keys: Vec<String> = rows
        .into_iter()
        .map(|row| row[0].as_str().unwrap().to_string())
        .collect();
    keys.sort();
    keys
}

// == Storage Round Trip ==

#[test]
fn test_put_get_delete_round_trip() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store
        .put("user:1".to_string(), json!({"name": "ada"}), None)
        .unwrap();

    assert_eq!(store.get("user:1").unwrap(), json!({"name": "ada"}));

    store.delete("user:1").unwrap();
    assert!(matches!(
        store.get("user:1"),
        Err(CacheError::NotFound(_))
    ));
}

// == Expiration ==

#[test]
fn test_entry_expires_after_ttl() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store.put("short".to_string(), json!(1), Some(10)).unwrap();
    assert!(store.get("short").is_ok());

    sleep(Duration::from_millis(30));

    assert!(matches!(store.get("short"), Err(CacheError::Expired(_))));
    // A second read reports plain not-found, the record is gone
    assert!(matches!(store.get("short"), Err(CacheError::NotFound(_))));
}

#[test]
fn test_default_ttl_from_config() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new().with_default_ttl(10));

    store.put("short".to_string(), json!(1), None).unwrap();
    store
        .put("long".to_string(), json!(2), Some(60_000))
        .unwrap();

    sleep(Duration::from_millis(30));

    assert!(matches!(store.get("short"), Err(CacheError::Expired(_))));
    assert!(store.get("long").is_ok());
}

#[test]
fn test_disable_ode_serves_stale_entries() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new().with_ode_disabled());

    store.put("stale".to_string(), json!(1), Some(10)).unwrap();
    sleep(Duration::from_millis(30));

    assert_eq!(store.get("stale").unwrap(), json!(1));
}

// == Compiled Scans ==

#[test]
fn test_live_and_expired_scans_partition_entries() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store.put("eternal".to_string(), json!(1), None).unwrap();
    store
        .put("fresh".to_string(), json!(2), Some(60_000))
        .unwrap();
    store.put("stale".to_string(), json!(3), Some(10)).unwrap();

    sleep(Duration::from_millis(30));

    assert_eq!(
        sorted_keys(store.live(Field::Key)),
        vec!["eternal", "fresh"]
    );
    assert_eq!(sorted_keys(store.expired(Field::Key)), vec!["stale"]);
}

#[test]
fn test_scan_projection_of_multiple_fields() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store
        .put("only".to_string(), json!("payload"), None)
        .unwrap();

    let rows = store.live(vec![
        Term::Field(Field::Key),
        Term::Field(Field::Ttl),
        Term::Field(Field::Value),
    ]);

    assert_eq!(
        rows,
        vec![vec![json!("only"), Value::Null, json!("payload")]]
    );
}

#[test]
fn test_purge_expired_removes_only_stale_entries() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store.put("keep".to_string(), json!(1), None).unwrap();
    store.put("drop1".to_string(), json!(2), Some(10)).unwrap();
    store.put("drop2".to_string(), json!(3), Some(10)).unwrap();

    sleep(Duration::from_millis(30));

    assert_eq!(store.purge_expired(), 2);
    assert_eq!(store.len(), 1);
    assert!(store.get("keep").is_ok());

    let stats = store.stats();
    assert_eq!(stats.purged, 2);
    assert_eq!(stats.total_entries, 1);
}

// == Fallback Resolution ==

#[test]
fn test_miss_resolved_through_configured_fallback() {
    init_tracing();
    let config = CacheConfig::new()
        .with_fallback(Fallback::keyed_with_args(
            |key, args| Ok(json!([key, args[0].clone(), args[1].clone()])),
            2,
        ))
        .with_fallback_args(vec![json!("region"), json!("eu")]);
    let mut store = CacheStore::new(config);

    let miss = store.get("absent");
    assert!(matches!(miss, Err(CacheError::NotFound(_))));

    let outcome = store.resolve_miss(None, "absent", json!("dflt")).unwrap();
    assert_eq!(
        outcome,
        FallbackOutcome::Loaded(json!(["absent", "region", "eu"]))
    );
}

#[test]
fn test_per_call_fallback_overrides_configured() {
    init_tracing();
    let config =
        CacheConfig::new().with_fallback(Fallback::nullary(|| Ok(json!("configured"))));
    let store = CacheStore::new(config);

    let per_call = Fallback::keyed(|key| Ok(json!(format!("override_{key}"))));
    let outcome = store
        .resolve_miss(Some(&per_call), "k", json!("dflt"))
        .unwrap();

    assert_eq!(outcome, FallbackOutcome::Loaded(json!("override_k")));
}

#[test]
fn test_fallback_arity_mismatch_keeps_default() {
    init_tracing();
    // Expects three extra arguments but only two are configured
    let config = CacheConfig::new()
        .with_fallback(Fallback::keyed_with_args(|_, _| Ok(json!("ran")), 3))
        .with_fallback_args(vec![json!(1), json!(2)]);
    let store = CacheStore::new(config);

    let outcome = store.resolve_miss(None, "k", json!("dflt")).unwrap();
    assert_eq!(outcome, FallbackOutcome::NotLoaded(json!("dflt")));
}

#[test]
fn test_no_fallback_yields_static_default() {
    init_tracing();
    let store = CacheStore::new(CacheConfig::new());

    let outcome = store.resolve_miss(None, "k", json!("dflt")).unwrap();
    assert_eq!(outcome, FallbackOutcome::Static(json!("dflt")));
}

#[test]
fn test_fallback_error_propagates_to_caller() {
    init_tracing();
    let config = CacheConfig::new().with_fallback(Fallback::keyed(|key| {
        Err(CacheError::Internal(format!("loader failed for {key}")))
    }));
    let store = CacheStore::new(config);

    let result = store.resolve_miss(None, "k", json!(0));
    assert!(matches!(result, Err(CacheError::Internal(_))));
}

// == Statistics ==

#[test]
fn test_stats_track_hits_and_misses() {
    init_tracing();
    let mut store = CacheStore::new(CacheConfig::new());

    store.put("key".to_string(), json!(1), None).unwrap();
    store.get("key").unwrap();
    store.get("key").unwrap();
    let _ = store.get("absent");

    let stats = store.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
}
