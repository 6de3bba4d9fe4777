//! Integration tests for `LayeredJsonStore` and `TypedPreference` over an
//! `InMemoryStore`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use prefstore_core::{InMemoryStore, PrefError, PreferenceStore};
use prefstore_json::{LayeredJsonStore, TypedPreference, DEFAULT_PREFS_KEY, USER_PREFS_KEY};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Builds a ready layered store over a fresh in-memory store seeded with the
/// given blobs (pass `None` to leave a blob absent).
async fn ready_store(
    user_blob: Option<&str>,
    default_blob: Option<&str>,
) -> (Arc<InMemoryStore>, Arc<LayeredJsonStore>) {
    let raw = Arc::new(InMemoryStore::new());
    if let Some(blob) = user_blob {
        raw.set_value(USER_PREFS_KEY, Some(blob)).await.unwrap();
    }
    if let Some(blob) = default_blob {
        raw.set_value(DEFAULT_PREFS_KEY, Some(blob)).await.unwrap();
    }
    let layered = Arc::new(LayeredJsonStore::new(raw.clone()));
    layered.ready().await.expect("layered store failed to load");
    (raw, layered)
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Reads and writes before `ready()` fail loudly instead of silently
/// returning defaults.
#[tokio::test]
async fn access_before_ready_errors() {
    let raw = Arc::new(InMemoryStore::new());
    let layered = LayeredJsonStore::new(raw);

    assert!(matches!(layered.get_value("x"), Err(PrefError::NotReady)));
    assert!(matches!(
        layered.set_value("x", json!(1)).await,
        Err(PrefError::NotReady)
    ));
}

/// A malformed persisted blob fails the load; the store must not become
/// ready over a silently-substituted empty map.
#[tokio::test]
async fn malformed_blob_fails_the_load() {
    let raw = Arc::new(InMemoryStore::new());
    raw.set_value(USER_PREFS_KEY, Some("{not json"))
        .await
        .unwrap();

    let layered = LayeredJsonStore::new(raw);
    let err = layered.ready().await.unwrap_err();
    assert!(matches!(err, PrefError::Decode { ref key, .. } if key == USER_PREFS_KEY));

    // Still not ready afterwards.
    assert!(matches!(layered.get_value("x"), Err(PrefError::NotReady)));
}

/// Missing blobs load as empty maps — absence is not an error.
#[tokio::test]
async fn missing_blobs_load_as_empty_maps() {
    let (_raw, layered) = ready_store(None, None).await;
    assert_eq!(layered.get_value("anything").unwrap(), None);
}

// ---------------------------------------------------------------------------
// Layered resolution
// ---------------------------------------------------------------------------

/// Override-then-default-then-caller-default resolution.
#[tokio::test]
async fn override_beats_default_beats_fallback() {
    let (_raw, layered) = ready_store(None, Some(r#"{"x":1}"#)).await;

    assert_eq!(layered.get_value("x").unwrap(), Some(json!(1)));

    layered.set_value("x", json!(2)).await.unwrap();
    assert_eq!(layered.get_value("x").unwrap(), Some(json!(2)));

    assert_eq!(layered.get_value_or("y", json!(99)).unwrap(), json!(99));
}

/// Removing an override falls back to the default layer.
#[tokio::test]
async fn removing_an_override_restores_the_default() {
    let (_raw, layered) = ready_store(Some(r#"{"x":2}"#), Some(r#"{"x":1}"#)).await;

    assert_eq!(layered.get_value("x").unwrap(), Some(json!(2)));

    layered.remove_value(&["x".to_string()]).await.unwrap();
    assert_eq!(layered.get_value("x").unwrap(), Some(json!(1)));
}

/// `clear` empties only the override layer.
#[tokio::test]
async fn clear_keeps_defaults() {
    let (raw, layered) = ready_store(Some(r#"{"x":2,"y":3}"#), Some(r#"{"x":1}"#)).await;

    layered.clear().await.unwrap();

    assert_eq!(layered.get_value("x").unwrap(), Some(json!(1)));
    assert_eq!(layered.get_value("y").unwrap(), None);
    assert_eq!(
        raw.get_value(USER_PREFS_KEY, "missing").await.unwrap(),
        "{}",
        "an empty blob must be persisted"
    );
}

// ---------------------------------------------------------------------------
// Persistence round-trip
// ---------------------------------------------------------------------------

/// Writes persist as one blob; a fresh layered store over the same backing
/// data reconstructs an identical override map.
#[tokio::test]
async fn round_trip_through_the_underlying_store() {
    let (raw, layered) = ready_store(None, None).await;

    layered.set_value("theme", json!("dark")).await.unwrap();
    layered.set_value("fontSize", json!(14)).await.unwrap();
    layered
        .set_value("panels", json!({"left": true, "right": false}))
        .await
        .unwrap();

    let reloaded = LayeredJsonStore::new(raw);
    reloaded.ready().await.unwrap();

    assert_eq!(reloaded.get_value("theme").unwrap(), Some(json!("dark")));
    assert_eq!(reloaded.get_value("fontSize").unwrap(), Some(json!(14)));
    assert_eq!(
        reloaded.get_value("panels").unwrap(),
        Some(json!({"left": true, "right": false}))
    );
}

/// `is_dirty` mirrors the underlying store and `flush` delegates to it.
#[tokio::test]
async fn dirty_and_flush_mirror_the_underlying_store() {
    let (_raw, layered) = ready_store(None, None).await;

    layered.set_value("x", json!(1)).await.unwrap();
    assert!(layered.is_dirty());

    layered.flush().await.unwrap();
    assert!(!layered.is_dirty());
}

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

/// The typed change event fires on acceptance, before the underlying write
/// is awaited, carrying the JSON-decoded value.
#[tokio::test]
async fn set_emits_a_typed_event() {
    let (_raw, layered) = ready_store(None, None).await;
    let mut rx = layered.subscribe();

    layered.set_value("volume", json!(0.5)).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.key, "volume");
    assert_eq!(event.new_value, Some(json!(0.5)));
}

/// Removal events carry no value.
#[tokio::test]
async fn remove_emits_an_event_without_a_value() {
    let (_raw, layered) = ready_store(Some(r#"{"x":1}"#), None).await;
    let mut rx = layered.subscribe();

    layered.remove_value(&["x".to_string()]).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.key, "x");
    assert_eq!(event.new_value, None);
}

// ---------------------------------------------------------------------------
// Typed preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EditorPrefs {
    theme: String,
    tab_width: u8,
}

/// A typed accessor round-trips its value through the layered store.
#[tokio::test]
async fn typed_preference_round_trips() {
    let (_raw, layered) = ready_store(None, None).await;
    let pref: TypedPreference<EditorPrefs> = TypedPreference::new(layered.clone(), "editor");

    assert_eq!(pref.get().unwrap(), None);

    let value = EditorPrefs {
        theme: "solarized".to_string(),
        tab_width: 4,
    };
    pref.set(&value).await.unwrap();

    assert_eq!(pref.get().unwrap(), Some(value));
}

/// A stored value whose shape does not match `T` surfaces as a decode error
/// at read time rather than being coerced.
#[tokio::test]
async fn typed_preference_surfaces_shape_mismatch() {
    let (_raw, layered) = ready_store(Some(r#"{"editor":"just a string"}"#), None).await;
    let pref: TypedPreference<EditorPrefs> = TypedPreference::new(layered.clone(), "editor");

    let err = pref.get().unwrap_err();
    assert!(matches!(err, PrefError::Decode { ref key, .. } if key == "editor"));
}

/// `get_or` falls back only when neither layer has the id.
#[tokio::test]
async fn typed_preference_get_or_falls_back() {
    let (_raw, layered) = ready_store(None, None).await;
    let pref: TypedPreference<EditorPrefs> = TypedPreference::new(layered, "editor");

    let fallback = EditorPrefs {
        theme: "plain".to_string(),
        tab_width: 8,
    };
    assert_eq!(pref.get_or(fallback.clone()).unwrap(), fallback);
}

/// Typed preferences can also resolve from the defaults layer.
#[tokio::test]
async fn typed_preference_reads_the_default_layer() {
    let (_raw, layered) = ready_store(
        None,
        Some(r#"{"editor":{"theme":"plain","tab_width":2}}"#),
    )
    .await;
    let pref: TypedPreference<EditorPrefs> = TypedPreference::new(layered, "editor");

    assert_eq!(
        pref.get().unwrap(),
        Some(EditorPrefs {
            theme: "plain".to_string(),
            tab_width: 2,
        })
    );
}
