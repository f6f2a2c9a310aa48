mod support;

use matinee::progress::{JsonProgressStore, ProgressMap, ProgressRecord, ProgressStore};
use support::tracing_init;
use tempfile::TempDir;

fn sample_map() -> ProgressMap {
    let mut map = ProgressMap::new();
    map.insert("halfway".to_string(), ProgressRecord::at_position(63.5, false));
    map.insert("finished".to_string(), ProgressRecord::completed());
    map.insert("broken".to_string(), ProgressRecord::faulted());
    map
}

#[tokio::test]
async fn test_round_trip_preserves_records() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let store = JsonProgressStore::new(dir.path().join("progress_v1.json"));

    let map = sample_map();
    store.save(&map).await.unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded, map);
}

#[tokio::test]
async fn test_missing_file_loads_empty() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let store = JsonProgressStore::new(dir.path().join("nowhere").join("progress_v1.json"));

    let loaded = store.load().await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_undecodable_file_loads_empty() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress_v1.json");
    tokio::fs::write(&path, b"{ this is not json").await.unwrap();

    let store = JsonProgressStore::new(path);
    let loaded = store.load().await.unwrap();
    assert!(loaded.is_empty(), "a corrupt file must not block playback");
}

#[tokio::test]
async fn test_save_creates_missing_parent_directories() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("progress_v1.json");

    let store = JsonProgressStore::new(path.clone());
    store.save(&sample_map()).await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_save_replaces_previous_content() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let store = JsonProgressStore::new(dir.path().join("progress_v1.json"));

    store.save(&sample_map()).await.unwrap();

    let mut second = ProgressMap::new();
    second.insert("only".to_string(), ProgressRecord::completed());
    store.save(&second).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key("only"));

    // The temp file from the write-then-rename dance does not linger.
    assert!(!dir.path().join("progress_v1.json.tmp").exists());
}

#[tokio::test]
async fn test_wire_format_keeps_the_historical_field_names() {
    tracing_init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress_v1.json");
    let store = JsonProgressStore::new(path.clone());

    let mut map = ProgressMap::new();
    map.insert("movie".to_string(), ProgressRecord::at_position(12.0, true));
    store.save(&map).await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["movie"]["progress"], 12.0);
    assert_eq!(value["movie"]["seen"], true);
    assert!(value["movie"].get("updatedAt").is_some());
    assert!(
        value["movie"].get("error").is_none(),
        "clean records carry no error mark"
    );
}
