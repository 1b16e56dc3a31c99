use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prosody_core::model::PersistedDocument;
use prosody_core::time::fixed_clock;
use serde_json::{json, Map, Value};
use services::{AutoSaveController, PersistedStore};
use storage::repository::{DocumentRepository, InMemoryRepository, StorageError};

/// Wraps the in-memory repository and records every write.
#[derive(Clone, Default)]
struct CountingRepo {
    inner: InMemoryRepository,
    writes: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<String>>>,
    write_delay: Duration,
}

impl CountingRepo {
    fn slow(write_delay: Duration) -> Self {
        Self {
            write_delay,
            ..Self::default()
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn last_document(&self) -> PersistedDocument {
        let raw = self.last.lock().unwrap().clone().unwrap();
        PersistedDocument::from_json_str(&raw).unwrap()
    }
}

#[async_trait]
impl DocumentRepository for CountingRepo {
    async fn get_blob(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_blob(key).await
    }

    async fn put_blob(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(value.to_owned());
        self.inner.put_blob(key, value).await
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete_blob(key).await
    }
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn controller(repo: &CountingRepo) -> AutoSaveController {
    let store = PersistedStore::with_default_key(Arc::new(repo.clone()));
    AutoSaveController::load(store, fixed_clock(), Duration::from_millis(500)).await
}

#[tokio::test(start_paused = true)]
async fn burst_of_saves_writes_once_with_last_state() {
    let repo = CountingRepo::default();
    let controller = controller(&repo).await;
    let saver = controller.section("sentenceStructure");

    for template in 0..10 {
        saver.save(fields(json!({ "activeTemplate": format!("template-{template}") })));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(repo.writes(), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(repo.writes(), 1);

    let stored = repo.last_document();
    assert_eq!(
        stored.get("sentenceStructure").unwrap().to_value()["activeTemplate"],
        json!("template-9")
    );
    assert!(stored.app_settings().unwrap().last_updated.is_some());
}

#[tokio::test(start_paused = true)]
async fn sections_debounce_independently() {
    let repo = CountingRepo::default();
    let controller = controller(&repo).await;

    controller
        .section("fillerPrompts")
        .save(fields(json!({ "selected": ["um"] })));
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller
        .section("attentionChecks")
        .save(fields(json!({ "enabled": true })));
    assert_eq!(
        controller.pending_sections(),
        vec!["attentionChecks".to_owned(), "fillerPrompts".to_owned()]
    );

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(repo.writes(), 1);
    assert_eq!(controller.pending_sections(), vec!["attentionChecks".to_owned()]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(repo.writes(), 2);
    let stored = repo.last_document();
    assert!(stored.get("fillerPrompts").is_some());
    assert!(stored.get("attentionChecks").is_some());
}

#[tokio::test(start_paused = true)]
async fn reload_sees_saved_sections() {
    let repo = CountingRepo::default();
    let controller = controller(&repo).await;
    controller
        .section("prosodyAnnotation")
        .save(fields(json!({ "marks": [{ "word": 2, "kind": "pause" }] })));
    controller.flush().await;

    let reloaded = PersistedStore::with_default_key(Arc::new(repo.clone()))
        .load()
        .await;
    assert_eq!(reloaded, controller.document());
}

#[tokio::test]
async fn corrupt_entry_loads_as_empty() {
    let repo = CountingRepo::default();
    repo.inner
        .put_blob(prosody_core::model::DEFAULT_STORAGE_KEY, "{\"appSettings\": ")
        .await
        .unwrap();

    let controller = controller(&repo).await;
    assert!(controller.document().is_empty());
}

#[tokio::test(start_paused = true)]
async fn replaced_document_survives_in_flight_autosave() {
    let repo = CountingRepo::slow(Duration::from_secs(1));
    let controller = controller(&repo).await;
    controller
        .section("appSettings")
        .save(fields(json!({ "activePhase": "checks" })));

    // The timer fires at 500ms and its write is still running at 600ms.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(controller.pending_sections().is_empty());

    let imported = PersistedDocument::from_json_str(
        r#"{"appSettings":{"activePhase":"numeric","lastUpdated":"2024-01-01T00:00:00.000Z"}}"#,
    )
    .unwrap();
    controller.replace_document(imported.clone()).await;
    assert_eq!(repo.last_document(), imported);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(repo.last_document(), imported);
    assert_eq!(controller.document(), imported);
}
