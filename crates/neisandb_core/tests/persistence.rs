//! Durability: rotation, flushing, the debounce timer, and reopening
//! collections from their page files.

use neisandb_core::{
    Collection, CollectionConfig, CoreError, CoreResult, Database, DatabaseConfig, Document,
    FieldSpec, FindOptions, Model, Schema, Selector,
};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

#[derive(Debug, Clone, PartialEq)]
struct Note {
    id: u32,
    title: String,
    pinned: bool,
}

impl Model for Note {
    fn id(&self) -> u32 {
        self.id
    }

    fn from_document(id: u32, doc: &Document) -> CoreResult<Self> {
        let title = doc
            .get("title")
            .and_then(|v| v.as_text())
            .ok_or_else(|| CoreError::model_decode("missing title"))?
            .to_string();
        let pinned = doc.get("pinned").and_then(|v| v.as_bool()).unwrap_or(false);
        Ok(Note { id, title, pinned })
    }

    fn to_document(&self) -> Document {
        Document::new()
            .with("title", self.title.clone())
            .with("pinned", self.pinned)
    }
}

fn note_schema() -> Schema {
    Schema::new()
        .field("title", FieldSpec::text().required())
        .field("pinned", FieldSpec::boolean().default_value(false))
}

fn note_doc(title: &str) -> Document {
    Document::new().with("title", title)
}

/// Small pages and trees so rotation happens quickly in tests, the way
/// production-scale defaults would over thousands of records.
fn small_config() -> CollectionConfig {
    CollectionConfig::new("notes")
        .tree_capacity(5)
        .page_size(8 * 1024)
}

async fn open_db(dir: &TempDir) -> Database {
    Database::open(DatabaseConfig::new().directory(dir.path().join("db")))
        .await
        .unwrap()
}

async fn open_notes(db: &Database, config: CollectionConfig) -> Collection<Note> {
    db.collection::<Note>(config, note_schema()).await.unwrap()
}

#[tokio::test]
async fn rotation_writes_full_pages() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(&db, small_config()).await;

    // One over capacity: the sixth insert lands in a fresh tree after
    // the full page is flushed to slot 0.
    for i in 0..6 {
        notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
    }

    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.pages, 1);
    assert_eq!(stats.current_entries, 1);
    assert_eq!(stats.file_size, 8 * 1024);
    assert_eq!(stats.last_flushed_lsn, Some(4));

    // Every record stays findable across the page boundary.
    for i in 0..6 {
        let found = notes.find_one(Selector::id(i)).await.unwrap().unwrap();
        assert_eq!(found.title, format!("n{i}"));
    }
}

#[tokio::test]
async fn flush_advances_the_watermark_to_max_lsn() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(&db, small_config()).await;

    for i in 0..3 {
        notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
    }
    let before = notes.stats().await.unwrap();
    assert_eq!(before.last_flushed_lsn, None);

    notes.flush().await.unwrap();

    let after = notes.stats().await.unwrap();
    assert_eq!(after.max_lsn, Some(2));
    assert_eq!(after.last_flushed_lsn, after.max_lsn);
    assert_eq!(after.pages, 1);
}

#[tokio::test]
async fn flush_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(&db, small_config()).await;

    notes.insert(note_doc("only")).await.unwrap().unwrap_written();
    notes.flush().await.unwrap();
    notes.flush().await.unwrap();

    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.pages, 1);
    assert_eq!(stats.live, 1);
}

#[tokio::test]
async fn reopen_restores_queries() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;

    let before = {
        let notes = open_notes(&db, small_config()).await;
        for i in 0..7 {
            notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        }
        notes
            .find_one_and_update(Selector::id(2), |note| {
                note.pinned = true;
                Ok(())
            })
            .await
            .unwrap()
            .unwrap_written();
        notes.find_one_and_delete(Selector::id(4)).await.unwrap();

        let all = notes.find(None, FindOptions::new()).await.unwrap().unwrap();
        notes.close().await.unwrap();
        all
    };

    let notes = open_notes(&db, small_config()).await;

    assert_eq!(notes.count(None).await.unwrap(), before.len());
    let all = notes.find(None, FindOptions::new()).await.unwrap().unwrap();
    assert_eq!(all, before);

    assert!(notes.find_one(Selector::id(4)).await.unwrap().is_none());
    let pinned = notes.find_one(Selector::id(2)).await.unwrap().unwrap();
    assert!(pinned.pinned);
}

#[tokio::test]
async fn reopen_continues_id_and_lsn_sequences() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;

    {
        let notes = open_notes(&db, small_config()).await;
        for i in 0..3 {
            notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        }
        notes.close().await.unwrap();
    }

    let notes = open_notes(&db, small_config()).await;
    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.max_id, Some(2));
    assert_eq!(stats.max_lsn, Some(2));
    assert_eq!(stats.last_flushed_lsn, Some(2));

    let next = notes.insert(note_doc("later")).await.unwrap().unwrap_written();
    assert_eq!(next.id, 3);
}

#[tokio::test]
async fn reopen_with_full_last_page_starts_fresh_tree() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;

    {
        let notes = open_notes(&db, small_config()).await;
        // Exactly one full page; rotation already flushed it.
        for i in 0..5 {
            notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        }
        notes.close().await.unwrap();
    }

    let notes = open_notes(&db, small_config()).await;
    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.current_entries, 0);
    assert_eq!(stats.live, 5);

    // The next insert belongs to page 1, not page 0.
    notes.insert(note_doc("n5")).await.unwrap().unwrap_written();
    notes.flush().await.unwrap();
    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.pages, 2);
    assert_eq!(notes.count(None).await.unwrap(), 6);
}

#[tokio::test]
async fn many_pages_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;

    {
        let notes = open_notes(&db, small_config()).await;
        for i in 0..23 {
            notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        }
        notes.close().await.unwrap();
    }

    let notes = open_notes(&db, small_config()).await;
    assert_eq!(notes.count(None).await.unwrap(), 23);

    // Spot-check records on the oldest page, a middle page, and the
    // recovered tail.
    for id in [0, 11, 22] {
        let found = notes.find_one(Selector::id(id)).await.unwrap().unwrap();
        assert_eq!(found.title, format!("n{id}"));
    }
    assert!(notes.find_one(Selector::id(23)).await.unwrap().is_none());
}

#[tokio::test]
async fn full_capacity_collection_round_trip() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let config = CollectionConfig::new("notes");

    {
        let notes = open_notes(&db, config.clone()).await;
        for i in 0..1500 {
            notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        }
        notes.close().await.unwrap();
    }

    let notes = open_notes(&db, config).await;
    assert_eq!(notes.count(None).await.unwrap(), 1500);
    assert!(notes.find_one(Selector::id(0)).await.unwrap().is_some());
    assert!(notes.find_one(Selector::id(1499)).await.unwrap().is_some());
}

#[tokio::test]
async fn debounced_flush_fires_after_quiet_period() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(
        &db,
        small_config().flush_debounce(Duration::from_millis(100)),
    )
    .await;

    notes.insert(note_doc("pending")).await.unwrap().unwrap_written();
    assert_eq!(notes.stats().await.unwrap().last_flushed_lsn, None);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.last_flushed_lsn, stats.max_lsn);
    assert_eq!(stats.pages, 1);
}

#[tokio::test]
async fn mutations_push_the_debounce_out() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(
        &db,
        small_config().flush_debounce(Duration::from_millis(500)),
    )
    .await;

    // Keep mutating faster than the debounce; nothing may flush.
    for i in 0..3 {
        notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(notes.stats().await.unwrap().last_flushed_lsn, None);

    // Going quiet lets the last armed timer fire.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.last_flushed_lsn, stats.max_lsn);
}

#[tokio::test]
async fn id_start_one_shifts_ids_and_page_math() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir).await;
    let notes = open_notes(
        &db,
        small_config().id_start(neisandb_core::IdStart::One),
    )
    .await;

    let first = notes.insert(note_doc("first")).await.unwrap().unwrap_written();
    assert_eq!(first.id, 1);

    // Fill the first page (LSNs 1..=5) and force rotation into slot 0.
    for i in 1..5 {
        notes.insert(note_doc(&format!("n{i}"))).await.unwrap().unwrap_written();
    }
    let stats = notes.stats().await.unwrap();
    assert_eq!(stats.pages, 1);
    assert_eq!(stats.file_size, 8 * 1024);

    for id in 1..=5 {
        assert!(notes.find_one(Selector::id(id)).await.unwrap().is_some());
    }
}
