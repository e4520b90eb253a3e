mod common;

use common::{default_rules, fill_publishable, instructor, RecordingStore};
use lessonforge_core::db::open_db_in_memory;
use lessonforge_core::{
    EngineError, SaveOutcome, SqliteTemplateStore, StoreError, TemplateEditor, TemplateStatus,
    TemplateStore,
};

#[test]
fn save_writes_header_then_parts_then_activities() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    assert_eq!(store.call_count(), 0, "editing never touches the store");

    editor.save().unwrap();
    assert_eq!(
        store.calls(),
        vec!["write_template", "replace_parts", "replace_activities"]
    );
}

#[test]
fn failed_header_write_short_circuits_the_persist() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    store.fail_on("write_template");

    let err = editor.save().unwrap_err();
    assert_eq!(store.calls(), vec!["write_template"]);
    assert_eq!(err.kind(), "store_failure");
    assert_eq!(err.to_string(), "invalid template data: injected failure in write_template");
    assert!(!editor.is_persisted());
    assert!(sqlite.read_template(editor.id()).unwrap().is_none());
    assert!(sqlite.read_parts(editor.id()).unwrap().is_empty());
}

#[test]
fn failed_parts_write_keeps_session_dirty_and_skips_activities() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    editor.save().unwrap();

    editor.set_title("Photosynthesis II").unwrap();
    store.reset();
    store.fail_on("replace_parts");
    let err = editor.save().unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::InvalidData(_))));
    assert_eq!(store.calls(), vec!["write_template", "replace_parts"]);
    assert!(editor.is_dirty(), "baseline only moves after the last write");

    // The header did land, so the session tracks the new stored revision.
    let stored = sqlite.read_template(editor.id()).unwrap().unwrap();
    assert_eq!(stored.revision, editor.template().revision);

    store.clear_failure();
    store.reset();
    editor.save().unwrap();
    assert_eq!(
        store.calls(),
        vec!["write_template", "replace_parts", "replace_activities"]
    );
    assert!(!editor.is_dirty());
}

#[test]
fn publish_and_archive_write_the_header_only() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    editor.save().unwrap();

    store.reset();
    editor.publish().unwrap();
    assert_eq!(store.calls(), vec!["write_template"]);

    store.reset();
    editor.unpublish().unwrap();
    assert_eq!(
        store.calls(),
        vec!["write_template", "replace_parts", "replace_activities"]
    );

    store.reset();
    editor.archive().unwrap();
    assert_eq!(store.calls(), vec!["write_template"]);
    assert_eq!(editor.status(), TemplateStatus::Archived);
}

#[test]
fn guard_failures_issue_no_store_calls() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    assert!(editor.save().is_err());
    assert!(editor.publish().is_err());
    assert!(editor.archive().is_err());
    assert_eq!(store.call_count(), 0);
}

#[test]
fn failed_publish_header_write_keeps_draft_status() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    editor.save().unwrap();
    let revision = editor.template().revision;

    store.fail_on("write_template");
    assert!(editor.publish().is_err());
    assert_eq!(editor.status(), TemplateStatus::Draft);
    assert_eq!(editor.template().revision, revision);
    assert_eq!(
        sqlite.read_template(editor.id()).unwrap().unwrap().status,
        TemplateStatus::Draft
    );
}

#[test]
fn failed_first_save_leaves_draft_unpersisted_until_retry() {
    let conn = open_db_in_memory().unwrap();
    let sqlite = SqliteTemplateStore::try_new(&conn).unwrap();
    let store = RecordingStore::new(&sqlite);
    let identity = instructor();

    let mut editor = TemplateEditor::new_draft(&store, &identity, default_rules()).unwrap();
    fill_publishable(&mut editor);
    store.fail_on("replace_parts");
    assert!(editor.save().is_err());

    // The header row landed but the parts did not.
    assert!(sqlite.read_template(editor.id()).unwrap().is_some());
    assert!(sqlite.read_parts(editor.id()).unwrap().is_empty());
    assert!(!editor.is_persisted());
    assert!(editor.can_save());

    store.clear_failure();
    store.reset();
    assert!(matches!(
        editor.publish(),
        Err(EngineError::UnsavedChanges(id)) if id == editor.id()
    ));
    assert_eq!(store.call_count(), 0);

    assert_eq!(editor.save().unwrap(), SaveOutcome::Saved);
    assert_eq!(
        store.calls(),
        vec!["write_template", "replace_parts", "replace_activities"]
    );
    assert_eq!(sqlite.read_parts(editor.id()).unwrap().len(), 2);
    assert!(editor.is_persisted());
    editor.publish().unwrap();
    assert_eq!(editor.status(), TemplateStatus::Published);
}
