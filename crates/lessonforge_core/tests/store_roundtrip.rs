use lessonforge_core::db::open_db_in_memory;
use lessonforge_core::repo::load_document;
use lessonforge_core::{
    compute_fingerprint, Activity, ActivityKind, Part, PartKind, SqliteTemplateStore, StoreError,
    Template, TemplateDocument, TemplateStatus, TemplateStore,
};
use uuid::Uuid;

fn sample_header() -> Template {
    let mut template = Template::new_draft(Uuid::new_v4());
    template.title = "Plate tectonics".to_string();
    template.grade_ref = Some("G9".to_string());
    template.track_ref = Some("ACAD".to_string());
    template.subject_ref = Some("GEO".to_string());
    template.objectives = vec![
        "Describe plate boundaries".to_string(),
        "Relate quakes to \"faults\"".to_string(),
    ];
    template.duration_minutes = 60;
    template.audience = "Grade 9".to_string();
    template.updated_at = 1_735_689_600_000;
    template
}

#[test]
fn write_then_read_preserves_header_fingerprint() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let header = sample_header();

    let id = store.write_template(&header).unwrap();
    assert_eq!(id, header.id);

    let loaded = store.read_template(id).unwrap().unwrap();
    assert_eq!(
        compute_fingerprint(&TemplateDocument::new(loaded.clone())),
        compute_fingerprint(&TemplateDocument::new(header.clone()))
    );
    assert_eq!(loaded.revision, 1);
    assert_eq!(loaded.author_id, header.author_id);
    assert_eq!(loaded.updated_at, header.updated_at);
    assert_eq!(loaded.status, TemplateStatus::Draft);
}

#[test]
fn stale_revision_write_is_rejected_without_changes() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let mut header = sample_header();
    store.write_template(&header).unwrap();

    header.revision = 1;
    header.title = "First update".to_string();
    store.write_template(&header).unwrap();

    header.title = "Stale update".to_string();
    match store.write_template(&header).unwrap_err() {
        StoreError::Conflict {
            expected_revision,
            stored_revision,
            ..
        } => {
            assert_eq!(expected_revision, 1);
            assert_eq!(stored_revision, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        store.read_template(header.id).unwrap().unwrap().title,
        "First update"
    );
}

#[test]
fn replace_parts_is_delete_then_insert() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let header = sample_header();
    store.write_template(&header).unwrap();

    let first = Part::new(header.id, 1, PartKind::Introduction, "Hook");
    let second = Part::new(header.id, 2, PartKind::Instruction, "Lecture");
    store
        .replace_parts(header.id, &[first.clone(), second.clone()])
        .unwrap();
    let quiz = Activity::new(second.id, 1, ActivityKind::Quiz, "Check");
    store
        .replace_activities(&[first.id, second.id], &[quiz.clone()])
        .unwrap();

    let mut reordered = second.clone();
    reordered.position = 1;
    store.replace_parts(header.id, &[reordered.clone()]).unwrap();

    let parts = store.read_parts(header.id).unwrap();
    assert_eq!(parts, vec![reordered]);
    // Activities of removed or replaced parts go with them.
    assert!(store
        .read_activities(&[first.id, second.id])
        .unwrap()
        .is_empty());
}

#[test]
fn replace_rejects_rows_outside_the_target_set() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let header = sample_header();
    store.write_template(&header).unwrap();

    let foreign = Part::new(Uuid::new_v4(), 1, PartKind::Closure, "Other");
    assert!(matches!(
        store.replace_parts(header.id, &[foreign]),
        Err(StoreError::InvalidData(_))
    ));

    let part = Part::new(header.id, 1, PartKind::Closure, "Wrap-up");
    store.replace_parts(header.id, &[part.clone()]).unwrap();
    let stray = Activity::new(Uuid::new_v4(), 1, ActivityKind::Media, "Clip");
    assert!(matches!(
        store.replace_activities(&[part.id], &[stray]),
        Err(StoreError::InvalidData(_))
    ));
}

#[test]
fn load_document_assembles_ordered_tree() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let header = sample_header();
    store.write_template(&header).unwrap();

    let part = Part::new(header.id, 1, PartKind::GuidedPractice, "Map work");
    store.replace_parts(header.id, &[part.clone()]).unwrap();
    let mut late = Activity::new(part.id, 2, ActivityKind::Discussion, "Debrief");
    late.estimated_minutes = 10;
    let early = Activity::new(part.id, 1, ActivityKind::Exercise, "Label plates");
    store
        .replace_activities(&[part.id], &[late.clone(), early.clone()])
        .unwrap();

    let document = load_document(&store, header.id).unwrap().unwrap();
    assert_eq!(document.parts.len(), 1);
    assert_eq!(document.parts[0].activities, vec![early, late]);
    assert!(load_document(&store, Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn corrupted_status_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTemplateStore::try_new(&conn).unwrap();
    let header = sample_header();
    store.write_template(&header).unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "UPDATE templates SET status = 'retired' WHERE id = ?1;",
        [header.id.to_string()],
    )
    .unwrap();

    match store.read_template(header.id).unwrap_err() {
        StoreError::InvalidData(message) => assert!(message.contains("retired")),
        other => panic!("unexpected error: {other}"),
    }
}
