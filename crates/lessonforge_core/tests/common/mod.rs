#![allow(dead_code)]

use lessonforge_core::lifecycle::GuardRules;
use lessonforge_core::model::instance::{InstanceHeader, InstanceId};
use lessonforge_core::visibility::VisibilityWindow;
use lessonforge_core::{
    Activity, ActivityKind, Part, PartId, PartKind, StaticIdentity, StoreError, StoreResult,
    Template, TemplateEditor, TemplateId, TemplateStore,
};
use std::cell::{Cell, RefCell};
use uuid::Uuid;

/// Store wrapper that logs every adapter call and can fail one of them.
///
/// A failing call is still logged, then returns `StoreError::InvalidData`
/// without reaching the wrapped store.
pub struct RecordingStore<'a, S: TemplateStore> {
    inner: &'a S,
    calls: RefCell<Vec<&'static str>>,
    fail_on: Cell<Option<&'static str>>,
}

impl<'a, S: TemplateStore> RecordingStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
            fail_on: Cell::new(None),
        }
    }

    pub fn fail_on(&self, call: &'static str) {
        self.fail_on.set(Some(call));
    }

    pub fn clear_failure(&self) {
        self.fail_on.set(None);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn reset(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: &'static str) -> StoreResult<()> {
        self.calls.borrow_mut().push(call);
        if self.fail_on.get() == Some(call) {
            return Err(StoreError::InvalidData(format!("injected failure in {call}")));
        }
        Ok(())
    }
}

impl<S: TemplateStore> TemplateStore for RecordingStore<'_, S> {
    fn read_template(&self, id: TemplateId) -> StoreResult<Option<Template>> {
        self.record("read_template")?;
        self.inner.read_template(id)
    }

    fn read_parts(&self, template_id: TemplateId) -> StoreResult<Vec<Part>> {
        self.record("read_parts")?;
        self.inner.read_parts(template_id)
    }

    fn read_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>> {
        self.record("read_activities")?;
        self.inner.read_activities(part_ids)
    }

    fn write_template(&self, header: &Template) -> StoreResult<TemplateId> {
        self.record("write_template")?;
        self.inner.write_template(header)
    }

    fn replace_parts(&self, template_id: TemplateId, parts: &[Part]) -> StoreResult<()> {
        self.record("replace_parts")?;
        self.inner.replace_parts(template_id, parts)
    }

    fn replace_activities(&self, part_ids: &[PartId], activities: &[Activity]) -> StoreResult<()> {
        self.record("replace_activities")?;
        self.inner.replace_activities(part_ids, activities)
    }

    fn insert_instance(&self, header: &InstanceHeader) -> StoreResult<()> {
        self.record("insert_instance")?;
        self.inner.insert_instance(header)
    }

    fn insert_instance_parts(&self, parts: &[Part]) -> StoreResult<()> {
        self.record("insert_instance_parts")?;
        self.inner.insert_instance_parts(parts)
    }

    fn insert_instance_activities(&self, activities: &[Activity]) -> StoreResult<()> {
        self.record("insert_instance_activities")?;
        self.inner.insert_instance_activities(activities)
    }

    fn read_instance(&self, id: InstanceId) -> StoreResult<Option<InstanceHeader>> {
        self.record("read_instance")?;
        self.inner.read_instance(id)
    }

    fn read_instance_parts(&self, instance_id: InstanceId) -> StoreResult<Vec<Part>> {
        self.record("read_instance_parts")?;
        self.inner.read_instance_parts(instance_id)
    }

    fn read_instance_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>> {
        self.record("read_instance_activities")?;
        self.inner.read_instance_activities(part_ids)
    }

    fn update_instance_visibility(
        &self,
        id: InstanceId,
        window: &VisibilityWindow,
    ) -> StoreResult<()> {
        self.record("update_instance_visibility")?;
        self.inner.update_instance_visibility(id, window)
    }

    fn delete_instance(&self, id: InstanceId) -> StoreResult<()> {
        self.record("delete_instance")?;
        self.inner.delete_instance(id)
    }
}

pub fn instructor() -> StaticIdentity {
    StaticIdentity::signed_in(Uuid::new_v4())
}

/// Fills a fresh draft so that both save and publish guards pass.
///
/// Returns the ids of the two parts it adds.
pub fn fill_publishable<S: TemplateStore + ?Sized>(
    editor: &mut TemplateEditor<'_, S>,
) -> (PartId, PartId) {
    editor.set_title("Photosynthesis").unwrap();
    editor.set_grade_ref(Some("G7".to_string())).unwrap();
    editor.set_subject_ref(Some("SCI".to_string())).unwrap();
    editor.set_duration(45).unwrap();
    editor.set_audience("Grade 7 science").unwrap();
    editor
        .add_objective("Explain how plants convert light to energy")
        .unwrap();

    let intro = editor.add_part(PartKind::Introduction, "").unwrap();
    let practice = editor
        .add_part(PartKind::GuidedPractice, "Leaf lab")
        .unwrap();
    editor
        .update_part(
            intro,
            lessonforge_core::PartPatch {
                body: Some("What do plants eat?".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    editor
        .add_activity(practice, ActivityKind::Reading, "Chapter 4")
        .unwrap();
    editor
        .add_activity(practice, ActivityKind::Exercise, "Observe stomata")
        .unwrap();
    (intro, practice)
}

pub fn default_rules() -> GuardRules {
    GuardRules::default()
}
