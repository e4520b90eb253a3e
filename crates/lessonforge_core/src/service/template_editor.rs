//! Template edit session.
//!
//! # Responsibility
//! - Own one in-memory template document while an author edits it.
//! - Route every mutation through the edit lock.
//! - Persist header, parts and activities in a fixed sequence and keep the
//!   change-tracking baseline in step with storage.
//!
//! # Invariants
//! - Mutations are rejected with `EditLocked` unless status is `Draft`.
//! - Part and activity ordinals are dense and 1-based after every change.
//! - A persist writes the header first; when it fails nothing else runs.
//!   The baseline moves only after the last write of a persist succeeds.
//! - Publish and Archive write the header alone and require persisted,
//!   clean content.
//! - "Persisted" means a full persist has succeeded, not that a header row
//!   exists.

use crate::error::{EngineError, EngineResult};
use crate::fingerprint::{compute_fingerprint, ChangeTracker, Fingerprint};
use crate::identity::{require_user, IdentityProvider};
use crate::lifecycle::{
    check_publish_guard, check_save_guard, ensure_editable, next_status, GuardRules,
    GuardViolation, Transition,
};
use crate::model::now_epoch_ms;
use crate::model::reference::normalize_reference;
use crate::model::template::{
    Activity, ActivityId, ActivityKind, Part, PartBlock, PartId, PartKind, Template,
    TemplateDocument, TemplateId, TemplateStatus,
};
use crate::repo::{load_document, TemplateStore};
use log::{error, info};
use std::time::Instant;

/// Partial update for one part. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartPatch {
    pub kind: Option<PartKind>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub collapsed: Option<bool>,
}

/// Partial update for one activity. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityPatch {
    pub kind: Option<ActivityKind>,
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub attachable: Option<bool>,
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Header, parts and activities were written.
    Saved,
    /// Persisted template had no changes; nothing was written.
    Unchanged,
}

/// Edit session over one template.
pub struct TemplateEditor<'s, S: TemplateStore + ?Sized> {
    store: &'s S,
    rules: GuardRules,
    document: TemplateDocument,
    tracker: ChangeTracker,
}

impl<'s, S: TemplateStore + ?Sized> TemplateEditor<'s, S> {
    /// Starts a never-persisted draft authored by the current user.
    pub fn new_draft<I: IdentityProvider + ?Sized>(
        store: &'s S,
        identity: &I,
        rules: GuardRules,
    ) -> EngineResult<Self> {
        let author_id = require_user(identity)?;
        Ok(Self {
            store,
            rules,
            document: TemplateDocument::new(Template::new_draft(author_id)),
            tracker: ChangeTracker::unsaved(),
        })
    }

    /// Loads a persisted template and baselines it.
    pub fn open(store: &'s S, id: TemplateId, rules: GuardRules) -> EngineResult<Self> {
        let document = load_document(store, id)?.ok_or(EngineError::TemplateNotFound(id))?;
        info!(
            "event=template_open module=editor status=ok template_id={} parts={} activities={}",
            id,
            document.parts.len(),
            document.activity_count()
        );
        let tracker = ChangeTracker::persisted(&document);
        Ok(Self {
            store,
            rules,
            document,
            tracker,
        })
    }

    pub fn id(&self) -> TemplateId {
        self.document.template.id
    }

    pub fn status(&self) -> TemplateStatus {
        self.document.template.status
    }

    pub fn template(&self) -> &Template {
        &self.document.template
    }

    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    pub fn fingerprint(&self) -> Fingerprint {
        compute_fingerprint(&self.document)
    }

    /// Whether the document differs from the last persisted state.
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(&self.document)
    }

    /// Whether header, parts and activities have all been written at least once.
    ///
    /// A persist that fails partway leaves this unchanged; the local revision
    /// only tracks the stored header for the conflict check.
    pub fn is_persisted(&self) -> bool {
        self.tracker.has_baseline()
    }

    /// Whether `save` would write anything.
    pub fn can_save(&self) -> bool {
        ensure_editable(&self.document.template).is_ok()
            && check_save_guard(&self.document.template, &self.rules).is_ok()
            && (!self.is_persisted() || self.is_dirty())
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> EngineResult<()> {
        self.header_mut()?.title = title.into();
        Ok(())
    }

    pub fn set_grade_ref(&mut self, grade_ref: Option<String>) -> EngineResult<()> {
        self.header_mut()?.grade_ref = normalize_reference(grade_ref);
        Ok(())
    }

    pub fn set_track_ref(&mut self, track_ref: Option<String>) -> EngineResult<()> {
        self.header_mut()?.track_ref = normalize_reference(track_ref);
        Ok(())
    }

    pub fn set_strand_ref(&mut self, strand_ref: Option<String>) -> EngineResult<()> {
        self.header_mut()?.strand_ref = normalize_reference(strand_ref);
        Ok(())
    }

    pub fn set_subject_ref(&mut self, subject_ref: Option<String>) -> EngineResult<()> {
        self.header_mut()?.subject_ref = normalize_reference(subject_ref);
        Ok(())
    }

    pub fn set_duration(&mut self, minutes: u32) -> EngineResult<()> {
        self.header_mut()?.duration_minutes = minutes;
        Ok(())
    }

    pub fn set_audience(&mut self, audience: impl Into<String>) -> EngineResult<()> {
        self.header_mut()?.audience = audience.into();
        Ok(())
    }

    /// Appends one objective. Blank text is rejected.
    pub fn add_objective(&mut self, objective: impl Into<String>) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let objective = objective.into();
        let trimmed = objective.trim();
        if trimmed.is_empty() {
            return Err(GuardViolation::BlankObjective.into());
        }
        self.document.template.objectives.push(trimmed.to_string());
        Ok(())
    }

    /// Removes the objective at zero-based `index` and returns it.
    pub fn remove_objective(&mut self, index: usize) -> EngineResult<String> {
        let header = self.header_mut()?;
        if index >= header.objectives.len() {
            return Err(EngineError::UnknownObjective(index));
        }
        Ok(header.objectives.remove(index))
    }

    /// Appends a part. A blank title falls back to the kind's label.
    pub fn add_part(&mut self, kind: PartKind, title: impl Into<String>) -> EngineResult<PartId> {
        ensure_editable(&self.document.template)?;
        let title = label_or_default(title.into(), kind.default_title());
        let position = self.document.parts.len() as u32 + 1;
        let part = Part::new(self.document.template.id, position, kind, title);
        let id = part.id;
        self.document.parts.push(PartBlock::new(part));
        self.document.renumber();
        Ok(id)
    }

    /// Removes a part together with its activities.
    pub fn remove_part(&mut self, part_id: PartId) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let index = self.part_index(part_id)?;
        self.document.parts.remove(index);
        self.document.renumber();
        Ok(())
    }

    /// Moves a part to 1-based `position`, clamped to the valid range.
    pub fn move_part(&mut self, part_id: PartId, position: u32) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let index = self.part_index(part_id)?;
        let block = self.document.parts.remove(index);
        let target = clamp_slot(position, self.document.parts.len());
        self.document.parts.insert(target, block);
        self.document.renumber();
        Ok(())
    }

    pub fn update_part(&mut self, part_id: PartId, patch: PartPatch) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let index = self.part_index(part_id)?;
        let part = &mut self.document.parts[index].part;
        if let Some(kind) = patch.kind {
            part.kind = kind;
        }
        if let Some(title) = patch.title {
            part.title = label_or_default(title, part.kind.default_title());
        }
        if let Some(body) = patch.body {
            part.body = body;
        }
        if let Some(collapsed) = patch.collapsed {
            part.collapsed = collapsed;
        }
        Ok(())
    }

    /// Appends an activity to `part_id`. A blank title falls back to the kind's label.
    pub fn add_activity(
        &mut self,
        part_id: PartId,
        kind: ActivityKind,
        title: impl Into<String>,
    ) -> EngineResult<ActivityId> {
        ensure_editable(&self.document.template)?;
        let index = self.part_index(part_id)?;
        let title = label_or_default(title.into(), kind.default_title());
        let block = &mut self.document.parts[index];
        let position = block.activities.len() as u32 + 1;
        let activity = Activity::new(part_id, position, kind, title);
        let id = activity.id;
        block.activities.push(activity);
        block.renumber();
        Ok(id)
    }

    pub fn remove_activity(&mut self, activity_id: ActivityId) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let (block_index, index) = self.activity_index(activity_id)?;
        let block = &mut self.document.parts[block_index];
        block.activities.remove(index);
        block.renumber();
        Ok(())
    }

    /// Moves an activity to 1-based `position` within its part, clamped.
    pub fn move_activity(&mut self, activity_id: ActivityId, position: u32) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let (block_index, index) = self.activity_index(activity_id)?;
        let block = &mut self.document.parts[block_index];
        let activity = block.activities.remove(index);
        let target = clamp_slot(position, block.activities.len());
        block.activities.insert(target, activity);
        block.renumber();
        Ok(())
    }

    pub fn update_activity(
        &mut self,
        activity_id: ActivityId,
        patch: ActivityPatch,
    ) -> EngineResult<()> {
        ensure_editable(&self.document.template)?;
        let (block_index, index) = self.activity_index(activity_id)?;
        let activity = &mut self.document.parts[block_index].activities[index];
        if let Some(kind) = patch.kind {
            activity.kind = kind;
        }
        if let Some(title) = patch.title {
            activity.title = label_or_default(title, activity.kind.default_title());
        }
        if let Some(instructions) = patch.instructions {
            activity.instructions = instructions;
        }
        if let Some(minutes) = patch.estimated_minutes {
            activity.estimated_minutes = minutes;
        }
        if let Some(attachable) = patch.attachable {
            activity.attachable = attachable;
        }
        Ok(())
    }

    /// Persists the draft.
    ///
    /// # Errors
    /// - `EditLocked` outside `Draft`.
    /// - `Validation` naming the first unmet save condition.
    /// - `Store` from the first failing write; later writes are skipped.
    pub fn save(&mut self) -> EngineResult<SaveOutcome> {
        ensure_editable(&self.document.template)?;
        check_save_guard(&self.document.template, &self.rules)?;
        if self.is_persisted() && !self.is_dirty() {
            info!(
                "event=template_persist module=editor status=skipped template_id={}",
                self.id()
            );
            return Ok(SaveOutcome::Unchanged);
        }
        self.persist(TemplateStatus::Draft)?;
        Ok(SaveOutcome::Saved)
    }

    /// Moves a clean, persisted draft to `Published`.
    pub fn publish(&mut self) -> EngineResult<()> {
        let next = next_status(self.status(), Transition::Publish)?;
        check_publish_guard(&self.document, &self.rules)?;
        self.ensure_clean()?;
        self.write_header(next, Transition::Publish)
    }

    /// Returns a published template to `Draft`, re-persisting its content.
    pub fn unpublish(&mut self) -> EngineResult<()> {
        let next = next_status(self.status(), Transition::Unpublish)?;
        self.persist(next)
    }

    /// Archives a clean, persisted template. Archived is terminal.
    pub fn archive(&mut self) -> EngineResult<()> {
        let next = next_status(self.status(), Transition::Archive)?;
        self.ensure_clean()?;
        self.write_header(next, Transition::Archive)
    }

    fn header_mut(&mut self) -> EngineResult<&mut Template> {
        ensure_editable(&self.document.template)?;
        Ok(&mut self.document.template)
    }

    fn ensure_clean(&self) -> EngineResult<()> {
        if !self.is_persisted() || self.is_dirty() {
            return Err(EngineError::UnsavedChanges(self.id()));
        }
        Ok(())
    }

    fn part_index(&self, part_id: PartId) -> EngineResult<usize> {
        self.document
            .parts
            .iter()
            .position(|block| block.part.id == part_id)
            .ok_or(EngineError::UnknownPart(part_id))
    }

    fn activity_index(&self, activity_id: ActivityId) -> EngineResult<(usize, usize)> {
        self.document
            .parts
            .iter()
            .enumerate()
            .find_map(|(block_index, block)| {
                block
                    .activities
                    .iter()
                    .position(|activity| activity.id == activity_id)
                    .map(|index| (block_index, index))
            })
            .ok_or(EngineError::UnknownActivity(activity_id))
    }

    /// Writes one header with `status` and adopts it locally on success.
    fn commit_header(&mut self, status: TemplateStatus) -> EngineResult<()> {
        let mut header = self.document.template.clone();
        header.status = status;
        header.updated_at = now_epoch_ms();
        self.store.write_template(&header)?;
        header.revision += 1;
        self.document.template = header;
        Ok(())
    }

    fn write_header(&mut self, status: TemplateStatus, transition: Transition) -> EngineResult<()> {
        let started_at = Instant::now();
        let template_id = self.id();
        match self.commit_header(status) {
            Ok(()) => {
                self.tracker.rebaseline(&self.document);
                info!(
                    "event=template_transition module=editor status=ok template_id={} transition={} revision={} duration_ms={}",
                    template_id,
                    transition.as_str(),
                    self.document.template.revision,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=template_transition module=editor status=error template_id={} transition={} error_kind={}",
                    template_id,
                    transition.as_str(),
                    err.kind()
                );
                Err(err)
            }
        }
    }

    fn persist(&mut self, status: TemplateStatus) -> EngineResult<()> {
        let started_at = Instant::now();
        let template_id = self.id();
        info!(
            "event=template_persist module=editor status=start template_id={} revision={} parts={} activities={}",
            template_id,
            self.document.template.revision,
            self.document.parts.len(),
            self.document.activity_count()
        );
        match self.write_all(status) {
            Ok(()) => {
                self.tracker.rebaseline(&self.document);
                info!(
                    "event=template_persist module=editor status=ok template_id={} revision={} duration_ms={}",
                    template_id,
                    self.document.template.revision,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=template_persist module=editor status=error template_id={} duration_ms={} error_kind={} error={}",
                    template_id,
                    started_at.elapsed().as_millis(),
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }

    fn write_all(&mut self, status: TemplateStatus) -> EngineResult<()> {
        self.commit_header(status)?;
        let template_id = self.id();
        self.store
            .replace_parts(template_id, &self.document.part_rows())?;
        self.store
            .replace_activities(&self.document.part_ids(), &self.document.activity_rows())?;
        Ok(())
    }
}

fn label_or_default(title: String, fallback: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn clamp_slot(position: u32, len: usize) -> usize {
    (position.max(1) as usize - 1).min(len)
}

#[cfg(test)]
mod tests {
    use super::{clamp_slot, label_or_default};

    #[test]
    fn clamp_slot_maps_one_based_positions_into_range() {
        assert_eq!(clamp_slot(0, 3), 0);
        assert_eq!(clamp_slot(1, 3), 0);
        assert_eq!(clamp_slot(3, 3), 2);
        assert_eq!(clamp_slot(9, 3), 3);
    }

    #[test]
    fn blank_labels_fall_back() {
        assert_eq!(label_or_default("  ".to_string(), "Quiz"), "Quiz");
        assert_eq!(label_or_default(" Warm-up ".to_string(), "Quiz"), "Warm-up");
    }
}
