//! Snapshot materialization of published templates into assignment instances.
//!
//! # Responsibility
//! - Deep-copy a published template's parts and activities under fresh ids.
//! - Denormalize display fields and target linkage onto the instance header.
//!
//! # Invariants
//! - The instance shares no mutable structure with the source document: every
//!   copied value is owned by the instance.
//! - No copied activity references a template-owned part id.
//! - Ordinal order of parts and activities is preserved.

use crate::eligibility::check_target;
use crate::error::{EngineError, EngineResult};
use crate::model::instance::{AssignmentInstance, DeploymentTarget, InstanceHeader};
use crate::model::now_epoch_ms;
use crate::model::template::{Activity, Part, PartBlock, PartId, TemplateDocument, TemplateStatus};
use crate::visibility::VisibilityWindow;
use std::collections::HashMap;
use uuid::Uuid;

/// Materializes `document` for `target`.
///
/// `window` defaults to hidden with no bounds.
///
/// # Errors
/// - `NotPublished` when the template status is not `Published`.
/// - `TargetInvalid` when `target` is not eligible for the template.
/// - `Visibility` when the supplied window fails validation.
pub fn materialize(
    document: &TemplateDocument,
    target: &DeploymentTarget,
    window: Option<VisibilityWindow>,
) -> EngineResult<AssignmentInstance> {
    let template = &document.template;
    if template.status != TemplateStatus::Published {
        return Err(EngineError::NotPublished {
            template_id: template.id,
            status: template.status,
        });
    }
    check_target(template, target).map_err(|mismatch| EngineError::TargetInvalid {
        schedule_id: target.schedule_id.clone(),
        mismatch,
    })?;
    let visibility = window.unwrap_or_default();
    visibility.validate()?;

    let instance_id = Uuid::new_v4();

    let mut part_id_map: HashMap<PartId, PartId> = HashMap::with_capacity(document.parts.len());
    let mut parts: Vec<Part> = Vec::with_capacity(document.parts.len());
    for (index, block) in document.parts.iter().enumerate() {
        let new_id = Uuid::new_v4();
        part_id_map.insert(block.part.id, new_id);
        parts.push(Part {
            id: new_id,
            owner_id: instance_id,
            position: index as u32 + 1,
            kind: block.part.kind,
            title: block.part.title.clone(),
            body: block.part.body.clone(),
            collapsed: block.part.collapsed,
        });
    }

    let mut blocks: Vec<PartBlock> = parts.into_iter().map(PartBlock::new).collect();
    for (block_index, source) in document.parts.iter().enumerate() {
        for (index, activity) in source.activities.iter().enumerate() {
            let part_id = *part_id_map
                .get(&activity.part_id)
                .ok_or(EngineError::UnknownPart(activity.part_id))?;
            blocks[block_index].activities.push(Activity {
                id: Uuid::new_v4(),
                part_id,
                position: index as u32 + 1,
                kind: activity.kind,
                title: activity.title.clone(),
                instructions: activity.instructions.clone(),
                estimated_minutes: activity.estimated_minutes,
                attachable: activity.attachable,
            });
        }
    }

    Ok(AssignmentInstance {
        header: InstanceHeader {
            id: instance_id,
            template_id: template.id,
            template_title: template.title.clone(),
            template_duration: template.duration_minutes,
            section_id: target.section_id.clone(),
            term_id: target.term_id.clone(),
            schedule_id: target.schedule_id.clone(),
            assigned_by: None,
            visibility,
            created_at: now_epoch_ms(),
        },
        parts: blocks,
    })
}
