//! Assignment instance model.
//!
//! An instance is a deployed, fully independent copy of a published
//! template's parts and activities. Its `template_id` is a display-only
//! back-reference and is never dereferenced to pull live content.

use crate::model::template::{PartBlock, TemplateId, UserId};
use crate::visibility::VisibilityWindow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable assignment instance identifier.
pub type InstanceId = Uuid;

/// One class schedule slot an instance can be deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub section_id: String,
    pub term_id: String,
    pub schedule_id: String,
    pub grade_ref: Option<String>,
    pub track_ref: Option<String>,
    pub strand_ref: Option<String>,
}

impl DeploymentTarget {
    pub fn new(
        section_id: impl Into<String>,
        term_id: impl Into<String>,
        schedule_id: impl Into<String>,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            term_id: term_id.into(),
            schedule_id: schedule_id.into(),
            grade_ref: None,
            track_ref: None,
            strand_ref: None,
        }
    }

    pub fn with_grade(mut self, grade_ref: impl Into<String>) -> Self {
        self.grade_ref = Some(grade_ref.into());
        self
    }

    pub fn with_track(mut self, track_ref: impl Into<String>) -> Self {
        self.track_ref = Some(track_ref.into());
        self
    }

    pub fn with_strand(mut self, strand_ref: impl Into<String>) -> Self {
        self.strand_ref = Some(strand_ref.into());
        self
    }
}

/// Instance header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHeader {
    pub id: InstanceId,
    /// Originating template, for display only.
    pub template_id: TemplateId,
    /// Template title at deployment time.
    pub template_title: String,
    /// Template duration at deployment time.
    pub template_duration: u32,
    pub section_id: String,
    pub term_id: String,
    pub schedule_id: String,
    /// Instructor who deployed the instance, when known.
    pub assigned_by: Option<UserId>,
    pub visibility: VisibilityWindow,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Deployed copy of a template's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentInstance {
    pub header: InstanceHeader,
    pub parts: Vec<PartBlock>,
}

impl AssignmentInstance {
    pub fn id(&self) -> InstanceId {
        self.header.id
    }
}
