//! Lesson template model.
//!
//! # Responsibility
//! - Define the template header and its ordered part/activity children.
//! - Provide the fixed part/activity kinds and their storage strings.
//!
//! # Invariants
//! - `id` is stable and never reused for another template.
//! - Structural attributes and content change only while `status == Draft`
//!   (enforced by `lifecycle`, not by these plain data types).
//! - Inside a `TemplateDocument`, every activity's `part_id` equals the id of
//!   the block that holds it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Stable template identifier.
pub type TemplateId = Uuid;
/// Stable part identifier.
pub type PartId = Uuid;
/// Stable activity identifier.
pub type ActivityId = Uuid;
/// Identifier handed out by the identity provider.
pub type UserId = Uuid;

/// Template lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    /// Editable; the initial status.
    Draft,
    /// Locked for editing and deployable.
    Published,
    /// Terminal for editing.
    Archived,
}

impl TemplateStatus {
    /// Stable storage string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parses a storage string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Fixed kinds of lesson parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Introduction,
    Instruction,
    GuidedPractice,
    IndependentPractice,
    Assessment,
    Closure,
}

impl PartKind {
    pub const ALL: [PartKind; 6] = [
        Self::Introduction,
        Self::Instruction,
        Self::GuidedPractice,
        Self::IndependentPractice,
        Self::Assessment,
        Self::Closure,
    ];

    /// Stable storage string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Instruction => "instruction",
            Self::GuidedPractice => "guided_practice",
            Self::IndependentPractice => "independent_practice",
            Self::Assessment => "assessment",
            Self::Closure => "closure",
        }
    }

    /// Parses a storage string.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Title used when the author leaves the part title blank.
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Introduction => "Introduction",
            Self::Instruction => "Instruction",
            Self::GuidedPractice => "Guided Practice",
            Self::IndependentPractice => "Independent Practice",
            Self::Assessment => "Assessment",
            Self::Closure => "Closure",
        }
    }
}

/// Fixed kinds of activities inside a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Reading,
    Discussion,
    Exercise,
    Quiz,
    Project,
    Media,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        Self::Reading,
        Self::Discussion,
        Self::Exercise,
        Self::Quiz,
        Self::Project,
        Self::Media,
    ];

    /// Stable storage string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Discussion => "discussion",
            Self::Exercise => "exercise",
            Self::Quiz => "quiz",
            Self::Project => "project",
            Self::Media => "media",
        }
    }

    /// Parses a storage string.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Title used when the author leaves the activity title blank.
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Reading => "Reading",
            Self::Discussion => "Discussion",
            Self::Exercise => "Exercise",
            Self::Quiz => "Quiz",
            Self::Project => "Project",
            Self::Media => "Media",
        }
    }

    /// Initial `attachable` flag for new activities of this kind.
    ///
    /// Kinds that collect student work accept attachments by default.
    pub fn default_attachable(self) -> bool {
        match self {
            Self::Exercise | Self::Quiz | Self::Project => true,
            Self::Reading | Self::Discussion | Self::Media => false,
        }
    }
}

/// Template header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    /// Instructor who created the draft.
    pub author_id: UserId,
    pub title: String,
    pub status: TemplateStatus,
    pub grade_ref: Option<String>,
    pub track_ref: Option<String>,
    pub strand_ref: Option<String>,
    pub subject_ref: Option<String>,
    /// Ordered learning objectives.
    pub objectives: Vec<String>,
    pub duration_minutes: u32,
    pub audience: String,
    /// Number of successful header writes. `0` means never persisted.
    pub revision: u32,
    /// Epoch milliseconds of the last persisted change.
    pub updated_at: i64,
}

impl Template {
    /// Creates an empty, never-persisted draft owned by `author_id`.
    pub fn new_draft(author_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: String::new(),
            status: TemplateStatus::Draft,
            grade_ref: None,
            track_ref: None,
            strand_ref: None,
            subject_ref: None,
            objectives: Vec::new(),
            duration_minutes: 0,
            audience: String::new(),
            revision: 0,
            updated_at: 0,
        }
    }
}

/// One ordered section of a template or instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    /// Owning template id, or owning instance id after a snapshot.
    pub owner_id: Uuid,
    /// Dense, 1-based ordinal within the owner.
    pub position: u32,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub title: String,
    pub body: String,
    pub collapsed: bool,
}

impl Part {
    pub fn new(owner_id: Uuid, position: u32, kind: PartKind, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            position,
            kind,
            title: title.into(),
            body: String::new(),
            collapsed: false,
        }
    }
}

/// One ordered unit of work inside a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub part_id: PartId,
    /// Dense, 1-based ordinal within the part.
    pub position: u32,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub instructions: String,
    pub estimated_minutes: u32,
    /// Whether students may attach files to this activity.
    pub attachable: bool,
}

impl Activity {
    pub fn new(part_id: PartId, position: u32, kind: ActivityKind, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            part_id,
            position,
            kind,
            title: title.into(),
            instructions: String::new(),
            estimated_minutes: 0,
            attachable: kind.default_attachable(),
        }
    }
}

/// A part together with its ordered activities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBlock {
    pub part: Part,
    pub activities: Vec<Activity>,
}

impl PartBlock {
    pub fn new(part: Part) -> Self {
        Self {
            part,
            activities: Vec::new(),
        }
    }

    /// Rewrites activity positions to `1..=n` in current vector order.
    pub fn renumber(&mut self) {
        let part_id = self.part.id;
        for (index, activity) in self.activities.iter_mut().enumerate() {
            activity.position = index as u32 + 1;
            activity.part_id = part_id;
        }
    }
}

/// In-memory editable template: header plus owned content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub template: Template,
    pub parts: Vec<PartBlock>,
}

impl TemplateDocument {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            parts: Vec::new(),
        }
    }

    /// Returns whether any part has a non-blank body or any activity exists.
    pub fn has_content(&self) -> bool {
        self.parts
            .iter()
            .any(|block| !block.part.body.trim().is_empty() || !block.activities.is_empty())
    }

    /// Part ids in ordinal order.
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts.iter().map(|block| block.part.id).collect()
    }

    /// Flat part rows in ordinal order.
    pub fn part_rows(&self) -> Vec<Part> {
        self.parts.iter().map(|block| block.part.clone()).collect()
    }

    /// Flat activity rows, grouped by part in ordinal order.
    pub fn activity_rows(&self) -> Vec<Activity> {
        self.parts
            .iter()
            .flat_map(|block| block.activities.iter().cloned())
            .collect()
    }

    pub fn activity_count(&self) -> usize {
        self.parts.iter().map(|block| block.activities.len()).sum()
    }

    /// Rewrites part and activity positions to dense 1-based ordinals.
    pub fn renumber(&mut self) {
        let owner_id = self.template.id;
        for (index, block) in self.parts.iter_mut().enumerate() {
            block.part.position = index as u32 + 1;
            block.part.owner_id = owner_id;
            block.renumber();
        }
    }
}

/// Groups flat part/activity rows into ordered blocks.
///
/// Parts and activities are sorted by position. Returns the id of the first
/// activity whose `part_id` matches none of `parts`.
pub fn assemble_blocks(
    mut parts: Vec<Part>,
    mut activities: Vec<Activity>,
) -> Result<Vec<PartBlock>, ActivityId> {
    parts.sort_by_key(|part| part.position);
    activities.sort_by_key(|activity| activity.position);

    let index_by_part: HashMap<PartId, usize> = parts
        .iter()
        .enumerate()
        .map(|(index, part)| (part.id, index))
        .collect();
    let mut blocks: Vec<PartBlock> = parts.into_iter().map(PartBlock::new).collect();

    for activity in activities {
        let index = *index_by_part.get(&activity.part_id).ok_or(activity.id)?;
        blocks[index].activities.push(activity);
    }
    Ok(blocks)
}
