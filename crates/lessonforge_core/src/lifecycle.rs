//! Template lifecycle state machine and guards.
//!
//! # Responsibility
//! - Decide which status transitions are legal.
//! - Enforce the edit lock for non-draft templates.
//! - Evaluate save and publish guards in a fixed order.
//!
//! # Invariants
//! - `Draft -> Published -> Draft` via Publish/Unpublish.
//! - `Draft | Published -> Archived`; nothing leaves `Archived`.
//! - Guards report the first unmet condition, in the order
//!   title, structural attribute, objective count, content.

use crate::error::{EngineError, EngineResult};
use crate::model::reference::is_valid_reference;
use crate::model::template::{Template, TemplateDocument, TemplateStatus};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Thresholds used by the save and publish guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuardRules {
    /// Minimum title length in characters required to publish.
    pub min_publish_title_chars: usize,
    /// Minimum number of non-blank objectives required to save or publish.
    pub min_objectives: usize,
}

impl Default for GuardRules {
    fn default() -> Self {
        Self {
            min_publish_title_chars: 3,
            min_objectives: 1,
        }
    }
}

/// First unmet guard condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    TitleMissing,
    TitleTooShort { min_chars: usize, actual: usize },
    GradeMissing,
    SubjectMissing,
    /// A structural reference is present but not a well-formed id.
    MalformedReference { field: &'static str, value: String },
    ObjectivesTooFew { min: usize, actual: usize },
    BlankObjective,
    ContentMissing,
}

impl GuardViolation {
    /// Name of the field the violation is about.
    pub fn field(&self) -> &'static str {
        match self {
            Self::TitleMissing | Self::TitleTooShort { .. } => "title",
            Self::GradeMissing => "grade",
            Self::SubjectMissing => "subject",
            Self::MalformedReference { field, .. } => *field,
            Self::ObjectivesTooFew { .. } | Self::BlankObjective => "objectives",
            Self::ContentMissing => "content",
        }
    }
}

impl Display for GuardViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleMissing => write!(f, "title is required"),
            Self::TitleTooShort { min_chars, actual } => write!(
                f,
                "title must have at least {min_chars} characters, got {actual}"
            ),
            Self::GradeMissing => write!(f, "grade is required"),
            Self::SubjectMissing => write!(f, "subject is required"),
            Self::MalformedReference { field, value } => {
                write!(f, "{field} reference `{value}` is malformed")
            }
            Self::ObjectivesTooFew { min, actual } => {
                write!(f, "at least {min} objective(s) required, got {actual}")
            }
            Self::BlankObjective => write!(f, "objective must not be blank"),
            Self::ContentMissing => {
                write!(f, "at least one part needs a body or an activity")
            }
        }
    }
}

impl Error for GuardViolation {}

/// Status-changing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Publish,
    Unpublish,
    Archive,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Archive => "archive",
        }
    }
}

/// Returns the status reached by applying `transition` to `from`.
pub fn next_status(from: TemplateStatus, transition: Transition) -> EngineResult<TemplateStatus> {
    match (from, transition) {
        (TemplateStatus::Draft, Transition::Publish) => Ok(TemplateStatus::Published),
        (TemplateStatus::Published, Transition::Unpublish) => Ok(TemplateStatus::Draft),
        (TemplateStatus::Draft | TemplateStatus::Published, Transition::Archive) => {
            Ok(TemplateStatus::Archived)
        }
        (from, transition) => Err(EngineError::InvalidTransition { from, transition }),
    }
}

/// Rejects mutation of any template that is not a draft.
pub fn ensure_editable(template: &Template) -> EngineResult<()> {
    match template.status {
        TemplateStatus::Draft => Ok(()),
        status => Err(EngineError::EditLocked {
            template_id: template.id,
            status,
        }),
    }
}

/// Minimum fields required to persist a draft.
pub fn check_save_guard(template: &Template, rules: &GuardRules) -> Result<(), GuardViolation> {
    if template.title.trim().is_empty() {
        return Err(GuardViolation::TitleMissing);
    }
    check_structure(template)?;
    check_objectives(template, rules)
}

/// Conditions required to enter `Published`.
pub fn check_publish_guard(
    document: &TemplateDocument,
    rules: &GuardRules,
) -> Result<(), GuardViolation> {
    let template = &document.template;
    let title_chars = template.title.trim().chars().count();
    if title_chars == 0 {
        return Err(GuardViolation::TitleMissing);
    }
    if title_chars < rules.min_publish_title_chars {
        return Err(GuardViolation::TitleTooShort {
            min_chars: rules.min_publish_title_chars,
            actual: title_chars,
        });
    }
    check_structure(template)?;
    check_objectives(template, rules)?;
    if !document.has_content() {
        return Err(GuardViolation::ContentMissing);
    }
    Ok(())
}

fn check_structure(template: &Template) -> Result<(), GuardViolation> {
    match template.grade_ref.as_deref() {
        None => return Err(GuardViolation::GradeMissing),
        Some(value) => check_reference("grade", value)?,
    }
    if let Some(value) = template.track_ref.as_deref() {
        check_reference("track", value)?;
    }
    if let Some(value) = template.strand_ref.as_deref() {
        check_reference("strand", value)?;
    }
    match template.subject_ref.as_deref() {
        None => Err(GuardViolation::SubjectMissing),
        Some(value) => check_reference("subject", value),
    }
}

fn check_reference(field: &'static str, value: &str) -> Result<(), GuardViolation> {
    if is_valid_reference(value) {
        Ok(())
    } else {
        Err(GuardViolation::MalformedReference {
            field,
            value: value.to_string(),
        })
    }
}

fn check_objectives(template: &Template, rules: &GuardRules) -> Result<(), GuardViolation> {
    let actual = template
        .objectives
        .iter()
        .filter(|objective| !objective.trim().is_empty())
        .count();
    if actual < rules.min_objectives {
        return Err(GuardViolation::ObjectivesTooFew {
            min: rules.min_objectives,
            actual,
        });
    }
    Ok(())
}
