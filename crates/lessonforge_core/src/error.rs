//! Engine-level error taxonomy.
//!
//! # Invariants
//! - Every failure carries the specific unmet condition or underlying cause.
//! - Store failures pass through unchanged; their message is the adapter's own.

use crate::eligibility::TargetMismatch;
use crate::lifecycle::{GuardViolation, Transition};
use crate::model::instance::InstanceId;
use crate::model::template::{ActivityId, PartId, TemplateId, TemplateStatus};
use crate::repo::StoreError;
use crate::visibility::VisibilityError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of a lifecycle, editing or assignment operation.
#[derive(Debug)]
pub enum EngineError {
    /// A save/publish guard is not met.
    Validation(GuardViolation),
    /// Mutation attempted on a non-draft template.
    EditLocked {
        template_id: TemplateId,
        status: TemplateStatus,
    },
    /// Transition not allowed from the current status.
    InvalidTransition {
        from: TemplateStatus,
        transition: Transition,
    },
    /// Header-only transition attempted with unsaved or never-saved content.
    UnsavedChanges(TemplateId),
    /// Deployment attempted from a template that is not published.
    NotPublished {
        template_id: TemplateId,
        status: TemplateStatus,
    },
    /// Deployment target does not satisfy the template's constraints.
    TargetInvalid {
        schedule_id: String,
        mismatch: TargetMismatch,
    },
    /// Visibility window failed local validation.
    Visibility(VisibilityError),
    /// Deployment budget has no remaining deployments.
    BudgetExhausted { limit: u32 },
    TemplateNotFound(TemplateId),
    InstanceNotFound(InstanceId),
    UnknownPart(PartId),
    UnknownActivity(ActivityId),
    UnknownObjective(usize),
    /// No signed-in user.
    Unauthenticated,
    /// Storage adapter failure.
    Store(StoreError),
}

impl EngineError {
    /// Stable short code for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failure",
            Self::EditLocked { .. } => "edit_locked",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::UnsavedChanges(_) => "unsaved_changes",
            Self::NotPublished { .. } => "not_published",
            Self::TargetInvalid { .. } => "target_invalid",
            Self::Visibility(_) => "visibility_invalid",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::TemplateNotFound(_) | Self::InstanceNotFound(_) => "not_found",
            Self::UnknownPart(_) | Self::UnknownActivity(_) | Self::UnknownObjective(_) => {
                "unknown_item"
            }
            Self::Unauthenticated => "unauthenticated",
            Self::Store(_) => "store_failure",
        }
    }

    /// Returns the guard violation when this is a validation failure.
    pub fn violation(&self) -> Option<&GuardViolation> {
        match self {
            Self::Validation(violation) => Some(violation),
            _ => None,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(violation) => write!(f, "validation failed: {violation}"),
            Self::EditLocked {
                template_id,
                status,
            } => write!(
                f,
                "template {template_id} is {} and cannot be edited",
                status.as_str()
            ),
            Self::InvalidTransition { from, transition } => write!(
                f,
                "cannot {} a {} template",
                transition.as_str(),
                from.as_str()
            ),
            Self::UnsavedChanges(template_id) => {
                write!(f, "template {template_id} has unsaved changes")
            }
            Self::NotPublished {
                template_id,
                status,
            } => write!(
                f,
                "template {template_id} is {}, not published",
                status.as_str()
            ),
            Self::TargetInvalid {
                schedule_id,
                mismatch,
            } => write!(f, "target {schedule_id} is not eligible: {mismatch}"),
            Self::Visibility(err) => write!(f, "invalid visibility window: {err}"),
            Self::BudgetExhausted { limit } => {
                write!(f, "deployment budget of {limit} exhausted")
            }
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::InstanceNotFound(id) => write!(f, "assignment instance not found: {id}"),
            Self::UnknownPart(id) => write!(f, "part not found: {id}"),
            Self::UnknownActivity(id) => write!(f, "activity not found: {id}"),
            Self::UnknownObjective(index) => write!(f, "objective index out of range: {index}"),
            Self::Unauthenticated => write!(f, "no signed-in user"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Visibility(err) => Some(err),
            Self::TargetInvalid { mismatch, .. } => Some(mismatch),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GuardViolation> for EngineError {
    fn from(value: GuardViolation) -> Self {
        Self::Validation(value)
    }
}

impl From<VisibilityError> for EngineError {
    fn from(value: VisibilityError) -> Self {
        Self::Visibility(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
