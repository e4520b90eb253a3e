//! Deployment target eligibility.
//!
//! A template constrains targets on three nullable dimensions (grade, track,
//! strand). A dimension with no template value imposes no constraint; a
//! dimension with a value requires the target to carry exactly that value.
//! A target is eligible only when all three dimensions pass.

use crate::model::instance::DeploymentTarget;
use crate::model::reference::is_valid_reference;
use crate::model::template::Template;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Constraint dimensions, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintDimension {
    Grade,
    Track,
    Strand,
}

impl ConstraintDimension {
    pub const ALL: [ConstraintDimension; 3] = [Self::Grade, Self::Track, Self::Strand];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grade => "grade",
            Self::Track => "track",
            Self::Strand => "strand",
        }
    }

    fn template_value(self, template: &Template) -> Option<&str> {
        match self {
            Self::Grade => template.grade_ref.as_deref(),
            Self::Track => template.track_ref.as_deref(),
            Self::Strand => template.strand_ref.as_deref(),
        }
    }

    fn target_value(self, target: &DeploymentTarget) -> Option<&str> {
        match self {
            Self::Grade => target.grade_ref.as_deref(),
            Self::Track => target.track_ref.as_deref(),
            Self::Strand => target.strand_ref.as_deref(),
        }
    }
}

/// Why a target is not eligible for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMismatch {
    /// Target itself is not structurally valid.
    Malformed { field: &'static str },
    /// Target fails one constraint dimension.
    Constraint {
        dimension: ConstraintDimension,
        required: String,
        actual: Option<String>,
    },
}

impl Display for TargetMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { field } => write!(f, "target field `{field}` is malformed"),
            Self::Constraint {
                dimension,
                required,
                actual,
            } => write!(
                f,
                "{} must be `{required}`, target has `{}`",
                dimension.as_str(),
                actual.as_deref().unwrap_or("none")
            ),
        }
    }
}

impl Error for TargetMismatch {}

/// Checks structural validity of a target on its own.
pub fn check_target_shape(target: &DeploymentTarget) -> Result<(), TargetMismatch> {
    for (field, value) in [
        ("section_id", target.section_id.as_str()),
        ("term_id", target.term_id.as_str()),
        ("schedule_id", target.schedule_id.as_str()),
    ] {
        if value.trim().is_empty() {
            return Err(TargetMismatch::Malformed { field });
        }
    }
    for dimension in ConstraintDimension::ALL {
        if let Some(value) = dimension.target_value(target) {
            if !is_valid_reference(value) {
                return Err(TargetMismatch::Malformed {
                    field: dimension.as_str(),
                });
            }
        }
    }
    Ok(())
}

/// Checks one target against a template, reporting the first failure.
pub fn check_target(template: &Template, target: &DeploymentTarget) -> Result<(), TargetMismatch> {
    check_target_shape(target)?;
    for dimension in ConstraintDimension::ALL {
        let Some(required) = dimension.template_value(template) else {
            continue;
        };
        let actual = dimension.target_value(target);
        if actual != Some(required) {
            return Err(TargetMismatch::Constraint {
                dimension,
                required: required.to_string(),
                actual: actual.map(str::to_string),
            });
        }
    }
    Ok(())
}

pub fn is_eligible(template: &Template, target: &DeploymentTarget) -> bool {
    check_target(template, target).is_ok()
}

/// Filters candidates down to eligible targets, preserving input order.
pub fn eligible_targets<'a>(
    template: &Template,
    candidates: &'a [DeploymentTarget],
) -> Vec<&'a DeploymentTarget> {
    candidates
        .iter()
        .filter(|candidate| is_eligible(template, candidate))
        .collect()
}
