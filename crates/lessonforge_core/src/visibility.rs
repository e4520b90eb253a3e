//! Per-instance visibility gate.
//!
//! # Responsibility
//! - Model whether and when a deployed instance is exposed to its audience.
//! - Validate the window locally, before any store call is attempted.
//!
//! # Invariants
//! - When both bounds are set, `visible_until >= visible_from`.
//! - The window never influences template status or target eligibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Visibility mode for an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    #[default]
    Hidden,
    Visible,
}

impl VisibilityMode {
    /// Stable storage string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Visible => "visible",
        }
    }

    /// Parses a storage string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hidden" => Some(Self::Hidden),
            "visible" => Some(Self::Visible),
            _ => None,
        }
    }
}

/// Local validation failure for a visibility window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    UntilBeforeFrom {
        visible_from: DateTime<Utc>,
        visible_until: DateTime<Utc>,
    },
}

impl Display for VisibilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UntilBeforeFrom {
                visible_from,
                visible_until,
            } => write!(
                f,
                "visible_until {} is earlier than visible_from {}",
                visible_until.to_rfc3339(),
                visible_from.to_rfc3339()
            ),
        }
    }
}

impl Error for VisibilityError {}

/// Hidden/visible gate with optional, independent start and end bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityWindow {
    pub mode: VisibilityMode,
    pub visible_from: Option<DateTime<Utc>>,
    pub visible_until: Option<DateTime<Utc>>,
}

impl VisibilityWindow {
    /// Hidden window with no bounds. Attached to new instances by default.
    pub fn hidden() -> Self {
        Self::default()
    }

    /// Visible window with no bounds.
    pub fn visible() -> Self {
        Self {
            mode: VisibilityMode::Visible,
            ..Self::default()
        }
    }

    pub fn opens_at(mut self, visible_from: DateTime<Utc>) -> Self {
        self.visible_from = Some(visible_from);
        self
    }

    pub fn closes_at(mut self, visible_until: DateTime<Utc>) -> Self {
        self.visible_until = Some(visible_until);
        self
    }

    /// Checks the bound ordering rule.
    pub fn validate(&self) -> Result<(), VisibilityError> {
        match (self.visible_from, self.visible_until) {
            (Some(visible_from), Some(visible_until)) if visible_until < visible_from => {
                Err(VisibilityError::UntilBeforeFrom {
                    visible_from,
                    visible_until,
                })
            }
            _ => Ok(()),
        }
    }

    /// Returns whether a viewer should surface the instance at `now`.
    ///
    /// Hidden windows are never visible. Visible windows are visible inside
    /// their bounds, both ends inclusive; a missing bound is open.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        if self.mode == VisibilityMode::Hidden {
            return false;
        }
        let started = self.visible_from.map_or(true, |from| now >= from);
        let not_ended = self.visible_until.map_or(true, |until| now <= until);
        started && not_ended
    }
}

#[cfg(test)]
mod tests {
    use super::{VisibilityError, VisibilityMode, VisibilityWindow};
    use chrono::{TimeZone, Utc};

    #[test]
    fn default_window_is_hidden_and_unbounded() {
        let window = VisibilityWindow::default();
        assert_eq!(window.mode, VisibilityMode::Hidden);
        assert!(window.visible_from.is_none());
        assert!(window.visible_until.is_none());
        assert!(window.validate().is_ok());
    }

    #[test]
    fn until_before_from_is_rejected() {
        let from = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        let err = VisibilityWindow::visible()
            .opens_at(from)
            .closes_at(until)
            .validate()
            .unwrap_err();
        assert!(matches!(err, VisibilityError::UntilBeforeFrom { .. }));
    }

    #[test]
    fn single_bound_and_equal_bounds_are_valid() {
        let day = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        assert!(VisibilityWindow::visible().opens_at(day).validate().is_ok());
        assert!(VisibilityWindow::visible().closes_at(day).validate().is_ok());
        assert!(VisibilityWindow::visible()
            .opens_at(day)
            .closes_at(day)
            .validate()
            .is_ok());
    }

    #[test]
    fn visibility_respects_mode_and_inclusive_bounds() {
        let from = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let inside = Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();

        let window = VisibilityWindow::visible().opens_at(from).closes_at(until);
        assert!(window.is_visible_at(from));
        assert!(window.is_visible_at(inside));
        assert!(window.is_visible_at(until));
        assert!(!window.is_visible_at(after));

        let hidden = VisibilityWindow {
            mode: VisibilityMode::Hidden,
            ..window
        };
        assert!(!hidden.is_visible_at(inside));
    }
}
