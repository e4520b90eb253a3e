//! Change tracking for template edit sessions.
//!
//! # Responsibility
//! - Compute a canonical fingerprint of the editable template state.
//! - Derive the "unsaved changes" flag from a fingerprint and its baseline.
//!
//! # Invariants
//! - Fingerprinting is pure: no I/O, no clock, no randomness.
//! - Object keys are written in lexicographic order by this module, so field
//!   and insertion order never affect equality.
//! - Part and activity order is carried by array order and does affect
//!   equality.
//! - Ids, positions, status, revision and timestamps are not part of the
//!   fingerprint.

use crate::model::template::{Activity, PartBlock, TemplateDocument};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Canonical serialization of editable template state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a template document.
pub fn compute_fingerprint(document: &TemplateDocument) -> Fingerprint {
    let template = &document.template;
    let value = json!({
        "title": template.title,
        "gradeRef": template.grade_ref,
        "trackRef": template.track_ref,
        "strandRef": template.strand_ref,
        "subjectRef": template.subject_ref,
        "objectives": template.objectives,
        "duration": template.duration_minutes,
        "audience": template.audience,
        "parts": document.parts.iter().map(part_value).collect::<Vec<_>>(),
    });
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);
    Fingerprint(canonical)
}

/// Compact JSON with object keys emitted in sorted order.
///
/// Sorting here keeps the output stable when `serde_json/preserve_order`
/// switches `Map` to insertion order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(left, _), (right, _)| left.cmp(right));
            out.push('{');
            for (index, (key, entry)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(entry, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Returns whether `current` differs from `baseline`.
///
/// Without a baseline (a draft that was never saved) nothing is dirty.
pub fn is_dirty(current: &Fingerprint, baseline: Option<&Fingerprint>) -> bool {
    baseline.is_some_and(|baseline| baseline != current)
}

fn part_value(block: &PartBlock) -> Value {
    json!({
        "type": block.part.kind.as_str(),
        "title": block.part.title,
        "body": block.part.body,
        "collapsed": block.part.collapsed,
        "activities": block.activities.iter().map(activity_value).collect::<Vec<_>>(),
    })
}

fn activity_value(activity: &Activity) -> Value {
    json!({
        "type": activity.kind.as_str(),
        "title": activity.title,
        "instructions": activity.instructions,
        "estimatedDuration": activity.estimated_minutes,
        "attachable": activity.attachable,
    })
}

/// Last-persisted fingerprint of one edit session.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    baseline: Option<Fingerprint>,
}

impl ChangeTracker {
    /// Tracker for a draft that has never been persisted.
    pub fn unsaved() -> Self {
        Self::default()
    }

    /// Tracker whose baseline is the given persisted state.
    pub fn persisted(document: &TemplateDocument) -> Self {
        Self {
            baseline: Some(compute_fingerprint(document)),
        }
    }

    /// Replaces the baseline after a successful persist.
    pub fn rebaseline(&mut self, document: &TemplateDocument) {
        self.baseline = Some(compute_fingerprint(document));
    }

    pub fn baseline(&self) -> Option<&Fingerprint> {
        self.baseline.as_ref()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn is_dirty(&self, document: &TemplateDocument) -> bool {
        is_dirty(&compute_fingerprint(document), self.baseline.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_fingerprint, is_dirty, write_canonical, ChangeTracker};
    use crate::model::template::{
        Activity, ActivityKind, Part, PartBlock, PartKind, Template, TemplateDocument,
        TemplateStatus,
    };
    use uuid::Uuid;

    fn sample_document() -> TemplateDocument {
        let mut template = Template::new_draft(Uuid::new_v4());
        template.title = "Photosynthesis".to_string();
        template.grade_ref = Some("G7".to_string());
        template.objectives = vec!["Explain light reactions".to_string()];
        let owner = template.id;
        let mut document = TemplateDocument::new(template);

        for (index, kind) in [PartKind::Introduction, PartKind::Instruction, PartKind::Closure]
            .into_iter()
            .enumerate()
        {
            let mut part = Part::new(owner, index as u32 + 1, kind, kind.default_title());
            part.body = format!("body {index}");
            let mut block = PartBlock::new(part);
            block.activities.push(Activity::new(
                block.part.id,
                1,
                ActivityKind::Reading,
                "Read",
            ));
            block.activities.push(Activity::new(
                block.part.id,
                2,
                ActivityKind::Quiz,
                "Check",
            ));
            document.parts.push(block);
        }
        document
    }

    #[test]
    fn fingerprint_is_reflexive() {
        let document = sample_document();
        let fingerprint = compute_fingerprint(&document);
        assert!(!is_dirty(&fingerprint, Some(&compute_fingerprint(&document))));
    }

    #[test]
    fn no_baseline_is_never_dirty() {
        let document = sample_document();
        assert!(!is_dirty(&compute_fingerprint(&document), None));
        assert!(!ChangeTracker::unsaved().is_dirty(&document));
    }

    #[test]
    fn part_order_changes_fingerprint() {
        let document = sample_document();
        let mut swapped = document.clone();
        swapped.parts.swap(0, 2);
        swapped.renumber();
        assert_ne!(compute_fingerprint(&document), compute_fingerprint(&swapped));

        let mut rotated = document.clone();
        rotated.parts.rotate_left(1);
        rotated.renumber();
        assert_ne!(compute_fingerprint(&document), compute_fingerprint(&rotated));
    }

    #[test]
    fn activity_order_changes_fingerprint() {
        let document = sample_document();
        let mut swapped = document.clone();
        swapped.parts[1].activities.swap(0, 1);
        swapped.parts[1].renumber();
        assert_ne!(compute_fingerprint(&document), compute_fingerprint(&swapped));
    }

    #[test]
    fn resetting_same_title_keeps_fingerprint() {
        let document = sample_document();
        let mut retitled = document.clone();
        retitled.template.title = String::from("Photosynthesis");
        assert_eq!(compute_fingerprint(&document), compute_fingerprint(&retitled));
    }

    #[test]
    fn ids_status_and_timestamps_are_ignored() {
        let document = sample_document();
        let mut other = document.clone();
        other.template.id = Uuid::new_v4();
        other.template.status = TemplateStatus::Published;
        other.template.revision = 9;
        other.template.updated_at = 1_700_000_000_000;
        for block in &mut other.parts {
            block.part.id = Uuid::new_v4();
        }
        other.renumber();
        assert_eq!(compute_fingerprint(&document), compute_fingerprint(&other));
    }

    #[test]
    fn keys_are_sorted_in_canonical_form() {
        let fingerprint = compute_fingerprint(&sample_document());
        let text = fingerprint.as_str();
        let audience = text.find("\"audience\"").unwrap();
        let title = text.find("\"title\"").unwrap();
        assert!(audience < title);
    }

    #[test]
    fn canonical_writer_sorts_keys_at_every_depth() {
        let mut map = serde_json::Map::new();
        map.insert("zeta".to_string(), serde_json::json!([{"b": 1, "a": "x\"y"}]));
        map.insert("alpha".to_string(), serde_json::Value::Null);
        let mut out = String::new();
        write_canonical(&serde_json::Value::Object(map), &mut out);
        assert_eq!(out, r#"{"alpha":null,"zeta":[{"a":"x\"y","b":1}]}"#);
    }

    #[test]
    fn tracker_detects_edit_and_clears_on_rebaseline() {
        let mut document = sample_document();
        let mut tracker = ChangeTracker::persisted(&document);
        assert!(!tracker.is_dirty(&document));

        document.parts[0].part.collapsed = true;
        assert!(tracker.is_dirty(&document));

        tracker.rebaseline(&document);
        assert!(!tracker.is_dirty(&document));
    }
}
