//! Lesson template lifecycle and snapshot-assignment engine.
//!
//! Instructors edit draft templates, publish them, and deploy published
//! templates to class schedule slots as independent assignment instances.

pub mod budget;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod materializer;
pub mod model;
pub mod repo;
pub mod service;
pub mod visibility;

pub use budget::DeploymentBudget;
pub use config::{ConfigError, EngineConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use eligibility::{eligible_targets, is_eligible, ConstraintDimension, TargetMismatch};
pub use error::{EngineError, EngineResult};
pub use fingerprint::{compute_fingerprint, is_dirty, ChangeTracker, Fingerprint};
pub use identity::{IdentityProvider, StaticIdentity};
pub use lifecycle::{GuardRules, GuardViolation, Transition};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use materializer::materialize;
pub use model::instance::{AssignmentInstance, DeploymentTarget, InstanceHeader, InstanceId};
pub use model::template::{
    Activity, ActivityId, ActivityKind, Part, PartBlock, PartId, PartKind, Template,
    TemplateDocument, TemplateId, TemplateStatus, UserId,
};
pub use repo::{SqliteTemplateStore, StoreError, StoreResult, TemplateStore};
pub use service::assignment_service::{AssignmentService, Deployment};
pub use service::template_editor::{ActivityPatch, PartPatch, SaveOutcome, TemplateEditor};
pub use visibility::{VisibilityError, VisibilityMode, VisibilityWindow};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
