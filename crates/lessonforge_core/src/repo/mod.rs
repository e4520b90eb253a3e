//! Template store contracts.
//!
//! # Responsibility
//! - Define the narrow storage contract the engine consumes.
//! - Provide read helpers that assemble flat rows into owned trees.
//!
//! # Invariants
//! - Calls are synchronous and the engine issues them strictly in sequence;
//!   a failed call short-circuits the remaining steps of an operation.
//! - `replace_parts` and `replace_activities` each act as one logical unit
//!   with delete-then-insert semantics.
//! - `write_template` is insert-or-update by id guarded by the header
//!   `revision` (optimistic concurrency).
//! - Store errors are returned to callers unchanged; nothing here retries.

use crate::db::DbError;
use crate::model::instance::{AssignmentInstance, InstanceHeader, InstanceId};
use crate::model::template::{
    assemble_blocks, Activity, Part, PartId, Template, TemplateDocument, TemplateId,
};
use crate::visibility::VisibilityWindow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod sqlite_store;

pub use sqlite_store::SqliteTemplateStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage adapter failure.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Row addressed by id does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Header write carried a stale revision; nothing was written.
    Conflict {
        template_id: TemplateId,
        expected_revision: u32,
        stored_revision: u32,
    },
    /// Persisted or supplied rows violate the storage contract.
    InvalidData(String),
    /// Connection schema lacks a table this store needs.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict {
                template_id,
                expected_revision,
                stored_revision,
            } => write!(
                f,
                "template {template_id} was modified concurrently: expected revision {expected_revision}, stored {stored_revision}"
            ),
            Self::InvalidData(message) => write!(f, "invalid template data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "template store requires table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for templates and assignment instances.
pub trait TemplateStore {
    /// Loads one template header.
    fn read_template(&self, id: TemplateId) -> StoreResult<Option<Template>>;
    /// Loads a template's parts in ordinal order.
    fn read_parts(&self, template_id: TemplateId) -> StoreResult<Vec<Part>>;
    /// Loads activities belonging to the given parts only.
    fn read_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>>;
    /// Inserts or updates one header and returns its id.
    fn write_template(&self, header: &Template) -> StoreResult<TemplateId>;
    /// Replaces the full part set of a template.
    fn replace_parts(&self, template_id: TemplateId, parts: &[Part]) -> StoreResult<()>;
    /// Replaces the activities of the given parts.
    fn replace_activities(&self, part_ids: &[PartId], activities: &[Activity]) -> StoreResult<()>;

    fn insert_instance(&self, header: &InstanceHeader) -> StoreResult<()>;
    fn insert_instance_parts(&self, parts: &[Part]) -> StoreResult<()>;
    fn insert_instance_activities(&self, activities: &[Activity]) -> StoreResult<()>;
    fn read_instance(&self, id: InstanceId) -> StoreResult<Option<InstanceHeader>>;
    fn read_instance_parts(&self, instance_id: InstanceId) -> StoreResult<Vec<Part>>;
    fn read_instance_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>>;
    fn update_instance_visibility(
        &self,
        id: InstanceId,
        window: &VisibilityWindow,
    ) -> StoreResult<()>;
    /// Deletes one instance with its parts and activities.
    fn delete_instance(&self, id: InstanceId) -> StoreResult<()>;
}

/// Loads a template header with its full content tree.
pub fn load_document<S: TemplateStore + ?Sized>(
    store: &S,
    id: TemplateId,
) -> StoreResult<Option<TemplateDocument>> {
    let Some(template) = store.read_template(id)? else {
        return Ok(None);
    };
    let parts = store.read_parts(id)?;
    let part_ids: Vec<PartId> = parts.iter().map(|part| part.id).collect();
    let activities = store.read_activities(&part_ids)?;
    let parts = assemble_blocks(parts, activities).map_err(|activity_id| {
        StoreError::InvalidData(format!(
            "activity {activity_id} references a part outside template {id}"
        ))
    })?;
    Ok(Some(TemplateDocument { template, parts }))
}

/// Loads an instance header with its copied content tree.
pub fn load_instance<S: TemplateStore + ?Sized>(
    store: &S,
    id: InstanceId,
) -> StoreResult<Option<AssignmentInstance>> {
    let Some(header) = store.read_instance(id)? else {
        return Ok(None);
    };
    let parts = store.read_instance_parts(id)?;
    let part_ids: Vec<PartId> = parts.iter().map(|part| part.id).collect();
    let activities = store.read_instance_activities(&part_ids)?;
    let parts = assemble_blocks(parts, activities).map_err(|activity_id| {
        StoreError::InvalidData(format!(
            "activity {activity_id} references a part outside instance {id}"
        ))
    })?;
    Ok(Some(AssignmentInstance { header, parts }))
}
