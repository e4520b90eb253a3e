//! SQLite implementation of `TemplateStore`.
//!
//! # Invariants
//! - Multi-row writes run inside one immediate transaction each.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Instance rows live in their own tables; template writes never touch them.

use super::{StoreError, StoreResult, TemplateStore};
use crate::model::instance::{InstanceHeader, InstanceId};
use crate::model::template::{
    Activity, ActivityKind, Part, PartId, PartKind, Template, TemplateId, TemplateStatus,
};
use crate::visibility::{VisibilityMode, VisibilityWindow};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use uuid::Uuid;

const REQUIRED_TABLES: &[&str] = &[
    "templates",
    "template_parts",
    "template_activities",
    "assignment_instances",
    "instance_parts",
    "instance_activities",
];

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id,
    author_id,
    title,
    status,
    grade_ref,
    track_ref,
    strand_ref,
    subject_ref,
    objectives_json,
    duration_minutes,
    audience,
    revision,
    updated_at
FROM templates";

const INSTANCE_SELECT_SQL: &str = "SELECT
    id,
    template_id,
    template_title,
    template_duration,
    section_id,
    term_id,
    schedule_id,
    assigned_by,
    visibility_mode,
    visible_from,
    visible_until,
    created_at
FROM assignment_instances";

/// Which table family a part/activity row lives in.
#[derive(Debug, Clone, Copy)]
enum ContentTables {
    Template,
    Instance,
}

impl ContentTables {
    fn parts(self) -> &'static str {
        match self {
            Self::Template => "template_parts",
            Self::Instance => "instance_parts",
        }
    }

    fn activities(self) -> &'static str {
        match self {
            Self::Template => "template_activities",
            Self::Instance => "instance_activities",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            Self::Template => "template_id",
            Self::Instance => "instance_id",
        }
    }
}

/// SQLite-backed template store.
pub struct SqliteTemplateStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateStore<'conn> {
    /// Constructs a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(StoreError::MissingRequiredTable(*table));
            }
        }
        Ok(Self { conn })
    }

    fn immediate(&self) -> StoreResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl TemplateStore for SqliteTemplateStore<'_> {
    fn read_template(&self, id: TemplateId) -> StoreResult<Option<Template>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_template_row(row)?));
        }
        Ok(None)
    }

    fn read_parts(&self, template_id: TemplateId) -> StoreResult<Vec<Part>> {
        read_parts_in(self.conn, ContentTables::Template, template_id)
    }

    fn read_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>> {
        read_activities_in(self.conn, ContentTables::Template, part_ids)
    }

    fn write_template(&self, header: &Template) -> StoreResult<TemplateId> {
        let objectives_json = serde_json::to_string(&header.objectives)
            .map_err(|err| StoreError::InvalidData(format!("objectives not encodable: {err}")))?;
        let id_text = header.id.to_string();

        let tx = self.immediate()?;
        let stored_revision: Option<u32> = tx
            .query_row(
                "SELECT revision FROM templates WHERE id = ?1;",
                [id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match stored_revision {
            None => {
                tx.execute(
                    "INSERT INTO templates (
                        id,
                        author_id,
                        title,
                        status,
                        grade_ref,
                        track_ref,
                        strand_ref,
                        subject_ref,
                        objectives_json,
                        duration_minutes,
                        audience,
                        revision,
                        updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
                    params![
                        id_text,
                        header.author_id.to_string(),
                        header.title,
                        header.status.as_str(),
                        header.grade_ref,
                        header.track_ref,
                        header.strand_ref,
                        header.subject_ref,
                        objectives_json,
                        header.duration_minutes,
                        header.audience,
                        header.revision + 1,
                        header.updated_at,
                    ],
                )?;
            }
            Some(stored) if stored == header.revision => {
                tx.execute(
                    "UPDATE templates
                     SET
                        title = ?2,
                        status = ?3,
                        grade_ref = ?4,
                        track_ref = ?5,
                        strand_ref = ?6,
                        subject_ref = ?7,
                        objectives_json = ?8,
                        duration_minutes = ?9,
                        audience = ?10,
                        revision = revision + 1,
                        updated_at = ?11
                     WHERE id = ?1;",
                    params![
                        id_text,
                        header.title,
                        header.status.as_str(),
                        header.grade_ref,
                        header.track_ref,
                        header.strand_ref,
                        header.subject_ref,
                        objectives_json,
                        header.duration_minutes,
                        header.audience,
                        header.updated_at,
                    ],
                )?;
            }
            Some(stored) => {
                return Err(StoreError::Conflict {
                    template_id: header.id,
                    expected_revision: header.revision,
                    stored_revision: stored,
                });
            }
        }

        tx.commit()?;
        Ok(header.id)
    }

    fn replace_parts(&self, template_id: TemplateId, parts: &[Part]) -> StoreResult<()> {
        if let Some(foreign) = parts.iter().find(|part| part.owner_id != template_id) {
            return Err(StoreError::InvalidData(format!(
                "part {} is owned by {}, not template {template_id}",
                foreign.id, foreign.owner_id
            )));
        }

        let tx = self.immediate()?;
        tx.execute(
            "DELETE FROM template_parts WHERE template_id = ?1;",
            [template_id.to_string()],
        )?;
        insert_parts(&tx, ContentTables::Template, parts)?;
        tx.commit()?;
        Ok(())
    }

    fn replace_activities(&self, part_ids: &[PartId], activities: &[Activity]) -> StoreResult<()> {
        let allowed: HashSet<PartId> = part_ids.iter().copied().collect();
        if let Some(stray) = activities
            .iter()
            .find(|activity| !allowed.contains(&activity.part_id))
        {
            return Err(StoreError::InvalidData(format!(
                "activity {} targets part {} outside the replaced set",
                stray.id, stray.part_id
            )));
        }

        let tx = self.immediate()?;
        for part_id in part_ids {
            tx.execute(
                "DELETE FROM template_activities WHERE part_id = ?1;",
                [part_id.to_string()],
            )?;
        }
        insert_activities(&tx, ContentTables::Template, activities)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_instance(&self, header: &InstanceHeader) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO assignment_instances (
                id,
                template_id,
                template_title,
                template_duration,
                section_id,
                term_id,
                schedule_id,
                assigned_by,
                visibility_mode,
                visible_from,
                visible_until,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                header.id.to_string(),
                header.template_id.to_string(),
                header.template_title,
                header.template_duration,
                header.section_id,
                header.term_id,
                header.schedule_id,
                header.assigned_by.map(|id| id.to_string()),
                header.visibility.mode.as_str(),
                header.visibility.visible_from.map(|at| at.timestamp_millis()),
                header.visibility.visible_until.map(|at| at.timestamp_millis()),
                header.created_at,
            ],
        )?;
        Ok(())
    }

    fn insert_instance_parts(&self, parts: &[Part]) -> StoreResult<()> {
        let tx = self.immediate()?;
        insert_parts(&tx, ContentTables::Instance, parts)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_instance_activities(&self, activities: &[Activity]) -> StoreResult<()> {
        let tx = self.immediate()?;
        insert_activities(&tx, ContentTables::Instance, activities)?;
        tx.commit()?;
        Ok(())
    }

    fn read_instance(&self, id: InstanceId) -> StoreResult<Option<InstanceHeader>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INSTANCE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_instance_row(row)?));
        }
        Ok(None)
    }

    fn read_instance_parts(&self, instance_id: InstanceId) -> StoreResult<Vec<Part>> {
        read_parts_in(self.conn, ContentTables::Instance, instance_id)
    }

    fn read_instance_activities(&self, part_ids: &[PartId]) -> StoreResult<Vec<Activity>> {
        read_activities_in(self.conn, ContentTables::Instance, part_ids)
    }

    fn update_instance_visibility(
        &self,
        id: InstanceId,
        window: &VisibilityWindow,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE assignment_instances
             SET
                visibility_mode = ?2,
                visible_from = ?3,
                visible_until = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                window.mode.as_str(),
                window.visible_from.map(|at| at.timestamp_millis()),
                window.visible_until.map(|at| at.timestamp_millis()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment instance",
                id,
            });
        }
        Ok(())
    }

    fn delete_instance(&self, id: InstanceId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM assignment_instances WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment instance",
                id,
            });
        }
        Ok(())
    }
}

fn read_parts_in(conn: &Connection, tables: ContentTables, owner_id: Uuid) -> StoreResult<Vec<Part>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT
            id,
            {owner} AS owner_id,
            position,
            kind,
            title,
            body,
            collapsed
         FROM {table}
         WHERE {owner} = ?1
         ORDER BY position ASC;",
        owner = tables.owner_column(),
        table = tables.parts(),
    ))?;
    let mut rows = stmt.query([owner_id.to_string()])?;
    let mut parts = Vec::new();
    while let Some(row) = rows.next()? {
        parts.push(parse_part_row(row, tables)?);
    }
    Ok(parts)
}

fn read_activities_in(
    conn: &Connection,
    tables: ContentTables,
    part_ids: &[PartId],
) -> StoreResult<Vec<Activity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT
            id,
            part_id,
            position,
            kind,
            title,
            instructions,
            estimated_minutes,
            attachable
         FROM {table}
         WHERE part_id = ?1
         ORDER BY position ASC;",
        table = tables.activities(),
    ))?;
    let mut activities = Vec::new();
    for part_id in part_ids {
        let mut rows = stmt.query([part_id.to_string()])?;
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row, tables)?);
        }
    }
    Ok(activities)
}

fn insert_parts(tx: &Transaction<'_>, tables: ContentTables, parts: &[Part]) -> StoreResult<()> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} (id, {owner}, position, kind, title, body, collapsed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        table = tables.parts(),
        owner = tables.owner_column(),
    ))?;
    for part in parts {
        stmt.execute(params![
            part.id.to_string(),
            part.owner_id.to_string(),
            part.position,
            part.kind.as_str(),
            part.title,
            part.body,
            bool_to_int(part.collapsed),
        ])?;
    }
    Ok(())
}

fn insert_activities(
    tx: &Transaction<'_>,
    tables: ContentTables,
    activities: &[Activity],
) -> StoreResult<()> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} (
            id,
            part_id,
            position,
            kind,
            title,
            instructions,
            estimated_minutes,
            attachable
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        table = tables.activities(),
    ))?;
    for activity in activities {
        stmt.execute(params![
            activity.id.to_string(),
            activity.part_id.to_string(),
            activity.position,
            activity.kind.as_str(),
            activity.title,
            activity.instructions,
            activity.estimated_minutes,
            bool_to_int(activity.attachable),
        ])?;
    }
    Ok(())
}

fn parse_template_row(row: &Row<'_>) -> StoreResult<Template> {
    let status_text: String = row.get("status")?;
    let status = TemplateStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid status `{status_text}` in templates.status"
        ))
    })?;

    let objectives_json: String = row.get("objectives_json")?;
    let objectives: Vec<String> = serde_json::from_str(&objectives_json).map_err(|err| {
        StoreError::InvalidData(format!("invalid templates.objectives_json: {err}"))
    })?;

    Ok(Template {
        id: parse_uuid_column(row, "id", "templates.id")?,
        author_id: parse_uuid_column(row, "author_id", "templates.author_id")?,
        title: row.get("title")?,
        status,
        grade_ref: row.get("grade_ref")?,
        track_ref: row.get("track_ref")?,
        strand_ref: row.get("strand_ref")?,
        subject_ref: row.get("subject_ref")?,
        objectives,
        duration_minutes: row.get("duration_minutes")?,
        audience: row.get("audience")?,
        revision: row.get("revision")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_part_row(row: &Row<'_>, tables: ContentTables) -> StoreResult<Part> {
    let kind_text: String = row.get("kind")?;
    let kind = PartKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid part kind `{kind_text}` in {}.kind",
            tables.parts()
        ))
    })?;

    Ok(Part {
        id: parse_uuid_column(row, "id", tables.parts())?,
        owner_id: parse_uuid_column(row, "owner_id", tables.owner_column())?,
        position: row.get("position")?,
        kind,
        title: row.get("title")?,
        body: row.get("body")?,
        collapsed: int_to_bool(row.get("collapsed")?, "collapsed")?,
    })
}

fn parse_activity_row(row: &Row<'_>, tables: ContentTables) -> StoreResult<Activity> {
    let kind_text: String = row.get("kind")?;
    let kind = ActivityKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid activity kind `{kind_text}` in {}.kind",
            tables.activities()
        ))
    })?;

    Ok(Activity {
        id: parse_uuid_column(row, "id", tables.activities())?,
        part_id: parse_uuid_column(row, "part_id", tables.activities())?,
        position: row.get("position")?,
        kind,
        title: row.get("title")?,
        instructions: row.get("instructions")?,
        estimated_minutes: row.get("estimated_minutes")?,
        attachable: int_to_bool(row.get("attachable")?, "attachable")?,
    })
}

fn parse_instance_row(row: &Row<'_>) -> StoreResult<InstanceHeader> {
    let mode_text: String = row.get("visibility_mode")?;
    let mode = VisibilityMode::parse(&mode_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid visibility mode `{mode_text}` in assignment_instances.visibility_mode"
        ))
    })?;
    let assigned_by = match row.get::<_, Option<String>>("assigned_by")? {
        Some(value) => Some(parse_uuid(&value, "assignment_instances.assigned_by")?),
        None => None,
    };

    Ok(InstanceHeader {
        id: parse_uuid_column(row, "id", "assignment_instances.id")?,
        template_id: parse_uuid_column(row, "template_id", "assignment_instances.template_id")?,
        template_title: row.get("template_title")?,
        template_duration: row.get("template_duration")?,
        section_id: row.get("section_id")?,
        term_id: row.get("term_id")?,
        schedule_id: row.get("schedule_id")?,
        assigned_by,
        visibility: VisibilityWindow {
            mode,
            visible_from: parse_millis(row.get("visible_from")?, "visible_from")?,
            visible_until: parse_millis(row.get("visible_until")?, "visible_until")?,
        },
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid_column(row: &Row<'_>, column: &str, label: &str) -> StoreResult<Uuid> {
    let value: String = row.get(column)?;
    parse_uuid(&value, label)
}

fn parse_uuid(value: &str, label: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {label}")))
}

fn parse_millis(value: Option<i64>, column: &str) -> StoreResult<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(millis) => DateTime::from_timestamp_millis(millis).map(Some).ok_or_else(|| {
            StoreError::InvalidData(format!("timestamp `{millis}` out of range in {column}"))
        }),
    }
}

fn int_to_bool(value: i64, column: &str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
