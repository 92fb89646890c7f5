//! Timeline store contract and SQLite implementation.
//!
//! # Responsibility
//! - Read a day's activities and groups (groups pre-resolved with members).
//! - Persist group creation/dissolution and per-record flag patches.
//!
//! # Invariants
//! - `create_group` and `delete_group` update the group row and every
//!   member's `group_uuid` inside one transaction.
//! - `create_group` is not idempotent and must not be retried blindly.
//! - All other writes are idempotent.
//! - Members are returned in `member_order`, matching `member_ids`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
use crate::model::day::TimelineDay;
use crate::model::group::{ActivityGroup, ResolvedGroup};
use crate::model::validation::ValidationError;
use crate::model::RecordRef;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    activity_uuid,
    url,
    domain,
    title,
    start_ms,
    end_ms,
    duration_seconds,
    client_uuid,
    group_uuid,
    is_hidden,
    source
FROM activities";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store reads and writes.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound(RecordRef),
    /// Activity was grouped concurrently with a create request.
    AlreadyGrouped {
        activity_id: ActivityId,
        group_id: GroupId,
    },
    /// Record failed validation before a write.
    Validation(ValidationError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(target) => write!(f, "{target} not found"),
            Self::AlreadyGrouped {
                activity_id,
                group_id,
            } => write!(f, "activity {activity_id} is already grouped in {group_id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "timeline store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid timeline data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound(_)
            | Self::AlreadyGrouped { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
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

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Backing store used by the grouping engine and controller.
pub trait TimelineStore {
    /// Ingests one captured activity.
    fn insert_activity(&self, activity: &ActivityRecord) -> StoreResult<()>;
    /// Loads one activity by id.
    fn get_activity(&self, id: ActivityId) -> StoreResult<Option<ActivityRecord>>;
    /// Lists activities starting within the day, ordered by start then id.
    fn list_activities(
        &self,
        day: &TimelineDay,
        include_hidden: bool,
    ) -> StoreResult<Vec<ActivityRecord>>;
    /// Loads one group with its members.
    fn get_group(&self, id: GroupId) -> StoreResult<Option<ResolvedGroup>>;
    /// Lists groups with at least one member starting within the day.
    fn list_groups(&self, day: &TimelineDay) -> StoreResult<Vec<ResolvedGroup>>;
    /// Persists a new group and links every member to it.
    fn create_group(&self, group: &ActivityGroup) -> StoreResult<()>;
    /// Unlinks every member and removes the group.
    fn delete_group(&self, id: GroupId) -> StoreResult<()>;
    fn update_group_client(&self, id: GroupId, client_id: Option<ClientId>) -> StoreResult<()>;
    fn update_activity_client(
        &self,
        id: ActivityId,
        client_id: Option<ClientId>,
    ) -> StoreResult<()>;
    /// Sets `hidden` on every listed activity, or on none of them.
    fn update_activity_hidden(&self, ids: &[ActivityId], hidden: bool) -> StoreResult<()>;
}

/// SQLite-backed timeline store.
pub struct SqliteTimelineStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTimelineStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl TimelineStore for SqliteTimelineStore<'_> {
    fn insert_activity(&self, activity: &ActivityRecord) -> StoreResult<()> {
        activity.validate()?;

        self.conn.execute(
            "INSERT INTO activities (
                activity_uuid,
                url,
                domain,
                title,
                start_ms,
                end_ms,
                duration_seconds,
                client_uuid,
                group_uuid,
                is_hidden,
                source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10);",
            params![
                activity.id.to_string(),
                activity.url.as_str(),
                activity.domain.as_str(),
                activity.title.as_str(),
                activity.start.timestamp_millis(),
                activity.end.timestamp_millis(),
                activity.duration_seconds,
                activity.client_id.map(|value| value.to_string()),
                bool_to_int(activity.hidden),
                activity.source.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_activity(&self, id: ActivityId) -> StoreResult<Option<ActivityRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE activity_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn list_activities(
        &self,
        day: &TimelineDay,
        include_hidden: bool,
    ) -> StoreResult<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL}
             WHERE start_ms >= ?1
               AND start_ms < ?2
               AND (?3 = 1 OR is_hidden = 0)
             ORDER BY start_ms ASC, activity_uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            day.start().timestamp_millis(),
            day.end().timestamp_millis(),
            bool_to_int(include_hidden),
        ])?;

        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn get_group(&self, id: GroupId) -> StoreResult<Option<ResolvedGroup>> {
        load_resolved_group(self.conn, id)
    }

    fn list_groups(&self, day: &TimelineDay) -> StoreResult<Vec<ResolvedGroup>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT g.group_uuid
             FROM activity_groups g
             INNER JOIN activities a ON a.group_uuid = g.group_uuid
             WHERE a.start_ms >= ?1
               AND a.start_ms < ?2
             ORDER BY g.group_uuid ASC;",
        )?;
        let mut rows = stmt.query(params![
            day.start().timestamp_millis(),
            day.end().timestamp_millis(),
        ])?;

        let mut group_ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            group_ids.push(parse_uuid(&value, "activity_groups.group_uuid")?);
        }

        let mut groups = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            let group = load_resolved_group(self.conn, group_id)?.ok_or_else(|| {
                StoreError::InvalidData(format!("group {group_id} vanished during read"))
            })?;
            groups.push(group);
        }
        Ok(groups)
    }

    fn create_group(&self, group: &ActivityGroup) -> StoreResult<()> {
        group.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO activity_groups (group_uuid, client_uuid) VALUES (?1, ?2);",
            params![
                group.id.to_string(),
                group.client_id.map(|value| value.to_string()),
            ],
        )?;

        for (index, member_id) in group.member_ids.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE activities
                 SET group_uuid = ?2,
                     member_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE activity_uuid = ?1
                   AND group_uuid IS NULL;",
                params![member_id.to_string(), group.id.to_string(), index as i64],
            )?;
            if changed == 0 {
                // Dropping `tx` rolls back the group row and earlier members.
                return Err(match current_group_of(&tx, *member_id)? {
                    None => StoreError::NotFound(RecordRef::Activity(*member_id)),
                    Some(Some(existing)) => StoreError::AlreadyGrouped {
                        activity_id: *member_id,
                        group_id: existing,
                    },
                    Some(None) => StoreError::InvalidData(format!(
                        "activity {member_id} could not be linked to group {}",
                        group.id
                    )),
                });
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE activities
             SET group_uuid = NULL,
                 member_order = NULL,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE group_uuid = ?1;",
            [id.to_string()],
        )?;
        let deleted = tx.execute(
            "DELETE FROM activity_groups WHERE group_uuid = ?1;",
            [id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound(RecordRef::Group(id)));
        }
        tx.commit()?;
        Ok(())
    }

    fn update_group_client(&self, id: GroupId, client_id: Option<ClientId>) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE activity_groups
             SET client_uuid = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE group_uuid = ?1;",
            params![id.to_string(), client_id.map(|value| value.to_string())],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(RecordRef::Group(id)));
        }
        Ok(())
    }

    fn update_activity_client(
        &self,
        id: ActivityId,
        client_id: Option<ClientId>,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE activities
             SET client_uuid = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE activity_uuid = ?1;",
            params![id.to_string(), client_id.map(|value| value.to_string())],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(RecordRef::Activity(id)));
        }
        Ok(())
    }

    fn update_activity_hidden(&self, ids: &[ActivityId], hidden: bool) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for id in ids {
            let changed = tx.execute(
                "UPDATE activities
                 SET is_hidden = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE activity_uuid = ?1;",
                params![id.to_string(), bool_to_int(hidden)],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(RecordRef::Activity(*id)));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn load_resolved_group(conn: &Connection, id: GroupId) -> StoreResult<Option<ResolvedGroup>> {
    let client_text: Option<Option<String>> = conn
        .query_row(
            "SELECT client_uuid FROM activity_groups WHERE group_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(client_text) = client_text else {
        return Ok(None);
    };
    let client_id = client_text
        .map(|value| parse_uuid(&value, "activity_groups.client_uuid"))
        .transpose()?;

    let mut stmt = conn.prepare(&format!(
        "{ACTIVITY_SELECT_SQL}
         WHERE group_uuid = ?1
         ORDER BY member_order ASC, activity_uuid ASC;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(parse_activity_row(row)?);
    }

    let group = ActivityGroup {
        id,
        client_id,
        member_ids: members.iter().map(|member| member.id).collect(),
    };
    group.validate().map_err(|err| {
        StoreError::InvalidData(format!("group {id} violates membership rules: {err}"))
    })?;
    Ok(Some(ResolvedGroup::new(group, members)))
}

/// `None` when the activity is missing, `Some(group)` otherwise.
fn current_group_of(
    conn: &Connection,
    activity_id: ActivityId,
) -> StoreResult<Option<Option<GroupId>>> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT group_uuid FROM activities WHERE activity_uuid = ?1;",
            [activity_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|group| {
            group
                .map(|text| parse_uuid(&text, "activities.group_uuid"))
                .transpose()
        })
        .transpose()
}

fn parse_activity_row(row: &Row<'_>) -> StoreResult<ActivityRecord> {
    let id_text: String = row.get("activity_uuid")?;
    let id = parse_uuid(&id_text, "activities.activity_uuid")?;

    let client_id = row
        .get::<_, Option<String>>("client_uuid")?
        .map(|value| parse_uuid(&value, "activities.client_uuid"))
        .transpose()?;
    let group_id = row
        .get::<_, Option<String>>("group_uuid")?
        .map(|value| parse_uuid(&value, "activities.group_uuid"))
        .transpose()?;

    let hidden = match row.get::<_, i64>("is_hidden")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_hidden value `{other}` in activities.is_hidden"
            )));
        }
    };

    let activity = ActivityRecord {
        id,
        url: row.get("url")?,
        domain: row.get("domain")?,
        title: row.get("title")?,
        start: parse_millis(row.get("start_ms")?, "activities.start_ms")?,
        end: parse_millis(row.get("end_ms")?, "activities.end_ms")?,
        duration_seconds: row.get("duration_seconds")?,
        client_id,
        group_id,
        hidden,
        source: row.get("source")?,
    };
    activity
        .validate()
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;
    Ok(activity)
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_millis(value: i64, column: &'static str) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| StoreError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
