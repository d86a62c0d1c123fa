use rusqlite::Connection;
use tracing::{debug, instrument};

use robinwood_core::ids::UsageEventId;
use robinwood_core::usage::UsageEvent;

use crate::database::Database;
use crate::error::{is_unique_violation, StoreError};
use crate::row_helpers::{get, get_opt, get_u64, parse_enum, parse_json, to_sql_int};

const EVENT_COLUMNS: &str = "id, idempotency_key, user_id, api_key_id, pipeline_type, operations, \
     input_bytes, output_bytes, tokens_saved, processing_ms, timestamp";

/// Append-only usage event log. Rows are never updated.
pub struct UsageEventRepo {
    db: Database,
}

impl UsageEventRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert an event. A second insert with the same idempotency key is a `DuplicateKey`.
    #[instrument(skip(self, event), fields(key = %event.idempotency_key, user_id = %event.user_id))]
    pub fn create(&self, event: &UsageEvent) -> Result<(), StoreError> {
        self.db.with_conn(|conn| insert_in(conn, event))
    }

    #[instrument(skip(self), fields(key))]
    pub fn find_by_key(&self, key: &str) -> Result<Option<UsageEvent>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM usage_events WHERE idempotency_key = ?1"
            ))?;
            let mut rows = stmt.query([key])?;
            rows.next()?.map(event_from_row).transpose()
        })
    }

    /// Most recent events for a user, newest first.
    #[instrument(skip(self), fields(user_id, limit))]
    pub fn list_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<UsageEvent>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM usage_events WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT ?2"
            ))?;
            let mut rows = stmt.query(rusqlite::params![user_id, limit])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(event_from_row(row)?);
            }
            Ok(events)
        })
    }

    pub fn count_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM usage_events WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(n.max(0) as u64)
        })
    }
}

pub(crate) fn insert_in(conn: &Connection, event: &UsageEvent) -> Result<(), StoreError> {
    let operations = serde_json::to_string(&event.operations)?;
    let result = conn.execute(
        &format!(
            "INSERT INTO usage_events ({EVENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            event.id.as_str(),
            event.idempotency_key,
            event.user_id,
            event.api_key_id,
            event.pipeline_type.as_str(),
            operations,
            to_sql_int(event.input_bytes),
            to_sql_int(event.output_bytes),
            to_sql_int(event.tokens_saved),
            to_sql_int(event.processing_ms),
            event.timestamp,
        ],
    );
    match result {
        Ok(_) => {
            debug!(event_id = %event.id, "usage event stored");
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => {
            Err(StoreError::DuplicateKey(event.idempotency_key.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> Result<UsageEvent, StoreError> {
    const T: &str = "usage_events";
    let pipeline_type: String = get(row, 4, T, "pipeline_type")?;
    let operations: String = get(row, 5, T, "operations")?;
    Ok(UsageEvent {
        id: UsageEventId::from_raw(get::<String>(row, 0, T, "id")?),
        idempotency_key: get(row, 1, T, "idempotency_key")?,
        user_id: get(row, 2, T, "user_id")?,
        api_key_id: get_opt(row, 3, T, "api_key_id")?,
        pipeline_type: parse_enum(&pipeline_type, T, "pipeline_type")?,
        operations: parse_json(&operations, T, "operations")?,
        input_bytes: get_u64(row, 6, T, "input_bytes")?,
        output_bytes: get_u64(row, 7, T, "output_bytes")?,
        tokens_saved: get_u64(row, 8, T, "tokens_saved")?,
        processing_ms: get_u64(row, 9, T, "processing_ms")?,
        timestamp: get(row, 10, T, "timestamp")?,
    })
}
