use chrono::{DateTime, Datelike, TimeZone, Utc};
use rusqlite::Connection;
use tracing::{debug, instrument};

use robinwood_core::usage::UserQuota;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::{get, get_u64, to_sql_int};

const QUOTA_COLUMNS: &str = "id, tokens_limit, tokens_used, resets_at";

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a user's quota row, creating it with `default_limit` if absent.
    #[instrument(skip(self, email), fields(user_id, default_limit))]
    pub fn get_or_create(
        &self,
        user_id: &str,
        email: Option<&str>,
        default_limit: u64,
    ) -> Result<UserQuota, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now();
            let ts = now.to_rfc3339();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, email, tokens_limit, tokens_used, resets_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
                rusqlite::params![
                    user_id,
                    email,
                    to_sql_int(default_limit),
                    next_reset(now).to_rfc3339(),
                    ts,
                ],
            )?;
            if inserted > 0 {
                debug!(user_id, "user created");
            }
            find_in(conn, user_id)?.ok_or_else(|| StoreError::NotFound(user_id.to_string()))
        })
    }

    /// Get a user's quota; `NotFound` if the user does not exist.
    #[instrument(skip(self), fields(user_id))]
    pub fn get(&self, user_id: &str) -> Result<UserQuota, StoreError> {
        self.find(user_id)?
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    pub fn find(&self, user_id: &str) -> Result<Option<UserQuota>, StoreError> {
        self.db.with_conn(|conn| find_in(conn, user_id))
    }

    /// Atomically add `amount` to the user's used-token counter.
    #[instrument(skip(self), fields(user_id, amount))]
    pub fn increment_tokens_used(&self, user_id: &str, amount: u64) -> Result<UserQuota, StoreError> {
        self.db.with_conn(|conn| increment_in(conn, user_id, amount))
    }

    /// Zero the counter and move the reset date to the start of next month.
    #[instrument(skip(self), fields(user_id))]
    pub fn reset_tokens_used(&self, user_id: &str) -> Result<UserQuota, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now();
            let mut stmt = conn.prepare(&format!(
                "UPDATE users SET tokens_used = 0, resets_at = ?1, updated_at = ?2
                 WHERE id = ?3 RETURNING {QUOTA_COLUMNS}"
            ))?;
            let mut rows = stmt.query(rusqlite::params![
                next_reset(now).to_rfc3339(),
                now.to_rfc3339(),
                user_id,
            ])?;
            match rows.next()? {
                Some(row) => quota_from_row(row),
                None => Err(StoreError::NotFound(user_id.to_string())),
            }
        })
    }

    /// Change a user's limit (plan upgrades are handled outside the metered path).
    #[instrument(skip(self), fields(user_id, tokens_limit))]
    pub fn set_tokens_limit(&self, user_id: &str, tokens_limit: u64) -> Result<UserQuota, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET tokens_limit = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![to_sql_int(tokens_limit), Utc::now().to_rfc3339(), user_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(user_id.to_string()));
            }
            find_in(conn, user_id)?.ok_or_else(|| StoreError::NotFound(user_id.to_string()))
        })
    }
}

pub(crate) fn find_in(conn: &Connection, user_id: &str) -> Result<Option<UserQuota>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {QUOTA_COLUMNS} FROM users WHERE id = ?1"))?;
    let mut rows = stmt.query([user_id])?;
    rows.next()?.map(quota_from_row).transpose()
}

/// Single-statement increment; never a read-modify-write.
pub(crate) fn increment_in(
    conn: &Connection,
    user_id: &str,
    amount: u64,
) -> Result<UserQuota, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE users SET tokens_used = tokens_used + ?1, updated_at = ?2
         WHERE id = ?3 RETURNING {QUOTA_COLUMNS}"
    ))?;
    let mut rows = stmt.query(rusqlite::params![
        to_sql_int(amount),
        Utc::now().to_rfc3339(),
        user_id,
    ])?;
    match rows.next()? {
        Some(row) => quota_from_row(row),
        None => Err(StoreError::NotFound(user_id.to_string())),
    }
}

fn quota_from_row(row: &rusqlite::Row<'_>) -> Result<UserQuota, StoreError> {
    Ok(UserQuota {
        user_id: get(row, 0, "users", "id")?,
        tokens_limit: get_u64(row, 1, "users", "tokens_limit")?,
        tokens_used: get_u64(row, 2, "users", "tokens_used")?,
        resets_at: get(row, 3, "users", "resets_at")?,
    })
}

/// Midnight UTC on the first day of the month after `now`.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
