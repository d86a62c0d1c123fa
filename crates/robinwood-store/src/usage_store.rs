use tracing::instrument;

use robinwood_core::usage::{UsageEvent, UsageStore, UsageStoreError, UserQuota};

use crate::database::Database;
use crate::error::StoreError;
use crate::usage_events::{self, UsageEventRepo};
use crate::users::{self, UserRepo};

/// SQLite-backed [`UsageStore`].
pub struct SqliteUsageStore {
    db: Database,
    events: UsageEventRepo,
    users: UserRepo,
}

impl SqliteUsageStore {
    pub fn new(db: Database) -> Self {
        Self {
            events: UsageEventRepo::new(db.clone()),
            users: UserRepo::new(db.clone()),
            db,
        }
    }

    pub fn users(&self) -> &UserRepo {
        &self.users
    }

    pub fn events(&self) -> &UsageEventRepo {
        &self.events
    }
}

impl From<StoreError> for UsageStoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(key) => UsageStoreError::DuplicateKey(key),
            StoreError::NotFound(user) => UsageStoreError::UserNotFound(user),
            other => UsageStoreError::Backend(other.to_string()),
        }
    }
}

impl UsageStore for SqliteUsageStore {
    fn find_event_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<UsageEvent>, UsageStoreError> {
        Ok(self.events.find_by_key(key)?)
    }

    fn create_event(&self, event: &UsageEvent) -> Result<(), UsageStoreError> {
        Ok(self.events.create(event)?)
    }

    fn increment_user_tokens_used(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<UserQuota, UsageStoreError> {
        Ok(self.users.increment_tokens_used(user_id, amount)?)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<UserQuota>, UsageStoreError> {
        Ok(self.users.find(user_id)?)
    }

    #[instrument(skip(self, event), fields(key = %event.idempotency_key, user_id = %event.user_id))]
    fn create_event_and_charge(&self, event: &UsageEvent) -> Result<UserQuota, UsageStoreError> {
        let quota = self.db.with_tx(|tx| {
            usage_events::insert_in(tx, event)?;
            users::increment_in(tx, &event.user_id, event.tokens_saved)
        })?;
        Ok(quota)
    }
}
