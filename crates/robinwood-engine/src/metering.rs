//! Usage metering over a [`UsageStore`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use robinwood_core::usage::{
    CurrentUsage, RecordOutcome, RecordUsageInput, UsageEvent, UsageLimits, UsageStore,
    UsageStoreError, UserQuota,
};
use robinwood_core::{Result, StealError};

#[derive(Clone)]
pub struct UsageMeter {
    store: Arc<dyn UsageStore>,
}

impl UsageMeter {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Record one run exactly once per idempotency key.
    ///
    /// A key seen before returns the stored saving and the current quota
    /// without charging again.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, key = %input.idempotency_key))]
    pub fn record(&self, input: RecordUsageInput) -> Result<RecordOutcome> {
        if let Some(existing) = self.store.find_event_by_idempotency_key(&input.idempotency_key)? {
            return self.duplicate(existing);
        }
        self.quota(&input.user_id)?;

        let event = input.into_event(Utc::now().to_rfc3339());
        match self.store.create_event_and_charge(&event) {
            Ok(quota) => {
                info!(
                    event_id = %event.id,
                    pipeline = %event.pipeline_type,
                    tokens_saved = event.tokens_saved,
                    tokens_remaining = quota.tokens_remaining(),
                    "usage recorded"
                );
                Ok(RecordOutcome {
                    event_id: event.id,
                    tokens_saved: event.tokens_saved,
                    tokens_remaining: quota.tokens_remaining(),
                    duplicate: false,
                })
            }
            Err(UsageStoreError::DuplicateKey(_)) => {
                // Lost a race with a concurrent request for the same key.
                let key = &event.idempotency_key;
                let winner = self
                    .store
                    .find_event_by_idempotency_key(key)?
                    .ok_or_else(|| StealError::Storage(format!("event for key {key} vanished")))?;
                info!(event_id = %winner.id, "concurrent duplicate resolved to stored event");
                self.duplicate(winner)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `record` whose failure is logged and dropped so the processed payload still reaches the caller.
    pub fn record_best_effort(&self, input: RecordUsageInput) -> Option<RecordOutcome> {
        let user_id = input.user_id.clone();
        let key = input.idempotency_key.clone();
        match self.record(input) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(%user_id, %key, error = %e, "usage recording failed, result returned unmetered");
                None
            }
        }
    }

    pub fn check_limits(&self, user_id: &str) -> Result<UsageLimits> {
        Ok(UsageLimits::from(&self.quota(user_id)?))
    }

    pub fn current_usage(&self, user_id: &str) -> Result<CurrentUsage> {
        Ok(CurrentUsage::from(&self.quota(user_id)?))
    }

    fn quota(&self, user_id: &str) -> Result<UserQuota> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| StealError::UserNotFound(user_id.to_string()))
    }

    fn duplicate(&self, event: UsageEvent) -> Result<RecordOutcome> {
        let quota = self.quota(&event.user_id)?;
        Ok(RecordOutcome {
            event_id: event.id,
            tokens_saved: event.tokens_saved,
            tokens_remaining: quota.tokens_remaining(),
            duplicate: true,
        })
    }
}
