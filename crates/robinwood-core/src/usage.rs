use serde::{Deserialize, Serialize};

use crate::errors::StealError;
use crate::ids::UsageEventId;
use crate::operation::PipelineType;

/// Immutable record of one metered pipeline run.
/// Created at most once per idempotency key, never modified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub idempotency_key: String,
    pub user_id: String,
    pub api_key_id: Option<String>,
    pub pipeline_type: PipelineType,
    pub operations: Vec<String>,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub tokens_saved: u64,
    pub processing_ms: u64,
    pub timestamp: String,
}

/// What a caller hands the meter after a pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageInput {
    pub idempotency_key: String,
    pub user_id: String,
    pub api_key_id: Option<String>,
    pub pipeline_type: PipelineType,
    pub operations: Vec<String>,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub processing_ms: u64,
}

impl RecordUsageInput {
    /// Billable saving; an expanded payload earns nothing rather than a refund.
    pub fn tokens_saved(&self) -> u64 {
        self.input_bytes.saturating_sub(self.output_bytes)
    }

    pub fn into_event(self, timestamp: String) -> UsageEvent {
        let tokens_saved = self.tokens_saved();
        UsageEvent {
            id: UsageEventId::new(),
            idempotency_key: self.idempotency_key,
            user_id: self.user_id,
            api_key_id: self.api_key_id,
            pipeline_type: self.pipeline_type,
            operations: self.operations,
            input_bytes: self.input_bytes,
            output_bytes: self.output_bytes,
            tokens_saved,
            processing_ms: self.processing_ms,
            timestamp,
        }
    }
}

/// Per-user running counter against the free tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuota {
    pub user_id: String,
    pub tokens_limit: u64,
    pub tokens_used: u64,
    pub resets_at: String,
}

impl UserQuota {
    pub fn tokens_remaining(&self) -> u64 {
        self.tokens_limit.saturating_sub(self.tokens_used)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub event_id: UsageEventId,
    pub tokens_saved: u64,
    pub tokens_remaining: u64,
    /// True when the key had already been recorded and nothing was mutated.
    pub duplicate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimits {
    pub can_process: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub tokens_limit: u64,
    pub tokens_used: u64,
    pub tokens_remaining: u64,
}

impl From<&UserQuota> for UsageLimits {
    fn from(quota: &UserQuota) -> Self {
        let remaining = quota.tokens_remaining();
        let can_process = remaining > 0;
        Self {
            can_process,
            reason: (!can_process).then(|| "free tier exhausted".to_string()),
            tokens_limit: quota.tokens_limit,
            tokens_used: quota.tokens_used,
            tokens_remaining: remaining,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUsage {
    pub tokens_limit: u64,
    pub tokens_used: u64,
    pub tokens_remaining: u64,
}

impl From<&UserQuota> for CurrentUsage {
    fn from(quota: &UserQuota) -> Self {
        Self {
            tokens_limit: quota.tokens_limit,
            tokens_used: quota.tokens_used,
            tokens_remaining: quota.tokens_remaining(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UsageStoreError {
    #[error("duplicate idempotency key: {0}")]
    DuplicateKey(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("usage store backend: {0}")]
    Backend(String),
}

impl From<UsageStoreError> for StealError {
    fn from(e: UsageStoreError) -> Self {
        match e {
            UsageStoreError::UserNotFound(id) => StealError::UserNotFound(id),
            other => StealError::Storage(other.to_string()),
        }
    }
}

/// Usage storage consumed by the meter.
///
/// `create_event` must fail with `DuplicateKey` when the idempotency key
/// exists, and `increment_user_tokens_used` must be a single atomic
/// "add N" against the store, never a read-modify-write.
pub trait UsageStore: Send + Sync {
    fn find_event_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<UsageEvent>, UsageStoreError>;

    fn create_event(&self, event: &UsageEvent) -> Result<(), UsageStoreError>;

    fn increment_user_tokens_used(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<UserQuota, UsageStoreError>;

    fn get_user(&self, user_id: &str) -> Result<Option<UserQuota>, UsageStoreError>;

    /// Persist the event and charge its savings as one unit.
    ///
    /// Stores with transactions should override this so a failed increment
    /// cannot leave an uncharged event behind.
    fn create_event_and_charge(&self, event: &UsageEvent) -> Result<UserQuota, UsageStoreError> {
        self.create_event(event)?;
        self.increment_user_tokens_used(&event.user_id, event.tokens_saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(input_bytes: u64, output_bytes: u64) -> RecordUsageInput {
        RecordUsageInput {
            idempotency_key: "k".into(),
            user_id: "u1".into(),
            api_key_id: None,
            pipeline_type: PipelineType::Text,
            operations: vec!["trim".into()],
            input_bytes,
            output_bytes,
            processing_ms: 3,
        }
    }

    fn quota(limit: u64, used: u64) -> UserQuota {
        UserQuota {
            user_id: "u1".into(),
            tokens_limit: limit,
            tokens_used: used,
            resets_at: "2026-11-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn tokens_saved_floors_at_zero() {
        assert_eq!(input(1000, 800).tokens_saved(), 200);
        assert_eq!(input(800, 1000).tokens_saved(), 0);
    }

    #[test]
    fn into_event_carries_fields() {
        let event = input(1000, 400).into_event("2026-10-18T12:00:00Z".into());
        assert_eq!(event.tokens_saved, 600);
        assert_eq!(event.idempotency_key, "k");
        assert!(event.id.as_str().starts_with("usage_"));
    }

    #[test]
    fn limits_with_quota_left() {
        let limits = UsageLimits::from(&quota(100, 40));
        assert!(limits.can_process);
        assert_eq!(limits.tokens_remaining, 60);
        assert!(limits.reason.is_none());
    }

    #[test]
    fn limits_exhausted() {
        let limits = UsageLimits::from(&quota(100, 100));
        assert!(!limits.can_process);
        assert_eq!(limits.tokens_remaining, 0);
        assert_eq!(limits.reason.as_deref(), Some("free tier exhausted"));
    }

    #[test]
    fn overdrawn_quota_reports_zero_remaining() {
        assert_eq!(quota(100, 250).tokens_remaining(), 0);
        assert_eq!(CurrentUsage::from(&quota(100, 250)).tokens_remaining, 0);
    }

    #[test]
    fn store_error_maps_to_steal_error() {
        let e: StealError = UsageStoreError::UserNotFound("u9".into()).into();
        assert_eq!(e, StealError::UserNotFound("u9".into()));
        let e: StealError = UsageStoreError::Backend("disk full".into()).into();
        assert_eq!(e.code(), "STORAGE_ERROR");
    }
}
