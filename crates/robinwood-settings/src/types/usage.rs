use serde::{Deserialize, Serialize};

use crate::loader::robinwood_home;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageSettings {
    /// SQLite file holding usage events and quotas.
    pub database_path: String,
    /// Free tier granted to newly seen users, in tokens.
    pub default_tokens_limit: u64,
    /// Width of the idempotency time bucket.
    pub idempotency_window_secs: u64,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            database_path: robinwood_home()
                .join("database")
                .join("usage.db")
                .to_string_lossy()
                .into_owned(),
            default_tokens_limit: 500_000_000,
            idempotency_window_secs: 60,
        }
    }
}
