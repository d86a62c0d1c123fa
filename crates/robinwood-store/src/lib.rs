pub mod database;
pub mod error;
pub mod row_helpers;
pub mod schema;
pub mod usage_events;
pub mod usage_store;
pub mod users;

pub use database::Database;
pub use error::StoreError;
pub use usage_events::UsageEventRepo;
pub use usage_store::SqliteUsageStore;
pub use users::UserRepo;
