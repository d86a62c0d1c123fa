//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format and `#[serde(default)]` so a partial file only overrides what it
//! names.

mod logging;
mod transcoder;
mod usage;

pub use logging::*;
pub use transcoder::*;
pub use usage::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "transcoder": { "binary": "/usr/local/bin/ffmpeg", "timeoutMs": 60000 },
///   "usage": { "defaultTokensLimit": 1000000 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobinwoodSettings {
    /// External media transcoder (ffmpeg) invocation.
    pub transcoder: TranscoderSettings,
    /// Usage metering and free tier.
    pub usage: UsageSettings,
    /// Log output.
    pub logging: LoggingSettings,
}
