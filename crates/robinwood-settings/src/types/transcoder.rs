use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscoderSettings {
    /// Executable name or path.
    pub binary: String,
    /// Hard ceiling on a single transcoder invocation.
    pub timeout_ms: u64,
    /// Largest payload piped into the transcoder.
    pub max_input_bytes: u64,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout_ms: 120_000,
            max_input_bytes: 200 * 1024 * 1024,
        }
    }
}
