use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StealError};

/// Payload modality a pipeline operates on.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineType {
    Audio,
    Text,
    Image,
    Video,
}

impl PipelineType {
    pub const ALL: [PipelineType; 4] = [Self::Audio, Self::Text, Self::Image, Self::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown pipeline type: {other}")),
        }
    }
}

/// A queued operation in wire form: a name plus an opaque parameter map.
///
/// Pipelines parse these into their own strongly-typed operation enums
/// before anything runs, so an unrecognised name fails up front.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type", alias = "name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Operation {
    pub fn new(name: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// An operation with no parameters.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, serde_json::Value::Null)
    }

    /// Deserialize the params into a typed struct. Missing params yield the default.
    pub fn params<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.params.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.params.clone()).map_err(|e| {
            StealError::InvalidInput(format!("malformed params for {}: {e}", self.name))
        })
    }
}

/// Implemented by typed operation enums so the engine can report what ran.
pub trait NamedOperation {
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase", default)]
    struct TrimParams {
        aggressiveness: Option<f64>,
        min_silence_duration: Option<u32>,
    }

    #[test]
    fn pipeline_type_roundtrip() {
        for t in PipelineType::ALL {
            assert_eq!(t.as_str().parse::<PipelineType>().unwrap(), t);
        }
        assert!("hologram".parse::<PipelineType>().is_err());
    }

    #[test]
    fn operation_wire_format_uses_type_key() {
        let op: Operation = serde_json::from_str(
            r#"{"type": "trim-silence", "params": {"aggressiveness": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(op.name, "trim-silence");
        let params: TrimParams = op.params().unwrap();
        assert_eq!(params.aggressiveness, Some(0.5));
        assert_eq!(params.min_silence_duration, None);
    }

    #[test]
    fn operation_accepts_name_alias() {
        let op: Operation = serde_json::from_str(r#"{"name": "normalize"}"#).unwrap();
        assert_eq!(op.name, "normalize");
        assert!(op.params.is_null());
    }

    #[test]
    fn missing_params_yield_default() {
        let params: TrimParams = Operation::bare("trim-silence").params().unwrap();
        assert_eq!(params, TrimParams::default());
    }

    #[test]
    fn malformed_params_are_invalid_input() {
        let op = Operation::new("trim-silence", serde_json::json!({"aggressiveness": "lots"}));
        let err = op.params::<TrimParams>().unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn bare_operation_serializes_without_params() {
        let json = serde_json::to_value(Operation::bare("minify")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "minify"}));
    }
}
