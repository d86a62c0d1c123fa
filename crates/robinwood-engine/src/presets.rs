//! Named operation lists per modality, plus the operation catalogues shown to clients.

use serde::Serialize;
use serde_json::{json, Value};

use robinwood_core::{Operation, PipelineType, Result, StealError};

/// A fixed operation list under a stable id.
#[derive(Clone, Debug, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub operations: Vec<Operation>,
}

/// Listing form of a preset: operation names only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresetSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub operations: Vec<String>,
}

/// One entry of an operation catalogue. `params` describes accepted parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub params: Value,
}

/// Every modality's presets and operation catalogue, built once at startup.
pub struct PresetCatalog {
    audio: Vec<Preset>,
    text: Vec<Preset>,
    image: Vec<Preset>,
    video: Vec<Preset>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetCatalog {
    pub fn new() -> Self {
        Self {
            audio: audio_presets(),
            text: text_presets(),
            image: image_presets(),
            video: video_presets(),
        }
    }

    pub fn presets(&self, kind: PipelineType) -> &[Preset] {
        match kind {
            PipelineType::Audio => &self.audio,
            PipelineType::Text => &self.text,
            PipelineType::Image => &self.image,
            PipelineType::Video => &self.video,
        }
    }

    pub fn get(&self, kind: PipelineType, id: &str) -> Option<&Preset> {
        self.presets(kind).iter().find(|p| p.id == id)
    }

    /// Operation list for a preset id.
    pub fn resolve(&self, kind: PipelineType, id: &str) -> Result<&[Operation]> {
        self.get(kind, id)
            .map(|p| p.operations.as_slice())
            .ok_or_else(|| StealError::UnknownPreset(format!("{kind}/{id}")))
    }

    pub fn list_presets(&self, kind: PipelineType) -> Vec<PresetSummary> {
        self.presets(kind)
            .iter()
            .map(|p| PresetSummary {
                id: p.id,
                name: p.name,
                description: p.description,
                operations: p.operations.iter().map(|op| op.name.clone()).collect(),
            })
            .collect()
    }

    pub fn list_operations(&self, kind: PipelineType) -> Vec<OperationInfo> {
        match kind {
            PipelineType::Audio => audio_operations(),
            PipelineType::Text => text_operations(),
            PipelineType::Image => image_operations(),
            PipelineType::Video => video_operations(),
        }
    }
}

fn op(name: &str, params: Value) -> Operation {
    Operation::new(name, params)
}

fn audio_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "chill",
            name: "Chill",
            description: "Trims only long, near-silent gaps",
            operations: vec![op("trim-silence", json!({"aggressiveness": 0.2, "minSilenceDuration": 1000}))],
        },
        Preset {
            id: "medium",
            name: "Medium",
            description: "Balanced silence trimming with loudness normalization",
            operations: vec![
                op("trim-silence", json!({"aggressiveness": 0.5, "minSilenceDuration": 500})),
                Operation::bare("normalize"),
            ],
        },
        Preset {
            id: "aggressive",
            name: "Aggressive",
            description: "Maximum silence removal and a faster tempo",
            operations: vec![
                op("trim-silence", json!({"aggressiveness": 0.9, "minSilenceDuration": 200})),
                Operation::bare("normalize"),
                op("speedup", json!({"rate": 1.25})),
            ],
        },
        Preset {
            id: "podcast",
            name: "Podcast",
            description: "Tuned for spoken word: tight pauses, even levels",
            operations: vec![
                op("trim-silence", json!({"aggressiveness": 0.6, "minSilenceDuration": 400})),
                op("compress", json!({"ratio": 4, "threshold": -24})),
                op("normalize", json!({"targetLevel": -1})),
            ],
        },
    ]
}

fn text_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "chill",
            name: "Chill",
            description: "Whitespace cleanup only",
            operations: vec![Operation::bare("trim")],
        },
        Preset {
            id: "medium",
            name: "Medium",
            description: "Whitespace cleanup and common abbreviations",
            operations: vec![Operation::bare("trim"), Operation::bare("shorten")],
        },
        Preset {
            id: "aggressive",
            name: "Aggressive",
            description: "Compact JSON, whitespace cleanup and abbreviations",
            operations: vec![
                op("json-to-toon", json!({"compact": true})),
                Operation::bare("trim"),
                Operation::bare("shorten"),
            ],
        },
        Preset {
            id: "podcast",
            name: "Podcast",
            description: "Transcript cleanup for spoken content",
            operations: vec![
                Operation::bare("trim"),
                Operation::bare("shorten"),
                Operation::bare("minify"),
                Operation::bare("compress"),
            ],
        },
    ]
}

fn image_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "chill",
            name: "Chill",
            description: "Light compression, preserves quality",
            operations: vec![op("compress", json!({"quality": 90}))],
        },
        Preset {
            id: "medium",
            name: "Medium",
            description: "Balanced compression",
            operations: vec![op("compress", json!({"quality": 75, "format": "webp"}))],
        },
        Preset {
            id: "aggressive",
            name: "Aggressive",
            description: "Maximum compression",
            operations: vec![
                op("resize", json!({"width": 1920, "fit": "contain"})),
                op("compress", json!({"quality": 60, "format": "webp"})),
            ],
        },
        Preset {
            id: "podcast",
            name: "Podcast",
            description: "Optimized for thumbnails and covers",
            operations: vec![
                op("resize", json!({"width": 1400, "height": 1400, "fit": "cover"})),
                op("compress", json!({"quality": 85, "format": "jpeg"})),
            ],
        },
    ]
}

fn video_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "chill",
            name: "Chill",
            description: "Light compression, preserves quality",
            operations: vec![op("compress", json!({"quality": 90}))],
        },
        Preset {
            id: "medium",
            name: "Medium",
            description: "Balanced compression",
            operations: vec![
                op("transcode", json!({"codec": "h264", "format": "mp4"})),
                op("compress", json!({"quality": 75, "maxBitrate": 5000})),
            ],
        },
        Preset {
            id: "aggressive",
            name: "Aggressive",
            description: "Maximum compression",
            operations: vec![
                op("transcode", json!({"codec": "h265", "format": "mp4"})),
                op("compress", json!({"quality": 50, "maxBitrate": 2000})),
            ],
        },
        Preset {
            id: "podcast",
            name: "Podcast",
            description: "Optimized for video podcasts",
            operations: vec![
                op("transcode", json!({"codec": "h264", "format": "mp4"})),
                op("compress", json!({"quality": 80, "maxBitrate": 4000})),
            ],
        },
    ]
}

fn audio_operations() -> Vec<OperationInfo> {
    vec![
        OperationInfo {
            id: "trim-silence",
            name: "Trim Silence",
            description: "Remove silent stretches longer than a minimum duration",
            params: json!({
                "aggressiveness": {"type": "number", "min": 0, "max": 1, "default": 0.5},
                "minSilenceDuration": {"type": "number", "min": 100, "max": 5000, "default": 300}
            }),
        },
        OperationInfo {
            id: "normalize",
            name: "Normalize",
            description: "Scale to full peak, then to a target level",
            params: json!({
                "targetLevel": {"type": "number", "min": -70, "max": 0, "default": 0}
            }),
        },
        OperationInfo {
            id: "compress",
            name: "Compress",
            description: "Makeup-gain approximation of dynamic range compression",
            params: json!({
                "ratio": {"type": "number", "min": 1, "max": 20, "default": 4},
                "threshold": {"type": "number", "min": -60, "max": 0, "default": -20}
            }),
        },
        OperationInfo {
            id: "speedup",
            name: "Speed Up",
            description: "Change tempo without changing pitch",
            params: json!({
                "rate": {"type": "number", "min": 0.25, "max": 100, "required": true}
            }),
        },
        OperationInfo {
            id: "volume",
            name: "Volume",
            description: "Multiply every sample by a gain factor",
            params: json!({
                "level": {"type": "number", "min": 0, "max": 2, "required": true}
            }),
        },
    ]
}

fn text_operations() -> Vec<OperationInfo> {
    let strict = json!({
        "strict": {"type": "boolean", "default": false}
    });
    vec![
        OperationInfo {
            id: "trim",
            name: "Trim",
            description: "Collapse whitespace and remove spaces before punctuation",
            params: strict.clone(),
        },
        OperationInfo {
            id: "syntax",
            name: "Syntax",
            description: "Same normalization as trim",
            params: strict,
        },
        OperationInfo {
            id: "shorten",
            name: "Shorten",
            description: "Replace wordy phrases, then abbreviate common words",
            params: json!({
                "language": {"type": "string", "enum": ["en", "pt"], "default": "en"}
            }),
        },
        OperationInfo {
            id: "minify",
            name: "Minify",
            description: "Whitespace minification",
            params: json!({}),
        },
        OperationInfo {
            id: "compress",
            name: "Compress",
            description: "Currently the same as trim",
            params: json!({}),
        },
        OperationInfo {
            id: "json-to-toon",
            name: "JSON Re-encode",
            description: "Re-serialize JSON blocks embedded in the text",
            params: json!({
                "indent": {"type": "number", "min": 0, "max": 8, "default": 2},
                "compact": {"type": "boolean", "default": false}
            }),
        },
    ]
}

fn image_operations() -> Vec<OperationInfo> {
    vec![
        OperationInfo {
            id: "resize",
            name: "Resize",
            description: "Resize to fit the given box",
            params: json!({
                "width": {"type": "number", "min": 1, "max": 8192},
                "height": {"type": "number", "min": 1, "max": 8192},
                "fit": {"type": "string", "enum": ["cover", "contain", "fill"], "default": "cover"}
            }),
        },
        OperationInfo {
            id: "compress",
            name: "Compress",
            description: "Re-encode at a lower quality",
            params: json!({
                "quality": {"type": "number", "min": 1, "max": 100, "default": 80},
                "format": {"type": "string", "enum": ["jpeg", "png", "webp"], "default": "webp"}
            }),
        },
    ]
}

fn video_operations() -> Vec<OperationInfo> {
    vec![
        OperationInfo {
            id: "transcode",
            name: "Transcode",
            description: "Change codec and container",
            params: json!({
                "codec": {"type": "string", "enum": ["h264", "h265", "vp9"]},
                "format": {"type": "string", "enum": ["mp4", "webm", "mov"]}
            }),
        },
        OperationInfo {
            id: "compress",
            name: "Compress",
            description: "Lower quality and cap the bitrate",
            params: json!({
                "quality": {"type": "number", "min": 1, "max": 100, "default": 75},
                "maxBitrate": {"type": "number", "min": 100, "max": 50000, "default": 5000}
            }),
        },
        OperationInfo {
            id: "trim",
            name: "Trim",
            description: "Cut to a start/end window in seconds",
            params: json!({
                "start": {"type": "number", "min": 0, "default": 0},
                "end": {"type": "number", "min": 0}
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ops::lower_all;
    use crate::text::TextOp;

    const IDS: [&str; 4] = ["chill", "medium", "aggressive", "podcast"];

    #[test]
    fn every_modality_has_the_four_presets() {
        let catalog = PresetCatalog::new();
        for kind in PipelineType::ALL {
            let ids: Vec<&str> = catalog.presets(kind).iter().map(|p| p.id).collect();
            assert_eq!(ids, IDS, "{kind}");
        }
    }

    #[test]
    fn unknown_preset() {
        let catalog = PresetCatalog::new();
        let err = catalog.resolve(PipelineType::Audio, "turbo").unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_PRESET");
    }

    #[test]
    fn audio_presets_lower_cleanly() {
        let catalog = PresetCatalog::new();
        for id in IDS {
            let ops = catalog.resolve(PipelineType::Audio, id).unwrap();
            assert!(lower_all(ops).is_ok(), "audio preset {id}");
        }
    }

    #[test]
    fn text_presets_parse_cleanly() {
        let catalog = PresetCatalog::new();
        for id in IDS {
            let ops = catalog.resolve(PipelineType::Text, id).unwrap();
            assert!(TextOp::parse_all(ops).is_ok(), "text preset {id}");
        }
    }

    #[test]
    fn summaries_list_operation_names() {
        let catalog = PresetCatalog::new();
        let summaries = catalog.list_presets(PipelineType::Image);
        let aggressive = summaries.iter().find(|s| s.id == "aggressive").unwrap();
        assert_eq!(aggressive.operations, vec!["resize", "compress"]);
        assert_eq!(aggressive.description, "Maximum compression");
    }

    #[test]
    fn operation_catalogues_cover_executable_ops() {
        let catalog = PresetCatalog::new();
        let audio: Vec<&str> = catalog.list_operations(PipelineType::Audio).iter().map(|o| o.id).collect();
        assert_eq!(audio, ["trim-silence", "normalize", "compress", "speedup", "volume"]);
        for info in catalog.list_operations(PipelineType::Text) {
            assert!(TextOp::parse(&Operation::bare(info.id)).is_ok(), "{}", info.id);
        }
    }

    #[test]
    fn preset_serializes_wire_operations() {
        let catalog = PresetCatalog::new();
        let preset = catalog.get(PipelineType::Video, "medium").unwrap();
        let json = serde_json::to_value(preset).unwrap();
        assert_eq!(json["operations"][0], json!({"type": "transcode", "params": {"codec": "h264", "format": "mp4"}}));
    }
}
