//! Typed audio operations and lowering of public API operations onto them.

use serde::Deserialize;

use robinwood_core::{NamedOperation, Operation, Result, StealError};

pub const VOLUME_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;
pub const SPEEDUP_RANGE: std::ops::RangeInclusive<f64> = 0.25..=100.0;

const AGGRESSIVENESS_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;
const MIN_SILENCE_RANGE: std::ops::RangeInclusive<f64> = 100.0..=5000.0;
const TARGET_LEVEL_RANGE: std::ops::RangeInclusive<f64> = -70.0..=0.0;
const RATIO_RANGE: std::ops::RangeInclusive<f64> = 1.0..=20.0;
const THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = -60.0..=0.0;

/// Signal-level primitives the audio executor runs.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioOp {
    Normalize,
    Volume { level: f64 },
    RemoveSilence { threshold_db: f64, min_duration_ms: f64 },
    Speedup { rate: f64 },
}

impl AudioOp {
    pub fn volume(level: f64) -> Result<Self> {
        check("volume", "level", level, VOLUME_RANGE)?;
        Ok(Self::Volume { level })
    }

    pub fn speedup(rate: f64) -> Result<Self> {
        check("speedup", "rate", rate, SPEEDUP_RANGE)?;
        Ok(Self::Speedup { rate })
    }

    /// The threshold is clamped to [-60, 0] dB when applied, so it is not range-checked here.
    pub fn remove_silence(threshold_db: f64, min_duration_ms: f64) -> Result<Self> {
        if !threshold_db.is_finite() || !min_duration_ms.is_finite() || min_duration_ms < 0.0 {
            return Err(StealError::InvalidInput(format!(
                "removeSilence needs finite threshold and non-negative duration, got {threshold_db} dB / {min_duration_ms} ms"
            )));
        }
        Ok(Self::RemoveSilence {
            threshold_db,
            min_duration_ms,
        })
    }
}

impl NamedOperation for AudioOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Volume { .. } => "volume",
            Self::RemoveSilence { .. } => "removeSilence",
            Self::Speedup { .. } => "speedup",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct TrimSilenceParams {
    aggressiveness: Option<f64>,
    min_silence_duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct NormalizeParams {
    target_level: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct CompressParams {
    ratio: Option<f64>,
    threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SpeedupParams {
    rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct VolumeParams {
    level: Option<f64>,
}

/// Translate one public operation into primitives. Ranges are enforced here.
pub fn lower(op: &Operation) -> Result<Vec<AudioOp>> {
    match op.name.as_str() {
        "trim-silence" => {
            let p: TrimSilenceParams = op.params()?;
            let aggressiveness = p.aggressiveness.unwrap_or(0.5);
            let min_ms = p.min_silence_duration.unwrap_or(300.0);
            check("trim-silence", "aggressiveness", aggressiveness, AGGRESSIVENESS_RANGE)?;
            check("trim-silence", "minSilenceDuration", min_ms, MIN_SILENCE_RANGE)?;
            Ok(vec![AudioOp::remove_silence(
                aggressiveness_to_db(aggressiveness),
                min_ms,
            )?])
        }
        "normalize" => {
            let p: NormalizeParams = op.params()?;
            let target = p.target_level.unwrap_or(0.0);
            check("normalize", "targetLevel", target, TARGET_LEVEL_RANGE)?;
            let mut ops = vec![AudioOp::Normalize];
            if target < 0.0 {
                ops.push(AudioOp::volume(db_to_gain(target))?);
            }
            Ok(ops)
        }
        "compress" => {
            let p: CompressParams = op.params()?;
            let ratio = p.ratio.unwrap_or(4.0);
            let threshold = p.threshold.unwrap_or(-20.0);
            check("compress", "ratio", ratio, RATIO_RANGE)?;
            check("compress", "threshold", threshold, THRESHOLD_RANGE)?;
            // Threshold is range-checked, so the gain stays within [1, 31.7].
            Ok(vec![AudioOp::Volume {
                level: makeup_gain(threshold),
            }])
        }
        "speedup" => {
            let p: SpeedupParams = op.params()?;
            let rate = p.rate.ok_or_else(|| missing("speedup", "rate"))?;
            Ok(vec![AudioOp::speedup(rate)?])
        }
        "volume" => {
            let p: VolumeParams = op.params()?;
            let level = p.level.ok_or_else(|| missing("volume", "level"))?;
            Ok(vec![AudioOp::volume(level)?])
        }
        other => Err(StealError::UnknownOperation(other.to_string())),
    }
}

/// Lower a whole list, failing on the first bad operation before anything runs.
pub fn lower_all(ops: &[Operation]) -> Result<Vec<AudioOp>> {
    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        out.extend(lower(op)?);
    }
    Ok(out)
}

/// 0 maps to -60 dB (only near-digital silence), 1 to -20 dB.
pub fn aggressiveness_to_db(aggressiveness: f64) -> f64 {
    -60.0 + aggressiveness * 40.0
}

pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Makeup gain standing in for a real compressor: half the threshold depth, as linear gain.
pub fn makeup_gain(threshold_db: f64) -> f64 {
    db_to_gain(threshold_db.abs() / 2.0)
}

fn check(
    operation: &str,
    param: &str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(StealError::out_of_range(operation, param, value, range))
    }
}

fn missing(operation: &str, param: &str) -> StealError {
    StealError::InvalidInput(format!("{operation} requires {param}"))
}
