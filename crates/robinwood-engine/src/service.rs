//! Request-level flow: validate, resolve, run, encode, meter.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use robinwood_core::idempotency::{derive_key_in_window, hash_input};
use robinwood_core::ids::RequestId;
use robinwood_core::usage::{RecordOutcome, RecordUsageInput, UsageStore};
use robinwood_core::{Metrics, Operation, PipelineType, Result, StealError};
use robinwood_settings::UsageSettings;

use crate::audio::ops::lower_all;
use crate::audio::pcm::parse_raw;
use crate::audio::{AudioDetails, AudioOutputFormat, AudioPipeline, Transcoder};
use crate::metering::UsageMeter;
use crate::presets::{OperationInfo, PresetCatalog, PresetSummary};
use crate::text::{Dictionaries, TextOp, TextPipeline, TextResult};

/// Who is asking.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: String,
    pub api_key_id: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            api_key_id: None,
        }
    }
}

/// A preset id or an explicit operation list. The preset wins when both are given.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StealRequest {
    pub preset: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl StealRequest {
    pub fn preset(id: impl Into<String>) -> Self {
        Self {
            preset: Some(id.into()),
            operations: Vec::new(),
        }
    }

    pub fn operations(operations: Vec<Operation>) -> Self {
        Self {
            preset: None,
            operations,
        }
    }
}

/// Audio payload as received.
#[derive(Clone, Debug)]
pub enum AudioInput {
    /// Headerless mono f32le at 44.1 kHz.
    RawF32(Vec<u8>),
    /// Any container the transcoder can decode.
    Container(Vec<u8>),
}

impl AudioInput {
    pub fn len(&self) -> usize {
        match self {
            Self::RawF32(b) | Self::Container(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TextSteal {
    #[serde(flatten)]
    pub result: TextResult,
    pub usage: Option<RecordOutcome>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSteal {
    #[serde(skip)]
    pub file: Vec<u8>,
    pub filename: String,
    pub metrics: Metrics,
    pub details: AudioDetails,
    pub operations: Vec<String>,
    pub usage: Option<RecordOutcome>,
}

pub struct StealService {
    transcoder: Arc<dyn Transcoder>,
    dictionaries: Arc<Dictionaries>,
    presets: PresetCatalog,
    meter: UsageMeter,
    idempotency_window_ms: i64,
}

impl StealService {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn UsageStore>,
        settings: &UsageSettings,
    ) -> Result<Self> {
        let window_ms = settings.idempotency_window_secs.saturating_mul(1000);
        Ok(Self {
            transcoder,
            dictionaries: Arc::new(Dictionaries::new()?),
            presets: PresetCatalog::new(),
            meter: UsageMeter::new(store),
            idempotency_window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX),
        })
    }

    pub fn meter(&self) -> &UsageMeter {
        &self.meter
    }

    pub fn list_presets(&self, kind: PipelineType) -> Vec<PresetSummary> {
        self.presets.list_presets(kind)
    }

    pub fn list_operations(&self, kind: PipelineType) -> Vec<OperationInfo> {
        self.presets.list_operations(kind)
    }

    #[instrument(skip_all, fields(request_id = %RequestId::new(), user_id = %ctx.user_id, pipeline = "text"))]
    pub async fn steal_text(
        &self,
        ctx: &RequestContext,
        text: String,
        request: &StealRequest,
    ) -> Result<TextSteal> {
        let started = Instant::now();
        if text.trim().is_empty() {
            return Err(StealError::InvalidInput("text is required".into()));
        }
        let operations = self.operations_for(PipelineType::Text, request)?;
        let ops = TextOp::parse_all(operations)?;

        let input_bytes = text.len();
        let result = TextPipeline::from_text(text, Arc::clone(&self.dictionaries))
            .then_all(ops)
            .execute()
            .await?;

        let usage = self.meter_run(
            ctx,
            PipelineType::Text,
            operations,
            input_bytes,
            result.data.len(),
            started,
        );
        Ok(TextSteal { result, usage })
    }

    #[instrument(skip_all, fields(request_id = %RequestId::new(), user_id = %ctx.user_id, pipeline = "audio", input_bytes = input.len()))]
    pub async fn steal_audio(
        &self,
        ctx: &RequestContext,
        input: AudioInput,
        request: &StealRequest,
        format: AudioOutputFormat,
    ) -> Result<AudioSteal> {
        let started = Instant::now();
        if input.is_empty() {
            return Err(StealError::InvalidInput("file is required".into()));
        }
        let operations = self.operations_for(PipelineType::Audio, request)?;
        // Lower before decoding so a bad request never reaches the transcoder.
        let ops = lower_all(operations)?;

        let input_bytes = input.len();
        let pcm = match input {
            AudioInput::RawF32(bytes) => parse_raw(&bytes)?,
            AudioInput::Container(bytes) => self.transcoder.decode_to_pcm(bytes).await?,
        };
        debug!(samples = pcm.len(), "audio decoded");

        let result = AudioPipeline::from_pcm(pcm, Arc::clone(&self.transcoder))
            .then_all(ops)
            .execute()
            .await?;
        let file = self.transcoder.encode(&result.data, format).await?;

        let usage = self.meter_run(
            ctx,
            PipelineType::Audio,
            operations,
            input_bytes,
            file.len(),
            started,
        );
        Ok(AudioSteal {
            filename: format!(
                "processed_{}.{}",
                Utc::now().timestamp_millis(),
                format.extension()
            ),
            file,
            metrics: result.metrics,
            details: result.details,
            operations: result.operations,
            usage,
        })
    }

    fn operations_for<'a>(
        &'a self,
        kind: PipelineType,
        request: &'a StealRequest,
    ) -> Result<&'a [Operation]> {
        match &request.preset {
            Some(id) => self.presets.resolve(kind, id),
            None if request.operations.is_empty() => Err(StealError::InvalidInput(
                "either preset or operations must be provided".into(),
            )),
            None => Ok(&request.operations),
        }
    }

    fn meter_run(
        &self,
        ctx: &RequestContext,
        kind: PipelineType,
        operations: &[Operation],
        input_bytes: usize,
        output_bytes: usize,
        started: Instant,
    ) -> Option<RecordOutcome> {
        let names: Vec<String> = operations.iter().map(|op| op.name.clone()).collect();
        let input_hash = hash_input(&ctx.user_id, kind, &names, input_bytes);
        let idempotency_key = derive_key_in_window(
            &ctx.user_id,
            kind,
            &input_hash,
            Utc::now().timestamp_millis(),
            self.idempotency_window_ms,
        );
        self.meter.record_best_effort(RecordUsageInput {
            idempotency_key,
            user_id: ctx.user_id.clone(),
            api_key_id: ctx.api_key_id.clone(),
            pipeline_type: kind,
            operations: names,
            input_bytes: input_bytes as u64,
            output_bytes: output_bytes as u64,
            processing_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
