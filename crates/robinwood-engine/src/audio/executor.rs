use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use robinwood_core::{Operation, PipelineType, Result, SizeUnit};

use super::dsp;
use super::ops::{self, AudioOp};
use super::pcm::{self, Pcm, SAMPLE_RATE};
use super::transcoder::Transcoder;
use crate::pipeline::{Executor, Pipeline, PipelineResult};

pub type AudioPipeline = Pipeline<AudioExecutor>;
pub type AudioResult = PipelineResult<Pcm, AudioDetails>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDetails {
    pub duration: f64,
    pub sample_rate: u32,
    pub original_duration: f64,
    pub silence_removed: f64,
}

#[derive(Debug, Default)]
pub struct AudioState {
    silence_removed_samples: usize,
}

pub struct AudioExecutor {
    transcoder: Arc<dyn Transcoder>,
}

impl AudioExecutor {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }
}

#[async_trait]
impl Executor for AudioExecutor {
    type Data = Pcm;
    type Op = AudioOp;
    type State = AudioState;
    type Details = AudioDetails;
    const UNIT: SizeUnit = SizeUnit::Bytes;

    async fn apply(&self, data: Pcm, op: &AudioOp, state: &mut AudioState) -> Result<Pcm> {
        match *op {
            AudioOp::Normalize => Ok(dsp::normalize(data)),
            AudioOp::Volume { level } => Ok(dsp::scale(data, level)),
            AudioOp::RemoveSilence {
                threshold_db,
                min_duration_ms,
            } => {
                let (out, removed) = dsp::remove_silence(data, threshold_db, min_duration_ms);
                state.silence_removed_samples += removed;
                Ok(out)
            }
            AudioOp::Speedup { rate } => {
                let chain = dsp::tempo_chain(rate);
                if chain.is_empty() {
                    return Ok(data);
                }
                Ok(self.transcoder.change_tempo(&data, &chain).await?)
            }
        }
    }

    fn size_of(&self, data: &Pcm) -> usize {
        data.byte_len()
    }

    fn details(&self, original_size: usize, data: &Pcm, state: &AudioState) -> AudioDetails {
        AudioDetails {
            duration: round2(data.duration_secs()),
            sample_rate: SAMPLE_RATE,
            original_duration: round2(pcm::samples_to_secs(original_size / 4)),
            silence_removed: round2(pcm::samples_to_secs(state.silence_removed_samples)),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Pipeline<AudioExecutor> {
    /// Build an audio pipeline over headerless f32 PCM. Container headers are rejected.
    pub fn from_raw(bytes: &[u8], transcoder: Arc<dyn Transcoder>) -> Result<Self> {
        let pcm = pcm::parse_raw(bytes)?;
        Ok(Self::from_pcm(pcm, transcoder))
    }

    pub fn from_pcm(pcm: Pcm, transcoder: Arc<dyn Transcoder>) -> Self {
        Pipeline::new(PipelineType::Audio, pcm, AudioExecutor::new(transcoder))
    }

    pub fn normalize(self) -> Self {
        self.then(AudioOp::Normalize)
    }

    pub fn volume(self, level: f64) -> Result<Self> {
        Ok(self.then(AudioOp::volume(level)?))
    }

    pub fn remove_silence(self, threshold_db: f64, min_duration_ms: f64) -> Result<Self> {
        Ok(self.then(AudioOp::remove_silence(threshold_db, min_duration_ms)?))
    }

    pub fn speedup(self, rate: f64) -> Result<Self> {
        Ok(self.then(AudioOp::speedup(rate)?))
    }

    /// Queue a public API operation, lowered to primitives.
    pub fn apply(self, op: &Operation) -> Result<Self> {
        Ok(self.then_all(ops::lower(op)?))
    }
}
