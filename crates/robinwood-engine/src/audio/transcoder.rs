//! External media transcoding boundary.
//!
//! Decoding, container encoding and tempo changes run in an `ffmpeg`
//! subprocess. Every invocation is size-bounded, wrapped in a timeout and
//! killed if the surrounding request is cancelled.

use std::fmt;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use robinwood_core::StealError;
use robinwood_settings::TranscoderSettings;

use super::dsp::atempo_filter;
use super::pcm::{Pcm, SAMPLE_RATE};

const STDERR_TAIL_CHARS: usize = 400;

/// Container for the processed artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum AudioOutputFormat {
    /// Headerless little-endian f32, no subprocess needed.
    RawF32,
    #[default]
    Wav,
    Mp3 { bitrate_kbps: u32 },
}

impl AudioOutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::RawF32 => "f32",
            Self::Wav => "wav",
            Self::Mp3 { .. } => "mp3",
        }
    }
}

impl fmt::Display for AudioOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RawF32 => f.write_str("raw"),
            Self::Wav => f.write_str("wav"),
            Self::Mp3 { bitrate_kbps } => write!(f, "mp3@{bitrate_kbps}k"),
        }
    }
}

impl FromStr for AudioOutputFormat {
    type Err = String;

    /// `raw`, `wav`, `mp3` (128 kbps) or `mp3@<kbps>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" | "f32" => Ok(Self::RawF32),
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3 { bitrate_kbps: 128 }),
            other => {
                let kbps = other
                    .strip_prefix("mp3@")
                    .map(|b| b.trim_end_matches('k'))
                    .and_then(|b| b.parse::<u32>().ok())
                    .filter(|b| (32..=320).contains(b))
                    .ok_or_else(|| format!("unknown output format: {other}"))?;
                Ok(Self::Mp3 { bitrate_kbps: kbps })
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder I/O: {0}")]
    Io(#[source] std::io::Error),

    #[error("transcoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("transcode cancelled")]
    Cancelled,

    #[error("input of {size} bytes exceeds transcoder limit of {max} bytes")]
    InputTooLarge { size: u64, max: u64 },

    #[error("transcoder exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("malformed transcoder output: {0}")]
    Malformed(String),
}

impl From<TranscodeError> for StealError {
    fn from(e: TranscodeError) -> Self {
        StealError::Processing(e.to_string())
    }
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Decode any container ffmpeg understands to mono f32 PCM at 44.1 kHz.
    async fn decode_to_pcm(&self, input: Vec<u8>) -> Result<Pcm, TranscodeError>;

    async fn encode(&self, pcm: &Pcm, format: AudioOutputFormat) -> Result<Vec<u8>, TranscodeError>;

    /// Apply a chain of `atempo` stages, each already within [0.5, 2.0].
    async fn change_tempo(&self, pcm: &Pcm, chain: &[f64]) -> Result<Pcm, TranscodeError>;
}

pub struct FfmpegTranscoder {
    binary: String,
    timeout: Duration,
    max_input_bytes: u64,
    cancel: CancellationToken,
}

impl FfmpegTranscoder {
    pub fn new(settings: &TranscoderSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
            max_input_bytes: settings.max_input_bytes,
            cancel: CancellationToken::new(),
        }
    }

    /// Kill in-flight subprocesses when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn run(&self, args: Vec<String>, input: Vec<u8>) -> Result<Vec<u8>, TranscodeError> {
        let size = input.len() as u64;
        if size > self.max_input_bytes {
            return Err(TranscodeError::InputTooLarge {
                size,
                max: self.max_input_bytes,
            });
        }

        debug!(binary = %self.binary, ?args, input_bytes = size, "spawning transcoder");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TranscodeError::Malformed("stdin not captured".into()))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            res = tokio::time::timeout(self.timeout, child.wait_with_output()) => match res {
                Ok(out) => out.map_err(TranscodeError::Io)?,
                Err(_) => {
                    warn!(timeout = ?self.timeout, "transcoder timed out, killing");
                    return Err(TranscodeError::Timeout(self.timeout));
                }
            },
            _ = self.cancel.cancelled() => {
                warn!("transcode cancelled, killing subprocess");
                return Err(TranscodeError::Cancelled);
            }
        };

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(e) => return Err(TranscodeError::Malformed(format!("stdin writer: {e}"))),
        }

        debug!(output_bytes = output.stdout.len(), "transcoder finished");
        Ok(output.stdout)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn decode_to_pcm(&self, input: Vec<u8>) -> Result<Pcm, TranscodeError> {
        let mut args = base_args();
        args.extend(owned(&["-i", "pipe:0", "-vn"]));
        args.extend(raw_output_args());
        let out = self.run(args, input).await?;
        pcm_from_output(&out)
    }

    async fn encode(&self, pcm: &Pcm, format: AudioOutputFormat) -> Result<Vec<u8>, TranscodeError> {
        let container = match format {
            AudioOutputFormat::RawF32 => return Ok(pcm.to_le_bytes()),
            AudioOutputFormat::Wav => owned(&["-f", "wav", "pipe:1"]),
            AudioOutputFormat::Mp3 { bitrate_kbps } => {
                let bitrate = format!("{bitrate_kbps}k");
                owned(&["-c:a", "libmp3lame", "-b:a", &bitrate, "-f", "mp3", "pipe:1"])
            }
        };
        let mut args = base_args();
        args.extend(raw_input_args());
        args.extend(container);
        self.run(args, pcm.to_le_bytes()).await
    }

    async fn change_tempo(&self, pcm: &Pcm, chain: &[f64]) -> Result<Pcm, TranscodeError> {
        if chain.is_empty() {
            return Ok(pcm.clone());
        }
        let mut args = base_args();
        args.extend(raw_input_args());
        args.push("-filter:a".into());
        args.push(atempo_filter(chain));
        args.extend(raw_output_args());
        let out = self.run(args, pcm.to_le_bytes()).await?;
        pcm_from_output(&out)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn base_args() -> Vec<String> {
    owned(&["-hide_banner", "-loglevel", "error", "-nostdin"])
}

fn raw_input_args() -> Vec<String> {
    let mut args = owned(&["-f", "f32le", "-ar"]);
    args.push(SAMPLE_RATE.to_string());
    args.extend(owned(&["-ac", "1", "-i", "pipe:0"]));
    args
}

fn raw_output_args() -> Vec<String> {
    let mut args = owned(&["-ac", "1", "-ar"]);
    args.push(SAMPLE_RATE.to_string());
    args.extend(owned(&["-f", "f32le", "-c:a", "pcm_f32le", "pipe:1"]));
    args
}

fn pcm_from_output(out: &[u8]) -> Result<Pcm, TranscodeError> {
    Pcm::from_le_bytes(out).map_err(|e| TranscodeError::Malformed(e.to_string()))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(binary: &str, timeout_ms: u64, max_input_bytes: u64) -> TranscoderSettings {
        TranscoderSettings {
            binary: binary.into(),
            timeout_ms,
            max_input_bytes,
        }
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("wav".parse::<AudioOutputFormat>().unwrap(), AudioOutputFormat::Wav);
        assert_eq!("raw".parse::<AudioOutputFormat>().unwrap(), AudioOutputFormat::RawF32);
        assert_eq!(
            "mp3".parse::<AudioOutputFormat>().unwrap(),
            AudioOutputFormat::Mp3 { bitrate_kbps: 128 }
        );
        assert_eq!(
            "mp3@64k".parse::<AudioOutputFormat>().unwrap(),
            AudioOutputFormat::Mp3 { bitrate_kbps: 64 }
        );
        assert!("mp3@9000".parse::<AudioOutputFormat>().is_err());
        assert!("flac".parse::<AudioOutputFormat>().is_err());
        assert_eq!(AudioOutputFormat::default().extension(), "wav");
    }

    #[test]
    fn stderr_tail_keeps_end() {
        let long = "x".repeat(1000) + "the real error";
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
        assert!(tail.ends_with("the real error"));
    }

    #[test]
    fn errors_surface_as_processing() {
        let e: StealError = TranscodeError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(e.code(), "PROCESSING_ERROR");
    }

    #[tokio::test]
    async fn raw_encode_skips_subprocess() {
        let t = FfmpegTranscoder::new(&settings("/nonexistent/ffmpeg", 1000, 1024));
        let pcm = Pcm::from_samples(vec![0.5, -0.5]);
        let bytes = t.encode(&pcm, AudioOutputFormat::RawF32).await.unwrap();
        assert_eq!(bytes, pcm.to_le_bytes());
    }

    #[tokio::test]
    async fn identity_tempo_skips_subprocess() {
        let t = FfmpegTranscoder::new(&settings("/nonexistent/ffmpeg", 1000, 1024));
        let pcm = Pcm::from_samples(vec![0.1]);
        assert_eq!(t.change_tempo(&pcm, &[]).await.unwrap(), pcm);
    }

    #[tokio::test]
    async fn oversized_input_rejected_before_spawn() {
        let t = FfmpegTranscoder::new(&settings("/nonexistent/ffmpeg", 1000, 8));
        let err = t.decode_to_pcm(vec![0; 9]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::InputTooLarge { size: 9, max: 8 }));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let t = FfmpegTranscoder::new(&settings("/nonexistent/ffmpeg", 1000, 1024));
        let err = t.decode_to_pcm(vec![0; 4]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let t = FfmpegTranscoder::new(&settings("false", 5000, 1024));
        let err = t.run(vec![], vec![]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Failed { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_collected() {
        // `cat` echoes stdin, standing in for a transcoder.
        let t = FfmpegTranscoder::new(&settings("cat", 5000, 1024));
        let out = t.run(vec![], b"pcm!".to_vec()).await.unwrap();
        assert_eq!(out, b"pcm!");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_subprocess_times_out() {
        let t = FfmpegTranscoder::new(&settings("sleep", 100, 1024));
        let err = t.run(vec!["5".into()], vec![]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Timeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_kills_subprocess() {
        let cancel = CancellationToken::new();
        let t = FfmpegTranscoder::new(&settings("sleep", 10_000, 1024))
            .with_cancellation(cancel.clone());
        cancel.cancel();
        let err = t.run(vec!["5".into()], vec![]).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Cancelled));
    }
}
