//! Audio pipeline: mono f32 PCM at 44.1 kHz.

pub mod dsp;
pub mod executor;
pub mod ops;
pub mod pcm;
pub mod transcoder;

pub use executor::{AudioDetails, AudioExecutor, AudioPipeline, AudioResult};
pub use ops::AudioOp;
pub use pcm::{Pcm, SAMPLE_RATE};
pub use transcoder::{AudioOutputFormat, FfmpegTranscoder, TranscodeError, Transcoder};
