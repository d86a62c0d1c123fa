use robinwood_core::{Result, StealError};

/// Fixed sample rate of every buffer the audio pipeline handles.
pub const SAMPLE_RATE: u32 = 44_100;

const BYTES_PER_SAMPLE: usize = 4;

/// Mono 32-bit float PCM at [`SAMPLE_RATE`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pcm(Vec<f32>);

impl Pcm {
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self(samples)
    }

    /// Decode little-endian f32 samples. The buffer must hold whole samples.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % BYTES_PER_SAMPLE != 0 {
            return Err(StealError::InvalidFormat(format!(
                "raw f32 PCM length {} is not a multiple of {BYTES_PER_SAMPLE}",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self(samples))
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for s in &self.0 {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub fn samples(&self) -> &[f32] {
        &self.0
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.0.len() * BYTES_PER_SAMPLE
    }

    pub fn duration_secs(&self) -> f64 {
        samples_to_secs(self.0.len())
    }
}

pub fn samples_to_secs(samples: usize) -> f64 {
    samples as f64 / f64::from(SAMPLE_RATE)
}

/// Name of the container whose magic bytes open `bytes`, if any.
///
/// Buffers shorter than 12 bytes are never treated as containers.
pub fn sniff_container(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 12 {
        return None;
    }
    if &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some("WAV");
    }
    if &bytes[4..8] == b"ftyp" {
        return Some("MP4/AAC");
    }
    if &bytes[0..3] == b"ID3" {
        return Some("MP3");
    }
    None
}

/// Accept only headerless f32 PCM.
pub fn parse_raw(bytes: &[u8]) -> Result<Pcm> {
    if let Some(container) = sniff_container(bytes) {
        return Err(StealError::InvalidFormat(format!(
            "{container} container detected; decode to raw f32 PCM first"
        )));
    }
    Pcm::from_le_bytes(bytes)
}
