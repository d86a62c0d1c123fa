//! Sample-level DSP primitives. All functions are pure.

use std::ops::Range;

use super::pcm::{Pcm, SAMPLE_RATE};

/// Bounds of one `atempo` filter stage.
pub const TEMPO_STAGE_MIN: f64 = 0.5;
pub const TEMPO_STAGE_MAX: f64 = 2.0;

const SILENCE_DB_FLOOR: f64 = -60.0;
const SILENCE_DB_CEIL: f64 = 0.0;

/// Largest absolute amplitude.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
}

/// Scale so the loudest sample reaches 1.0. Pure silence is returned untouched.
pub fn normalize(pcm: Pcm) -> Pcm {
    let peak = peak(pcm.samples());
    if peak == 0.0 {
        return pcm;
    }
    let scale = 1.0 / peak;
    Pcm::from_samples(pcm.into_samples().into_iter().map(|s| s * scale).collect())
}

/// Multiply every sample by `level`. Range checking belongs to the caller.
pub fn scale(pcm: Pcm, level: f64) -> Pcm {
    let level = level as f32;
    Pcm::from_samples(pcm.into_samples().into_iter().map(|s| s * level).collect())
}

/// dB to linear amplitude, with the dB value clamped to [-60, 0].
pub fn db_to_amplitude(db: f64) -> f32 {
    let db = db.clamp(SILENCE_DB_FLOOR, SILENCE_DB_CEIL);
    10f64.powf(db / 20.0) as f32
}

pub fn ms_to_samples(ms: f64) -> usize {
    ((ms / 1000.0) * f64::from(SAMPLE_RATE)).floor().max(0.0) as usize
}

/// Contiguous runs of samples below `threshold` that are at least `min_samples` long.
pub fn silent_runs(samples: &[f32], threshold: f32, min_samples: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, s) in samples.iter().enumerate() {
        if s.abs() < threshold {
            start.get_or_insert(i);
        } else if let Some(begin) = start.take() {
            if i - begin >= min_samples {
                runs.push(begin..i);
            }
        }
    }
    if let Some(begin) = start {
        if samples.len() - begin >= min_samples {
            runs.push(begin..samples.len());
        }
    }
    runs
}

/// Excise qualifying silent runs. Returns the trimmed buffer and the number of samples removed.
pub fn remove_silence(pcm: Pcm, threshold_db: f64, min_duration_ms: f64) -> (Pcm, usize) {
    let threshold = db_to_amplitude(threshold_db);
    let runs = silent_runs(pcm.samples(), threshold, ms_to_samples(min_duration_ms));
    if runs.is_empty() {
        return (pcm, 0);
    }

    let removed: usize = runs.iter().map(|r| r.len()).sum();
    let samples = pcm.samples();
    let mut kept = Vec::with_capacity(samples.len() - removed);
    let mut cursor = 0;
    for run in &runs {
        kept.extend_from_slice(&samples[cursor..run.start]);
        cursor = run.end;
    }
    kept.extend_from_slice(&samples[cursor..]);

    (Pcm::from_samples(kept), removed)
}

/// Split a tempo factor into `atempo` stages that each lie in [0.5, 2.0].
///
/// A factor of exactly 1 yields an empty chain.
pub fn tempo_chain(rate: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remaining = rate;
    while remaining > TEMPO_STAGE_MAX {
        stages.push(TEMPO_STAGE_MAX);
        remaining /= TEMPO_STAGE_MAX;
    }
    while remaining < TEMPO_STAGE_MIN {
        stages.push(TEMPO_STAGE_MIN);
        remaining /= TEMPO_STAGE_MIN;
    }
    if remaining != 1.0 {
        stages.push(remaining);
    }
    stages
}

/// Render a chain as an ffmpeg audio filter graph, e.g. `atempo=2.0,atempo=1.25`.
pub fn atempo_filter(chain: &[f64]) -> String {
    chain
        .iter()
        .map(|stage| {
            if stage.fract() == 0.0 {
                format!("atempo={stage:.1}")
            } else {
                format!("atempo={stage}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[f32]) -> Pcm {
        Pcm::from_samples(samples.to_vec())
    }

    #[test]
    fn normalize_scales_to_unit_peak() {
        let out = normalize(pcm(&[0.25, -0.5, 0.1]));
        assert_eq!(out.samples(), &[0.5, -1.0, 0.2]);
    }

    #[test]
    fn normalize_silence_is_identity() {
        let input = pcm(&[0.0, -0.0, 0.0]);
        assert_eq!(normalize(input.clone()), input);
    }

    #[test]
    fn scale_multiplies() {
        assert_eq!(scale(pcm(&[0.5, -0.25]), 2.0).samples(), &[1.0, -0.5]);
        assert_eq!(scale(pcm(&[0.5]), 0.0).samples(), &[0.0]);
    }

    #[test]
    fn db_clamps() {
        assert_eq!(db_to_amplitude(0.0), 1.0);
        assert_eq!(db_to_amplitude(10.0), 1.0);
        assert!((db_to_amplitude(-60.0) - 0.001).abs() < 1e-6);
        assert_eq!(db_to_amplitude(-90.0), db_to_amplitude(-60.0));
        assert!((db_to_amplitude(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn ms_to_samples_floors() {
        assert_eq!(ms_to_samples(1000.0), 44_100);
        assert_eq!(ms_to_samples(300.0), 13_230);
        assert_eq!(ms_to_samples(0.01), 0);
    }

    #[test]
    fn short_runs_are_kept() {
        // threshold 0.1, min run 3 samples
        let samples = [0.5, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5];
        assert_eq!(silent_runs(&samples, 0.1, 3), vec![4..7]);
    }

    #[test]
    fn trailing_run_is_excised() {
        let samples = [0.5, 0.0, 0.0, 0.0];
        assert_eq!(silent_runs(&samples, 0.1, 2), vec![1..4]);
    }

    #[test]
    fn remove_silence_splices_in_order() {
        let mut samples = vec![0.9_f32; 10];
        samples.extend(vec![0.0; 44_100]); // one second of silence
        samples.extend(vec![-0.8; 5]);
        let (out, removed) = remove_silence(Pcm::from_samples(samples), -40.0, 500.0);
        assert_eq!(removed, 44_100);
        assert_eq!(out.len(), 15);
        assert_eq!(out.samples()[9], 0.9);
        assert_eq!(out.samples()[10], -0.8);
    }

    #[test]
    fn no_qualifying_run_returns_input() {
        let input = pcm(&[0.5, 0.0, 0.5]);
        let (out, removed) = remove_silence(input.clone(), -40.0, 100.0);
        assert_eq!(out, input);
        assert_eq!(removed, 0);
    }

    #[test]
    fn tempo_chain_examples() {
        assert_eq!(tempo_chain(5.0), vec![2.0, 2.0, 1.25]);
        assert_eq!(tempo_chain(1.0), Vec::<f64>::new());
        assert_eq!(tempo_chain(1.5), vec![1.5]);
        assert_eq!(tempo_chain(0.25), vec![0.5, 0.5]);
        assert_eq!(tempo_chain(4.0), vec![2.0, 2.0]);
    }

    #[test]
    fn filter_string() {
        assert_eq!(atempo_filter(&[2.0, 2.0, 1.25]), "atempo=2.0,atempo=2.0,atempo=1.25");
        assert_eq!(atempo_filter(&[]), "");
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_peak_bounded(samples in prop::collection::vec(-1000.0f32..1000.0, 0..256)) {
                let out = normalize(Pcm::from_samples(samples));
                prop_assert!(peak(out.samples()) <= 1.0 + 1e-5);
            }

            #[test]
            fn tempo_chain_product_and_bounds(rate in 0.25f64..=100.0) {
                let chain = tempo_chain(rate);
                let product: f64 = chain.iter().product();
                prop_assert!((product - rate).abs() <= rate * 1e-9);
                for stage in &chain {
                    prop_assert!((TEMPO_STAGE_MIN..=TEMPO_STAGE_MAX).contains(stage));
                }
            }

            #[test]
            fn higher_threshold_removes_at_least_as_much(
                samples in prop::collection::vec(-1.0f32..1.0, 0..512),
                low in -60.0f64..0.0,
                delta in 0.0f64..60.0,
                min_ms in 0.0f64..0.1,
            ) {
                let high = (low + delta).min(0.0);
                let (_, removed_low) = remove_silence(Pcm::from_samples(samples.clone()), low, min_ms);
                let (_, removed_high) = remove_silence(Pcm::from_samples(samples), high, min_ms);
                prop_assert!(removed_high >= removed_low);
            }

            #[test]
            fn removal_preserves_sample_budget(
                samples in prop::collection::vec(-1.0f32..1.0, 0..512),
                db in -60.0f64..0.0,
            ) {
                let n = samples.len();
                let (out, removed) = remove_silence(Pcm::from_samples(samples), db, 0.05);
                prop_assert_eq!(out.len() + removed, n);
            }
        }
    }
}
