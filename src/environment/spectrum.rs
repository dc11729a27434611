//! Byte frequency analysis of rendered audio samples.
//!
//! Produces what `AnalyserNode.getByteFrequencyData()` reports for one
//! frame: the last `FFT_SIZE` samples under a Blackman window, DFT
//! magnitudes scaled by `1/FFT_SIZE`, converted to decibels and mapped
//! onto `0..=255` between `MIN_DECIBELS` and `MAX_DECIBELS`. There is no
//! smoothing across frames.

use std::f64::consts::PI;

/// Analyser frame length (`AnalyserNode.fftSize` default).
pub const FFT_SIZE: usize = 2048;

/// Number of bins returned (`frequencyBinCount`).
pub const BIN_COUNT: usize = FFT_SIZE / 2;

pub const MIN_DECIBELS: f64 = -100.0;
pub const MAX_DECIBELS: f64 = -30.0;

/// Byte spectrum of the tail of `samples`.
///
/// A buffer shorter than one frame is zero-padded. An empty buffer has no
/// spectrum and yields no bins.
pub fn byte_frequency_data(samples: &[f32]) -> Vec<u8> {
    if samples.is_empty() {
        return Vec::new();
    }

    let cos: Vec<f64> = (0..FFT_SIZE)
        .map(|i| (2.0 * PI * i as f64 / FFT_SIZE as f64).cos())
        .collect();
    let sin: Vec<f64> = (0..FFT_SIZE)
        .map(|i| (2.0 * PI * i as f64 / FFT_SIZE as f64).sin())
        .collect();

    let frame = &samples[samples.len().saturating_sub(FFT_SIZE)..];
    let windowed: Vec<f64> = (0..FFT_SIZE)
        .map(|i| {
            let x = frame.get(i).copied().unwrap_or(0.0) as f64;
            let w = 0.42 - 0.5 * cos[i] + 0.08 * cos[(2 * i) % FFT_SIZE];
            x * w
        })
        .collect();

    (0..BIN_COUNT)
        .map(|k| {
            let (mut re, mut im) = (0.0, 0.0);
            for (i, x) in windowed.iter().enumerate() {
                let t = (k * i) % FFT_SIZE;
                re += x * cos[t];
                im -= x * sin[t];
            }
            let magnitude = (re * re + im * im).sqrt() / FFT_SIZE as f64;
            to_byte(20.0 * magnitude.log10())
        })
        .collect()
}

fn to_byte(db: f64) -> u8 {
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
