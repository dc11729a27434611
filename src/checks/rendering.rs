//! Display, graphics and audio checks.
//!
//! Canvas and audio outputs are reduced to a SHA-256 fingerprint. The
//! fingerprint is only compared against known degenerate outputs; it is
//! not used to identify the session.

use sha2::{Digest, Sha256};

use super::{CheckDetail, CheckId, CheckResult};
use crate::environment::Environment;
use crate::error::Result;

/// Resolutions typical of default VM and headless profiles.
pub const LOW_END_RESOLUTIONS: &[&str] = &["1024x768", "800x600", "1280x1024"];

/// Renderer substrings of software rasterizers.
pub const SOFTWARE_RENDERER_MARKERS: &[&str] = &["SwiftShader", "Mesa"];

/// Canvas output hashes that mean rendering was disabled or stubbed:
/// the empty string and `data:,` (what a blocked canvas serializes to).
pub const KNOWN_BAD_CANVAS_HASHES: &[&str] = &[
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    "4ff286857945d8713fd2e6744ee452fb51aadd3bca707c9850cb95ef18bba878",
];

/// Data URLs shorter than this cannot hold the drawn scene.
pub const MIN_CANVAS_DATA_URL_LEN: usize = 100;

/// Lowercase hex SHA-256.
pub fn fingerprint_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn check_screen<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let screen = env.screen()?;
    let resolution = screen.resolution();
    let suspicious = LOW_END_RESOLUTIONS.contains(&resolution.as_str());
    Ok(CheckResult::scored(
        if suspicious { 1 } else { 0 },
        CheckDetail::Screen {
            resolution,
            color_depth: screen.color_depth,
            pixel_depth: screen.pixel_depth,
        },
    ))
}

/// Missing WebGL and a software renderer score independently.
pub fn check_webgl<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let (supported, renderer) = match env.webgl()? {
        Some(info) => (true, info.renderer),
        None => (false, "unknown".to_string()),
    };
    let software = SOFTWARE_RENDERER_MARKERS
        .iter()
        .any(|marker| renderer.contains(marker));

    Ok(CheckResult::scored(
        u32::from(!supported) + u32::from(software),
        CheckDetail::Webgl {
            supported,
            renderer,
        },
    ))
}

/// A rendering exception is scored 2 by the fallback; a degenerate
/// rendering scores 3.
///
/// Besides the fixed list, the hash of an untouched canvas of the same
/// size is known bad: blockers hand back a blank image for the drawing.
pub fn check_canvas<E: Environment + ?Sized>(env: &E) -> Result<CheckResult> {
    let data_url = env.canvas_data_url()?;
    let hash = fingerprint_hash(data_url.as_bytes());
    let blank_hash = match env.blank_canvas_data_url() {
        Ok(blank) => Some(fingerprint_hash(blank.as_bytes())),
        Err(e) => {
            log::debug!("Blank canvas reference unavailable: {}", e);
            None
        }
    };
    let known_bad = KNOWN_BAD_CANVAS_HASHES.contains(&hash.as_str())
        || blank_hash.as_deref() == Some(hash.as_str());
    let too_short = data_url.len() < MIN_CANVAS_DATA_URL_LEN;

    Ok(CheckResult::scored(
        if known_bad || too_short { 3 } else { 0 },
        CheckDetail::Canvas {
            hash,
            data_url_length: data_url.len(),
            known_bad,
            too_short,
        },
    ))
}

/// Degenerate analyser output: empty, all zero, or one value in every bin.
pub fn is_degenerate_spectrum(bins: &[u8]) -> bool {
    match bins.first() {
        None => true,
        Some(first) => bins.iter().all(|b| b == first),
    }
}

/// Score the rendered audio spectrum.
///
/// Degenerate output scores 2. A pipeline that could not be built or
/// rendered gets the fallback of 1.
pub fn evaluate_audio(outcome: Result<Vec<u8>>) -> CheckResult {
    let bins = match outcome {
        Ok(bins) => bins,
        Err(err) => {
            log::warn!("⚠️ Audio pipeline failed: {}", err);
            return CheckResult::fallback(CheckId::Audio, &err);
        }
    };
    let degenerate = is_degenerate_spectrum(&bins);
    let sum = bins.iter().map(|b| u64::from(*b)).sum();

    CheckResult::scored(
        if degenerate { 2 } else { 0 },
        CheckDetail::Audio {
            hash: fingerprint_hash(&bins),
            bin_count: bins.len(),
            sum,
            degenerate,
        },
    )
}
