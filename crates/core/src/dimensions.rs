//! Output dimension calculation.
//!
//! Converts an aspect-ratio selector (or raw width/height) plus the quality
//! tier's maximum edge into pixel dimensions the inference backend accepts.
//! The backend tiles latents internally, so both edges must be multiples of
//! [`ALIGNMENT_UNIT`].

use serde::Serialize;

/// Every output edge is a multiple of this many pixels.
pub const ALIGNMENT_UNIT: u32 = 16;

/// A named reference width:height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub key: &'static str,
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Supported aspect ratios.
pub const ASPECT_RATIOS: &[AspectRatio] = &[
    AspectRatio { key: "1:1", width: 1, height: 1 },
    AspectRatio { key: "4:3", width: 4, height: 3 },
    AspectRatio { key: "3:4", width: 3, height: 4 },
    AspectRatio { key: "3:2", width: 3, height: 2 },
    AspectRatio { key: "2:3", width: 2, height: 3 },
    AspectRatio { key: "16:9", width: 16, height: 9 },
    AspectRatio { key: "9:16", width: 9, height: 16 },
    AspectRatio { key: "21:9", width: 21, height: 9 },
    AspectRatio { key: "4:5", width: 4, height: 5 },
    AspectRatio { key: "5:4", width: 5, height: 4 },
];

/// Look up an aspect ratio by key (e.g. `"16:9"`).
pub fn find_aspect_ratio(key: &str) -> Option<&'static AspectRatio> {
    ASPECT_RATIOS.iter().find(|r| r.key == key)
}

/// Final pixel dimensions of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Compute output dimensions.
///
/// With `use_aspect_ratio` and a known `aspect_ratio_key`, the longer edge
/// becomes `max_dimension` and the shorter one is derived from the ratio.
/// Otherwise the raw values are clamped to `max_dimension` independently.
/// Both edges are then floored to [`ALIGNMENT_UNIT`], never below one unit.
pub fn compute(
    use_aspect_ratio: bool,
    aspect_ratio_key: Option<&str>,
    raw_width: u32,
    raw_height: u32,
    max_dimension: u32,
) -> Dimensions {
    let ratio = aspect_ratio_key
        .filter(|_| use_aspect_ratio)
        .and_then(find_aspect_ratio);

    let (width, height) = match ratio {
        Some(r) => {
            let max = f64::from(max_dimension);
            let ratio = r.ratio();
            if ratio > 1.0 {
                (max_dimension, (max / ratio).round() as u32)
            } else {
                ((max * ratio).round() as u32, max_dimension)
            }
        }
        None => (raw_width.min(max_dimension), raw_height.min(max_dimension)),
    };

    Dimensions {
        width: align_down(width),
        height: align_down(height),
    }
}

/// Floor to the alignment unit, with one unit as the minimum.
fn align_down(value: u32) -> u32 {
    (value / ALIGNMENT_UNIT * ALIGNMENT_UNIT).max(ALIGNMENT_UNIT)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
