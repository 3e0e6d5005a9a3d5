//! Slice planning: cut fractions → covering ranges → export pixel rows.
//!
//! [`plan_slices`] is resolution-independent and never drops a range.
//! Whether a range is too thin to keep only becomes known once an export
//! raster height is chosen, which is what [`slice_rows`] does.

use crate::cuts::CutSet;
use serde::{Deserialize, Serialize};

/// A fractional band `[start, end)` of page height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceRange {
    pub start: f64,
    pub end: f64,
}

impl SliceRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Pair each cut with its neighbours plus the implicit 0 and 1 boundaries.
///
/// `[c1..cn]` → `[(0,c1), (c1,c2), …, (cn,1)]`; no cuts → `[(0,1)]`.
pub fn plan_slices(cuts: &CutSet) -> Vec<SliceRange> {
    let mut ranges = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0.0;
    for &c in cuts.as_slice() {
        ranges.push(SliceRange::new(start, c));
        start = c;
    }
    ranges.push(SliceRange::new(start, 1.0));
    ranges
}

/// A slice resolved to raster rows `[y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSlice {
    /// Position of the source range in the plan (0-based).
    pub index: usize,
    pub y0: u32,
    pub y1: u32,
}

impl PixelSlice {
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Resolve ranges to rows on a raster `raster_height` tall.
///
/// Bounds become `round(fraction * raster_height)` (halves to even), clamped
/// to the raster. Slices shorter than `min_px` rows are dropped; because
/// neighbouring ranges share a rounded boundary, the kept slices never
/// overlap and never add up past the raster height.
pub fn slice_rows(ranges: &[SliceRange], raster_height: u32, min_px: u32) -> Vec<PixelSlice> {
    let h = raster_height as f64;
    let to_row = |fraction: f64| -> u32 { (fraction.clamp(0.0, 1.0) * h).round_ties_even() as u32 };

    ranges
        .iter()
        .enumerate()
        .filter_map(|(index, r)| {
            let y0 = to_row(r.start);
            let y1 = to_row(r.end).max(y0);
            let slice = PixelSlice { index, y0, y1 };
            (slice.height() >= min_px.max(1)).then_some(slice)
        })
        .collect()
}
