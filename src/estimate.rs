//! Output-size estimation without encoding anything.
//!
//! The estimate is a display hint next to the preset picker. Actual JPEG/PNG
//! sizes depend on page content, so nothing gates on these numbers.

use crate::config::QualityPreset;
use serde::{Deserialize, Serialize};

/// Fixed per-page PDF overhead assumed by [`estimate_mb`].
pub const PER_PAGE_OVERHEAD_BYTES: u64 = 60_000;

/// Predict output size in megabytes (10⁶ bytes).
///
/// `(width * height * 3 * compression_factor + num_pages * 60 000) / 1 000 000`
pub fn estimate_mb(width_px: u32, height_px: u32, num_pages: usize, compression_factor: f64) -> f64 {
    estimate_mb_with_overhead(
        width_px,
        height_px,
        num_pages,
        compression_factor,
        PER_PAGE_OVERHEAD_BYTES,
    )
}

/// [`estimate_mb`] with an explicit per-page overhead.
pub fn estimate_mb_with_overhead(
    width_px: u32,
    height_px: u32,
    num_pages: usize,
    compression_factor: f64,
    per_page_overhead_bytes: u64,
) -> f64 {
    let raw_bytes = width_px as f64 * height_px as f64 * 3.0;
    let estimated = raw_bytes * compression_factor + (num_pages as u64 * per_page_overhead_bytes) as f64;
    estimated / 1_000_000.0
}

/// Estimate shown alongside the preview for one preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeEstimate {
    pub preset: QualityPreset,
    /// Full-page raster width at the preset's DPI.
    pub width_px: u32,
    pub height_px: u32,
    /// `max(1, cuts + 1)`; tiny slices dropped at export are not anticipated.
    pub pages: usize,
    pub megabytes: f64,
}

/// Estimate the export size of a page of `page_width_pt × page_height_pt`
/// cut `num_cuts` times, at `preset`.
pub fn estimate_export(
    preset: QualityPreset,
    page_width_pt: f64,
    page_height_pt: f64,
    num_cuts: usize,
    per_page_overhead_bytes: u64,
) -> SizeEstimate {
    let settings = preset.settings();
    let width_px = (page_width_pt * settings.dpi as f64 / 72.0) as u32;
    let height_px = (page_height_pt * settings.dpi as f64 / 72.0) as u32;
    let pages = (num_cuts + 1).max(1);
    SizeEstimate {
        preset,
        width_px,
        height_px,
        pages,
        megabytes: estimate_mb_with_overhead(
            width_px,
            height_px,
            pages,
            settings.compression,
            per_page_overhead_bytes,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_megapixel_at_point_two() {
        let mb = estimate_mb(1000, 1000, 1, 0.2);
        assert!((mb - 0.66).abs() < 1e-12, "got {mb}");
        assert_eq!(mb, (1000.0 * 1000.0 * 3.0 * 0.2 + 60_000.0) / 1_000_000.0);
    }

    #[test]
    fn overhead_scales_with_pages() {
        let one = estimate_mb(100, 100, 1, 0.0);
        let five = estimate_mb(100, 100, 5, 0.0);
        assert!((one - 0.06).abs() < 1e-12);
        assert!((five - 0.30).abs() < 1e-12);
    }

    #[test]
    fn export_estimate_uses_preset_dpi() {
        // US Letter at Low (120 DPI): 1020 × 1320 px, 3 pages.
        let e = estimate_export(QualityPreset::Low, 612.0, 792.0, 2, PER_PAGE_OVERHEAD_BYTES);
        assert_eq!((e.width_px, e.height_px), (1020, 1320));
        assert_eq!(e.pages, 3);
        let expected = (1020.0 * 1320.0 * 3.0 * 0.20 + 3.0 * 60_000.0) / 1e6;
        assert!((e.megabytes - expected).abs() < 1e-9);
    }
}
