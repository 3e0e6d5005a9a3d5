//! Configuration types for page splitting.
//!
//! All export behaviour is controlled through [`SplitConfig`], built via its
//! [`SplitConfigBuilder`]. Quality is picked from a fixed set of
//! [`QualityPreset`]s; everything else (floors, ceilings, display sizing) has
//! a documented default.

use crate::error::SplitError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution/compression tuple behind a [`QualityPreset`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySetting {
    /// Export rasterisation density.
    pub dpi: u32,
    /// Compressed-to-raw size ratio used by [`crate::estimate::estimate_mb`].
    pub compression: f64,
    /// JPEG quality, 0–100.
    pub jpeg_quality: u8,
}

/// Named export quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityPreset {
    /// 120 DPI, JPEG q70.
    Low,
    /// 170 DPI, JPEG q80.
    Normal,
    /// 220 DPI, JPEG q88. (default)
    #[default]
    High,
    /// 300 DPI, JPEG q95.
    Native,
    /// Size-constrained export: starts at 220 DPI / q80 and degrades until
    /// the output fits [`SplitConfig::target_mb`]. Always encodes JPEG.
    SizeConstrained,
}

impl QualityPreset {
    /// Every preset, in menu order.
    pub const ALL: [QualityPreset; 5] = [
        QualityPreset::Low,
        QualityPreset::Normal,
        QualityPreset::High,
        QualityPreset::Native,
        QualityPreset::SizeConstrained,
    ];

    pub fn settings(self) -> QualitySetting {
        let (dpi, compression, jpeg_quality) = match self {
            QualityPreset::Low => (120, 0.20, 70),
            QualityPreset::Normal => (170, 0.28, 80),
            QualityPreset::High => (220, 0.38, 88),
            QualityPreset::Native => (300, 0.55, 95),
            QualityPreset::SizeConstrained => (220, 0.38, 80),
        };
        QualitySetting {
            dpi,
            compression,
            jpeg_quality,
        }
    }

    /// Whether exports with this preset run the budget search.
    pub fn is_size_constrained(self) -> bool {
        matches!(self, QualityPreset::SizeConstrained)
    }

    /// Human-readable label used by the CLI.
    pub fn label(self) -> &'static str {
        match self {
            QualityPreset::Low => "Low (120 DPI)",
            QualityPreset::Normal => "Normal (170 DPI)",
            QualityPreset::High => "High (220 DPI)",
            QualityPreset::Native => "Native (300 DPI)",
            QualityPreset::SizeConstrained => "Size-constrained (dynamic)",
        }
    }
}

/// How each slice is encoded inside the output PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossy, smaller. (default)
    #[default]
    Jpeg,
    /// Lossless.
    Png,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => f.write_str("JPEG"),
            ImageFormat::Png => f.write_str("PNG"),
        }
    }
}

/// Sizing of the interactive preview the user clicks on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Preview render DPI never exceeds this. Default: 320.
    pub max_dpi: u32,
    /// Pixel budget for the preview render. Default: 10 000 000.
    pub max_pixels: u64,
    /// Widest preview shown to the user, in display pixels. Default: 1600.
    pub max_width: u32,
    /// Debounce threshold between cuts, in display pixels. Default: 12.
    pub min_cut_gap_px: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            max_dpi: 320,
            max_pixels: 10_000_000,
            max_width: 1600,
            min_cut_gap_px: 12,
        }
    }
}

/// Configuration for one split/export.
///
/// Built via [`SplitConfig::builder()`] or using [`SplitConfig::default()`].
///
/// # Example
/// ```rust
/// use pagesplit::{ImageFormat, QualityPreset, SplitConfig};
///
/// let config = SplitConfig::builder()
///     .preset(QualityPreset::Normal)
///     .image_format(ImageFormat::Png)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_image_format(), ImageFormat::Png);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Export quality preset. Default: [`QualityPreset::High`].
    pub preset: QualityPreset,

    /// Encoding of each slice. Ignored (forced to JPEG) for
    /// [`QualityPreset::SizeConstrained`]. Default: JPEG.
    pub image_format: ImageFormat,

    /// Output size target for the budget search, in MB (10⁶ bytes). Default: 100.
    pub target_mb: f64,

    /// Lowest DPI the budget search will try. Default: 10.
    pub dpi_floor: u32,

    /// Lowest JPEG quality the budget search will try. Default: 30.
    pub quality_floor: u8,

    /// Highest JPEG quality the budget search starts from. Default: 85.
    pub quality_ceiling: u8,

    /// DPI multiplier applied per budget step. Default: 0.80.
    pub dpi_step_factor: f64,

    /// JPEG quality decrement per budget step. Default: 10.
    pub quality_step: u8,

    /// Hard cap on export raster size. Default: 250 000 000 pixels.
    pub max_export_pixels: u64,

    /// Slices shorter than this (export pixels) are dropped. Default: 2.
    pub min_slice_px: u32,

    /// Fixed per-page term of the size estimate, in bytes. Default: 60 000.
    pub per_page_overhead_bytes: u64,

    /// Preview sizing.
    pub display: DisplaySettings,

    /// Optional export progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            preset: QualityPreset::default(),
            image_format: ImageFormat::default(),
            target_mb: 100.0,
            dpi_floor: 10,
            quality_floor: 30,
            quality_ceiling: 85,
            dpi_step_factor: 0.80,
            quality_step: 10,
            max_export_pixels: 250_000_000,
            min_slice_px: 2,
            per_page_overhead_bytes: 60_000,
            display: DisplaySettings::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("preset", &self.preset)
            .field("image_format", &self.image_format)
            .field("target_mb", &self.target_mb)
            .field("dpi_floor", &self.dpi_floor)
            .field("quality_floor", &self.quality_floor)
            .field("quality_ceiling", &self.quality_ceiling)
            .field("dpi_step_factor", &self.dpi_step_factor)
            .field("quality_step", &self.quality_step)
            .field("max_export_pixels", &self.max_export_pixels)
            .field("min_slice_px", &self.min_slice_px)
            .field("display", &self.display)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }

    /// Image format actually used: size-constrained exports are always JPEG.
    pub fn effective_image_format(&self) -> ImageFormat {
        if self.preset.is_size_constrained() {
            ImageFormat::Jpeg
        } else {
            self.image_format
        }
    }

    /// DPI used for the clickable preview.
    pub fn display_dpi(&self) -> u32 {
        self.preset.settings().dpi.min(self.display.max_dpi)
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn preset(mut self, preset: QualityPreset) -> Self {
        self.config.preset = preset;
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn target_mb(mut self, mb: f64) -> Self {
        self.config.target_mb = mb;
        self
    }

    pub fn dpi_floor(mut self, dpi: u32) -> Self {
        self.config.dpi_floor = dpi.max(1);
        self
    }

    pub fn quality_floor(mut self, q: u8) -> Self {
        self.config.quality_floor = q.min(100);
        self
    }

    pub fn quality_ceiling(mut self, q: u8) -> Self {
        self.config.quality_ceiling = q.min(100);
        self
    }

    pub fn dpi_step_factor(mut self, factor: f64) -> Self {
        self.config.dpi_step_factor = factor;
        self
    }

    pub fn quality_step(mut self, step: u8) -> Self {
        self.config.quality_step = step;
        self
    }

    pub fn max_export_pixels(mut self, px: u64) -> Self {
        self.config.max_export_pixels = px;
        self
    }

    pub fn min_slice_px(mut self, px: u32) -> Self {
        self.config.min_slice_px = px;
        self
    }

    pub fn per_page_overhead_bytes(mut self, bytes: u64) -> Self {
        self.config.per_page_overhead_bytes = bytes;
        self
    }

    pub fn display(mut self, display: DisplaySettings) -> Self {
        self.config.display = display;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if !(c.target_mb.is_finite() && c.target_mb > 0.0) {
            return Err(SplitError::InvalidConfig(format!(
                "target size must be a positive number of MB, got {}",
                c.target_mb
            )));
        }
        if !(c.dpi_step_factor > 0.0 && c.dpi_step_factor < 1.0) {
            return Err(SplitError::InvalidConfig(format!(
                "DPI step factor must be in (0, 1), got {}",
                c.dpi_step_factor
            )));
        }
        if c.quality_floor > c.quality_ceiling {
            return Err(SplitError::InvalidConfig(format!(
                "quality floor {} is above ceiling {}",
                c.quality_floor, c.quality_ceiling
            )));
        }
        if c.max_export_pixels == 0 {
            return Err(SplitError::InvalidConfig(
                "pixel ceiling must be ≥ 1".into(),
            ));
        }
        if c.display.max_width == 0 || c.display.max_dpi == 0 || c.display.max_pixels == 0 {
            return Err(SplitError::InvalidConfig(
                "display limits must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_table_matches_menu() {
        let high = QualityPreset::High.settings();
        assert_eq!(high.dpi, 220);
        assert_eq!(high.jpeg_quality, 88);
        assert!((high.compression - 0.38).abs() < 1e-12);

        let sc = QualityPreset::SizeConstrained.settings();
        assert_eq!((sc.dpi, sc.jpeg_quality), (220, 80));
        assert_eq!(QualityPreset::Low.settings().dpi, 120);
        assert_eq!(QualityPreset::Native.settings().jpeg_quality, 95);
    }

    #[test]
    fn size_constrained_forces_jpeg() {
        let config = SplitConfig::builder()
            .preset(QualityPreset::SizeConstrained)
            .image_format(ImageFormat::Png)
            .build()
            .unwrap();
        assert_eq!(config.effective_image_format(), ImageFormat::Jpeg);
    }

    #[test]
    fn display_dpi_is_capped() {
        let mut config = SplitConfig::default();
        assert_eq!(config.display_dpi(), 220);
        config.display.max_dpi = 150;
        assert_eq!(config.display_dpi(), 150);
    }

    #[test]
    fn builder_rejects_inverted_quality_bounds() {
        let err = SplitConfig::builder()
            .quality_floor(90)
            .quality_ceiling(50)
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_non_shrinking_step() {
        assert!(SplitConfig::builder().dpi_step_factor(1.0).build().is_err());
        assert!(SplitConfig::builder().target_mb(0.0).build().is_err());
    }

    #[test]
    fn preset_serialises_as_variant_name() {
        let json = serde_json::to_string(&QualityPreset::SizeConstrained).unwrap();
        assert_eq!(json, "\"SizeConstrained\"");
    }
}
