//! The export engine: slice plan + parameters → multi-page PDF bytes.
//!
//! ## Algorithm
//!
//! ```text
//! page size (pt) ─▶ raster size at DPI ─▶ pixel ceiling (may lower DPI)
//!      │
//!      ▼
//! raster: downscale of the cached base render, or a fresh render
//!      │
//!      ▼
//! per range: rows = round(fraction · H) ─▶ drop < min rows ─▶ crop ─▶ encode
//!      │
//!      ▼
//! compose: page size = crop px · 72 / effective DPI
//! ```
//!
//! Callers must accept that the effective DPI can be lower than the one they
//! asked for; it is reported on [`ExportedDocument::effective_dpi`]. Any
//! failure after planning aborts the attempt; no partial document is returned.

use crate::config::{ImageFormat, SplitConfig};
use crate::error::SplitError;
use crate::pipeline::compose::{px_to_pt, PdfComposer};
use crate::pipeline::encode::encode_slice;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::{resize_exact, RasterCache, Rasterizer};
use crate::plan::{slice_rows, SliceRange};
use image::imageops;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Parameters of one export attempt. A new value is made per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportParams {
    pub dpi: u32,
    pub jpeg_quality: u8,
    pub image_format: ImageFormat,
}

/// Raster size an export will use after the pixel ceiling is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportDimensions {
    pub effective_dpi: u32,
    pub width_px: u32,
    pub height_px: u32,
}

impl ExportDimensions {
    pub fn pixels(&self) -> u64 {
        self.width_px as u64 * self.height_px as u64
    }
}

fn raster_side(pt: f64, dpi: u32) -> u32 {
    ((pt * dpi as f64 / 72.0) as u32).max(1)
}

/// Compute `px = pt * dpi / 72` and lower the DPI until the raster holds at
/// most `max_pixels` pixels.
///
/// The first reduction scales DPI by `sqrt(max_pixels / pixels)`; flooring
/// the sides can leave it a hair over, so it then steps down one DPI at a
/// time. The DPI never drops below 1.
pub fn export_dimensions(width_pt: f64, height_pt: f64, dpi: u32, max_pixels: u64) -> ExportDimensions {
    let mut dpi = dpi.max(1);
    let mut dims = ExportDimensions {
        effective_dpi: dpi,
        width_px: raster_side(width_pt, dpi),
        height_px: raster_side(height_pt, dpi),
    };

    if dims.pixels() > max_pixels {
        let s = (max_pixels as f64 / dims.pixels() as f64).sqrt();
        dpi = ((dpi as f64 * s) as u32).max(1);
        loop {
            dims = ExportDimensions {
                effective_dpi: dpi,
                width_px: raster_side(width_pt, dpi),
                height_px: raster_side(height_pt, dpi),
            };
            if dims.pixels() <= max_pixels || dpi == 1 {
                break;
            }
            dpi -= 1;
        }
    }
    dims
}

/// One page of an exported document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportedPage {
    /// Index of the source range in the slice plan.
    pub slice_index: usize,
    pub width_px: u32,
    pub height_px: u32,
    pub width_pt: f64,
    pub height_pt: f64,
}

/// Result of one export attempt.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub requested: ExportParams,
    /// DPI actually rendered at, after the pixel ceiling.
    pub effective_dpi: u32,
    pub raster_width: u32,
    pub raster_height: u32,
    pub pages: Vec<ExportedPage>,
}

impl ExportedDocument {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Size in megabytes (10⁶ bytes).
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1_000_000.0
    }
}

/// Renders, crops, encodes and composes slices of one source document.
///
/// The engine renders the page once at `base_dpi` (through the shared
/// [`RasterCache`]) and serves every lower effective DPI by Lanczos
/// downscaling of that render. A higher effective DPI gets its own render.
pub struct ExportEngine<'a> {
    rasterizer: &'a dyn Rasterizer,
    source: &'a SourceDocument,
    cache: &'a mut RasterCache,
    base_dpi: u32,
    max_export_pixels: u64,
    min_slice_px: u32,
}

impl<'a> ExportEngine<'a> {
    pub fn new(
        rasterizer: &'a dyn Rasterizer,
        source: &'a SourceDocument,
        cache: &'a mut RasterCache,
        base_dpi: u32,
        config: &SplitConfig,
    ) -> Self {
        Self {
            rasterizer,
            source,
            cache,
            base_dpi: base_dpi.max(1),
            max_export_pixels: config.max_export_pixels,
            min_slice_px: config.min_slice_px,
        }
    }

    /// Raster size for `dpi` on this source page.
    pub fn dimensions(&self, dpi: u32) -> ExportDimensions {
        let page = self.source.page();
        export_dimensions(page.width_pt, page.height_pt, dpi, self.max_export_pixels)
    }

    /// Run one export attempt over `ranges`.
    pub fn export(&mut self, ranges: &[SliceRange], params: ExportParams) -> Result<ExportedDocument, SplitError> {
        let dims = self.dimensions(params.dpi);
        let dpi = dims.effective_dpi;
        if dpi != params.dpi {
            warn!(
                "Export at {} DPI would need {} px; using {} DPI ({}x{} px)",
                params.dpi,
                self.dimensions_uncapped(params.dpi),
                dpi,
                dims.width_px,
                dims.height_px
            );
        }

        // The base render is itself subject to the ceiling.
        let base_dpi = self.dimensions(self.base_dpi).effective_dpi;
        let render_dpi = if dpi <= base_dpi { base_dpi } else { dpi };
        let rendered = self
            .cache
            .get_or_render(self.rasterizer, self.source, render_dpi, None)?;
        let raster = resize_exact(&rendered, dims.width_px, dims.height_px);
        debug!(
            "Export raster {}x{} px at {} DPI (rendered at {})",
            raster.width(),
            raster.height(),
            dpi,
            render_dpi
        );

        let rows = slice_rows(ranges, raster.height(), self.min_slice_px);
        let dropped = ranges.len() - rows.len();
        if dropped > 0 {
            debug!("Dropped {} slice(s) thinner than {} px", dropped, self.min_slice_px);
        }
        if rows.is_empty() {
            return Err(SplitError::ComposeFailed(format!(
                "no slice is at least {} px tall at {} DPI",
                self.min_slice_px, dpi
            )));
        }

        let mut composer = PdfComposer::new();
        let mut pages = Vec::with_capacity(rows.len());
        for slice in &rows {
            let crop = imageops::crop_imm(&*raster, 0, slice.y0, raster.width(), slice.height()).to_image();
            let encoded = encode_slice(&crop, params.image_format, params.jpeg_quality).map_err(|e| {
                SplitError::EncodeFailed {
                    slice: slice.index + 1,
                    detail: e.to_string(),
                }
            })?;

            let width_pt = px_to_pt(crop.width(), dpi);
            let height_pt = px_to_pt(crop.height(), dpi);
            composer.add_page(width_pt, height_pt, &encoded)?;
            pages.push(ExportedPage {
                slice_index: slice.index,
                width_px: crop.width(),
                height_px: crop.height(),
                width_pt,
                height_pt,
            });
        }

        let bytes = composer.finish()?;
        info!(
            "Exported {} page(s) at {} DPI, {} q{}: {} bytes",
            pages.len(),
            dpi,
            params.image_format,
            params.jpeg_quality,
            bytes.len()
        );

        Ok(ExportedDocument {
            bytes,
            requested: params,
            effective_dpi: dpi,
            raster_width: raster.width(),
            raster_height: raster.height(),
            pages,
        })
    }

    fn dimensions_uncapped(&self, dpi: u32) -> u64 {
        let page = self.source.page();
        raster_side(page.width_pt, dpi) as u64 * raster_side(page.height_pt, dpi) as u64
    }
}
