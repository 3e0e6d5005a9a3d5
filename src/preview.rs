//! The clickable preview: a capped render, its screen geometry and the cut
//! overlay drawn on top of it.

use crate::config::SplitConfig;
use crate::cuts::{CutSet, DisplayGeometry};
use crate::error::SplitError;
use crate::estimate::{estimate_export, SizeEstimate};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::{RasterCache, Rasterizer};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tracing::debug;

const CUT_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const CUT_THICKNESS: u32 = 2;

/// A preview render and how it maps onto the screen.
#[derive(Debug, Clone)]
pub struct Preview {
    pub raster: Arc<RgbImage>,
    pub geometry: DisplayGeometry,
    /// DPI the preview raster was requested at.
    pub dpi: u32,
}

/// Render the preview at `min(preset DPI, display.max_dpi)`, capped to
/// `display.max_pixels`.
pub fn render_preview(
    rasterizer: &dyn Rasterizer,
    source: &SourceDocument,
    cache: &mut RasterCache,
    config: &SplitConfig,
) -> Result<Preview, SplitError> {
    let dpi = config.display_dpi();
    let raster = cache.get_or_render(rasterizer, source, dpi, Some(config.display.max_pixels))?;
    let geometry = DisplayGeometry::fit(raster.width(), raster.height(), config.display.max_width);
    debug!(
        "Preview {}x{} px at {} DPI, shown at {}x{}",
        raster.width(),
        raster.height(),
        dpi,
        geometry.display_width,
        geometry.display_height
    );
    Ok(Preview { raster, geometry, dpi })
}

impl Preview {
    /// The preview scaled to display size with every cut drawn as a red line.
    pub fn overlay(&self, cuts: &CutSet) -> RgbImage {
        let g = &self.geometry;
        let mut canvas = if (g.display_width, g.display_height) == self.raster.dimensions() {
            (*self.raster).clone()
        } else {
            imageops::resize(
                &*self.raster,
                g.display_width,
                g.display_height.max(1),
                FilterType::Triangle,
            )
        };

        let (width, height) = canvas.dimensions();
        for &fraction in cuts.as_slice() {
            let top = g.display_row(fraction);
            for y in top..top.saturating_add(CUT_THICKNESS).min(height) {
                for x in 0..width {
                    canvas.put_pixel(x, y, CUT_COLOUR);
                }
            }
        }
        canvas
    }

    /// Size estimate for exporting the current cuts with `config`'s preset.
    pub fn estimate(&self, source: &SourceDocument, cuts: &CutSet, config: &SplitConfig) -> SizeEstimate {
        let page = source.page();
        estimate_export(
            config.preset,
            page.width_pt,
            page.height_pt,
            cuts.len(),
            config.per_page_overhead_bytes,
        )
    }

    /// One-line caption shown under the preview.
    pub fn caption(&self, source: &SourceDocument, cuts: &CutSet, config: &SplitConfig) -> String {
        let est = self.estimate(source, cuts, config);
        format!(
            "{} cut(s) → {} page(s) · {} · ~{:.1} MB",
            cuts.len(),
            est.pages,
            config.preset.label(),
            est.megabytes
        )
    }
}
