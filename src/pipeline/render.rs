//! PDF rasterisation and the render cache.
//!
//! Rendering is the only expensive step in an export, and the same
//! `(document, DPI, pixel cap)` combination is asked for over and over: the
//! preview on every interaction, the base export raster on every budget
//! attempt. [`RasterCache`] memoises renders so each combination is paid for
//! once. It is a pure-function cache: equal keys always mean equal pixels.
//!
//! The [`Rasterizer`] trait is the seam to the PDF engine. [`PdfiumRasterizer`]
//! is the production implementation; tests substitute synthetic rasterisers.

use crate::error::SplitError;
use crate::pipeline::input::{PageInfo, SourceDocument};
use image::imageops::{self, FilterType};
use image::RgbImage;
use lru::LruCache;
use pdfium_render::prelude::*;
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

/// Renders the first page of a PDF to RGB.
pub trait Rasterizer {
    /// Page count and first-page size in points.
    fn inspect(&self, name: &str, pdf_bytes: &[u8]) -> Result<PageInfo, SplitError>;

    /// Rasterise page 0 at `dpi` (scale factor `dpi / 72`).
    fn render(&self, pdf_bytes: &[u8], dpi: u32) -> Result<RgbImage, SplitError>;
}

/// Bind to a pdfium library.
///
/// Search order:
/// 1. `PDFIUM_LIB_PATH` — explicit path to the shared library
/// 2. the platform library name in the current directory
/// 3. the system library search path
pub fn bind_pdfium() -> Result<Pdfium, SplitError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        if !path.is_empty() {
            let bindings = Pdfium::bind_to_library(&path)
                .map_err(|e| SplitError::PdfiumBindingFailed(format!("{path}: {e:?}")))?;
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SplitError::PdfiumBindingFailed(format!("{e:?}")))
}

/// [`Rasterizer`] backed by pdfium.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }

    /// Bind via [`bind_pdfium`].
    pub fn bind() -> Result<Self, SplitError> {
        bind_pdfium().map(Self::new)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn inspect(&self, name: &str, pdf_bytes: &[u8]) -> Result<PageInfo, SplitError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| SplitError::CorruptPdf {
                name: name.to_string(),
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        if page_count == 0 {
            return Ok(PageInfo {
                page_count,
                width_pt: 0.0,
                height_pt: 0.0,
            });
        }

        let page = pages.get(0).map_err(|e| SplitError::CorruptPdf {
            name: name.to_string(),
            detail: format!("{:?}", e),
        })?;

        Ok(PageInfo {
            page_count,
            width_pt: page.width().value as f64,
            height_pt: page.height().value as f64,
        })
    }

    fn render(&self, pdf_bytes: &[u8], dpi: u32) -> Result<RgbImage, SplitError> {
        let fail = |e: PdfiumError| SplitError::RasterisationFailed {
            dpi,
            detail: format!("{:?}", e),
        };

        let document = self.pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(fail)?;
        let page = document.pages().get(0).map_err(fail)?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let bitmap = page.render_with_config(&render_config).map_err(fail)?;

        let image = bitmap.as_image().to_rgb8();
        debug!("Rendered page at {} DPI → {}x{} px", dpi, image.width(), image.height());
        Ok(image)
    }
}

/// Downsample `image` so `width × height ≤ max_pixels`, keeping aspect.
///
/// Both sides scale by `sqrt(max_pixels / total)` and are floored (never
/// below 1). Images already within budget are returned unchanged.
pub fn fit_pixel_budget(image: RgbImage, max_pixels: u64) -> RgbImage {
    let total = image.width() as u64 * image.height() as u64;
    if total <= max_pixels {
        return image;
    }
    let s = (max_pixels as f64 / total as f64).sqrt();
    let w = ((image.width() as f64 * s) as u32).max(1);
    let h = ((image.height() as f64 * s) as u32).max(1);
    debug!(
        "Downsampling {}x{} → {}x{} to fit {} px",
        image.width(),
        image.height(),
        w,
        h,
        max_pixels
    );
    imageops::resize(&image, w, h, FilterType::Lanczos3)
}

/// Resize to exactly `width × height` with Lanczos3; borrowed when already that size.
pub fn resize_exact(image: &RgbImage, width: u32, height: u32) -> Cow<'_, RgbImage> {
    if image.width() == width && image.height() == height {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(
            image,
            width.max(1),
            height.max(1),
            FilterType::Lanczos3,
        ))
    }
}

/// Identity of one render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RasterKey {
    pub digest: [u8; 32],
    pub dpi: u32,
    pub max_pixels: Option<u64>,
}

/// Small LRU memo of rendered rasters.
pub struct RasterCache {
    entries: LruCache<RasterKey, Arc<RgbImage>>,
    hits: u64,
    misses: u64,
}

impl Default for RasterCache {
    fn default() -> Self {
        Self::new(4)
    }
}

impl RasterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached raster for `(source, dpi, max_pixels)`, rendering
    /// it on a miss.
    pub fn get_or_render(
        &mut self,
        rasterizer: &dyn Rasterizer,
        source: &SourceDocument,
        dpi: u32,
        max_pixels: Option<u64>,
    ) -> Result<Arc<RgbImage>, SplitError> {
        let key = RasterKey {
            digest: *source.digest(),
            dpi,
            max_pixels,
        };

        if let Some(image) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(image));
        }

        self.misses += 1;
        let mut image = rasterizer.render(source.bytes(), dpi)?;
        if let Some(cap) = max_pixels {
            image = fit_pixel_budget(image, cap);
        }
        info!(
            "Rendered '{}' at {} DPI: {}x{} px",
            source.name(),
            dpi,
            image.width(),
            image.height()
        );

        let image = Arc::new(image);
        self.entries.put(key, Arc::clone(&image));
        Ok(image)
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
