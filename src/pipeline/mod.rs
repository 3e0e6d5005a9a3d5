//! Pipeline stages behind an export.
//!
//! Each submodule wraps exactly one external concern so the slicing logic in
//! [`crate::export`] and [`crate::budget`] stays free of PDF and codec
//! details.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ (crop) ──▶ encode ──▶ compose
//! (bytes)   (pdfium)              (JPEG/    (lopdf)
//!           + cache               Flate)
//! ```
//!
//! 1. [`input`]   — validate the source bytes, enforce the single-page rule
//! 2. [`render`]  — rasterise the page at a DPI; memoised by [`render::RasterCache`]
//! 3. [`encode`]  — turn a cropped raster into an embeddable image stream
//! 4. [`compose`] — lay each encoded slice onto its own page, sized from
//!    pixels and DPI

pub mod compose;
pub mod encode;
pub mod input;
pub mod render;
