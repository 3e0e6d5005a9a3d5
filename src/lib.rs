//! # pagesplit
//!
//! Split a single, very tall PDF page into a multi-page PDF at user-chosen
//! horizontal cut lines.
//!
//! ## Why this crate?
//!
//! Long-form exports (web captures, chat transcripts, receipts) often arrive
//! as one page several metres tall. Printers and readers handle those badly.
//! This crate rasterises the page once, slices the raster at the cuts and
//! writes each slice as its own page, sized so the physical dimensions of the
//! original are kept.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (1 page)
//!  │
//!  ├─ 1. Input    magic bytes, page count == 1, SHA-256 digest
//!  ├─ 2. Preview  capped render + click → cut fraction mapping
//!  ├─ 3. Plan     cut fractions → covering ranges
//!  ├─ 4. Export   render (cached) → crop → JPEG/Flate → one page per slice
//!  └─ 5. Budget   optional: lower DPI / quality until the file fits a target
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesplit::{split_file, CutSet, QualityPreset, SplitConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitConfig::builder()
//!         .preset(QualityPreset::SizeConstrained)
//!         .target_mb(25.0)
//!         .build()?;
//!     let cuts = CutSet::from_fractions([0.25, 0.5, 0.75]);
//!     let (path, report) = split_file("transcript.pdf", &cuts, &config, None)?;
//!     eprintln!("{} pages, {:.1} MB → {}", report.pages.len(), report.size_mb(), path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagesplit` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod budget;
pub mod config;
pub mod cuts;
pub mod error;
pub mod estimate;
pub mod export;
pub mod pipeline;
pub mod plan;
pub mod preview;
pub mod progress;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use budget::{Attempt, BudgetOutcome, BudgetSearch};
pub use config::{
    DisplaySettings, ImageFormat, QualityPreset, QualitySetting, SplitConfig, SplitConfigBuilder,
};
pub use cuts::{map_click, merge_cut, CutSet, DisplayGeometry, EditSession};
pub use error::SplitError;
pub use estimate::{estimate_export, estimate_mb, SizeEstimate};
pub use export::{export_dimensions, ExportEngine, ExportParams, ExportedDocument, ExportedPage};
pub use pipeline::input::{PageInfo, SourceDocument};
pub use pipeline::render::{PdfiumRasterizer, RasterCache, Rasterizer};
pub use plan::{plan_slices, slice_rows, PixelSlice, SliceRange};
pub use preview::{render_preview, Preview};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use split::{inspect, split, split_file, split_to_file, ExportReport, SplitOutput};
