//! Split entry points: cuts + source → output PDF and an export report.
//!
//! [`split`] is the in-memory API every other entry point goes through. It
//! picks between a single export at the preset's parameters and a
//! size-constrained [`BudgetSearch`], fires the progress callback and
//! assembles the [`ExportReport`].

use crate::budget::{Attempt, BudgetOutcome, BudgetSearch};
use crate::config::{ImageFormat, QualityPreset, SplitConfig};
use crate::cuts::CutSet;
use crate::error::SplitError;
use crate::export::{ExportEngine, ExportParams, ExportedDocument, ExportedPage};
use crate::pipeline::input::{PageInfo, SourceDocument};
use crate::pipeline::render::{PdfiumRasterizer, RasterCache, Rasterizer};
use crate::plan::plan_slices;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// What was exported and how.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub file_name: String,
    pub preset: QualityPreset,
    pub size_bytes: usize,
    /// DPI of the final attempt after the pixel ceiling.
    pub effective_dpi: u32,
    pub jpeg_quality: u8,
    pub image_format: ImageFormat,
    pub raster_width: u32,
    pub raster_height: u32,
    pub pages: Vec<ExportedPage>,
    /// One entry per export; a single entry unless the budget search ran.
    pub attempts: Vec<Attempt>,
    /// Size target, for size-constrained exports only.
    pub target_mb: Option<f64>,
    /// Always `true` when there was no target.
    pub within_target: bool,
    pub duration_ms: u64,
}

impl ExportReport {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1_000_000.0
    }
}

/// A finished split held in memory.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub report: ExportReport,
}

/// Split `source` at `cuts` into a multi-page PDF.
///
/// Cuts are re-sanitised (kept strictly inside `(0, 1)`, sorted, deduped)
/// before planning. With [`QualityPreset::SizeConstrained`] the output is the
/// first budget attempt that fits `config.target_mb`, or the floor attempt
/// when none does; any other preset exports exactly once.
///
/// # Errors
/// Rasterisation, encoding and composition failures are fatal. A missed size
/// target is not an error; see [`ExportReport::within_target`].
pub fn split(
    source: &SourceDocument,
    cuts: &CutSet,
    rasterizer: &dyn Rasterizer,
    cache: &mut RasterCache,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let start = Instant::now();
    let cuts = CutSet::from_fractions(cuts.as_slice().iter().copied());
    let ranges = plan_slices(&cuts);
    info!(
        "Splitting '{}' at {} cut(s) with preset {:?}",
        source.name(),
        cuts.len(),
        config.preset
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(ranges.len());
    }

    let setting = config.preset.settings();
    let mut engine = ExportEngine::new(rasterizer, source, cache, setting.dpi, config);
    let mut attempt_no = 0usize;
    let mut run_attempt = |params: ExportParams| -> Result<ExportedDocument, SplitError> {
        attempt_no += 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_attempt_start(attempt_no, params.dpi, params.jpeg_quality);
        }
        let doc = engine.export(&ranges, params)?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_attempt_complete(attempt_no, doc.size_bytes());
        }
        Ok(doc)
    };

    let (outcome, target_mb) = if config.preset.is_size_constrained() {
        let search = BudgetSearch::from_config(config);
        let outcome = search.run(search.initial(setting), &mut run_attempt)?;
        (outcome, Some(config.target_mb))
    } else {
        let params = ExportParams {
            dpi: setting.dpi,
            jpeg_quality: setting.jpeg_quality,
            image_format: config.effective_image_format(),
        };
        let document = run_attempt(params)?;
        let attempts = vec![Attempt {
            params,
            size_bytes: document.size_bytes(),
        }];
        (
            BudgetOutcome {
                output: document,
                attempts,
                within_target: true,
            },
            None,
        )
    };

    let BudgetOutcome {
        output: document,
        attempts,
        within_target,
    } = outcome;

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(attempts.len(), document.size_bytes(), within_target);
    }

    let file_name = source.output_file_name();
    let report = ExportReport {
        file_name: file_name.clone(),
        preset: config.preset,
        size_bytes: document.size_bytes(),
        effective_dpi: document.effective_dpi,
        jpeg_quality: document.requested.jpeg_quality,
        image_format: document.requested.image_format,
        raster_width: document.raster_width,
        raster_height: document.raster_height,
        pages: document.pages,
        attempts,
        target_mb,
        within_target,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Split complete: {} page(s), {:.2} MB in {}ms",
        report.pages.len(),
        report.size_mb(),
        report.duration_ms
    );

    Ok(SplitOutput {
        file_name,
        bytes: document.bytes,
        report,
    })
}

/// Split and write the result to `output_path`.
///
/// The file is written to a temporary file in the same directory and then
/// renamed over the target, so an existing file is never left half-written.
pub fn split_to_file(
    source: &SourceDocument,
    cuts: &CutSet,
    rasterizer: &dyn Rasterizer,
    cache: &mut RasterCache,
    config: &SplitConfig,
    output_path: impl AsRef<Path>,
) -> Result<ExportReport, SplitError> {
    let output = split(source, cuts, rasterizer, cache, config)?;
    write_atomic(output_path.as_ref(), &output.bytes)?;
    Ok(output.report)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SplitError> {
    let write_err = |source: std::io::Error| SplitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Read page count and size of a PDF on disk using pdfium.
///
/// Unlike [`SourceDocument::open`] this accepts any page count, so it can
/// report why a document would be rejected.
pub fn inspect(path: impl AsRef<Path>) -> Result<PageInfo, SplitError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => SplitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SplitError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    let name = path.display().to_string();
    if !bytes.starts_with(b"%PDF") {
        return Err(SplitError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
            name,
        });
    }
    PdfiumRasterizer::bind()?.inspect(&name, &bytes)
}

/// Open `input` with pdfium, split it and write `<stem>_split.pdf` next to
/// it (or to `output_path` when given).
pub fn split_file(
    input: impl AsRef<Path>,
    cuts: &CutSet,
    config: &SplitConfig,
    output_path: Option<&Path>,
) -> Result<(std::path::PathBuf, ExportReport), SplitError> {
    let input = input.as_ref();
    let rasterizer = PdfiumRasterizer::bind()?;
    let source = SourceDocument::open(input, &rasterizer)?;
    let target = match output_path {
        Some(p) => p.to_path_buf(),
        None => input.with_file_name(source.output_file_name()),
    };
    let mut cache = RasterCache::default();
    let report = split_to_file(&source, cuts, &rasterizer, &mut cache, config, &target)?;
    Ok((target, report))
}
