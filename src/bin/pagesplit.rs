//! CLI binary for pagesplit.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SplitConfig` and a cut set, then prints the export report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagesplit::{
    inspect, render_preview, split_to_file, CutSet, EditSession, ExportProgressCallback,
    ImageFormat, PdfiumRasterizer, ProgressCallback, QualityPreset, RasterCache, SourceDocument,
    SplitConfig,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn mb(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / 1_000_000.0)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per export attempt.
struct CliProgressCallback {
    bar: ProgressBar,
    target_bytes: Option<u64>,
}

impl CliProgressCallback {
    fn new(target_mb: Option<f64>) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering page…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            target_bytes: target_mb.map(|t| (t * 1_000_000.0) as u64),
        })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, slices: usize) {
        self.bar.set_prefix("Exporting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Splitting into {slices} slice(s)…"))
        ));
    }

    fn on_attempt_start(&self, attempt: usize, dpi: u32, jpeg_quality: u8) {
        self.bar
            .set_message(format!("attempt {attempt}: {dpi} DPI, quality {jpeg_quality}"));
    }

    fn on_attempt_complete(&self, attempt: usize, size_bytes: usize) {
        let fits = self.target_bytes.map(|t| size_bytes as u64 <= t);
        let mark = match fits {
            Some(false) => yellow("↓"),
            _ => green("✓"),
        };
        self.bar.println(format!(
            "  {} Attempt {:>2}  {}",
            mark,
            attempt,
            dim(&mb(size_bytes))
        ));
    }

    fn on_export_complete(&self, attempts: usize, size_bytes: usize, within_target: bool) {
        self.bar.finish_and_clear();
        if within_target {
            eprintln!(
                "{} Exported {} after {} attempt(s)",
                green("✔"),
                bold(&mb(size_bytes)),
                attempts
            );
        } else {
            eprintln!(
                "{} Size target not reached; best effort is {} after {} attempt(s)",
                yellow("⚠"),
                bold(&mb(size_bytes)),
                attempts
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cut at a quarter, half and three quarters of the page height
  pagesplit transcript.pdf --cut 0.25,0.5,0.75

  # Cuts as rows clicked on the preview image (see --preview)
  pagesplit transcript.pdf --click 410,1220,2035

  # Write the preview with cut lines drawn in, without exporting
  pagesplit transcript.pdf --cut 0.5 --preview preview.png --preview-only

  # Fit the result under 25 MB
  pagesplit scan.pdf --cut 0.5 --preset size-constrained --target-mb 25

  # Lossless slices, explicit output path
  pagesplit scan.pdf --cut 0.3,0.6 --format png -o pages.pdf

  # Page count and size only
  pagesplit --inspect-only transcript.pdf

  # JSON export report
  pagesplit --json transcript.pdf --cut 0.5 > report.json

PRESETS:
  Preset             DPI   JPEG quality  Est. compression
  ────────────────   ───   ────────────  ────────────────
  low                120   70            0.20
  normal             170   80            0.28
  high (default)     220   88            0.38
  native             300   95            0.55
  size-constrained   220   80 (dynamic)  0.38

  size-constrained always writes JPEG and lowers DPI (×0.8) and quality (−10)
  per attempt until the file fits --target-mb, stopping at 10 DPI / q30.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Override the log filter (e.g. pagesplit=debug)
"#;

/// Split a single tall PDF page into a multi-page PDF at horizontal cuts.
#[derive(Parser, Debug)]
#[command(
    name = "pagesplit",
    version,
    about = "Split a single tall PDF page into a multi-page PDF at horizontal cuts",
    long_about = "Split a single-page PDF into several pages at horizontal cut lines. \
The page is rasterised, sliced at the cuts and every slice becomes its own page with its \
physical size preserved. Only PDFs with exactly one page are accepted.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Single-page PDF to split.
    input: PathBuf,

    /// Write the split PDF here instead of `<stem>_split.pdf` next to the input.
    #[arg(short, long, env = "PAGESPLIT_OUTPUT")]
    output: Option<PathBuf>,

    /// Cut positions as fractions of page height (0–1), comma separated.
    /// Values above 1 are read as preview pixel rows. Cuts closer than the
    /// preview's minimum gap are merged, earliest first.
    #[arg(long, value_delimiter = ',', env = "PAGESPLIT_CUTS")]
    cut: Vec<f64>,

    /// Cut positions as rows clicked on the preview image, comma separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    click: Vec<i64>,

    /// Export quality preset.
    #[arg(long, env = "PAGESPLIT_PRESET", value_enum, default_value = "high")]
    preset: PresetArg,

    /// Slice encoding (ignored by size-constrained).
    #[arg(long, env = "PAGESPLIT_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// Size target in MB for the size-constrained preset.
    #[arg(long, env = "PAGESPLIT_TARGET_MB", default_value_t = 100.0)]
    target_mb: f64,

    /// Write the preview with cut lines to this PNG.
    #[arg(long, env = "PAGESPLIT_PREVIEW")]
    preview: Option<PathBuf>,

    /// Stop after writing the preview.
    #[arg(long, requires = "preview")]
    preview_only: bool,

    /// Print page count and size only, no export.
    #[arg(long)]
    inspect_only: bool,

    /// Print the export report as JSON on stdout.
    #[arg(long, env = "PAGESPLIT_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAGESPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGESPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESPLIT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PresetArg {
    Low,
    Normal,
    High,
    Native,
    SizeConstrained,
}

impl From<PresetArg> for QualityPreset {
    fn from(v: PresetArg) -> Self {
        match v {
            PresetArg::Low => QualityPreset::Low,
            PresetArg::Normal => QualityPreset::Normal,
            PresetArg::High => QualityPreset::High,
            PresetArg::Native => QualityPreset::Native,
            PresetArg::SizeConstrained => QualityPreset::SizeConstrained,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Png => ImageFormat::Png,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports each attempt; keep library INFO logs out
    // of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input).context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise page info")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            println!("Pages:        {}", info.page_count);
            println!("Width:        {:.1} pt ({:.1} in)", info.width_pt, info.width_pt / 72.0);
            println!("Height:       {:.1} pt ({:.1} in)", info.height_pt, info.height_pt / 72.0);
            if info.page_count != 1 {
                println!("Splittable:   no (exactly 1 page required)");
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let preset: QualityPreset = cli.preset.into();
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let target = preset.is_size_constrained().then_some(cli.target_mb);
        Some(CliProgressCallback::new(target) as Arc<dyn ExportProgressCallback>)
    } else {
        None
    };

    let mut builder = SplitConfig::builder()
        .preset(preset)
        .image_format(cli.format.into())
        .target_mb(cli.target_mb);
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Load source ──────────────────────────────────────────────────────
    let rasterizer = PdfiumRasterizer::bind().context("PDF engine unavailable")?;
    let source = SourceDocument::open(&cli.input, &rasterizer)
        .with_context(|| format!("Cannot split '{}'", cli.input.display()))?;
    let mut cache = RasterCache::default();

    // ── Resolve cuts ─────────────────────────────────────────────────────
    // Typed cuts get the same display-gap debounce as clicks, which needs
    // the preview geometry.
    let needs_preview = cli.preview.is_some()
        || !cli.click.is_empty()
        || cli.cut.len() > 1
        || cli.cut.iter().any(|c| *c > 1.0);
    let mut session = EditSession::with_cuts(CutSet::from_fractions(cli.cut.iter().copied()));

    if needs_preview {
        let preview = render_preview(&rasterizer, &source, &mut cache, &config)
            .context("Failed to render preview")?;

        let typed = CutSet::normalize_legacy(&cli.cut, preview.geometry.raster_height);
        session = EditSession::with_cuts(
            typed.debounce(preview.geometry.display_height, config.display.min_cut_gap_px),
        );
        for &y in &cli.click {
            session = session.click(0, y, &preview.geometry, config.display.min_cut_gap_px);
        }

        if let Some(ref path) = cli.preview {
            preview
                .overlay(session.cuts())
                .save(path)
                .with_context(|| format!("Failed to write preview to {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} Preview {}  {}",
                    cyan("◆"),
                    bold(&path.display().to_string()),
                    dim(&preview.caption(&source, session.cuts(), &config))
                );
            }
        }
        if cli.preview_only {
            return Ok(());
        }
    }

    // ── Export ───────────────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_file_name(source.output_file_name()));
    let report = split_to_file(
        &source,
        session.cuts(),
        &rasterizer,
        &mut cache,
        &config,
        &output_path,
    )
    .context("Split failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} page(s)  {}  {} DPI  {} q{}  →  {}",
            if report.within_target { green("✔") } else { yellow("⚠") },
            report.pages.len(),
            mb(report.size_bytes),
            report.effective_dpi,
            report.image_format,
            report.jpeg_quality,
            bold(&output_path.display().to_string()),
        );
        if let Some(target) = report.target_mb {
            eprintln!(
                "   target {:.2} MB, {} attempt(s){}",
                target,
                report.attempts.len(),
                if report.within_target { "" } else { ", not reached" }
            );
        }
    }

    Ok(())
}
