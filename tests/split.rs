//! Integration tests for the export path, driven by a synthetic rasteriser.
//!
//! No pdfium is needed: [`GradientPage`] renders a page of fixed point size
//! as a vertical gradient, and the resulting PDFs are parsed back with lopdf.
//!
//! Run with:
//!   cargo test --test split

use image::{Rgb, RgbImage};
use lopdf::Document;
use pagesplit::{
    export_dimensions, plan_slices, split, BudgetSearch, CutSet, ExportEngine, ExportParams,
    ExportProgressCallback, ImageFormat, PageInfo, QualityPreset, RasterCache, Rasterizer,
    SourceDocument, SplitConfig, SplitError,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A single page of `width_pt × height_pt`, rendered as a grey ramp.
struct GradientPage {
    width_pt: f64,
    height_pt: f64,
    renders: RefCell<Vec<u32>>,
}

impl GradientPage {
    fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
            renders: RefCell::new(Vec::new()),
        }
    }
}

impl Rasterizer for GradientPage {
    fn inspect(&self, _name: &str, _pdf_bytes: &[u8]) -> Result<PageInfo, SplitError> {
        Ok(PageInfo {
            page_count: 1,
            width_pt: self.width_pt,
            height_pt: self.height_pt,
        })
    }

    fn render(&self, _pdf_bytes: &[u8], dpi: u32) -> Result<RgbImage, SplitError> {
        self.renders.borrow_mut().push(dpi);
        let w = ((self.width_pt * dpi as f64 / 72.0) as u32).max(1);
        let h = ((self.height_pt * dpi as f64 / 72.0) as u32).max(1);
        Ok(RgbImage::from_fn(w, h, |_, y| {
            let v = (y * 255 / h.max(1)) as u8;
            Rgb([v, v, v])
        }))
    }
}

fn load(r: &GradientPage) -> SourceDocument {
    SourceDocument::from_bytes("long-page.pdf", b"%PDF-1.7\n% synthetic\n".to_vec(), r)
        .expect("synthetic source loads")
}

/// `[width, height]` of every page's MediaBox, in page order.
fn media_boxes(bytes: &[u8]) -> Vec<[f32; 2]> {
    let doc = Document::load_mem(bytes).expect("output parses");
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_object(*id).unwrap().as_dict().unwrap();
            let mb: Vec<f32> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o.as_float().unwrap())
                .collect();
            [mb[2] - mb[0], mb[3] - mb[1]]
        })
        .collect()
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExportProgressCallback for Recorder {
    fn on_export_start(&self, slices: usize) {
        self.events.lock().unwrap().push(format!("start {slices}"));
    }
    fn on_attempt_start(&self, attempt: usize, dpi: u32, jpeg_quality: u8) {
        self.events
            .lock()
            .unwrap()
            .push(format!("attempt {attempt} {dpi} {jpeg_quality}"));
    }
    fn on_export_complete(&self, attempts: usize, _size_bytes: usize, within_target: bool) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {attempts} {within_target}"));
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

#[test]
fn three_cuts_make_four_pages_with_physical_size_kept() {
    let r = GradientPage::new(612.0, 1_500.0);
    let source = load(&r);
    let config = SplitConfig::builder()
        .preset(QualityPreset::Normal)
        .build()
        .unwrap();

    let out = split(
        &source,
        &CutSet::from_fractions([0.25, 0.5, 0.75]),
        &r,
        &mut RasterCache::default(),
        &config,
    )
    .unwrap();

    let boxes = media_boxes(&out.bytes);
    assert_eq!(boxes.len(), 4);
    for b in &boxes {
        assert!((b[0] - 612.0).abs() < 1.0, "width {} pt", b[0]);
    }
    let total_height: f32 = boxes.iter().map(|b| b[1]).sum();
    assert!((total_height - 1_500.0).abs() < 1.0, "height sum {total_height} pt");

    let px_total: u32 = out.report.pages.iter().map(|p| p.height_px).sum();
    assert_eq!(px_total, out.report.raster_height);
}

#[test]
fn sliver_slice_is_dropped() {
    // 72 pt at 72 DPI → 72 rows; a cut at 0.0001 rounds to row 0.
    let r = GradientPage::new(72.0, 72.0);
    let source = load(&r);
    let config = SplitConfig::default();
    let mut cache = RasterCache::default();
    let mut engine = ExportEngine::new(&r, &source, &mut cache, 72, &config);

    let ranges = plan_slices(&CutSet::from_fractions([0.0001]));
    assert_eq!(ranges.len(), 2);
    let doc = engine
        .export(
            &ranges,
            ExportParams {
                dpi: 72,
                jpeg_quality: 80,
                image_format: ImageFormat::Jpeg,
            },
        )
        .unwrap();

    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].slice_index, 1);
    assert_eq!(media_boxes(&doc.bytes).len(), 1);
}

#[test]
fn export_with_every_slice_dropped_fails() {
    // 72 × 1 pt at 72 DPI → a single 1-row slice, under the 2 px minimum.
    let r = GradientPage::new(72.0, 1.0);
    let source = load(&r);
    let config = SplitConfig::default();
    let mut cache = RasterCache::default();
    let mut engine = ExportEngine::new(&r, &source, &mut cache, 72, &config);

    let err = engine
        .export(
            &plan_slices(&CutSet::new()),
            ExportParams {
                dpi: 72,
                jpeg_quality: 80,
                image_format: ImageFormat::Jpeg,
            },
        )
        .unwrap_err();

    assert!(matches!(err, SplitError::ComposeFailed(_)), "got: {err}");
    assert!(err.to_string().contains("at least 2 px"), "got: {err}");
}

#[test]
fn pixel_ceiling_caps_raster_and_keeps_page_size() {
    // 612 × 30 000 pt at 300 DPI would be ~ 478 M px; cap at 4 M for speed.
    let r = GradientPage::new(612.0, 30_000.0);
    let source = load(&r);
    let config = SplitConfig::builder()
        .preset(QualityPreset::Native)
        .max_export_pixels(4_000_000)
        .build()
        .unwrap();

    let out = split(
        &source,
        &CutSet::from_fractions([0.5]),
        &r,
        &mut RasterCache::default(),
        &config,
    )
    .unwrap();

    let report = &out.report;
    assert!(report.effective_dpi < 300);
    assert!(report.raster_width as u64 * report.raster_height as u64 <= 4_000_000);
    assert_eq!(
        export_dimensions(612.0, 30_000.0, 300, 4_000_000).effective_dpi,
        report.effective_dpi
    );

    // Page points recomputed from pixels and effective DPI stay within a
    // DPI-sized rounding of the physical page.
    let tolerance = 72.0 / report.effective_dpi as f64 + 1e-6;
    let height_pt: f64 = report.pages.iter().map(|p| p.height_pt).sum();
    assert!((height_pt - 30_000.0).abs() <= tolerance * 2.0, "{height_pt}");
    for page in &report.pages {
        assert!((page.width_pt - 612.0).abs() <= tolerance, "{}", page.width_pt);
    }
}

#[test]
fn lower_dpi_reuses_base_render() {
    let r = GradientPage::new(100.0, 400.0);
    let source = load(&r);
    let config = SplitConfig::default();
    let mut cache = RasterCache::default();
    let ranges = plan_slices(&CutSet::new());

    let mut engine = ExportEngine::new(&r, &source, &mut cache, 220, &config);
    for dpi in [220, 176, 140] {
        engine
            .export(
                &ranges,
                ExportParams {
                    dpi,
                    jpeg_quality: 70,
                    image_format: ImageFormat::Jpeg,
                },
            )
            .unwrap();
    }
    assert_eq!(*r.renders.borrow(), vec![220]);

    engine
        .export(
            &ranges,
            ExportParams {
                dpi: 300,
                jpeg_quality: 70,
                image_format: ImageFormat::Jpeg,
            },
        )
        .unwrap();
    assert_eq!(*r.renders.borrow(), vec![220, 300]);
}

#[test]
fn png_format_embeds_flate_images() {
    let r = GradientPage::new(50.0, 100.0);
    let source = load(&r);
    let config = SplitConfig::builder()
        .preset(QualityPreset::Low)
        .image_format(ImageFormat::Png)
        .build()
        .unwrap();
    let out = split(&source, &CutSet::new(), &r, &mut RasterCache::default(), &config).unwrap();

    assert_eq!(out.report.image_format, ImageFormat::Png);
    let doc = Document::load_mem(&out.bytes).unwrap();
    let filters: Vec<Vec<u8>> = doc
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter_map(|s| s.dict.get(b"Filter").ok())
        .filter_map(|f| f.as_name().ok().map(|n| n.to_vec()))
        .collect();
    assert!(filters.iter().any(|f| f == b"FlateDecode"));
    assert!(!filters.iter().any(|f| f == b"DCTDecode"));
}

// ── Budget search ────────────────────────────────────────────────────────────

#[test]
fn unreachable_target_returns_floor_attempt() {
    let r = GradientPage::new(200.0, 800.0);
    let source = load(&r);
    let recorder = Arc::new(Recorder::default());
    let config = SplitConfig::builder()
        .preset(QualityPreset::SizeConstrained)
        .target_mb(0.000_01)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let out = split(
        &source,
        &CutSet::from_fractions([0.5]),
        &r,
        &mut RasterCache::default(),
        &config,
    )
    .unwrap();

    let report = &out.report;
    assert!(!report.within_target);
    let last = report.attempts.last().unwrap().params;
    assert_eq!((last.dpi, last.jpeg_quality), (10, 30));
    assert_eq!(report.effective_dpi, 10);
    for w in report.attempts.windows(2) {
        assert!(w[1].params.dpi <= w[0].params.dpi);
        assert!(w[1].params.jpeg_quality <= w[0].params.jpeg_quality);
    }

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("start 2"));
    assert_eq!(events.get(1).map(String::as_str), Some("attempt 1 220 80"));
    assert_eq!(
        events.last().cloned(),
        Some(format!("done {} false", report.attempts.len()))
    );
}

#[test]
fn budget_search_with_real_exports_stops_when_it_fits() {
    let r = GradientPage::new(612.0, 1_200.0);
    let source = load(&r);
    let config = SplitConfig::default();
    let mut cache = RasterCache::default();
    let ranges = plan_slices(&CutSet::from_fractions([0.5]));
    let mut engine = ExportEngine::new(&r, &source, &mut cache, 220, &config);

    // Size of the first attempt, then aim just under it.
    let search = BudgetSearch::from_config(&config);
    let start = search.initial(QualityPreset::SizeConstrained.settings());
    let first = engine.export(&ranges, start).unwrap();
    let search = BudgetSearch {
        target_mb: first.size_mb() * 0.9,
        ..search
    };

    let outcome = search.run(start, |p| engine.export(&ranges, p)).unwrap();
    assert!(outcome.within_target);
    assert!(outcome.attempts.len() >= 2);
    assert!(outcome.output.size_mb() <= first.size_mb() * 0.9);
}
