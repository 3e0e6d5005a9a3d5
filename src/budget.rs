//! Size-constrained export: degrade DPI and JPEG quality until the output fits.
//!
//! The search is a fixed-point loop over `(dpi, jpeg_quality)`:
//!
//! ```text
//! params₀ = (base dpi, min(base quality, ceiling))
//! loop:
//!     out = export(params)
//!     if size(out) ≤ target           → done, within target
//!     next = (max(dpi_floor, ⌊dpi · 0.8⌋), max(q_floor, q − 10))
//!     if next == params               → done, best effort (both at floors)
//!     params = next
//! ```
//!
//! DPI and quality reach their floors at different rates; comparing the whole
//! tuple means the loop only stops once neither can move. It never raises
//! quality again after an overshoot, so it is deterministic and bounded by
//! the number of 0.8 steps from base DPI to the floor.

use crate::config::{ImageFormat, QualitySetting, SplitConfig};
use crate::error::SplitError;
use crate::export::{ExportParams, ExportedDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Anything whose encoded size the search can measure.
pub trait SizedOutput {
    fn size_bytes(&self) -> usize;
}

impl SizedOutput for ExportedDocument {
    fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl SizedOutput for Vec<u8> {
    fn size_bytes(&self) -> usize {
        self.len()
    }
}

/// One export attempt as seen by the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub params: ExportParams,
    pub size_bytes: usize,
}

impl Attempt {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1_000_000.0
    }
}

/// Final result of a search.
#[derive(Debug, Clone)]
pub struct BudgetOutcome<T> {
    pub output: T,
    /// Every attempt, in order; the last one produced `output`.
    pub attempts: Vec<Attempt>,
    /// `false` when the floors were reached above target.
    pub within_target: bool,
}

/// Floors, ceiling and step sizes of the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetSearch {
    pub target_mb: f64,
    pub dpi_floor: u32,
    pub quality_floor: u8,
    pub quality_ceiling: u8,
    pub dpi_step_factor: f64,
    pub quality_step: u8,
}

impl BudgetSearch {
    pub fn from_config(config: &SplitConfig) -> Self {
        Self {
            target_mb: config.target_mb,
            dpi_floor: config.dpi_floor,
            quality_floor: config.quality_floor,
            quality_ceiling: config.quality_ceiling,
            dpi_step_factor: config.dpi_step_factor,
            quality_step: config.quality_step,
        }
    }

    /// Starting point: the preset's DPI, its quality capped at the ceiling,
    /// always JPEG.
    pub fn initial(&self, setting: QualitySetting) -> ExportParams {
        ExportParams {
            dpi: setting.dpi,
            jpeg_quality: setting.jpeg_quality.min(self.quality_ceiling),
            image_format: ImageFormat::Jpeg,
        }
    }

    /// One degrade step. Never increases either parameter.
    pub fn step(&self, params: ExportParams) -> ExportParams {
        let dpi = ((params.dpi as f64 * self.dpi_step_factor) as u32)
            .max(self.dpi_floor)
            .min(params.dpi);
        let jpeg_quality = params
            .jpeg_quality
            .saturating_sub(self.quality_step)
            .max(self.quality_floor)
            .min(params.jpeg_quality);
        ExportParams {
            dpi,
            jpeg_quality,
            image_format: params.image_format,
        }
    }

    fn fits(&self, size_bytes: usize) -> bool {
        size_bytes as f64 / 1_000_000.0 <= self.target_mb
    }

    /// Run the search from `start`, calling `export` once per attempt.
    ///
    /// Errors from `export` end the search immediately.
    pub fn run<T, F>(&self, start: ExportParams, mut export: F) -> Result<BudgetOutcome<T>, SplitError>
    where
        T: SizedOutput,
        F: FnMut(ExportParams) -> Result<T, SplitError>,
    {
        let mut params = start;
        let mut attempts = Vec::new();

        loop {
            let output = export(params)?;
            let size_bytes = output.size_bytes();
            attempts.push(Attempt { params, size_bytes });
            debug!(
                "Budget attempt {}: {} DPI q{} → {:.2} MB (target {:.2} MB)",
                attempts.len(),
                params.dpi,
                params.jpeg_quality,
                size_bytes as f64 / 1_000_000.0,
                self.target_mb
            );

            if self.fits(size_bytes) {
                info!(
                    "Size target met after {} attempt(s): {} DPI q{}",
                    attempts.len(),
                    params.dpi,
                    params.jpeg_quality
                );
                return Ok(BudgetOutcome {
                    output,
                    attempts,
                    within_target: true,
                });
            }

            let next = self.step(params);
            if next == params {
                warn!(
                    "Size target {:.2} MB not reachable; floors {} DPI q{} give {:.2} MB",
                    self.target_mb,
                    params.dpi,
                    params.jpeg_quality,
                    size_bytes as f64 / 1_000_000.0
                );
                return Ok(BudgetOutcome {
                    output,
                    attempts,
                    within_target: false,
                });
            }
            params = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityPreset;
    use pretty_assertions::assert_eq;

    fn search(target_mb: f64) -> BudgetSearch {
        BudgetSearch::from_config(&SplitConfig::builder().target_mb(target_mb).build().unwrap())
    }

    /// Output size grows with DPI²: 3 000 bytes per DPI².
    fn fake_export(p: ExportParams) -> Result<Vec<u8>, SplitError> {
        Ok(vec![0u8; p.dpi as usize * p.dpi as usize * 3_000])
    }

    #[test]
    fn initial_caps_quality_and_forces_jpeg() {
        let s = search(100.0);
        let p = s.initial(QualityPreset::Native.settings());
        assert_eq!(p.dpi, 300);
        assert_eq!(p.jpeg_quality, 85);
        assert_eq!(p.image_format, ImageFormat::Jpeg);

        let p = s.initial(QualityPreset::SizeConstrained.settings());
        assert_eq!((p.dpi, p.jpeg_quality), (220, 80));
    }

    #[test]
    fn three_downgrades_mean_four_exports() {
        let s = search(50.0);
        let start = s.initial(QualityPreset::SizeConstrained.settings());

        let mut calls = Vec::new();
        let outcome = s
            .run(start, |p| {
                calls.push(p);
                fake_export(p)
            })
            .unwrap();

        assert!(outcome.within_target);
        assert_eq!(calls.len(), 4);
        let trail: Vec<(u32, u8)> = calls.iter().map(|p| (p.dpi, p.jpeg_quality)).collect();
        assert_eq!(trail, vec![(220, 80), (176, 70), (140, 60), (112, 50)]);
        for w in calls.windows(2) {
            assert!(w[1].dpi <= w[0].dpi);
            assert!(w[1].jpeg_quality <= w[0].jpeg_quality);
        }
        assert_eq!(outcome.attempts.len(), 4);
        assert!(outcome.attempts[3].size_mb() <= 50.0);
    }

    #[test]
    fn first_attempt_that_fits_is_returned() {
        let s = search(1_000.0);
        let start = s.initial(QualityPreset::SizeConstrained.settings());
        let mut calls = 0;
        let outcome = s
            .run(start, |p| {
                calls += 1;
                fake_export(p)
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert!(outcome.within_target);
    }

    #[test]
    fn unreachable_target_stalls_at_floors() {
        let s = search(0.000_001);
        let start = s.initial(QualityPreset::SizeConstrained.settings());
        let outcome = s.run(start, fake_export).unwrap();

        assert!(!outcome.within_target);
        let last = outcome.attempts.last().unwrap().params;
        assert_eq!((last.dpi, last.jpeg_quality), (10, 30));
        // 220 → 176 → 140 → 112 → 89 → 71 → 56 → 44 → 35 → 28 → 22 → 17 → 13 → 10
        assert_eq!(outcome.attempts.len(), 14);
        // The floor pair is exported exactly once.
        let at_floor = outcome
            .attempts
            .iter()
            .filter(|a| a.params.dpi == 10 && a.params.jpeg_quality == 30)
            .count();
        assert_eq!(at_floor, 1);
    }

    #[test]
    fn step_never_raises_parameters_below_floor() {
        let s = search(1.0);
        let p = ExportParams {
            dpi: 5,
            jpeg_quality: 20,
            image_format: ImageFormat::Jpeg,
        };
        assert_eq!(s.step(p), p);
    }

    #[test]
    fn export_errors_abort_search() {
        let s = search(1.0);
        let start = s.initial(QualityPreset::SizeConstrained.settings());
        let err = s
            .run::<Vec<u8>, _>(start, |_| Err(SplitError::ComposeFailed("boom".into())))
            .unwrap_err();
        assert!(matches!(err, SplitError::ComposeFailed(_)));
    }
}
