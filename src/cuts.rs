//! Cut positions: click mapping, debounced merging and the editing session.
//!
//! Three pixel spaces are in play while the user edits cuts:
//!
//! ```text
//! display px  ──÷ scale──▶  preview raster px  ──÷ H──▶  fraction (0..1)
//! (what was clicked)        (true page height H)         (resolution-free)
//! ```
//!
//! Cuts are stored as fractions of page height so they survive any later
//! change of export DPI. The export raster is the third space; see
//! [`crate::plan`] for the fraction → export-row conversion.
//!
//! Every edit returns a new value. Nothing here mutates a [`CutSet`] or an
//! [`EditSession`] in place, so a caller holding the previous value never
//! observes a half-applied edit.

use serde::{Deserialize, Serialize};

/// How the preview raster is scaled onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    /// Width of the rendered preview raster.
    pub raster_width: u32,
    /// Height of the rendered preview raster (the "true height" of clicks).
    pub raster_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// `display_width / raster_width`.
    pub scale: f64,
}

impl DisplayGeometry {
    /// Fit a raster into at most `max_width` display pixels, never upscaling.
    pub fn fit(raster_width: u32, raster_height: u32, max_width: u32) -> Self {
        let raster_width = raster_width.max(1);
        let display_width = max_width.min(raster_width).max(1);
        let scale = display_width as f64 / raster_width as f64;
        let display_height = (raster_height as f64 * scale) as u32;
        Self {
            raster_width,
            raster_height,
            display_width,
            display_height,
            scale,
        }
    }

    /// Map a click on the scaled preview to a cut fraction.
    pub fn map_click(&self, click_y_display: i64) -> Option<f64> {
        map_click(click_y_display, self.scale, self.raster_height)
    }

    /// Display row of a cut, as drawn on the overlay.
    pub fn display_row(&self, fraction: f64) -> u32 {
        (fraction * self.display_height as f64) as u32
    }
}

/// Convert a click row in display space into a fraction of true page height.
///
/// `y_true = round(click_y_display / display_scale)`, halves to even.
/// Returns `None` unless `0 < y_true < true_height`; such clicks are
/// ignored, not reported.
pub fn map_click(click_y_display: i64, display_scale: f64, true_height: u32) -> Option<f64> {
    if !(display_scale.is_finite() && display_scale > 0.0) || true_height == 0 {
        return None;
    }
    let y_true = (click_y_display as f64 / display_scale).round_ties_even();
    if y_true > 0.0 && y_true < true_height as f64 {
        Some(y_true / true_height as f64)
    } else {
        None
    }
}

/// Ordered, debounced cut fractions in the open interval (0, 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CutSet(Vec<f64>);

impl CutSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary fractions.
    ///
    /// Values outside (0, 1) and non-finite values are discarded, the rest
    /// sorted and exact duplicates removed. No debounce is applied: the
    /// display gap is unknown here.
    pub fn from_fractions(fractions: impl IntoIterator<Item = f64>) -> Self {
        let mut cuts: Vec<f64> = fractions
            .into_iter()
            .filter(|c| c.is_finite() && *c > 0.0 && *c < 1.0)
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();
        Self(cuts)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply the [`merge_cut`] gap rule to the whole set, for cuts that did
    /// not arrive through clicks.
    pub fn debounce(&self, display_height: u32, min_pixel_gap: u32) -> CutSet {
        greedy_merge(self.0.clone(), display_height, min_pixel_gap)
    }

    /// See [`merge_cut`].
    pub fn merge(&self, new_fraction: f64, display_height: u32, min_pixel_gap: u32) -> CutSet {
        merge_cut(self, new_fraction, display_height, min_pixel_gap)
    }

    /// Remove the highest cut.
    ///
    /// Merging forgets which click produced which cut, so "undo" means the
    /// last cut by position, not the most recent click.
    pub fn undo(&self) -> CutSet {
        let mut cuts = self.0.clone();
        cuts.pop();
        CutSet(cuts)
    }

    pub fn clear(&self) -> CutSet {
        CutSet::new()
    }

    /// Convert a set saved as preview pixel rows back into fractions.
    ///
    /// Older sessions stored raw rows; any value above 1 marks the whole set
    /// as rows and every entry is divided by `raster_height`.
    pub fn normalize_legacy(values: &[f64], raster_height: u32) -> CutSet {
        let is_rows = values.iter().any(|v| *v > 1.0);
        if is_rows && raster_height > 0 {
            let h = raster_height as f64;
            CutSet::from_fractions(values.iter().map(|v| v / h))
        } else {
            CutSet::from_fractions(values.iter().copied())
        }
    }
}

/// Insert `new_fraction` and debounce the result.
///
/// After a sorted insert, a single left-to-right pass keeps a cut only when
/// its distance from the last *kept* cut, in display pixels
/// (`fraction * display_height`), exceeds `min_pixel_gap`. This is greedy,
/// not nearest-neighbour: an earlier cut always wins over a later one.
///
/// Re-merging the same fraction into the output changes nothing.
pub fn merge_cut(
    existing: &CutSet,
    new_fraction: f64,
    display_height: u32,
    min_pixel_gap: u32,
) -> CutSet {
    let mut cuts: Vec<f64> = existing.0.clone();
    if new_fraction.is_finite() && new_fraction > 0.0 && new_fraction < 1.0 {
        cuts.push(new_fraction);
    }
    greedy_merge(cuts, display_height, min_pixel_gap)
}

fn greedy_merge(mut cuts: Vec<f64>, display_height: u32, min_pixel_gap: u32) -> CutSet {
    cuts.sort_by(f64::total_cmp);

    let h = display_height as f64;
    let gap = min_pixel_gap as f64;
    let mut kept: Vec<f64> = Vec::with_capacity(cuts.len());
    for c in cuts {
        match kept.last() {
            Some(&last) if (c * h - last * h).abs() <= gap => {}
            _ => kept.push(c),
        }
    }
    CutSet(kept)
}

/// Cut-editing state carried between interactions.
///
/// Owned by the caller; each operation returns the next session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    cuts: CutSet,
    last_click: Option<(i64, i64)>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cuts(cuts: CutSet) -> Self {
        Self {
            cuts,
            last_click: None,
        }
    }

    pub fn cuts(&self) -> &CutSet {
        &self.cuts
    }

    pub fn last_click(&self) -> Option<(i64, i64)> {
        self.last_click
    }

    /// Apply a click at display coordinates `(x, y)`.
    ///
    /// The preview widget keeps reporting its most recent click on every
    /// pass, so a click identical to the previous one is a no-op. Clicks
    /// that map outside the page only update the remembered position.
    pub fn click(&self, x: i64, y: i64, geometry: &DisplayGeometry, min_pixel_gap: u32) -> Self {
        if self.last_click == Some((x, y)) {
            return self.clone();
        }
        let cuts = match geometry.map_click(y) {
            Some(fraction) => self
                .cuts
                .merge(fraction, geometry.display_height, min_pixel_gap),
            None => self.cuts.clone(),
        };
        Self {
            cuts,
            last_click: Some((x, y)),
        }
    }

    pub fn undo(&self) -> Self {
        Self {
            cuts: self.cuts.undo(),
            last_click: self.last_click,
        }
    }

    pub fn clear(&self) -> Self {
        Self {
            cuts: self.cuts.clear(),
            last_click: self.last_click,
        }
    }
}
