//! Progress-callback trait for export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to hear about each
//! export attempt as it happens. Size-constrained exports may run several
//! attempts; every other preset runs exactly one.
//!
//! # Example
//!
//! ```rust
//! use pagesplit::{ExportProgressCallback, SplitConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     attempts: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_attempt_complete(&self, attempt: usize, size_bytes: usize) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("attempt {attempt}: {size_bytes} bytes");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { attempts: AtomicUsize::new(0) });
//! let config = SplitConfig::builder()
//!     .progress_callback(cb as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the export pipeline around each attempt.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once before the first attempt.
    ///
    /// # Arguments
    /// * `slices` — number of slice ranges in the plan (before dropping tiny ones)
    fn on_export_start(&self, slices: usize) {
        let _ = slices;
    }

    /// Called before an attempt renders and encodes.
    ///
    /// # Arguments
    /// * `attempt`      — 1-indexed attempt number
    /// * `dpi`          — requested DPI for this attempt
    /// * `jpeg_quality` — JPEG quality for this attempt
    fn on_attempt_start(&self, attempt: usize, dpi: u32, jpeg_quality: u8) {
        let _ = (attempt, dpi, jpeg_quality);
    }

    /// Called after an attempt produced a document.
    fn on_attempt_complete(&self, attempt: usize, size_bytes: usize) {
        let _ = (attempt, size_bytes);
    }

    /// Called once with the accepted result.
    ///
    /// # Arguments
    /// * `attempts`   — total attempts run
    /// * `size_bytes` — size of the returned document
    /// * `within_target` — `false` when a size-constrained search stalled
    ///   above its target
    fn on_export_complete(&self, attempts: usize, size_bytes: usize, within_target: bool) {
        let _ = (attempts, size_bytes, within_target);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
