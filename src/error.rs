//! Error types for the pagesplit library.
//!
//! Every error here is **fatal** for the operation that raised it: an export
//! attempt either produces a complete document or returns `Err(SplitError)`.
//! There is no partial-output fallback.
//!
//! Some conditions are deliberately *not* errors:
//!
//! * A click outside the page is ignored (the cut set is returned unchanged).
//! * An export that would exceed the pixel ceiling silently runs at a lower DPI.
//! * A size-constrained export that cannot reach its target returns the
//!   best-effort document produced at the floor settings.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagesplit library.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes were read, but they are not a PDF.
    #[error("Input '{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// Only single-page documents can be split.
    #[error("This tool ONLY supports PDFs with exactly 1 page. '{name}' has {pages} pages.")]
    UnsupportedPageCount { name: String, pages: usize },

    /// The rasteriser failed to produce a bitmap.
    #[error("Rasterisation failed at {dpi} DPI: {detail}")]
    RasterisationFailed { dpi: u32, detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// A slice could not be encoded as PNG/JPEG.
    #[error("Encoding slice {slice} failed: {detail}")]
    EncodeFailed { slice: usize, detail: String },

    /// The output document could not be assembled or serialised.
    #[error("Composing output PDF failed: {0}")]
    ComposeFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium on the library search path, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_display_names_count() {
        let e = SplitError::UnsupportedPageCount {
            name: "poster.pdf".into(),
            pages: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("exactly 1 page"), "got: {msg}");
        assert!(msg.contains("3 pages"), "got: {msg}");
    }

    #[test]
    fn encode_failed_display() {
        let e = SplitError::EncodeFailed {
            slice: 4,
            detail: "zero height".into(),
        };
        assert!(e.to_string().contains("slice 4"));
        assert!(e.to_string().contains("zero height"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = SplitError::OutputWriteFailed {
            path: PathBuf::from("/nope/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/nope/out.pdf"));
    }

    #[test]
    fn binding_failure_mentions_env_override() {
        let e = SplitError::PdfiumBindingFailed("dlopen failed".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
