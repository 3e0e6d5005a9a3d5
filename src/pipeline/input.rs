//! Input loading: read and validate the single-page source document.
//!
//! The PDF magic bytes (`%PDF`) are checked before the rasteriser sees the
//! data, so a stray PNG or HTML download fails with [`SplitError::NotAPdf`]
//! rather than an opaque pdfium code. Documents with any page count other
//! than one are rejected outright; nothing is rendered for them.

use crate::error::SplitError;
use crate::pipeline::render::Rasterizer;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the source stem for the output file name.
pub const OUTPUT_SUFFIX: &str = "_split";

/// Page count and size of a source document, in PDF points (1/72 in).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageInfo {
    pub page_count: usize,
    pub width_pt: f64,
    pub height_pt: f64,
}

/// A validated single-page PDF held in memory.
#[derive(Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Vec<u8>,
    digest: [u8; 32],
    page: PageInfo,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("page", &self.page)
            .finish()
    }
}

impl SourceDocument {
    /// Validate `bytes` and read the page geometry through `rasterizer`.
    ///
    /// `name` is the original file name; it only feeds error messages and
    /// [`SourceDocument::output_file_name`].
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        rasterizer: &dyn Rasterizer,
    ) -> Result<Self, SplitError> {
        let name = name.into();
        if !bytes.starts_with(b"%PDF") {
            return Err(SplitError::NotAPdf {
                magic: bytes.iter().take(4).copied().collect(),
                name,
            });
        }

        let page = rasterizer.inspect(&name, &bytes)?;
        if page.page_count != 1 {
            return Err(SplitError::UnsupportedPageCount {
                name,
                pages: page.page_count,
            });
        }

        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        info!(
            "Loaded '{}': {:.1}×{:.1} pt, {} bytes",
            name,
            page.width_pt,
            page.height_pt,
            bytes.len()
        );

        Ok(Self {
            name,
            bytes,
            digest,
            page,
        })
    }

    /// Read and validate a PDF from disk.
    pub fn open(path: impl AsRef<Path>, rasterizer: &dyn Rasterizer) -> Result<Self, SplitError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| map_read_error(path, e))?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes, rasterizer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 of the source bytes; the content part of render cache keys.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn page(&self) -> PageInfo {
        self.page
    }

    /// File name without its last extension (`report.v2.pdf` → `report.v2`).
    pub fn base_name(&self) -> &str {
        let file = self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name);
        match file.rfind('.') {
            Some(idx) => &file[..idx],
            None => file,
        }
    }

    /// `<base name>_split.pdf`.
    pub fn output_file_name(&self) -> String {
        format!("{}{}.pdf", self.base_name(), OUTPUT_SUFFIX)
    }
}

fn map_read_error(path: &Path, e: std::io::Error) -> SplitError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => SplitError::PermissionDenied { path },
        _ => SplitError::FileNotFound { path },
    }
}
