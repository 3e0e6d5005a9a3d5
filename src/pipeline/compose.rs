//! Output assembly: one image-only page per encoded slice.
//!
//! Each page's MediaBox is computed from the slice's pixel size and the DPI
//! the slice was rendered at (`pt = px * 72 / dpi`), so the physical page
//! always matches the pixels it carries, whatever resizing happened before.

use crate::error::SplitError;
use crate::pipeline::encode::EncodedSlice;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Convert a pixel length at `dpi` to PDF points.
pub fn px_to_pt(px: u32, dpi: u32) -> f64 {
    px as f64 * 72.0 / dpi.max(1) as f64
}

/// Incrementally built multi-page output document.
pub struct PdfComposer {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PdfComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfComposer {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a page of `width_pt × height_pt` filled by `image`.
    pub fn add_page(&mut self, width_pt: f64, height_pt: f64, image: &EncodedSlice) -> Result<(), SplitError> {
        let (w, h) = (width_pt as f32, height_pt as f32);

        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
            "Filter" => image.pdf_filter(),
        };
        let mut image_stream = Stream::new(image_dict, image.data.clone());
        image_stream.allows_compression = false;
        let image_id = self.doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(w),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(h),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| SplitError::ComposeFailed(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let resources = dictionary! {
            "XObject" => dictionary! {
                "Im0" => Object::Reference(image_id),
            },
        };

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Real(w), Object::Real(h)],
            "Resources" => resources,
            "Contents" => Object::Reference(content_id),
        };
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);

        debug!(
            "Page {}: {:.2}×{:.2} pt, {} image bytes",
            self.page_ids.len(),
            width_pt,
            height_pt,
            image.data.len()
        );
        Ok(())
    }

    /// Write the page tree and catalog, then serialise.
    pub fn finish(mut self) -> Result<Vec<u8>, SplitError> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.page_ids.len() as i64,
            "Kids" => self
                .page_ids
                .iter()
                .map(|id| Object::Reference(*id))
                .collect::<Vec<_>>(),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| SplitError::ComposeFailed(format!("save failed: {e}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFormat;
    use crate::pipeline::encode::encode_slice;
    use image::{Rgb, RgbImage};

    fn media_box(doc: &Document, page_id: ObjectId) -> Vec<f32> {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect()
    }

    #[test]
    fn px_to_pt_inverts_render_scale() {
        assert_eq!(px_to_pt(150, 150), 72.0);
        assert_eq!(px_to_pt(220, 110), 144.0);
    }

    #[test]
    fn pages_carry_their_own_size() {
        let img = RgbImage::from_pixel(200, 100, Rgb([0, 128, 255]));
        let enc = encode_slice(&img, ImageFormat::Jpeg, 80).unwrap();

        let mut composer = PdfComposer::new();
        composer.add_page(144.0, 72.0, &enc).unwrap();
        composer.add_page(144.0, 36.0, &enc).unwrap();
        assert_eq!(composer.page_count(), 2);
        let bytes = composer.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[&1]), vec![0.0, 0.0, 144.0, 72.0]);
        assert_eq!(media_box(&doc, pages[&2]), vec![0.0, 0.0, 144.0, 36.0]);
    }

    #[test]
    fn lossless_pages_declare_flate() {
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let enc = encode_slice(&img, ImageFormat::Png, 0).unwrap();
        let mut composer = PdfComposer::new();
        composer.add_page(8.0, 8.0, &enc).unwrap();
        let bytes = composer.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let flate_images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"Subtype").and_then(|v| v.as_name()).ok() == Some(&b"Image"[..]))
            .filter(|s| s.dict.get(b"Filter").and_then(|v| v.as_name()).ok() == Some(&b"FlateDecode"[..]))
            .count();
        assert_eq!(flate_images, 1);
    }

    #[test]
    fn empty_document_still_serialises() {
        let bytes = PdfComposer::new().finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }
}
