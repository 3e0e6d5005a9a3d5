//! Slice encoding: cropped `RgbImage` → image stream ready for embedding.
//!
//! JPEG slices keep the encoder's bytes verbatim and are embedded with
//! `/DCTDecode`. Lossless slices are stored as zlib-compressed RGB samples
//! with `/FlateDecode`, which is how PDF holds PNG content: the deflated
//! samples are the payload, the PNG container around them is not.

use crate::config::ImageFormat;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};
use std::io::Write;
use tracing::debug;

/// One encoded slice and the facts needed to describe it in a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSlice {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EncodedSlice {
    /// PDF stream filter name matching `data`.
    pub fn pdf_filter(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "DCTDecode",
            ImageFormat::Png => "FlateDecode",
        }
    }
}

/// Encode `crop` as JPEG (`quality` 1–100, clamped) or lossless Flate.
pub fn encode_slice(crop: &RgbImage, format: ImageFormat, quality: u8) -> Result<EncodedSlice, ImageError> {
    let data = match format {
        ImageFormat::Jpeg => {
            let mut buf = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            encoder.encode_image(crop)?;
            buf
        }
        ImageFormat::Png => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(crop.as_raw()).map_err(ImageError::IoError)?;
            encoder.finish().map_err(ImageError::IoError)?
        }
    };

    debug!(
        "Encoded {}x{} slice as {} → {} bytes",
        crop.width(),
        crop.height(),
        format,
        data.len()
    );

    Ok(EncodedSlice {
        format,
        width: crop.width(),
        height: crop.height(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::Rgb;
    use std::io::Read;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn jpeg_slice_is_a_jpeg() {
        let enc = encode_slice(&gradient(64, 32), ImageFormat::Jpeg, 80).unwrap();
        assert_eq!(&enc.data[..2], &[0xFF, 0xD8]);
        assert_eq!((enc.width, enc.height), (64, 32));
        assert_eq!(enc.pdf_filter(), "DCTDecode");

        let decoded = image::load_from_memory(&enc.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = gradient(256, 256);
        let hi = encode_slice(&img, ImageFormat::Jpeg, 95).unwrap();
        let lo = encode_slice(&img, ImageFormat::Jpeg, 30).unwrap();
        assert!(lo.data.len() < hi.data.len());
    }

    #[test]
    fn lossless_slice_inflates_to_exact_samples() {
        let img = gradient(33, 17);
        let enc = encode_slice(&img, ImageFormat::Png, 0).unwrap();
        assert_eq!(enc.pdf_filter(), "FlateDecode");

        let mut samples = Vec::new();
        ZlibDecoder::new(enc.data.as_slice())
            .read_to_end(&mut samples)
            .unwrap();
        assert_eq!(samples, img.into_raw());
    }
}
