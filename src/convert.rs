//! Image conversion pipeline: decode → orient → (optional) downscale →
//! progressive JPEG encode.
//!
//! This is the "image transformation capability" behind `POST /api/convert`.
//! Decoding and orientation handling are delegated to the `image` crate;
//! encoding uses `jpeg_encoder` for progressive output at a caller-chosen
//! quality. Failures are classified into tagged variants so the HTTP layer can
//! map them to status codes without inspecting message text.

use image::{DynamicImage, ImageDecoder, ImageReader, metadata::Orientation};
use jpeg_encoder::{ColorType, Encoder, EncodingError};
use std::io::Cursor;
use thiserror::Error as ThisError;
use tracing::debug;

/// JPEG stores dimensions as u16; anything wider/taller cannot be encoded.
const JPEG_MAX_EDGE: u32 = u16::MAX as u32;

/// Longest output edge allowed when the caller opts out of size preservation.
const DOWNSCALE_MAX_EDGE: u32 = 3840;

/// Options for a single conversion, built from the request's form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// JPEG quality, 10-100.
    pub quality: u8,
    /// Keep the input dimensions exactly. When false, images whose longest
    /// edge exceeds [`DOWNSCALE_MAX_EDGE`] are scaled down to fit it.
    pub maintain_size: bool,
    /// Rotate/flip pixels according to the embedded EXIF orientation.
    pub auto_orient: bool,
    /// Drop EXIF metadata from the output instead of carrying it over.
    pub remove_metadata: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            maintain_size: true,
            auto_orient: true,
            remove_metadata: false,
        }
    }
}

/// Classified conversion failure.
///
/// `Decode` means the input bytes were not a readable image and the client can
/// correct the request; the other variants are not the client's fault.
#[derive(ThisError, Debug)]
pub enum ConvertError {
    #[error("input is not a decodable image")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode output JPEG")]
    Encode(#[source] EncodingError),

    #[error("image dimensions {width}x{height} exceed the JPEG limit of {JPEG_MAX_EDGE}")]
    Dimensions { width: u32, height: u32 },
}

/// Re-encode `data` as a progressive JPEG according to `opts`.
///
/// The output is always JPEG-encoded regardless of the input container; JFIF
/// vs JPEG naming is a concern of the HTTP layer, not of the byte stream.
pub fn convert(data: &[u8], opts: &ConvertOptions) -> Result<Vec<u8>, ConvertError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ConvertError::Decode(image::ImageError::IoError(e)))?;
    let mut decoder = reader.into_decoder().map_err(ConvertError::Decode)?;
    let orientation = decoder.orientation().map_err(ConvertError::Decode)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(ConvertError::Decode)?;

    let oriented = opts.auto_orient && orientation != Orientation::NoTransforms;
    if oriented {
        debug!(?orientation, "applying EXIF orientation");
        img.apply_orientation(orientation);
    }

    if !opts.maintain_size && img.width().max(img.height()) > DOWNSCALE_MAX_EDGE {
        debug!(
            width = img.width(),
            height = img.height(),
            max_edge = DOWNSCALE_MAX_EDGE,
            "downscaling oversized image"
        );
        img = img.resize(DOWNSCALE_MAX_EDGE, DOWNSCALE_MAX_EDGE, image::imageops::FilterType::Lanczos3);
    }

    let (width, height) = (img.width(), img.height());
    if width > JPEG_MAX_EDGE || height > JPEG_MAX_EDGE {
        return Err(ConvertError::Dimensions { width, height });
    }

    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, opts.quality);
    encoder.set_progressive(true);

    // Carry the source EXIF over unless the caller asked for a clean file.
    // Skipped when orientation was applied: the pixels are already rotated and
    // a stale orientation tag would make viewers rotate them again.
    if !opts.remove_metadata && !oriented {
        if let Some(exif) = exif_app1_payload(data) {
            encoder.add_app_segment(1, exif).map_err(ConvertError::Encode)?;
        }
    }

    encoder
        .encode(rgb.as_raw(), width as u16, height as u16, ColorType::Rgb)
        .map_err(ConvertError::Encode)?;

    debug!(in_bytes = data.len(), out_bytes = buf.len(), quality = opts.quality, "converted image");
    Ok(buf)
}

/// Find the payload of the first EXIF APP1 segment in a JPEG byte stream.
///
/// Returns the segment body including the leading `Exif\0\0` identifier, which
/// is the form `jpeg_encoder` expects for `add_app_segment`.
fn exif_app1_payload(data: &[u8]) -> Option<&[u8]> {
    // SOI
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            // Standalone markers carry no length
            0xD8 | 0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Entropy-coded data follows SOS; no further APP segments
            0xDA => return None,
            _ => {}
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > data.len() {
            return None;
        }
        let payload = &data[pos + 4..pos + 2 + len];
        if marker == 0xE1 && payload.starts_with(b"Exif\0\0") {
            return Some(payload);
        }
        pos += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A small gradient JPEG encoded with the `image` crate, independent of
    /// the encoder under test.
    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    /// Minimal EXIF APP1 payload with the given orientation tag.
    fn exif_payload(orientation: u16) -> Vec<u8> {
        let mut payload = b"Exif\0\0".to_vec();
        // Little-endian TIFF header, IFD at offset 8
        payload.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
        // One IFD entry: tag 0x0112 (Orientation), type SHORT, count 1
        payload.extend_from_slice(&[0x01, 0x00]);
        payload.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(&orientation.to_le_bytes());
        payload.extend_from_slice(&[0x00, 0x00]);
        // No next IFD
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        payload
    }

    /// Splice an APP1 segment right after SOI.
    fn with_exif(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let payload = exif_payload(orientation);
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn converts_to_valid_jpeg() {
        let input = sample_jpeg(64, 48);
        let out = convert(&input, &ConvertOptions::default()).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn conversion_is_deterministic() {
        let input = sample_jpeg(80, 60);
        let opts = ConvertOptions::default();
        let first = convert(&input, &opts).unwrap();
        let second = convert(&input, &opts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn lower_quality_produces_smaller_output() {
        let input = sample_jpeg(256, 256);
        let low = convert(
            &input,
            &ConvertOptions {
                quality: 30,
                ..Default::default()
            },
        )
        .unwrap();
        let high = convert(
            &input,
            &ConvertOptions {
                quality: 95,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(low.len() < high.len(), "{} !< {}", low.len(), high.len());
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = convert(b"this is definitely not a JPEG", &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)));
    }

    #[test]
    fn auto_orient_swaps_dimensions_for_rotated_input() {
        // Orientation 6 = rotate 90 CW
        let input = with_exif(&sample_jpeg(64, 32), 6);
        let out = convert(&input, &ConvertOptions::default()).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 64));

        let out = convert(
            &input,
            &ConvertOptions {
                auto_orient: false,
                ..Default::default()
            },
        )
        .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn remove_metadata_strips_exif() {
        let input = with_exif(&sample_jpeg(32, 32), 1);
        assert!(exif_app1_payload(&input).is_some());

        let stripped = convert(
            &input,
            &ConvertOptions {
                remove_metadata: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(exif_app1_payload(&stripped).is_none());
    }

    #[test]
    fn metadata_is_retained_for_orientation_normal_input() {
        let input = with_exif(&sample_jpeg(32, 32), 1);
        let out = convert(&input, &ConvertOptions::default()).unwrap();
        assert_eq!(exif_app1_payload(&out), exif_app1_payload(&input));
    }

    #[test]
    fn stale_orientation_tag_is_dropped_after_rotation() {
        let input = with_exif(&sample_jpeg(64, 32), 6);
        let out = convert(&input, &ConvertOptions::default()).unwrap();
        assert!(exif_app1_payload(&out).is_none());
    }

    #[test]
    fn maintain_size_false_downscales_only_oversized_images() {
        let input = sample_jpeg(120, 90);
        let out = convert(
            &input,
            &ConvertOptions {
                maintain_size: false,
                ..Default::default()
            },
        )
        .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        // Under the edge bound: untouched
        assert_eq!((decoded.width(), decoded.height()), (120, 90));
    }

    #[test]
    fn exif_scanner_ignores_non_exif_app1() {
        let jpeg = sample_jpeg(16, 16);
        let mut spliced = jpeg[..2].to_vec();
        let payload = b"http://ns.adobe.com/xap/1.0/\0<x/>";
        spliced.extend_from_slice(&[0xFF, 0xE1]);
        spliced.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        spliced.extend_from_slice(payload);
        spliced.extend_from_slice(&jpeg[2..]);
        assert!(exif_app1_payload(&spliced).is_none());
    }
}
