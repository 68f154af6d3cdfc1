//! Source image decoding for image → PDF.
//!
//! Every image is fully decoded, both to learn its native pixel size and to
//! prove the bytes are intact before anything is written to the output.
//! The decoded form then decides how the image is embedded:
//!
//! * grey or RGB JPEGs are embedded as their original bytes (`DCTDecode`),
//!   so they are not re-compressed;
//! * everything else (PNG, CMYK JPEG) becomes 8-bit RGB samples, with the
//!   alpha channel split out as a soft mask when present.

use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};
use std::io::Cursor;

/// Why an image could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither a JPEG nor a PNG signature.
    UnsupportedFormat,
    /// Right signature, broken data.
    Invalid(String),
}

/// Colour model of a passthrough JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColor {
    Gray,
    Rgb,
}

/// Pixel data ready to be embedded in a PDF image object.
#[derive(Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Original JPEG stream, embedded unchanged.
    Jpeg { data: Vec<u8>, color: JpegColor },
    /// Interleaved 8-bit RGB samples plus optional 8-bit alpha.
    Rgb { samples: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// A decoded source image.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub payload: ImagePayload,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.payload {
            ImagePayload::Jpeg { color, .. } => format!("jpeg/{color:?}"),
            ImagePayload::Rgb { alpha, .. } => {
                if alpha.is_some() {
                    "rgba".to_string()
                } else {
                    "rgb".to_string()
                }
            }
        };
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("payload", &kind)
            .finish()
    }
}

/// Decode JPEG or PNG bytes.
pub fn decode_image(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => decode_jpeg(data),
        Ok(ImageFormat::Png) => {
            let img = image::load_from_memory_with_format(data, ImageFormat::Png)
                .map_err(|e| DecodeError::Invalid(e.to_string()))?;
            Ok(to_rgb_payload(&img))
        }
        _ => Err(DecodeError::UnsupportedFormat),
    }
}

fn decode_jpeg(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    let decoder =
        JpegDecoder::new(Cursor::new(data)).map_err(|e| DecodeError::Invalid(e.to_string()))?;
    let passthrough = match decoder.original_color_type() {
        ExtendedColorType::L8 => Some(JpegColor::Gray),
        ExtendedColorType::Rgb8 => Some(JpegColor::Rgb),
        _ => None,
    };

    let img = DynamicImage::from_decoder(decoder).map_err(|e| DecodeError::Invalid(e.to_string()))?;

    Ok(match passthrough {
        Some(color) => DecodedImage {
            width: img.width(),
            height: img.height(),
            payload: ImagePayload::Jpeg {
                data: data.to_vec(),
                color,
            },
        },
        None => to_rgb_payload(&img),
    })
}

fn to_rgb_payload(img: &DynamicImage) -> DecodedImage {
    let alpha = img.color().has_alpha().then(|| {
        img.to_rgba8()
            .pixels()
            .map(|p| p.0[3])
            .collect::<Vec<u8>>()
    });

    DecodedImage {
        width: img.width(),
        height: img.height(),
        payload: ImagePayload::Rgb {
            samples: img.to_rgb8().into_raw(),
            alpha,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn rgb_jpeg_is_passed_through() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, Rgb([10, 200, 30])));
        let bytes = encode(&img, ImageFormat::Jpeg);

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (80, 60));
        match decoded.payload {
            ImagePayload::Jpeg { data, color } => {
                assert_eq!(color, JpegColor::Rgb);
                assert_eq!(data, bytes);
            }
            other => panic!("expected passthrough, got {:?}", DecodedImage { width: 0, height: 0, payload: other }),
        }
    }

    #[test]
    fn grey_jpeg_is_passed_through_as_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 32, Luma([128])));
        let bytes = encode(&img, ImageFormat::Jpeg);
        let decoded = decode_image(&bytes).unwrap();
        assert!(matches!(
            decoded.payload,
            ImagePayload::Jpeg { color: JpegColor::Gray, .. }
        ));
    }

    #[test]
    fn opaque_png_becomes_rgb_samples() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let decoded = decode_image(&encode(&img, ImageFormat::Png)).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        match decoded.payload {
            ImagePayload::Rgb { samples, alpha } => {
                assert_eq!(samples.len(), 3 * 2 * 3);
                assert_eq!(&samples[..3], &[1, 2, 3]);
                assert!(alpha.is_none());
            }
            ImagePayload::Jpeg { .. } => panic!("PNG must not be passed through"),
        }
    }

    #[test]
    fn transparent_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 77])));
        let decoded = decode_image(&encode(&img, ImageFormat::Png)).unwrap();
        match decoded.payload {
            ImagePayload::Rgb { alpha: Some(alpha), .. } => {
                assert_eq!(alpha.len(), 16);
                assert!(alpha.iter().all(|&a| a == 77));
            }
            _ => panic!("alpha channel lost"),
        }
    }

    #[test]
    fn unsupported_and_truncated_input() {
        assert_eq!(decode_image(b"GIF89a......"), Err(DecodeError::UnsupportedFormat));
        assert_eq!(decode_image(b""), Err(DecodeError::UnsupportedFormat));

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([0, 0, 0])));
        let png = encode(&img, ImageFormat::Png);
        assert!(matches!(
            decode_image(&png[..png.len() / 2]),
            Err(DecodeError::Invalid(_))
        ));
    }
}
