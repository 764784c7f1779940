//! Decode → resample → re-encode, as one stateless, fail-fast pass.
//!
//! Steps run in a fixed order and the first failure aborts the rest:
//! 1. decode the source bytes (`DecodeFailed`)
//! 2. validate the target width (`InvalidWidth`)
//! 3. derive the height from the source aspect ratio
//! 4. Lanczos3 resample, then apply the blur factor (`ResizeFailed`)
//! 5. encode at the configured quality into the output format (`EncodeFailed`)
//!
//! The blur factor follows the usual resampler convention: `1.0` is neutral,
//! values below sharpen (unsharp mask) and values above soften (gaussian).

use crate::{
    errors::{GatewayError, GatewayResult},
    models::resize::{OutputFormat, proportional_height},
};
use image::{
    DynamicImage, GenericImageView,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    },
    imageops::FilterType,
};

/// Largest output accepted, in pixels (~50 megapixels).
pub const MAX_OUTPUT_PIXELS: u64 = 50_000_000;

const NEUTRAL_BLUR_EPSILON: f32 = 1e-3;

/// Encoded result of one transform.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl ResizedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResizePipeline {
    pub format: OutputFormat,
    /// 1..=100. Honoured by JPEG and WebP; PNG always uses its best compression.
    pub quality: u8,
    pub blur: f32,
}

impl ResizePipeline {
    pub fn new(format: OutputFormat, quality: u8, blur: f32) -> Self {
        Self {
            format,
            quality,
            blur,
        }
    }

    pub fn transform(&self, raw: &[u8], target_width: u32) -> GatewayResult<ResizedImage> {
        let source = decode(raw)?;

        if target_width == 0 {
            return Err(GatewayError::InvalidWidth(
                "width must be a positive integer".into(),
            ));
        }

        let (width, height) = source.dimensions();
        let target_height = proportional_height(target_width, width, height);
        let resized = self.resample(&source, target_width, target_height)?;

        let bytes = self.encode(&resized)?;
        Ok(ResizedImage {
            bytes,
            width: target_width,
            height: target_height,
            format: self.format,
        })
    }

    fn resample(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> GatewayResult<DynamicImage> {
        if width == 0 || height == 0 {
            return Err(GatewayError::ResizeFailed(format!(
                "target {}x{} has a zero dimension",
                width, height
            )));
        }
        if u64::from(width) * u64::from(height) > MAX_OUTPUT_PIXELS {
            return Err(GatewayError::ResizeFailed(format!(
                "target {}x{} exceeds {} pixels",
                width, height, MAX_OUTPUT_PIXELS
            )));
        }

        let resized = source.resize_exact(width, height, FilterType::Lanczos3);
        let adjusted = if (self.blur - 1.0).abs() < NEUTRAL_BLUR_EPSILON {
            resized
        } else if self.blur < 1.0 {
            resized.unsharpen(2.0 * (1.0 - self.blur), 1)
        } else {
            resized.blur(self.blur - 1.0)
        };
        Ok(adjusted)
    }

    fn encode(&self, image: &DynamicImage) -> GatewayResult<Vec<u8>> {
        let mut out = Vec::new();
        let result = match self.format {
            OutputFormat::Jpeg => {
                // JPEG carries no alpha channel.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))
            }
            OutputFormat::Webp => return self.encode_webp(image),
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Best,
                PngFilterType::Adaptive,
            )),
        };
        result.map_err(|err| GatewayError::EncodeFailed(format!("{}: {}", self.format, err)))?;
        Ok(out)
    }

    /// Lossy WebP at `quality`; libwebp takes 8-bit RGB or RGBA only.
    fn encode_webp(&self, image: &DynamicImage) -> GatewayResult<Vec<u8>> {
        let pixels = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };
        let encoder = webp::Encoder::from_image(&pixels)
            .map_err(|err| GatewayError::EncodeFailed(format!("webp: {}", err)))?;
        let encoded = encoder
            .encode_simple(false, f32::from(self.quality))
            .map_err(|err| GatewayError::EncodeFailed(format!("webp: {:?}", err)))?;
        Ok(encoded.to_vec())
    }
}

fn decode(raw: &[u8]) -> GatewayResult<DynamicImage> {
    image::load_from_memory(raw).map_err(|err| GatewayError::DecodeFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn source_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn pipeline(format: OutputFormat) -> ResizePipeline {
        ResizePipeline::new(format, 95, 0.8)
    }

    #[test]
    fn halves_a_wide_image_into_webp() {
        let resized = pipeline(OutputFormat::Webp)
            .transform(&source_png(1600, 800), 800)
            .unwrap();
        assert_eq!((resized.width, resized.height), (800, 400));
        assert_eq!(resized.content_type(), "image/webp");

        let decoded =
            image::load_from_memory_with_format(&resized.bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (800, 400));
    }

    #[test]
    fn each_format_decodes_as_itself() {
        let raw = source_png(120, 90);
        for format in [OutputFormat::Webp, OutputFormat::Jpeg, OutputFormat::Png] {
            let resized = pipeline(format).transform(&raw, 60).unwrap();
            assert_eq!(
                image::guess_format(&resized.bytes).unwrap(),
                format.image_format()
            );
            let decoded = image::load_from_memory(&resized.bytes).unwrap();
            assert_eq!(decoded.dimensions(), (60, 45));
        }
    }

    #[test]
    fn keeps_aspect_ratio_within_a_pixel() {
        let raw = source_png(333, 187);
        for target in [1, 17, 100, 250, 500] {
            let resized = pipeline(OutputFormat::Png).transform(&raw, target).unwrap();
            let expected = f64::from(target) * 187.0 / 333.0;
            assert!((f64::from(resized.height) - expected).abs() <= 1.0, "{target}");
            assert_eq!(resized.width, target);
        }
    }

    #[test]
    fn quality_controls_webp_size() {
        let raw = source_png(300, 200);
        let low = ResizePipeline::new(OutputFormat::Webp, 10, 0.8)
            .transform(&raw, 300)
            .unwrap();
        let high = ResizePipeline::new(OutputFormat::Webp, 95, 0.8)
            .transform(&raw, 300)
            .unwrap();
        assert_ne!(low.bytes, high.bytes);
        assert!(low.bytes.len() < high.bytes.len(), "{} vs {}", low.bytes.len(), high.bytes.len());
        for encoded in [&low, &high] {
            let decoded = image::load_from_memory_with_format(&encoded.bytes, ImageFormat::WebP).unwrap();
            assert_eq!(decoded.dimensions(), (300, 200));
        }
    }

    #[test]
    fn upscales_when_asked() {
        let resized = pipeline(OutputFormat::Jpeg)
            .transform(&source_png(40, 20), 200)
            .unwrap();
        assert_eq!((resized.width, resized.height), (200, 100));
    }

    #[test]
    fn neutral_and_soft_blur_factors_resize_too() {
        let raw = source_png(64, 64);
        for blur in [1.0, 1.5] {
            let resized = ResizePipeline::new(OutputFormat::Png, 95, blur)
                .transform(&raw, 32)
                .unwrap();
            assert_eq!((resized.width, resized.height), (32, 32));
        }
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let err = pipeline(OutputFormat::Webp)
            .transform(b"definitely not an image", 100)
            .unwrap_err();
        assert!(matches!(err, GatewayError::DecodeFailed(_)));
    }

    #[test]
    fn zero_width_is_invalid() {
        let err = pipeline(OutputFormat::Webp)
            .transform(&source_png(10, 10), 0)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidWidth(_)));
    }

    #[test]
    fn degenerate_or_huge_targets_fail_to_resize() {
        let err = pipeline(OutputFormat::Png)
            .transform(&source_png(1000, 1), 1)
            .unwrap_err();
        assert!(matches!(err, GatewayError::ResizeFailed(_)));

        let err = pipeline(OutputFormat::Png)
            .transform(&source_png(10, 10), 100_000)
            .unwrap_err();
        assert!(matches!(err, GatewayError::ResizeFailed(_)));
    }
}
