//! # Image Processing Module
//!
//! Questo modulo gestisce la ricompressione in memoria delle immagini
//! embedded nel container, senza mai toccare il filesystem.
//!
//! ## Pipeline di trasformazione:
//! 1. **Decodifica**: `image::load_from_memory` sui byte della risorsa
//! 2. **Scelta target**: tabella fissa di regole per formato sorgente
//! 3. **Downscale opzionale**: bounding box con aspect ratio preservato
//! 4. **Ricodifica**: alla qualità configurata nel formato target
//!
//! ## Tabella delle regole:
//! | Sorgente        | Target |
//! |-----------------|--------|
//! | PNG con alpha   | WEBP   |
//! | PNG opaco       | JPEG   |
//! | PNG (force_jpeg off) | PNG |
//! | GIF             | WEBP   |
//! | JPEG            | JPEG   |
//! | WEBP            | WEBP   |
//! | Altro           | JPEG   |
//!
//! ## Contratto fail-closed:
//! Qualunque errore di decode o encode ritorna i byte ORIGINALI invariati
//! e segnala "nessuna conversione" (estensione `None`). La decisione di
//! sostituire i byte (solo se strettamente più piccoli) spetta
//! all'orchestratore, non a questo modulo.
//!
//! ## Encoder utilizzati:
//! - JPEG: encoder del crate `image` con qualità configurabile
//! - PNG: encoder del crate `image` a compressione massima
//! - WebP lossy: crate `webp` (l'encoder lossy di `image` 0.24 è deprecato)

use crate::config::ImageOptions;
use crate::error::OptimizeError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, ImageEncoder, ImageFormat};
use std::io::Cursor;
use tracing::{debug, warn};

/// Target encoding chosen by the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetFormat {
    Jpeg,
    Png,
    WebP,
}

impl TargetFormat {
    fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => ".jpeg",
            TargetFormat::Png => ".png",
            TargetFormat::WebP => ".webp",
        }
    }
}

/// Result of an image compression attempt.
///
/// `extension` is `Some` when the bytes were re-encoded (even into the same
/// codec) and `None` when compression failed and `data` still holds the
/// original bytes.
#[derive(Debug)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    pub extension: Option<&'static str>,
}

/// Recompresses resource images fully in memory
pub struct ImageProcessor {
    options: ImageOptions,
}

impl ImageProcessor {
    /// Create a new processor with the given image options
    pub fn new(options: ImageOptions) -> Self {
        Self { options }
    }

    /// Compress a single image, falling back to the original bytes on any
    /// decode or encode failure.
    pub fn compress(&self, data: &[u8]) -> CompressedImage {
        match self.try_compress(data) {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!("Could not compress image: {}", e);
                CompressedImage {
                    data: data.to_vec(),
                    extension: None,
                }
            }
        }
    }

    fn try_compress(&self, data: &[u8]) -> Result<CompressedImage, OptimizeError> {
        let format = image::guess_format(data)?;
        let mut img = image::load_from_memory(data)?;

        let target = pick_target(format, img.color().has_alpha(), self.options.force_jpeg);

        // Downscale into the bounding box, never upscale
        if let (Some(max_width), Some(max_height)) =
            (self.options.max_width, self.options.max_height)
        {
            if img.width() > max_width || img.height() > max_height {
                debug!(
                    "Downscaling {}x{} into {}x{}",
                    img.width(),
                    img.height(),
                    max_width,
                    max_height
                );
                img = img.resize(max_width, max_height, FilterType::Lanczos3);
            }
        }

        let data = match target {
            TargetFormat::Jpeg => {
                let rgb = img.to_rgb8();
                let mut out = Cursor::new(Vec::new());
                let mut encoder = JpegEncoder::new_with_quality(&mut out, self.options.quality);
                encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
                out.into_inner()
            }
            TargetFormat::Png => {
                let mut out = Cursor::new(Vec::new());
                if img.color().has_alpha() {
                    let rgba = img.to_rgba8();
                    let encoder = PngEncoder::new_with_quality(
                        &mut out,
                        CompressionType::Best,
                        PngFilterType::Adaptive,
                    );
                    encoder.write_image(
                        rgba.as_raw(),
                        rgba.width(),
                        rgba.height(),
                        ColorType::Rgba8,
                    )?;
                } else {
                    let rgb = img.to_rgb8();
                    let encoder = PngEncoder::new_with_quality(
                        &mut out,
                        CompressionType::Best,
                        PngFilterType::Adaptive,
                    );
                    encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
                }
                out.into_inner()
            }
            TargetFormat::WebP => {
                let rgba = img.to_rgba8();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
                encoder.encode(f32::from(self.options.quality)).to_vec()
            }
        };

        Ok(CompressedImage {
            data,
            extension: Some(target.extension()),
        })
    }
}

/// Fixed rule table mapping the source format to the target encoding
fn pick_target(format: ImageFormat, has_alpha: bool, force_jpeg: bool) -> TargetFormat {
    match format {
        ImageFormat::Png if force_jpeg => {
            if has_alpha {
                TargetFormat::WebP
            } else {
                TargetFormat::Jpeg
            }
        }
        ImageFormat::Png => TargetFormat::Png,
        ImageFormat::Gif => TargetFormat::WebP,
        ImageFormat::WebP => TargetFormat::WebP,
        ImageFormat::Jpeg => TargetFormat::Jpeg,
        _ => TargetFormat::Jpeg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, Rgba};
    use std::io::Cursor;

    fn options() -> ImageOptions {
        ImageOptions {
            quality: 75,
            max_width: None,
            max_height: None,
            force_jpeg: true,
        }
    }

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn opaque_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn alpha_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, (x * 3 % 256) as u8])
        }))
    }

    #[test]
    fn test_png_with_alpha_becomes_webp() {
        let processor = ImageProcessor::new(options());
        let result = processor.compress(&png_bytes(alpha_image(32, 32)));
        assert_eq!(result.extension, Some(".webp"));
    }

    #[test]
    fn test_opaque_png_becomes_jpeg() {
        let processor = ImageProcessor::new(options());
        let result = processor.compress(&png_bytes(opaque_image(32, 32)));
        assert_eq!(result.extension, Some(".jpeg"));
        assert_eq!(
            image::guess_format(&result.data).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_png_stays_png_when_force_jpeg_disabled() {
        let mut opts = options();
        opts.force_jpeg = false;
        let processor = ImageProcessor::new(opts);
        let result = processor.compress(&png_bytes(opaque_image(32, 32)));
        assert_eq!(result.extension, Some(".png"));
    }

    #[test]
    fn test_gif_becomes_webp() {
        let mut cursor = Cursor::new(Vec::new());
        opaque_image(16, 16)
            .write_to(&mut cursor, ImageOutputFormat::Gif)
            .unwrap();

        let processor = ImageProcessor::new(options());
        let result = processor.compress(&cursor.into_inner());
        assert_eq!(result.extension, Some(".webp"));
    }

    #[test]
    fn test_downscale_preserves_aspect_ratio() {
        let mut opts = options();
        opts.max_width = Some(50);
        opts.max_height = Some(50);
        let processor = ImageProcessor::new(opts);

        let result = processor.compress(&png_bytes(opaque_image(200, 100)));
        assert_eq!(result.extension, Some(".jpeg"));

        let decoded = image::load_from_memory(&result.data).unwrap();
        assert_eq!(decoded.width(), 50);
        assert_eq!(decoded.height(), 25);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let mut opts = options();
        opts.max_width = Some(1200);
        opts.max_height = Some(1600);
        let processor = ImageProcessor::new(opts);

        let result = processor.compress(&png_bytes(opaque_image(40, 20)));
        let decoded = image::load_from_memory(&result.data).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 20);
    }

    #[test]
    fn test_garbage_bytes_fail_closed() {
        let processor = ImageProcessor::new(options());
        let garbage = b"definitely not an image".to_vec();

        let result = processor.compress(&garbage);
        assert_eq!(result.extension, None);
        assert_eq!(result.data, garbage);
    }

    #[test]
    fn test_truncated_png_fails_closed() {
        let processor = ImageProcessor::new(options());
        let mut bytes = png_bytes(opaque_image(32, 32));
        bytes.truncate(bytes.len() / 2);

        let result = processor.compress(&bytes);
        assert_eq!(result.extension, None);
        assert_eq!(result.data, bytes);
    }
}
