//! Pixel-buffer re-encoding.
//!
//! Decoding to pixels and encoding a fresh file never copies EXIF, XMP,
//! IPTC or text chunks across. The ICC profile is the only container that
//! can be carried over, and only when asked for.

use crate::error::{Result, ScrubError};
use crate::format::ContainerKind;
use crate::report::Dimensions;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

pub const MIN_QUALITY: u8 = 50;
pub const MAX_QUALITY: u8 = 100;

/// How cleaned copies are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Re-attach the source ICC profile (JPEG/PNG output only).
    pub keep_icc: bool,
    /// Encode every output as JPEG.
    pub force_jpeg: bool,
    /// JPEG/WebP quality, 50-100.
    pub quality: u8,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            keep_icc: false,
            force_jpeg: false,
            quality: 85,
        }
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&self.quality) {
            return Err(ScrubError::InvalidOption(format!(
                "quality must be between {} and {}, got {}",
                MIN_QUALITY, MAX_QUALITY, self.quality
            )));
        }
        Ok(())
    }

    /// Container the cleaned copy of `source` is written as.
    pub fn output_kind(&self, source: ContainerKind) -> ContainerKind {
        if self.force_jpeg {
            ContainerKind::Jpeg
        } else {
            source
        }
    }
}

/// A re-encoded image.
#[derive(Debug, Clone)]
pub struct Reencoded {
    pub bytes: Vec<u8>,
    pub kind: ContainerKind,
    pub dimensions: Dimensions,
}

/// Produces a metadata-free copy of an image.
pub trait Reencoder: Send + Sync {
    fn reencode(&self, data: &[u8], source: ContainerKind, options: &ProcessingOptions) -> Result<Reencoded>;
}

/// Re-encoder backed by `image` (JPEG/PNG) and libwebp (WebP).
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelReencoder;

impl PixelReencoder {
    pub fn new() -> Self {
        Self
    }

    fn decode(data: &[u8], source: ContainerKind) -> Result<(DynamicImage, Option<Vec<u8>>)> {
        let format = match source {
            ContainerKind::Jpeg => image::ImageFormat::Jpeg,
            ContainerKind::Png => image::ImageFormat::Png,
            ContainerKind::WebP => image::ImageFormat::WebP,
            other => {
                return Err(ScrubError::UnsupportedFormat(format!("{:?} cannot be re-encoded", other)))
            }
        };
        let mut reader = ImageReader::new(Cursor::new(data));
        reader.set_format(format);
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| ScrubError::Decode(format!("Failed to open image: {}", e)))?;
        let icc = decoder.icc_profile().unwrap_or_else(|e| {
            debug!("ICC profile unreadable: {}", e);
            None
        });
        let img = DynamicImage::from_decoder(decoder)
            .map_err(|e| ScrubError::Decode(format!("Failed to decode image: {}", e)))?;
        Ok((img, icc))
    }

    fn encode_jpeg(img: &DynamicImage, quality: u8, icc: Option<Vec<u8>>) -> Result<Vec<u8>> {
        // JPEG has no alpha channel.
        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        if let Some(icc) = icc {
            if let Err(e) = encoder.set_icc_profile(icc) {
                debug!("JPEG encoder rejected ICC profile: {}", e);
            }
        }
        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ScrubError::Encode(format!("Failed to encode JPEG: {}", e)))?;
        Ok(out)
    }

    fn encode_png(img: &DynamicImage, icc: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let rgba = img.to_rgba8();
        let mut out = Vec::new();
        let mut encoder = PngEncoder::new(&mut out);
        if let Some(icc) = icc {
            if let Err(e) = encoder.set_icc_profile(icc) {
                debug!("PNG encoder rejected ICC profile: {}", e);
            }
        }
        encoder
            .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
            .map_err(|e| ScrubError::Encode(format!("Failed to encode PNG: {}", e)))?;
        Ok(out)
    }

    fn encode_webp(img: &DynamicImage, quality: u8) -> Vec<u8> {
        // Direct libwebp FFI encoding
        let rgba = img.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
        encoder.encode(quality as f32).to_vec()
    }
}

impl Reencoder for PixelReencoder {
    fn reencode(&self, data: &[u8], source: ContainerKind, options: &ProcessingOptions) -> Result<Reencoded> {
        options.validate()?;
        if !source.can_process() {
            return Err(ScrubError::UnsupportedFormat(format!("{:?} cannot be processed", source)));
        }

        let (img, icc) = Self::decode(data, source)?;
        let icc = if options.keep_icc { icc } else { None };
        let kind = options.output_kind(source);

        let bytes = match kind {
            ContainerKind::Jpeg => Self::encode_jpeg(&img, options.quality, icc)?,
            ContainerKind::Png => Self::encode_png(&img, icc)?,
            ContainerKind::WebP => {
                if icc.is_some() {
                    debug!("ICC profile dropped for WebP output");
                }
                Self::encode_webp(&img, options.quality)
            }
            other => return Err(ScrubError::UnsupportedFormat(format!("{:?} output", other))),
        };

        debug!(
            "Re-encoded {:?} -> {:?}: {} -> {} bytes",
            source,
            kind,
            data.len(),
            bytes.len()
        );

        Ok(Reencoded {
            bytes,
            kind,
            dimensions: Dimensions {
                width: img.width(),
                height: img.height(),
            },
        })
    }
}

/// `"{stem}_clean.{ext}"`; PNG/WebP sources become `.jpg` under `force_jpeg`.
/// Names without an extension take the output container's.
pub fn clean_file_name(original: &str, force_jpeg: bool, output: ContainerKind) -> String {
    let Some((stem, ext)) = original.rsplit_once('.').filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty()) else {
        return match output.extension() {
            Some(ext) => format!("{}_clean.{}", original, ext),
            None => format!("{}_clean", original),
        };
    };
    let ext = ext.to_ascii_lowercase();
    if force_jpeg && matches!(ext.as_str(), "png" | "webp") {
        format!("{}_clean.jpg", stem)
    } else {
        format!("{}_clean.{}", stem, ext)
    }
}
