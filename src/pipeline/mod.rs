//! Deterministic transform pipeline
//!
//! Applies a decoded [`TransformSpec`] to source image bytes in a fixed
//! order: crop-ratio → crop → scale → width bound → height bound → format
//! conversion. Only operations whose flag is set execute. The pipeline is a
//! pure function over its inputs — no filesystem access, no shared state —
//! so concurrent calls are safe and recomputation is idempotent.

pub mod encoder;

use std::fmt;
use std::io::Cursor;
use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use tracing::debug;

use crate::spec::{bitfloat, ImageFormat, TransformSpec};

/// Errors that can occur while rendering a spec against source bytes
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Failed to decode the source image data
    DecodeFailed { message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to the output format failed
    EncodeFailed { format: String, message: String },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            PipelineError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            PipelineError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    pub fn decode_failed(message: impl Into<String>) -> Self {
        PipelineError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        PipelineError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }
}

/// Output-side settings the spec does not carry itself
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// JPEG quality applied when the spec has no quality argument
    pub jpeg_quality: u8,
    /// Run the oxipng pass on PNG output even without the optimize marker
    pub optimize_png: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 60,
            optimize_png: false,
        }
    }
}

/// Result of rendering a spec
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Encoded output bytes
    pub data: Vec<u8>,
    /// The format the output was encoded in
    pub format: ImageFormat,
    /// Output dimensions (width, height)
    pub width: u32,
    pub height: u32,
}

/// Render `spec` against raw source bytes
pub fn process(
    data: &[u8],
    spec: &TransformSpec,
    config: &PipelineConfig,
) -> Result<RenderedImage, PipelineError> {
    let mut img = decode_image(data)?;
    let mut out_format = detect_format(data);
    let mut quality = config.jpeg_quality;
    let mut optimize = config.optimize_png;

    if spec.has_crop_ratio() {
        let ratio = bitfloat::unpack(spec.crop_ratio() as u16);
        img = crop_to_ratio(img, ratio);
    }

    if spec.has_crop() {
        img = crop_cover(img, spec.width(), spec.height())?;
    }

    if spec.has_scale() {
        img = scale(img, spec.scale())?;
    }

    // Width/height bounds run even when a crop already satisfied them; the
    // bounded resize only ever shrinks, so they degenerate to no-ops then.
    if spec.has_width() {
        let bound_h = img.height();
        img = shrink_to_fit(img, spec.width(), bound_h)?;
    }

    if spec.has_height() {
        let bound_w = img.width();
        img = shrink_to_fit(img, bound_w, spec.height())?;
    }

    if spec.has_image_fmt() {
        match spec.output_format() {
            Some(ImageFormat::Jpeg) => {
                out_format = ImageFormat::Jpeg;
                if spec.has_format_arg() && spec.format_arg() > 0 {
                    quality = spec.format_arg().min(100) as u8;
                }
            }
            Some(ImageFormat::Png) => {
                out_format = ImageFormat::Png;
                if spec.has_format_arg() && spec.format_arg() > 0 {
                    optimize = true;
                }
            }
            None => {
                // Only reachable for a forged body that survived the
                // checksum; degrade to the source format.
                debug!(code = spec.image_fmt(), "unknown image format code");
            }
        }
    }

    let (width, height) = (img.width(), img.height());
    let data = encoder::encode(&img, out_format, quality, optimize)?;

    Ok(RenderedImage {
        data,
        format: out_format,
        width,
        height,
    })
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DynamicImage, PipelineError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| PipelineError::decode_failed(e.to_string()))
}

/// Detect the output format to keep when the spec requests no conversion
fn detect_format(data: &[u8]) -> ImageFormat {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Png) => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    }
}

/// Center-crop to a target box, shrinking only
///
/// Skips entirely when the source already fits the box in both dimensions;
/// otherwise each target dimension is held to the source so the crop never
/// pads or upscales.
fn center_crop(img: DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w <= target_w && h <= target_h {
        return img;
    }
    let target_w = target_w.min(w).max(1);
    let target_h = target_h.min(h).max(1);
    let left = (w - target_w) / 2;
    let top = (h - target_h) / 2;
    img.crop_imm(left, top, target_w, target_h)
}

/// Crop to an aspect ratio: hold the limiting dimension, shrink the other
fn crop_to_ratio(img: DynamicImage, ratio: f64) -> DynamicImage {
    let (w, h) = (img.width() as f64, img.height() as f64);
    let current = w / h;
    let (new_w, new_h) = if current >= ratio {
        (((h * ratio).round() as u32).max(1), img.height())
    } else {
        (img.width(), ((w / ratio).round() as u32).max(1))
    };
    center_crop(img, new_w, new_h)
}

/// `WxH,C`: resize so the shorter requested dimension is met, then center-crop
fn crop_cover(img: DynamicImage, width: u32, height: u32) -> Result<DynamicImage, PipelineError> {
    let img = if height >= width {
        let bound_w = img.width();
        shrink_to_fit(img, bound_w, height)?
    } else {
        let bound_h = img.height();
        shrink_to_fit(img, width, bound_h)?
    };
    Ok(center_crop(img, width, height))
}

/// Percentage scale; may upscale, with a 1-pixel floor on both dimensions
///
/// The new height derives from the new width so both dimensions round
/// together instead of drifting independently.
fn scale(img: DynamicImage, percent: u32) -> Result<DynamicImage, PipelineError> {
    let (w, h) = (img.width() as f64, img.height() as f64);
    let new_w = (w * percent as f64 / 100.0).max(1.0) as u32;
    let new_h = (h * new_w as f64 / w).max(1.0) as u32;
    resize_exact(img, new_w, new_h)
}

/// Aspect-preserving resize into a bounding box, shrinking only
fn shrink_to_fit(
    img: DynamicImage,
    bound_w: u32,
    bound_h: u32,
) -> Result<DynamicImage, PipelineError> {
    let (w, h) = (img.width(), img.height());
    let ratio = f64::min(bound_w as f64 / w as f64, bound_h as f64 / h as f64);
    if ratio >= 1.0 {
        return Ok(img);
    }
    let new_w = ((w as f64 * ratio).round() as u32).max(1);
    let new_h = ((h as f64 * ratio).round() as u32).max(1);
    resize_exact(img, new_w, new_h)
}

/// Resize to exact dimensions using fast-image-resize with Lanczos3
fn resize_exact(
    img: DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, PipelineError> {
    if target_w == img.width() && target_h == img.height() {
        return Ok(img);
    }

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| PipelineError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| PipelineError::resize_failed("Source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| PipelineError::resize_failed("Target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| PipelineError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| PipelineError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| PipelineError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| PipelineError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
