//! Output encoders
//!
//! JPEG and PNG serialization for rendered images. JPEG flattens any alpha
//! channel before encoding; PNG output optionally runs through an oxipng
//! optimization pass.

use std::io::Cursor;

use image::DynamicImage;

use super::PipelineError;
use crate::spec::ImageFormat;

/// Encode a processed image into the target format
pub(super) fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    optimize: bool,
) -> Result<Vec<u8>, PipelineError> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(img, quality),
        ImageFormat::Png => {
            let data = encode_png(img)?;
            if optimize {
                optimize_png(&data)
            } else {
                Ok(data)
            }
        }
    }
}

/// JPEG encoder using the image crate
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    use image::codecs::jpeg::JpegEncoder;
    use image::ImageEncoder as _;

    // JPEG has no alpha; drop it before encoding
    let rgb = img.to_rgb8();

    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(|e| PipelineError::encode_failed("jpeg", e.to_string()))?;

    Ok(output.into_inner())
}

/// PNG encoder using the image crate
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder as _;

    let rgba = img.to_rgba8();

    let mut output = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut output);
    encoder
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| PipelineError::encode_failed("png", e.to_string()))?;

    Ok(output.into_inner())
}

/// Recompress PNG output with oxipng's default effort
fn optimize_png(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    oxipng::optimize_from_memory(data, &oxipng::Options::default())
        .map_err(|e| PipelineError::encode_failed("png", e.to_string()))
}
