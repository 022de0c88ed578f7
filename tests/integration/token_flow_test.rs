//! End-to-end flows: produce a signed URL, then serve it
//!
//! These tests exercise the whole consumer path against real files in a
//! temporary document root: resolve → decrypt → checksum-verify → unpack →
//! render → cache.

use std::io::Cursor;
use std::path::Path;

use thumbtoken::config::Config;
use thumbtoken::resolver::FileResolver;
use thumbtoken::service::{url, ImageService};

fn write_image(dir: &Path, name: &str, width: u32, height: u32, format: image::ImageFormat) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 64])
    });
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, format)
        .unwrap();
    std::fs::write(dir.join(name), buffer.into_inner()).unwrap();
}

fn service_for(dir: &Path) -> ImageService {
    let config = Config {
        secret_key: "integration-secret".to_string(),
        ..Default::default()
    };
    ImageService::new(config, FileResolver::new(vec![dir.to_path_buf()])).unwrap()
}

#[test]
fn test_resize_flow() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.png", 400, 300, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("cat.png", "200x200").unwrap();
    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    assert_eq!((img.width(), img.height()), (200, 150));
}

#[test]
fn test_crop_ratio_flow_lands_near_target_aspect() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "tall.png", 300, 600, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("tall.png", "x100 C15:10").unwrap();
    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    let ratio = img.width() as f64 / img.height() as f64;
    assert!((ratio - 1.5).abs() < 0.1, "got ratio {}", ratio);
}

#[test]
fn test_square_crop_flow() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "wide.png", 300, 200, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("wide.png", "100x C1:1").unwrap();
    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));
}

#[test]
fn test_format_conversion_flow_jpeg_to_png() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "fruits.jpg", 60, 40, image::ImageFormat::Jpeg);
    let service = service_for(dir.path());

    let segment = service.signed_url("fruits.jpg", "png").unwrap();
    assert!(segment.ends_with(".png"));
    let served = service.serve_segment(&segment).unwrap();
    assert_eq!(served.content_type, "image/png");
    assert_eq!(&served.data[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_scale_flow() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.png", 50, 30, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("cat.png", "200%").unwrap();
    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    assert_eq!((img.width(), img.height()), (100, 60));
}

#[test]
fn test_preset_flow() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.png", 400, 300, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("cat.png", "medium").unwrap();
    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    // medium preset is 320x240; 400x300 shrinks to fit both bounds
    assert_eq!((img.width(), img.height()), (320, 240));
}

#[test]
fn test_segment_survives_url_parsing() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.v2.png", 40, 40, image::ImageFormat::Png);
    let service = service_for(dir.path());

    // Dots in the basename must not confuse the segment grammar
    let segment = service.signed_url("cat.v2.png", "20x").unwrap();
    let parsed = url::parse_segment(&segment).unwrap();
    assert_eq!(parsed.basename, "cat.v2.png");

    let served = service.serve_segment(&segment).unwrap();
    let img = image::load_from_memory(&served.data).unwrap();
    assert_eq!(img.width(), 20);
}

#[test]
fn test_token_for_one_resource_rejected_for_another() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.png", 40, 40, image::ImageFormat::Png);
    write_image(dir.path(), "dog.png", 40, 40, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("cat.png", "20x").unwrap();
    let parsed = url::parse_segment(&segment).unwrap();

    // Same token text, different resource identity
    let result = service.serve("dog.png", &parsed.token);
    match result {
        Err(err) => assert_eq!(err.to_http_status(), 404),
        Ok(served) => {
            // A checksum collision may parse, but it cannot reproduce the
            // transform that was issued for the other resource.
            let img = image::load_from_memory(&served.data).unwrap();
            assert_ne!((img.width(), img.height()), (20, 20));
        }
    }
}

#[test]
fn test_repeat_serves_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "cat.png", 80, 80, image::ImageFormat::Png);
    let service = service_for(dir.path());

    let segment = service.signed_url("cat.png", "40x jpg80").unwrap();
    let first = service.serve_segment(&segment).unwrap();
    let second = service.serve_segment(&segment).unwrap();
    assert_eq!(first.data, second.data);
    assert!(service.cache_stats().hits >= 1);
}

#[test]
fn test_missing_resource_is_not_found_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_for(dir.path());

    let err = service.serve_segment("ghost.png.AAAAAAA.png").unwrap_err();
    assert_eq!(err.to_http_status(), 404);
}
