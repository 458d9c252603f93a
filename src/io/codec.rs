// Image decoding to RGB and encoding of enhanced results.

use crate::error::EnhanceError;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use image::{ImageFormat, RgbImage, codecs::jpeg::JpegEncoder};
use std::io::Cursor;
use std::path::Path;

/// Quality for JPEG responses of the hosted endpoints.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
/// Quality for files written by the batch driver.
pub const BATCH_JPEG_QUALITY: u8 = 95;

/// Decodes `data` and converts it to RGB8. Alpha is dropped, grey is expanded.
pub fn decode_rgb(data: &[u8], format: Option<ImageFormat>) -> Result<RgbImage, EnhanceError> {
    let image = match format {
        Some(format) => image::load_from_memory_with_format(data, format),
        None => image::load_from_memory(data),
    }
    .map_err(EnhanceError::Decode)?;
    Ok(image.to_rgb8())
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EnhanceError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(image)
        .map_err(EnhanceError::Encode)?;
    Ok(buffer.into_inner())
}

/// Encodes with the format's default settings. JPEG goes through `encode_jpeg` to control quality.
pub fn encode(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>, EnhanceError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(EnhanceError::Encode)?;
    Ok(buffer.into_inner())
}

/// Writes `image` to `path` in the format implied by its extension.
pub fn save(image: &RgbImage, path: &Path, jpeg_quality: u8) -> Result<(), EnhanceError> {
    let format = ImageFormat::from_path(path).map_err(EnhanceError::Encode)?;
    let bytes = match format {
        ImageFormat::Jpeg => encode_jpeg(image, jpeg_quality)?,
        other => encode(image, other)?,
    };
    std::fs::write(path, bytes).map_err(|e| EnhanceError::io(path, e))
}

pub fn to_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, Rgba, RgbaImage};

    #[test]
    fn test_decode_drops_alpha() {
        let rgba = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 0]));
        let png = {
            let mut buffer = Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(rgba)
                .write_to(&mut buffer, ImageFormat::Png)
                .unwrap();
            buffer.into_inner()
        };

        let rgb = decode_rgb(&png, None).unwrap();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_rgb(b"definitely not an image", None),
            Err(EnhanceError::Decode(_))
        ));
    }

    #[test]
    fn test_jpeg_roundtrip_keeps_dimensions() {
        let img = RgbImage::from_pixel(16, 9, Rgb([200, 100, 50]));
        let jpeg = encode_jpeg(&img, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decode_rgb(&jpeg, Some(ImageFormat::Jpeg)).unwrap().dimensions(), (16, 9));
    }

    #[test]
    fn test_save_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));

        for name in ["a_x4.png", "b_x4.jpg", "c_x4.bmp", "d_x4.tiff", "e_x4.webp"] {
            let path = dir.path().join(name);
            save(&img, &path, BATCH_JPEG_QUALITY).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(
                image::guess_format(&bytes).unwrap(),
                ImageFormat::from_path(&path).unwrap(),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_base64_standard_alphabet() {
        assert_eq!(to_base64(&[0xfb, 0xff]), "+/8=");
    }
}
