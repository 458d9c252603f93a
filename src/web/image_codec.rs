use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use image::{ImageFormat, RgbImage};
use tracing::debug;

use super::error::ApiError;
use crate::io::codec;

/// Output format negotiated from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
    Bmp,
    Tga,
    Qoi,
}

impl TryFrom<&mime::Mime> for OutputFormat {
    type Error = ();

    fn try_from(value: &mime::Mime) -> Result<Self, Self::Error> {
        if value.essence_str() == "*/*" {
            return Ok(OutputFormat::Jpeg {
                quality: codec::DEFAULT_JPEG_QUALITY,
            });
        }
        if value.type_() != mime::IMAGE {
            return Err(());
        }
        match value.subtype().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" => {
                let quality = value
                    .get_param("quality")
                    .and_then(|q| q.as_str().parse::<u8>().ok())
                    .filter(|q| (1..=100).contains(q))
                    .unwrap_or(codec::DEFAULT_JPEG_QUALITY);
                Ok(OutputFormat::Jpeg { quality })
            }
            "bmp" | "x-bmp" => Ok(OutputFormat::Bmp),
            "x-tga" | "x-targa" => Ok(OutputFormat::Tga),
            "x-qoi" => Ok(OutputFormat::Qoi),
            // image/* picks the same format as the hosted endpoint
            "*" => Ok(OutputFormat::Jpeg {
                quality: codec::DEFAULT_JPEG_QUALITY,
            }),
            _ => Err(()),
        }
    }
}

impl OutputFormat {
    fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg { .. } => "image/jpeg",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Tga => "image/x-tga",
            OutputFormat::Qoi => "image/x-qoi",
        }
    }
}

/// Decoder hint from a `Content-Type`. `Ok(None)` means "detect from the bytes".
pub fn format_hint(content_type: Option<&str>) -> Result<Option<ImageFormat>, ApiError> {
    let media_type = content_type.map(|s| s[0..s.find(';').unwrap_or(s.len())].trim());

    match media_type {
        None | Some("") | Some("application/octet-stream") => Ok(None),
        Some("image/jpeg") => Ok(Some(ImageFormat::Jpeg)),
        Some("image/png") => Ok(Some(ImageFormat::Png)),
        Some("image/webp") => Ok(Some(ImageFormat::WebP)),
        Some("image/bmp") | Some("image/x-bmp") => Ok(Some(ImageFormat::Bmp)),
        Some("image/tiff") => Ok(Some(ImageFormat::Tiff)),
        Some("image/qoi") | Some("image/x-qoi") => Ok(Some(ImageFormat::Qoi)),
        Some("image/x-tga") | Some("image/x-targa") => Ok(Some(ImageFormat::Tga)),
        Some(other) => Err(ApiError::UnsupportedMediaType(format!(
            "Content type '{}' is not supported.",
            other
        ))),
    }
}

pub fn encode_output_image(image: &RgbImage, output_format: OutputFormat) -> Result<Response, ApiError> {
    debug!(
        "Encoding {}x{} output as {}.",
        image.width(),
        image.height(),
        output_format.media_type()
    );

    let bytes = match output_format {
        OutputFormat::Jpeg { quality } => codec::encode_jpeg(image, quality),
        OutputFormat::Png => codec::encode(image, ImageFormat::Png),
        OutputFormat::Bmp => codec::encode(image, ImageFormat::Bmp),
        OutputFormat::Tga => codec::encode(image, ImageFormat::Tga),
        OutputFormat::Qoi => codec::encode(image, ImageFormat::Qoi),
    }
    .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, output_format.media_type())], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_format(raw: &str) -> Result<OutputFormat, ()> {
        OutputFormat::try_from(&raw.parse::<mime::Mime>().unwrap())
    }

    #[test]
    fn test_output_format_from_mime() {
        assert_eq!(output_format("image/png"), Ok(OutputFormat::Png));
        assert_eq!(
            output_format("image/jpeg;quality=92"),
            Ok(OutputFormat::Jpeg { quality: 92 })
        );
        assert_eq!(
            output_format("image/jpeg;quality=0"),
            Ok(OutputFormat::Jpeg {
                quality: codec::DEFAULT_JPEG_QUALITY
            })
        );
        assert_eq!(output_format("image/x-targa"), Ok(OutputFormat::Tga));
        assert!(output_format("image/gif").is_err());
        assert!(output_format("text/plain").is_err());
    }

    #[test]
    fn test_encode_failure_is_a_server_error() {
        // Baseline JPEG cannot describe a width above 65535
        let image = RgbImage::new(70_000, 1);
        assert!(matches!(
            encode_output_image(&image, OutputFormat::Jpeg { quality: 80 }),
            Err(ApiError::InternalServerError(_))
        ));
    }

    #[test]
    fn test_format_hint() {
        assert_eq!(format_hint(None).unwrap(), None);
        assert_eq!(format_hint(Some("application/octet-stream")).unwrap(), None);
        assert_eq!(
            format_hint(Some("image/png; charset=binary")).unwrap(),
            Some(ImageFormat::Png)
        );
        assert!(matches!(
            format_hint(Some("text/plain")),
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }
}
