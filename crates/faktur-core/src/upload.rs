//! Loading an uploaded file into an [`ExtractionRequest`].

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use crate::error::{FakturError, Result, UploadError};
use crate::gateway::{ExtractionRequest, InvoiceImage};
use crate::models::config::UploadConfig;
use crate::pdf::{PdfContent, PdfExtractor, PdfProcessor};

/// File extensions accepted as invoice images.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

/// Read `path` and turn it into a request: PDF text when the document has a
/// text layer, otherwise a downscaled JPEG of the scan or photo.
pub async fn load_upload(path: &Path, config: &UploadConfig) -> Result<ExtractionRequest> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let data = tokio::fs::read(path).await?;
    debug!(file = %name, bytes = data.len(), "Loaded upload");

    let config = config.clone();
    let task_name = name.clone();
    tokio::task::spawn_blocking(move || prepare(&task_name, &extension, &data, &config))
        .await
        .map_err(|e| FakturError::Io(std::io::Error::other(e)))?
}

/// Build a request from file bytes; `extension` picks the decoder.
pub fn prepare(name: &str, extension: &str, data: &[u8], config: &UploadConfig) -> Result<ExtractionRequest> {
    match extension {
        "pdf" => prepare_pdf(name, data, config),
        ext if IMAGE_EXTENSIONS.contains(&ext) => {
            let image = image::load_from_memory(data)?;
            Ok(ExtractionRequest::from_image(name, encode_image(image, config)?))
        }
        other => Err(UploadError::UnsupportedFormat(other.to_string()).into()),
    }
}

fn prepare_pdf(name: &str, data: &[u8], config: &UploadConfig) -> Result<ExtractionRequest> {
    let mut pdf = PdfExtractor::new();
    pdf.load(data)?;

    match pdf.content(config.min_pdf_text_length)? {
        Some(PdfContent::Text(text)) => {
            debug!(file = %name, chars = text.len(), "Using PDF text layer");
            Ok(ExtractionRequest::from_text(name, text))
        }
        Some(PdfContent::Scan(image)) => {
            debug!(file = %name, "Using embedded scan");
            Ok(ExtractionRequest::from_image(name, encode_image(image, config)?))
        }
        None => Err(UploadError::NoContent(name.to_string()).into()),
    }
}

/// Shrink the image so its longer side fits `max_image_size` and encode it as
/// JPEG. Smaller images are not enlarged.
pub fn encode_image(image: DynamicImage, config: &UploadConfig) -> Result<InvoiceImage> {
    let max = config.max_image_size;
    let image = if image.width().max(image.height()) > max {
        debug!(
            width = image.width(),
            height = image.height(),
            max,
            "Downscaling image"
        );
        image.resize(max, max, FilterType::Lanczos3)
    } else {
        image
    };

    let rgb = image.to_rgb8();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, config.jpeg_quality).encode_image(&rgb)?;
    Ok(InvoiceImage::jpeg(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FakturError;
    use image::{GenericImageView, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn config(max_image_size: u32) -> UploadConfig {
        UploadConfig {
            max_image_size,
            ..UploadConfig::default()
        }
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let request = prepare("scan.png", "png", &png_bytes(400, 200), &config(100)).unwrap();
        let image = request.image.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");

        let decoded = image::load_from_memory(&image.data).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
        assert_eq!(request.text, None);
    }

    #[test]
    fn test_small_image_keeps_size() {
        let request = prepare("scan.png", "png", &png_bytes(40, 30), &config(100)).unwrap();
        let decoded = image::load_from_memory(&request.image.unwrap().data).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = prepare("notes.txt", "txt", b"hello", &config(100)).unwrap_err();
        assert!(matches!(err, FakturError::Upload(UploadError::UnsupportedFormat(ext)) if ext == "txt"));
    }

    #[test]
    fn test_broken_image_is_an_error() {
        let err = prepare("scan.jpg", "jpg", b"not an image", &config(100)).unwrap_err();
        assert!(matches!(err, FakturError::Image(_)));
    }

    #[tokio::test]
    async fn test_load_upload_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Receipt.PNG");
        std::fs::write(&path, png_bytes(10, 10)).unwrap();

        let request = load_upload(&path, &UploadConfig::default()).await.unwrap();
        assert_eq!(request.name, "Receipt.PNG");
        assert!(request.image.is_some());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_upload(Path::new("/nonexistent/invoice.pdf"), &UploadConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FakturError::Io(_)));
    }
}
