//! Image encoding for data-URI inlining
//!
//! The format is sniffed from the payload's magic bytes, so a text file renamed
//! to `.jpg` is rejected here, before anything is sent to the remote endpoint.
//! No size limit is enforced.

use base64::Engine;
use image::ImageFormat;
use insight_types::{Error, Result};
use std::path::Path;

/// Base64 payload plus the MIME type it was sniffed as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: &'static str,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

/// Check that the payload looks like a supported image and return its MIME type
pub fn sniff_mime(bytes: &[u8]) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(Error::InvalidImage("empty payload".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| Error::InvalidImage("not a recognised image format".to_string()))?;

    mime_for(format)
        .ok_or_else(|| Error::InvalidImage(format!("unsupported image format: {:?}", format)))
}

/// Encode raw image bytes as base64
pub fn encode_image(bytes: &[u8]) -> Result<EncodedImage> {
    let mime = sniff_mime(bytes)?;
    let base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(EncodedImage { mime, base64 })
}

/// Read an image from disk. Read failures propagate unchanged.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_encode_png() {
        let encoded = encode_image(PNG_HEADER).unwrap();
        assert_eq!(encoded.mime, "image/png");
        assert!(encoded.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_encode_jpeg() {
        let encoded = encode_image(JPEG_HEADER).unwrap();
        assert_eq!(encoded.mime, "image/jpeg");
    }

    #[test]
    fn test_rejects_text() {
        let err = encode_image(b"Patient: John Doe\nRx: aspirin").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(encode_image(&[]), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_image(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
