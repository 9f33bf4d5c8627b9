//! Image payload encoding - base64 and embeddable data URLs

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{AppError, Result};

/// Encode binary data to a base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base64 string, tolerating a data-URL prefix
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(strip_data_url(encoded).trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}

/// Create an embeddable data URL from binary image data
pub fn data_url(data: &[u8], format: &str) -> String {
    format!("data:image/{};base64,{}", format, encode(data))
}

/// Strip a `data:*;base64,` prefix if present, returning the bare payload
pub fn strip_data_url(value: &str) -> &str {
    if value.starts_with("data:") {
        value.split_once(',').map(|(_, payload)| payload).unwrap_or(value)
    } else {
        value
    }
}

/// Detect an image format from magic bytes, for data-URL media types
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpeg");
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let original = b"studio image bytes";
        let decoded = decode(&encode(original)).unwrap();
        assert_eq!(original.as_slice(), decoded.as_slice());
    }

    #[test]
    fn test_decode_tolerates_data_url() {
        let decoded = decode("data:image/png;base64,SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(b"Hello, World!", decoded.as_slice());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not valid base64!!!").is_err());
    }

    #[test]
    fn test_data_url_shape() {
        let url = data_url(b"abc", "png");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode(&url).unwrap(), b"abc");
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,Zm9v"), "Zm9v");
        assert_eq!(strip_data_url("Zm9v"), "Zm9v");
    }

    #[test]
    fn test_detect_image_format() {
        assert_eq!(
            detect_image_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("png")
        );
        assert_eq!(detect_image_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpeg"));
        assert_eq!(detect_image_format(b"plain text"), None);
    }
}
