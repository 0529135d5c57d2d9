//! Track metadata consumed by the tag writer
//!
//! Supplied by an external collaborator (catalog lookup, UI form); the core
//! only reads it when writing tags.

use serde::{Deserialize, Serialize};

/// PNG file signature
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Embedded artwork image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    /// MIME type, e.g. "image/png"
    pub mime: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

impl Artwork {
    /// Build artwork from raw bytes, sniffing the MIME type
    ///
    /// Data matching the PNG signature is tagged image/png, anything else
    /// is assumed JPEG.
    pub fn sniffed(data: Vec<u8>) -> Self {
        let mime = if data.starts_with(&PNG_MAGIC) {
            "image/png"
        } else {
            "image/jpeg"
        };
        Self {
            mime: mime.to_string(),
            data,
        }
    }
}

/// Textual track metadata plus optional artwork
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    #[serde(skip)]
    pub artwork: Option<Artwork>,
}

impl TrackMetadata {
    /// True when there is nothing worth tagging
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.artist.is_empty()
            && self.album.is_empty()
            && self.year.is_empty()
            && self.artwork.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_sniffing() {
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        assert_eq!(Artwork::sniffed(png).mime, "image/png");
    }

    #[test]
    fn test_non_png_is_jpeg() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(Artwork::sniffed(jpeg).mime, "image/jpeg");
    }

    #[test]
    fn test_is_empty() {
        assert!(TrackMetadata::default().is_empty());
        let meta = TrackMetadata {
            title: "x".to_string(),
            ..Default::default()
        };
        assert!(!meta.is_empty());
    }
}
