//! Tag writer: merges textual metadata and artwork into the encoded stream
//!
//! Two sidecar formats are overlaid on an already-encoded MP3 blob:
//! a fixed 128-byte ID3v1 trailer (legacy players) and a variable-length
//! ID3v2.3 block at the front (extensible, carries artwork). When there is
//! nothing to tag, the input bytes pass through untouched.

use tracing::debug;

use crate::metadata::TrackMetadata;

/// ID3v1 text field width
const V1_FIELD_BYTES: usize = 30;

/// ID3v1 year field width
const V1_YEAR_BYTES: usize = 4;

/// ID3v2.3 text frame encoding byte: UTF-16 with BOM
const V2_ENCODING_UTF16: u8 = 1;

/// ID3v2 APIC picture type: front cover
const APIC_FRONT_COVER: u8 = 3;

/// Truncate a string so its UTF-8 byte length fits `max_bytes`, never
/// splitting a character
fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Write a string into a fixed-width, zero-padded ID3v1 field
fn v1_field(out: &mut Vec<u8>, text: &str, width: usize) {
    let truncated = truncate_utf8(text, width);
    out.extend_from_slice(truncated.as_bytes());
    out.resize(out.len() + (width - truncated.len()), 0);
}

/// Build the 128-byte ID3v1 trailer
fn id3v1_trailer(meta: &TrackMetadata) -> Vec<u8> {
    let mut tag = Vec::with_capacity(128);
    tag.extend_from_slice(b"TAG");
    v1_field(&mut tag, &meta.title, V1_FIELD_BYTES);
    v1_field(&mut tag, &meta.artist, V1_FIELD_BYTES);
    v1_field(&mut tag, &meta.album, V1_FIELD_BYTES);
    v1_field(&mut tag, &meta.year, V1_YEAR_BYTES);
    v1_field(&mut tag, "", V1_FIELD_BYTES); // comment
    tag.push(0xFF); // genre: none
    debug_assert_eq!(tag.len(), 128);
    tag
}

/// Encode text as UTF-16LE with a byte-order mark
fn utf16_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// One ID3v2.3 frame: 4-byte id, 32-bit big-endian size, zero flags, body
fn v2_frame(out: &mut Vec<u8>, id: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(body);
}

fn v2_text_frame(out: &mut Vec<u8>, id: &[u8; 4], text: &str) {
    let mut body = vec![V2_ENCODING_UTF16];
    body.extend_from_slice(&utf16_bom(text));
    v2_frame(out, id, &body);
}

/// Syncsafe 28-bit size used by the ID3v2 header
fn syncsafe(size: u32) -> [u8; 4] {
    [
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ]
}

/// Build the leading ID3v2.3 block
fn id3v2_block(meta: &TrackMetadata) -> Vec<u8> {
    let mut frames = Vec::new();
    if !meta.title.is_empty() {
        v2_text_frame(&mut frames, b"TIT2", &meta.title);
    }
    if !meta.artist.is_empty() {
        v2_text_frame(&mut frames, b"TPE1", &meta.artist);
    }
    if !meta.album.is_empty() {
        v2_text_frame(&mut frames, b"TALB", &meta.album);
    }
    if !meta.year.is_empty() {
        v2_text_frame(&mut frames, b"TYER", &meta.year);
    }
    if let Some(artwork) = &meta.artwork {
        let mut body = vec![0u8]; // ISO-8859-1 for the descriptor strings
        body.extend_from_slice(artwork.mime.as_bytes());
        body.push(0);
        body.push(APIC_FRONT_COVER);
        body.push(0); // empty description
        body.extend_from_slice(&artwork.data);
        v2_frame(&mut frames, b"APIC", &body);
    }

    let mut block = Vec::with_capacity(10 + frames.len());
    block.extend_from_slice(b"ID3");
    block.extend_from_slice(&[3, 0]); // version 2.3.0
    block.push(0); // flags
    block.extend_from_slice(&syncsafe(frames.len() as u32));
    block.extend_from_slice(&frames);
    block
}

/// Overlay both tag sets onto encoded MP3 bytes
///
/// Returns the input unchanged when the metadata carries nothing.
pub fn write_tags(encoded: Vec<u8>, meta: &TrackMetadata) -> Vec<u8> {
    if meta.is_empty() {
        return encoded;
    }

    let leading = id3v2_block(meta);
    let trailing = id3v1_trailer(meta);
    debug!(
        v2_bytes = leading.len(),
        stream_bytes = encoded.len(),
        "tags written"
    );

    let mut out = Vec::with_capacity(leading.len() + encoded.len() + trailing.len());
    out.extend_from_slice(&leading);
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&trailing);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::metadata::Artwork;

    fn meta_with_title(title: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_metadata_passthrough() {
        let stream = vec![1, 2, 3, 4];
        let out = write_tags(stream.clone(), &TrackMetadata::default());
        assert_eq!(out, stream);
    }

    #[test]
    fn test_ascii_title_truncates_to_exactly_30_bytes() {
        let long = "A".repeat(40);
        assert_eq!(truncate_utf8(&long, 30).len(), 30);

        let trailer = id3v1_trailer(&meta_with_title(&long));
        assert_eq!(trailer.len(), 128);
        assert_eq!(&trailer[3..33], "A".repeat(30).as_bytes());
    }

    #[test]
    fn test_multibyte_truncation_respects_char_boundaries() {
        // "é" is 2 bytes in UTF-8; 20 of them is 40 bytes
        let title = "é".repeat(20);
        let truncated = truncate_utf8(&title, 30);
        assert!(truncated.len() <= 30);
        assert_eq!(truncated.len() % 2, 0); // no split characters
        assert!(title.starts_with(truncated));
    }

    #[test]
    fn test_structure_around_stream() {
        let stream = vec![0xAB; 64];
        let meta = TrackMetadata {
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            year: "2024".to_string(),
            artwork: None,
        };
        let out = write_tags(stream.clone(), &meta);

        assert_eq!(&out[0..3], b"ID3");
        assert_eq!(out[3], 3); // v2.3
        assert_eq!(&out[out.len() - 128..out.len() - 125], b"TAG");

        // The stream bytes sit between the two tag sets
        let v2_size = ((out[6] as usize) << 21)
            | ((out[7] as usize) << 14)
            | ((out[8] as usize) << 7)
            | out[9] as usize;
        let stream_start = 10 + v2_size;
        assert_eq!(&out[stream_start..stream_start + 64], &stream[..]);
    }

    #[test]
    fn test_text_frames_present() {
        let meta = TrackMetadata {
            title: "T".to_string(),
            artist: "P".to_string(),
            album: "L".to_string(),
            year: "1999".to_string(),
            artwork: None,
        };
        let block = id3v2_block(&meta);
        let haystack = |needle: &[u8]| block.windows(needle.len()).any(|w| w == needle);
        assert!(haystack(b"TIT2"));
        assert!(haystack(b"TPE1"));
        assert!(haystack(b"TALB"));
        assert!(haystack(b"TYER"));
    }

    #[test]
    fn test_apic_frame_carries_mime_and_data() {
        let png_magic = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
        let meta = TrackMetadata {
            artwork: Some(Artwork::sniffed(png_magic.to_vec())),
            ..Default::default()
        };
        let block = id3v2_block(&meta);
        let haystack = |needle: &[u8]| block.windows(needle.len()).any(|w| w == needle);
        assert!(haystack(b"APIC"));
        assert!(haystack(b"image/png"));
        assert!(haystack(&png_magic));
    }

    #[test]
    fn test_artwork_only_still_tags() {
        let meta = TrackMetadata {
            artwork: Some(Artwork::sniffed(vec![0xFF, 0xD8])),
            ..Default::default()
        };
        let out = write_tags(vec![0x11; 8], &meta);
        assert_eq!(&out[0..3], b"ID3");
        assert_eq!(&out[out.len() - 128..out.len() - 125], b"TAG");
    }

    #[test]
    fn test_year_field_fits_four_bytes() {
        let meta = TrackMetadata {
            year: "19999".to_string(),
            ..Default::default()
        };
        let trailer = id3v1_trailer(&meta);
        // year occupies bytes 93..97
        assert_eq!(&trailer[93..97], b"1999");
    }
}
