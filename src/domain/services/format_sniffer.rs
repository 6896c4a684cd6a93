//! Content-based image format detection.

use std::io::Cursor;

use crate::domain::entities::ImageKind;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const RIFF_SIGNATURE: &[u8] = b"RIFF";
const WEBP_FOURCC: &[u8] = b"WEBP";

/// Classifies image bytes by their magic numbers.
///
/// Server content-type headers and URL extensions are never consulted;
/// a GIF served as `image/jpeg` is still a GIF.
pub struct FormatSniffer;

impl FormatSniffer {
    /// Returns the kind whose signature prefixes `bytes`, checked in
    /// PNG, GIF, JPEG, WEBP order. `None` means unknown.
    #[must_use]
    pub fn classify(bytes: &[u8]) -> Option<ImageKind> {
        if bytes.starts_with(PNG_SIGNATURE) {
            return Some(ImageKind::Png);
        }
        if bytes.starts_with(GIF87_SIGNATURE) || bytes.starts_with(GIF89_SIGNATURE) {
            return Some(ImageKind::Gif);
        }
        if bytes.starts_with(JPEG_SIGNATURE) {
            return Some(ImageKind::Jpeg);
        }
        if bytes.len() >= 12 && bytes.starts_with(RIFF_SIGNATURE) && &bytes[8..12] == WEBP_FOURCC {
            return Some(ImageKind::Webp);
        }
        None
    }

    /// Reads pixel dimensions from the image header, if decodable.
    #[must_use]
    pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13], Some(ImageKind::Png) ; "png")]
    #[test_case(b"GIF89a\x01\x00\x01\x00", Some(ImageKind::Gif) ; "gif89a")]
    #[test_case(b"GIF87a\x01\x00\x01\x00", Some(ImageKind::Gif) ; "gif87a")]
    #[test_case(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'], Some(ImageKind::Jpeg) ; "jpeg")]
    #[test_case(b"RIFF\x24\x00\x00\x00WEBPVP8 ", Some(ImageKind::Webp) ; "webp")]
    #[test_case(b"", None ; "empty")]
    #[test_case(&[0x89, b'P', b'N', b'G'], None ; "truncated png")]
    #[test_case(b"GIF8", None ; "truncated gif")]
    #[test_case(&[0xFF, 0xD8], None ; "truncated jpeg")]
    #[test_case(b"RIFF\x24\x00\x00\x00WAVE", None ; "riff but not webp")]
    #[test_case(b"RIFF\x24\x00\x00\x00WEB", None ; "truncated webp")]
    #[test_case(b"<!DOCTYPE html><html>", None ; "html error page")]
    fn test_classify(bytes: &[u8], expected: Option<ImageKind>) {
        assert_eq!(FormatSniffer::classify(bytes), expected);
    }

    #[test]
    fn test_gif_is_not_mistaken_for_jpeg() {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xD8, 0xFF]);
        assert_eq!(FormatSniffer::classify(&bytes), Some(ImageKind::Gif));
    }

    #[test]
    fn test_probe_dimensions_of_encoded_png() {
        let img = image::DynamicImage::new_rgb8(12, 7);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        let bytes = buf.into_inner();

        assert_eq!(FormatSniffer::classify(&bytes), Some(ImageKind::Png));
        assert_eq!(FormatSniffer::probe_dimensions(&bytes), Some((12, 7)));
    }

    #[test]
    fn test_probe_dimensions_of_garbage() {
        assert_eq!(FormatSniffer::probe_dimensions(b"not an image"), None);
    }
}
