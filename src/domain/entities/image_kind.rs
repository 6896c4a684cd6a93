//! Concrete image kinds and the bytes that carry them.

use std::fmt;

use bytes::Bytes;
use chrono::NaiveDate;

/// Image container format determined from content, never from headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Portable Network Graphics.
    Png,
    /// Graphics Interchange Format.
    Gif,
    /// JPEG/JFIF.
    Jpeg,
    /// `WebP` (RIFF container).
    Webp,
}

impl ImageKind {
    /// All kinds, in sniffing priority order.
    pub const ALL: [Self; 4] = [Self::Png, Self::Gif, Self::Jpeg, Self::Webp];

    /// File extension used for cached files.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// MIME type for the kind.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Parses a file extension, case-insensitively.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A classified strip image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicImage {
    /// Date of the strip the bytes belong to.
    pub date: NaiveDate,
    /// Sniffed kind.
    pub kind: ImageKind,
    /// Raw encoded bytes.
    pub bytes: Bytes,
}

impl ComicImage {
    /// Creates a new image.
    #[must_use]
    pub const fn new(date: NaiveDate, kind: ImageKind, bytes: Bytes) -> Self {
        Self { date, kind, bytes }
    }

    /// Size of the encoded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name the image is stored under.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.date.format("%Y-%m-%d"), self.kind.extension())
    }
}

/// Where a resolved image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the on-disk cache.
    Cache,
    /// Downloaded from the remote site.
    Network,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_round_trip() {
        for kind in ImageKind::ALL {
            assert_eq!(ImageKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ImageKind::from_extension("JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("bmp"), None);
    }

    #[test]
    fn test_file_name() {
        let image = ComicImage::new(
            NaiveDate::from_ymd_opt(1978, 6, 19).unwrap(),
            ImageKind::Gif,
            Bytes::from_static(b"GIF89a"),
        );
        assert_eq!(image.file_name(), "1978-06-19.gif");
    }
}
