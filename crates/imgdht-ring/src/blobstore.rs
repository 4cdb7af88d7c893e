//! The out-of-scope image storage boundary (spec §1: "image file decoding
//! and pixel transport ... specified by their interface to the core").
//!
//! [`BlobStore`] is the trait the local object index calls into for
//! `fetch_bytes`. [`FsBlobStore`] is the bundled implementation: it reads
//! the 18-byte TGA header directly (grounded on `imgdb.cpp`'s
//! `marshall_imsg`, which reads `GetPixelDepth`/`GetImageWidth`/
//! `GetImageHeight`/`GetAlphaDepth`/`GetImageType` off an already-decoded
//! `LTGA`) rather than decoding pixels, since full TGA decoding is
//! explicitly out of scope.

use crate::{RingError, Result};
use std::path::PathBuf;

/// Pixel format, derived from TGA image type + alpha depth (spec §4.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
}

/// Image metadata returned alongside the raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageMeta {
    pub width: u16,
    pub height: u16,
    /// Bytes per pixel (0 means "not found", spec §4.3.10).
    pub depth: u8,
    pub format: PixelFormat,
}

impl ImageMeta {
    /// A "not found" sentinel: depth 0 (spec §4.3.10).
    pub fn not_found() -> Self {
        ImageMeta {
            width: 0,
            height: 0,
            depth: 0,
            format: PixelFormat::Rgb,
        }
    }
}

/// The external blob-store interface the local index calls into.
pub trait BlobStore: Send + Sync {
    /// Resolve `name` to its metadata and raw pixel bytes.
    fn metadata_and_bytes(&self, name: &str) -> Result<(ImageMeta, Vec<u8>)>;
}

/// A TGA header is exactly 18 bytes; fields used here start at these offsets.
const TGA_HEADER_LEN: usize = 18;
const OFF_IMAGE_TYPE: usize = 2;
const OFF_WIDTH: usize = 12;
const OFF_HEIGHT: usize = 14;
const OFF_PIXEL_DEPTH: usize = 16;
const OFF_IMAGE_DESCRIPTOR: usize = 17;

/// TGA image-type codes that indicate greyscale data (uncompressed and
/// RLE-compressed), mirroring `imgdb.cpp`'s `greyscale == 3 || greyscale == 11`.
const TGA_TYPE_GREYSCALE: u8 = 3;
const TGA_TYPE_GREYSCALE_RLE: u8 = 11;

/// Filesystem-backed [`BlobStore`]: `folder/name` on disk.
pub struct FsBlobStore {
    folder: PathBuf,
}

impl FsBlobStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }
}

impl BlobStore for FsBlobStore {
    fn metadata_and_bytes(&self, name: &str) -> Result<(ImageMeta, Vec<u8>)> {
        let path = self.path_for(name);
        let raw = std::fs::read(&path).map_err(|source| RingError::ImageOpen {
            name: name.to_string(),
            source,
        })?;

        if raw.len() < TGA_HEADER_LEN {
            return Err(RingError::ImageTruncated {
                name: name.to_string(),
            });
        }

        let width = u16::from_le_bytes([raw[OFF_WIDTH], raw[OFF_WIDTH + 1]]);
        let height = u16::from_le_bytes([raw[OFF_HEIGHT], raw[OFF_HEIGHT + 1]]);
        let pixel_bits = raw[OFF_PIXEL_DEPTH];
        let depth = pixel_bits / 8;
        let alpha_bits = raw[OFF_IMAGE_DESCRIPTOR] & 0x0F;
        let image_type = raw[OFF_IMAGE_TYPE];

        let greyscale = image_type == TGA_TYPE_GREYSCALE || image_type == TGA_TYPE_GREYSCALE_RLE;
        let format = match (greyscale, alpha_bits > 0) {
            (true, true) => PixelFormat::LuminanceAlpha,
            (true, false) => PixelFormat::Luminance,
            (false, true) => PixelFormat::Rgba,
            (false, false) => PixelFormat::Rgb,
        };

        let meta = ImageMeta {
            width,
            height,
            depth,
            format,
        };

        let pixels = raw[TGA_HEADER_LEN..].to_vec();
        Ok((meta, pixels))
    }
}

/// Helper used only by tests: write a minimal valid TGA file.
#[cfg(test)]
pub fn write_test_tga(
    path: &std::path::Path,
    width: u16,
    height: u16,
    depth_bytes: u8,
    greyscale: bool,
) {
    let mut header = [0u8; TGA_HEADER_LEN];
    header[OFF_IMAGE_TYPE] = if greyscale { TGA_TYPE_GREYSCALE } else { 2 };
    header[OFF_WIDTH..OFF_WIDTH + 2].copy_from_slice(&width.to_le_bytes());
    header[OFF_HEIGHT..OFF_HEIGHT + 2].copy_from_slice(&height.to_le_bytes());
    header[OFF_PIXEL_DEPTH] = depth_bytes * 8;
    header[OFF_IMAGE_DESCRIPTOR] = 0;

    let pixel_count = width as usize * height as usize * depth_bytes as usize;
    let mut data = header.to_vec();
    data.extend(std::iter::repeat_n(0xABu8, pixel_count));
    std::fs::write(path, data).expect("write test tga");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_shim::TempDir;

    #[test]
    fn reads_rgb_header() {
        let dir = TempDir::new();
        write_test_tga(&dir.path().join("a.tga"), 4, 2, 3, false);
        let store = FsBlobStore::new(dir.path());
        let (meta, bytes) = store.metadata_and_bytes("a.tga").expect("read");
        assert_eq!(meta.width, 4);
        assert_eq!(meta.height, 2);
        assert_eq!(meta.depth, 3);
        assert_eq!(meta.format, PixelFormat::Rgb);
        assert_eq!(bytes.len(), 4 * 2 * 3);
    }

    #[test]
    fn reads_greyscale_header() {
        let dir = TempDir::new();
        write_test_tga(&dir.path().join("g.tga"), 1, 1, 1, true);
        let store = FsBlobStore::new(dir.path());
        let (meta, _) = store.metadata_and_bytes("g.tga").expect("read");
        assert_eq!(meta.format, PixelFormat::Luminance);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new();
        let store = FsBlobStore::new(dir.path());
        assert!(store.metadata_and_bytes("nope.tga").is_err());
    }

    #[test]
    fn truncated_file_is_an_error() {
        let dir = TempDir::new();
        std::fs::write(dir.path().join("short.tga"), [0u8; 4]).expect("write");
        let store = FsBlobStore::new(dir.path());
        assert!(matches!(
            store.metadata_and_bytes("short.tga"),
            Err(RingError::ImageTruncated { .. })
        ));
    }

    /// A tiny self-contained tempdir so this crate does not need a `tempfile`
    /// dev-dependency just for three tests.
    mod tempfile_shim {
        use std::path::{Path, PathBuf};
        use std::sync::atomic::{AtomicU64, Ordering};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new() -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                let pid = std::process::id();
                let path =
                    std::env::temp_dir().join(format!("imgdht-ring-test-{pid}-{n}"));
                std::fs::create_dir_all(&path).expect("create tempdir");
                TempDir(path)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }
}
