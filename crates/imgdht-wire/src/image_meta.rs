//! The 9-byte image metadata packet sent ahead of raw pixel bytes in a
//! REPLY (spec §6): `{vers:1, depth:1, width:2, height:2, format:2,
//! sentinel:1}`.

use crate::types::PROTOCOL_VERSION;
use crate::{Result, WireError};
use imgdht_ring::blobstore::{ImageMeta, PixelFormat};

/// Wire size of the image metadata packet.
pub const LEN: usize = 9;

const FORMAT_LUMINANCE: u16 = 1;
const FORMAT_LUMINANCE_ALPHA: u16 = 2;
const FORMAT_RGB: u16 = 3;
const FORMAT_RGBA: u16 = 4;

fn format_to_wire(format: PixelFormat) -> u16 {
    match format {
        PixelFormat::Luminance => FORMAT_LUMINANCE,
        PixelFormat::LuminanceAlpha => FORMAT_LUMINANCE_ALPHA,
        PixelFormat::Rgb => FORMAT_RGB,
        PixelFormat::Rgba => FORMAT_RGBA,
    }
}

fn format_from_wire(code: u16) -> PixelFormat {
    match code {
        FORMAT_LUMINANCE => PixelFormat::Luminance,
        FORMAT_LUMINANCE_ALPHA => PixelFormat::LuminanceAlpha,
        FORMAT_RGBA => PixelFormat::Rgba,
        _ => PixelFormat::Rgb,
    }
}

/// Encode image metadata for the wire. `depth == 0` marks "not found"
/// (spec §4.3.10) and is encoded as-is; the receiver checks `depth` before
/// trusting width/height/format.
pub fn to_bytes(meta: &ImageMeta) -> [u8; LEN] {
    let mut buf = [0u8; LEN];
    buf[0] = PROTOCOL_VERSION;
    buf[1] = meta.depth;
    buf[2..4].copy_from_slice(&meta.width.to_be_bytes());
    buf[4..6].copy_from_slice(&meta.height.to_be_bytes());
    buf[6..8].copy_from_slice(&format_to_wire(meta.format).to_be_bytes());
    buf[8] = 0; // rsvd
    buf
}

pub fn from_bytes(buf: &[u8]) -> Result<ImageMeta> {
    if buf.len() < LEN {
        return Err(WireError::ShortRead {
            need: LEN,
            got: buf.len(),
        });
    }
    let version = buf[0];
    if version != PROTOCOL_VERSION {
        return Err(WireError::BadVersion {
            got: version,
            expected: PROTOCOL_VERSION,
        });
    }
    let depth = buf[1];
    let width = u16::from_be_bytes([buf[2], buf[3]]);
    let height = u16::from_be_bytes([buf[4], buf[5]]);
    let format = format_from_wire(u16::from_be_bytes([buf[6], buf[7]]));
    Ok(ImageMeta {
        width,
        height,
        depth,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_fields() {
        let meta = ImageMeta {
            width: 640,
            height: 480,
            depth: 3,
            format: PixelFormat::Rgb,
        };
        let bytes = to_bytes(&meta);
        assert_eq!(bytes.len(), LEN);
        let back = from_bytes(&bytes).expect("decode");
        assert_eq!(back, meta);
    }

    #[test]
    fn not_found_sentinel_roundtrips() {
        let meta = ImageMeta::not_found();
        let back = from_bytes(&to_bytes(&meta)).expect("decode");
        assert_eq!(back.depth, 0);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(matches!(
            from_bytes(&[0u8; 3]),
            Err(WireError::ShortRead { .. })
        ));
    }
}
