//! Image transport (spec §4.3.10): a 9-byte metadata packet followed by
//! `width * height * depth` raw bytes, sent in several segments with a
//! small inter-segment delay to exercise slow-transfer paths.

use crate::error::Result;
use imgdht_ring::blobstore::ImageMeta;
use imgdht_wire::image_meta;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Segments per transfer; each segment is `max(total/SEGMENTS, MSS)` bytes.
const SEGMENTS: usize = 4;
const MSS: usize = 536;
const INTER_SEGMENT_DELAY: Duration = Duration::from_millis(1);

/// Send a "not found" metadata packet (depth 0) with no trailing bytes.
pub async fn send_not_found(stream: &mut TcpStream) -> Result<()> {
    stream.write_all(&image_meta::to_bytes(&ImageMeta::not_found())).await?;
    stream.flush().await?;
    Ok(())
}

/// Send metadata followed by `bytes`, split into segments.
pub async fn send_image(stream: &mut TcpStream, meta: &ImageMeta, bytes: &[u8]) -> Result<()> {
    stream.write_all(&image_meta::to_bytes(meta)).await?;

    let segment_len = (bytes.len() / SEGMENTS).max(MSS).max(1);
    for chunk in bytes.chunks(segment_len) {
        stream.write_all(chunk).await?;
        stream.flush().await?;
        tokio::time::sleep(INTER_SEGMENT_DELAY).await;
    }
    Ok(())
}

/// Receive metadata, then (if `depth > 0`) exactly `width * height * depth`
/// bytes, reassembling from however many reads it takes. The node itself
/// only ever sends images (the client does the receiving); this exists to
/// test the segmented send path against a real reader.
#[allow(dead_code)]
pub async fn recv_image(stream: &mut TcpStream) -> Result<(ImageMeta, Vec<u8>)> {
    let mut meta_buf = [0u8; image_meta::LEN];
    stream.read_exact(&mut meta_buf).await?;
    let meta = image_meta::from_bytes(&meta_buf)?;

    if meta.depth == 0 {
        return Ok((meta, Vec::new()));
    }

    let total = meta.width as usize * meta.height as usize * meta.depth as usize;
    let mut bytes = vec![0u8; total];
    stream.read_exact(&mut bytes).await?;
    Ok((meta, bytes))
}
