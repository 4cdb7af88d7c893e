//! Reading and writing [`Payload`]s over a `TcpStream` (spec §4.3.2: "reads
//! exactly one full DHTMSG header synchronously").

use crate::error::{NodeError, Result};
use crate::payload::Payload;
use imgdht_wire::dhtmsg::{self, DhtMsg};
use imgdht_wire::dhtsrch::{self, DhtSrch};
use imgdht_wire::types::{MessageKind, TypeFlags};
use imgdht_wire::WireError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A wrong version byte is a protocol violation (spec §7), not an ordinary
/// decode error; every other `WireError` stays a transient/decode failure.
fn classify_wire_error(err: WireError) -> NodeError {
    match err {
        WireError::BadVersion { got, expected } => NodeError::ProtocolViolation(format!(
            "wrong version byte: got {got}, expected {expected}"
        )),
        other => NodeError::Wire(other),
    }
}

/// Read exactly one message, blocking until the header and the rest of the
/// fixed-size body arrive.
pub async fn read_message(stream: &mut TcpStream) -> Result<Payload> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    parse_from_header(stream, header).await
}

/// Read at most one message, treating a connection closed before any byte
/// arrives as "no reply" (spec §4.3.4: "if nothing arrives, the forward
/// succeeded").
pub async fn try_read_reply(stream: &mut TcpStream) -> Result<Option<Payload>> {
    let mut header = [0u8; 4];
    let mut filled = 0usize;
    while filled < header.len() {
        let n = stream.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(NodeError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed mid-header",
            )));
        }
        filled += n;
    }
    Ok(Some(parse_from_header(stream, header).await?))
}

async fn parse_from_header(stream: &mut TcpStream, header: [u8; 4]) -> Result<Payload> {
    let flags = TypeFlags::from_bits_retain(header[1]);
    let kind = MessageKind::classify(flags).ok_or(NodeError::UnknownMessageType(header[1]))?;

    match kind {
        MessageKind::Join | MessageKind::Wlcm | MessageKind::Reid | MessageKind::Redrt => {
            let mut buf = [0u8; dhtmsg::LEN];
            buf[..4].copy_from_slice(&header);
            stream.read_exact(&mut buf[4..]).await?;
            Ok(Payload::Msg(
                DhtMsg::from_bytes(&buf).map_err(classify_wire_error)?,
            ))
        }
        MessageKind::Find | MessageKind::Query | MessageKind::Reply | MessageKind::Miss => {
            let mut buf = vec![0u8; dhtsrch::LEN];
            buf[..4].copy_from_slice(&header);
            stream.read_exact(&mut buf[4..]).await?;
            Ok(Payload::Srch(
                DhtSrch::from_bytes(&buf).map_err(classify_wire_error)?,
            ))
        }
    }
}

/// Write a message and flush.
pub async fn write_message(stream: &mut TcpStream, payload: &Payload) -> Result<()> {
    stream.write_all(&payload.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
