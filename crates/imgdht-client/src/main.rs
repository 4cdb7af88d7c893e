//! `dht-client`: connect, send one FIND, render the result (spec §6).

mod config;
mod display;

use anyhow::Context;
use clap::Parser;
use config::ClientArgs;
use display::{default_output_path, DisplaySink, FileDisplaySink};
use imgdht_ring::fingers::NodeDescriptor;
use imgdht_wire::dhtmsg::DhtMsg;
use imgdht_wire::dhtsrch::DhtSrch;
use imgdht_wire::image_meta;
use imgdht_wire::types::TypeFlags;
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const FIND_TTL: u16 = 1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = ClientArgs::parse();
    init_tracing(args.verbose);

    let mut stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("connecting to {}", args.server))?;

    // The client has no ring identity; a zeroed descriptor fills the wire
    // slot the protocol always carries.
    let anon = NodeDescriptor {
        id: imgdht_ring::id::Id(0),
        addr: Ipv4Addr::UNSPECIFIED,
        port: 0,
    };
    let header = DhtMsg::new(TypeFlags::FIND, FIND_TTL, anon);
    let find = DhtSrch::new(header, 0, args.name.clone())?;
    stream.write_all(&find.to_bytes()).await?;
    stream.flush().await?;

    let mut meta_buf = [0u8; image_meta::LEN];
    stream.read_exact(&mut meta_buf).await?;
    let meta = image_meta::from_bytes(&meta_buf)?;

    let sink = FileDisplaySink::new(default_output_path(args.output, &args.name));
    if meta.depth == 0 {
        sink.not_found(&args.name);
        return Ok(());
    }

    let total = meta.width as usize * meta.height as usize * meta.depth as usize;
    let mut bytes = vec![0u8; total];
    stream.read_exact(&mut bytes).await?;
    sink.show(&args.name, &meta, &bytes)?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "imgdht=debug" } else { "imgdht=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
