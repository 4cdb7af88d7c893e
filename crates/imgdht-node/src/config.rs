//! Node CLI surface (spec §6): `clap` derive, the idiomatic choice over
//! hand-rolled flag scanning (ambient stack, SPEC_FULL.md §9).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dht-node", about = "imgdht ring participant")]
pub struct NodeArgs {
    /// A known peer to join through, as `host:port`. Absent means "be the
    /// first node on the ring".
    #[arg(short = 'p', long = "peer")]
    pub peer: Option<String>,

    /// Force a node ID in [0, 255]; otherwise derive it from the bound
    /// address and port.
    #[arg(short = 'I', long = "id")]
    pub id: Option<u8>,

    /// The image folder to serve, containing `FILELIST.txt`.
    #[arg(short = 'i', long = "images", default_value = "images")]
    pub image_folder: PathBuf,

    /// Raise the tracing filter to debug level.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
