//! Client CLI surface (spec §6).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dht-client", about = "imgdht query client")]
pub struct ClientArgs {
    /// The node to connect to, as `host:port`.
    #[arg(short = 's', long = "server")]
    pub server: String,

    /// The image name to query for.
    #[arg(short = 'q', long = "query")]
    pub name: String,

    /// Where to write the received image bytes. Defaults to the queried
    /// name in the current directory.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Raise the tracing filter to debug level.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
