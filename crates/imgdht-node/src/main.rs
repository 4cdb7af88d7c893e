//! `dht-node`: a ring participant (spec §6).

use anyhow::Context;
use clap::Parser;
use imgdht_node::engine::spawn_stdin_forwarder;
use imgdht_node::{Engine, NodeArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();
    init_tracing(args.verbose);

    let mut engine = Engine::bootstrap(args)
        .await
        .context("node bootstrap failed")?;
    let control = spawn_stdin_forwarder();
    engine.run(control).await.context("node event loop failed")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "imgdht=debug" } else { "imgdht=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
