//! Demo node - two in-process actor systems over the loopback network
//!
//! Usage:
//!   actor-node
//!   actor-node --config config/node.toml --messages 10
//!   actor-node --log-level debug --json-logs

use actors::{
    decode_strong, encode_strong, ActorSystem, LoopbackNetwork, Message, MessageId,
};
use anyhow::{Context, Result};
use clap::Parser;
use runtime_config::{logging, RuntimeConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "actor-node")]
#[command(about = "Exercise actor handles across two loopback nodes")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive; overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Messages sent from alpha to the echo actor on beta
    #[arg(short, long, default_value_t = 3)]
    messages: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= args.json_logs;
    logging::init_logging(&config.logging)?;

    info!("Starting actor node demo");

    let network = LoopbackNetwork::new();
    let alpha = ActorSystem::from_config(&config, None).context("Failed to create node alpha")?;
    let beta = ActorSystem::builder()
        .name("beta")
        .delivery(config.delivery.clone())
        .build();
    network.attach(&alpha);
    network.attach(&beta);

    // echo actor on beta; its mailbox is drained by a tokio task
    let (echo, mut mailbox) = beta.spawn(String::from("echo"));
    let consumer = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(element) = mailbox.recv().await {
            received += 1;
            info!(
                msg_type = element.content.msg_type(),
                bytes = element.content.len(),
                from = ?element.sender.as_ref().map(|s| s.addr()),
                "echo received"
            );
        }
        received
    });

    // hand the handle to alpha the way a remote node would see it
    let wire = encode_strong(Some(&echo));
    let remote = decode_strong(&alpha, &wire)?.context("echo actor did not resolve on alpha")?;
    info!(actor = %remote, proxy = remote.is_proxy(), "alpha resolved echo handle");

    for n in 1..=args.messages {
        let payload = format!("hello #{}", n).into_bytes();
        remote.enqueue(None, MessageId::request(n), Message::new("greeting", payload), None);
    }
    let delivered = network.pump_all();
    info!(frames = delivered, "alpha -> beta delivered");

    // terminate echo: drop every strong handle on beta
    let echo_addr = echo.addr();
    drop(echo);
    remote.enqueue(None, MessageId::ASYNC, Message::signal("late"), None);
    network.pump_all();
    drop(remote);

    match decode_strong(&alpha, &wire)? {
        None => info!(actor = %echo_addr, "echo known terminated on alpha"),
        Some(handle) => warn!(actor = %handle, "echo still resolves on alpha"),
    }

    alpha.shutdown();
    beta.shutdown();
    let received = consumer.await.context("echo consumer panicked")?;

    info!(received, alpha = ?alpha.metrics(), beta = ?beta.metrics(), "Demo complete");
    Ok(())
}
