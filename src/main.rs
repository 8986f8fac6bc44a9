use anyhow::Context;
use clap::Parser;
use log::{error, info};
use trickle::{
    cli::Cli,
    http::HttpServer,
    logging,
    random::SeedSource,
    shutdown::{self, Shutdown},
};

const LOG_TARGET: &str = "trickle::main";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_config.as_deref()).context("failed to initialise logging")?;

    let config = cli.config()?;
    let listen_addr = config.listen_addr;
    let shutdown_timeout = config.shutdown_timeout;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(shutdown.to_signal(), config, SeedSource::from_clock());
    let listener = server
        .bind()
        .await
        .with_context(|| format!("failed to listen on {listen_addr}"))?;

    let mut serving = tokio::spawn(async move { server.serve(listener).await });
    info!(target: LOG_TARGET, "Server is ready to handle requests at {}", listen_addr);

    tokio::select! {
        res = &mut serving => {
            res.context("server task panicked")?.context("server stopped unexpectedly")?;
            return Ok(());
        },
        res = shutdown::interrupt() => {
            res.context("failed to listen for interrupt")?;
        },
    }

    info!(target: LOG_TARGET, "Interrupt received, waiting up to {:?} for in-flight requests", shutdown_timeout);
    shutdown.trigger();
    match tokio::time::timeout(shutdown_timeout, serving).await {
        Ok(Ok(Ok(()))) => info!(target: LOG_TARGET, "Server shut down"),
        Ok(Ok(Err(e))) => error!(target: LOG_TARGET, "Server error during shutdown: {}", e),
        Ok(Err(e)) => error!(target: LOG_TARGET, "Server task failed during shutdown: {}", e),
        Err(_) => error!(target: LOG_TARGET, "Failed to gracefully shutdown HTTP server within {:?}", shutdown_timeout),
    }
    Ok(())
}
