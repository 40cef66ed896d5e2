use std::sync::Arc;

use anyhow::{Context, Result};
use pdfpress::{app, compress::Ghostscript, config::Config, serve};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    pdfpress::tracing::init_tracing(pdfpress::tracing::parse_level(&config.log_level));

    app::prepare_dirs(&config).await?;

    let engine = Ghostscript::new(config.engine_program.clone(), config.engine_timeout());
    info!(
        program = %engine.program().display(),
        timeout_secs = config.engine_timeout_secs,
        "compression engine configured"
    );

    let shutdown = CancellationToken::new();
    let router = app::build_router(&config, Arc::new(engine), shutdown.clone())?;

    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown requested");
                    shutdown.cancel();
                }
                Err(err) => warn!(error = %err, "failed to listen for ctrl-c"),
            }
        }
    });

    serve(listener, router, shutdown).await?;
    info!("server stopped");
    Ok(())
}
