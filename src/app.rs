//! Assembles the service from its configuration.
//!
//! The binary and the integration tests build the same [`Router`] through
//! [`build_router`], differing only in the engine they hand in.

use std::sync::Arc;

use anyhow::{Context, Result};
use http::{Method, header::CONTENT_TYPE};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    api::{self, App, RESULT_HEADERS},
    artifact::UuidIds,
    compress::{CompressionEngine, Controller},
    config::Config,
    extractors::multipart::{FORM_OVERHEAD, UploadSettings},
    middleware::body_limit,
    plugins::cors::CorsBuilder,
    router::Router,
};

/// Creates the upload and output directories if they are missing.
pub async fn prepare_dirs(config: &Config) -> Result<()> {
    for dir in [&config.upload_dir, &config.output_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(())
}

pub fn build_router(
    config: &Config,
    engine: Arc<dyn CompressionEngine>,
    shutdown: CancellationToken,
) -> Result<Router> {
    let ladder = config.ladder()?;
    info!(
        profiles = ladder.len(),
        aggressive_max_kb = config.aggressive_max_kb,
        mid_max_kb = config.mid_max_kb,
        "profile ladder ready"
    );

    let controller = Controller::new(
        ladder,
        engine,
        config.output_dir.clone(),
        Arc::new(UuidIds),
    );

    let mut router = Router::new();
    router
        .state(App {
            controller: Arc::new(controller),
            shutdown,
        })
        .state(UploadSettings::new(
            config.upload_dir.clone(),
            config.max_upload_bytes,
        ));

    router.route(Method::GET, "/", api::index);
    router
        .route(Method::POST, "/compress", api::compress)
        .middleware(
            body_limit::Config::new(config.max_upload_bytes)
                .slack(FORM_OVERHEAD)
                .into_middleware(),
        );

    let origins = config
        .cors_origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_owned);

    router.plugin(
        CorsBuilder::new()
            .allow_origins(origins)
            .allow_methods(&[Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(&[CONTENT_TYPE])
            .expose_headers(&RESULT_HEADERS)
            .build(),
    )?;

    Ok(router)
}
