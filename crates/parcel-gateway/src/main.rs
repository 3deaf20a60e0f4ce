mod cli;

use crate::cli::{BlobBackendArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use parcel_core::{BlobStore, SystemClock};
use parcel_gateway::{App, AppState, Backends, GatewaySettings};
use parcel_quota::QuotaSettings;
use parcel_reaper::ReaperSettings;
use parcel_storage::{
    FsBlobStore, MemoryBlobStore, MySqlAccessLog, MySqlContentRepository, MySqlLinkRepository,
    MySqlUsageRepository,
};
use parcel_telemetry::TelemetryConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const DAY_SECS: u64 = 24 * 60 * 60;
const MYSQL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    let _telemetry = parcel_telemetry::init(
        TelemetryConfig::builder()
            .service_name("parcel-gateway")
            .format(config.log_format)
            .otlp_endpoint(config.otlp_endpoint.clone())
            .build(),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        public_base_url = %config.public_base_url,
        storage_backend = %config.storage,
        blob_backend = %config.blob,
        "starting parcel gateway"
    );

    let backends = backends(&config).await?;
    let settings = GatewaySettings::builder()
        .public_base_url(config.public_base_url.clone())
        .quota(
            QuotaSettings::builder()
                .default_storage_bytes(config.default_storage_bytes)
                .default_max_files(config.default_max_files)
                .max_upload_bytes(config.max_upload_bytes)
                .build(),
        )
        .reaper(
            ReaperSettings::builder()
                .interval(Duration::from_secs(config.reap_interval_secs))
                .log_retention(
                    (config.log_retention_days > 0)
                        .then(|| Duration::from_secs(config.log_retention_days * DAY_SECS)),
                )
                .build(),
        )
        .build();
    let state = AppState::new(backends, settings).context("invalid allocator settings")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = state.reaper();
    let reaper_task = tokio::spawn(async move { reaper.run(shutdown_rx).await });

    let router = App::router(state, Duration::from_secs(config.request_timeout_secs));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped, waiting for the reaper");
    let _ = shutdown_tx.send(true);
    if let Err(err) = reaper_task.await {
        warn!(error = %err, "reaper task did not exit cleanly");
    }
    Ok(())
}

async fn backends(config: &CLI) -> anyhow::Result<Backends> {
    let blobs: Arc<dyn BlobStore> = match config.blob {
        BlobBackendArg::Memory => Arc::new(MemoryBlobStore::new()),
        BlobBackendArg::Fs => {
            let dir = config
                .blob_dir
                .clone()
                .context("blob dir is required when blob backend is fs")?;
            Arc::new(FsBlobStore::new(dir).await?)
        }
    };

    let backends = match config.storage {
        StorageBackendArg::InMemory => Backends {
            blobs,
            ..Backends::in_memory()
        },
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let pool = parcel_storage::mysql::connect(
                mysql_dsn,
                config.mysql_max_connections,
                MYSQL_ACQUIRE_TIMEOUT,
            )
            .await?;
            parcel_storage::mysql::migrate(&pool).await?;

            Backends {
                contents: Arc::new(MySqlContentRepository::new(pool.clone())),
                links: Arc::new(MySqlLinkRepository::new(pool.clone())),
                usage: Arc::new(MySqlUsageRepository::new(pool.clone())),
                access_log: Arc::new(MySqlAccessLog::new(pool)),
                blobs,
                clock: Arc::new(SystemClock),
            }
        }
    };
    Ok(backends)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
