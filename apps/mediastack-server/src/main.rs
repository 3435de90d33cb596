//! MediaStack Server - chunked media upload endpoint.
//!
//! Serves the upload protocol over HTTP, storing chunks in a scratch
//! directory and finished files in the local media store.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:4580 mediastack-server
//! mediastack-server --health-check   # probe a running server, exit 0 when healthy
//! mediastack-server --sweep          # remove stale upload sessions and exit
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4580` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `text` or `json` |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `DATA_DIR` | `/var/lib/mediastack` | Parent of the default media directory |
//! | `UPLOAD_BASE_PATH` | `/media/upload` | Mount point of the upload endpoint |
//! | `UPLOAD_MAX_BODY_SIZE` | `134217728` | Largest accepted request body |
//!
//! Upload service variables (`UPLOAD_*`, `MEDIA_*`) are documented on
//! `UploadConfig::from_env`.

mod handler;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use mediastack_core::MediaStackConfig;
use mediastack_upload_core::MediaUploader;
use mediastack_upload_core::config::UploadConfig;
use mediastack_upload_http::service::{UploadHttpConfig, UploadHttpService};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::MediaUploadHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(
    listener: TcpListener,
    service: UploadHttpService<MediaUploadHandler>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if is_healthy_response(&response) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

fn is_healthy_response(response: &str) -> bool {
    response.starts_with("HTTP/1.1 200") && response.contains("\"running\"")
}

/// Remove stale upload sessions once and log the outcome.
async fn run_sweep(uploader: &MediaUploader) -> Result<()> {
    let max_age = uploader.config().stale_session_age();
    let report = uploader
        .sweep_stale_sessions(max_age)
        .await
        .context("failed to sweep upload sessions")?;
    info!(
        max_age_secs = max_age.as_secs(),
        scanned = report.scanned,
        removed = report.removed,
        skipped = report.skipped,
        "sweep finished"
    );
    Ok(())
}

/// The address the health probe should dial for a bind address.
fn probe_addr(listen_addr: &str) -> String {
    listen_addr.replace("0.0.0.0", "127.0.0.1")
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = MediaStackConfig::from_env();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if has_flag("--health-check") {
        let healthy = run_health_check(&probe_addr(&config.gateway_listen))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level, config.json_logs())?;

    let upload_config = UploadConfig::from_env();
    info!(
        scratch_dir = %upload_config.scratch_dir,
        media_dir = %upload_config.media_dir,
        default_context = %upload_config.default_context,
        pin_total_chunks = upload_config.pin_total_chunks,
        verify_declared_size = upload_config.verify_declared_size,
        "initializing upload service",
    );
    let uploader =
        MediaUploader::from_config(upload_config).context("invalid upload configuration")?;

    if has_flag("--sweep") {
        return run_sweep(&uploader).await;
    }

    let http_config = UploadHttpConfig::from_env();
    let base_path = http_config.base_path.clone();
    let service = UploadHttpService::new(MediaUploadHandler(uploader), http_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        base_path = %base_path,
        version = VERSION,
        "starting MediaStack Server",
    );

    serve(listener, service).await
}
