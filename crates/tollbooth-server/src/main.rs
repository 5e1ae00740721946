use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tollbooth_core::app::{AppBuilder, GcLoop};
use tollbooth_core::tools::ToolCatalog;
use tollbooth_server::config::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG が無ければ info
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    // (A) カタログ（指定がなければ組み込み）
    let catalog = match &args.tools {
        Some(path) => ToolCatalog::load(path)
            .await
            .with_context(|| format!("loading tool manifest {}", path.display()))?,
        None => ToolCatalog::builtin().context("parsing built-in tool manifest")?,
    };
    tracing::info!(tools = catalog.len(), "tool catalog loaded");

    // (B) RunService（Handler が足りなければここで落ちる）
    let service = AppBuilder::new()
        .with_catalog(catalog)
        .with_builtin_handlers()
        .with_fs_storage(&args.data_dir)
        .with_config(args.service_config())
        .require_handlers_for_all_tools()
        .build()
        .context("building run service")?;
    let service = Arc::new(service);

    // (C) GC
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gc = tokio::spawn(GcLoop::new(service.clone(), args.gc_config()).run(shutdown_rx));

    // (D) HTTP
    let app = tollbooth_server::router(service);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    tracing::info!(
        listen = %args.listen,
        data_dir = %args.data_dir.display(),
        "tollbooth listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = gc.await {
        tracing::warn!(error = %e, "gc loop ended abnormally");
    }
    tracing::info!("tollbooth shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
