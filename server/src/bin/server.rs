use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use camino::Utf8PathBuf as PathBuf;
use clap::Parser;
use ddam::{
    app,
    app_state::{AppState, SharedState},
};
use eyre::{self, Context, Result};
use tokio::signal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "1");
    }
    color_eyre::install()?;
    if std::env::var("DDAM_LOG").is_err() {
        std::env::set_var("DDAM_LOG", "info,ddam=debug,ddam_core=debug")
    }
    tracing_subscriber::registry()
        .with(EnvFilter::from_env("DDAM_LOG"))
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = PathBuf::from(args.config);
    let config = ddam_core::config::read_config(&config_path).await?;

    let addr: IpAddr = config
        .server
        .address
        .parse()
        .wrap_err("error parsing listening address")?;
    let port = config.server.port;

    info!("Starting up...");
    std::fs::create_dir_all(&config.media.root)
        .wrap_err_with(|| format!("could not create media root {}", config.media.root))?;
    std::fs::create_dir_all(&config.rendition.root)
        .wrap_err_with(|| format!("could not create rendition root {}", config.rendition.root))?;
    info!(
        media_root = %config.media.root,
        rendition_root = %config.rendition.root,
        max_file_size = config.upload.max_file_size,
        "media directories ready"
    );

    let shared_state: SharedState = Arc::new(AppState::new(config));
    let app = app(shared_state);
    let listener = tokio::net::TcpListener::bind(SocketAddr::new(addr, port))
        .await
        .wrap_err("Error binding socket")?;
    info!("Listening on {}", SocketAddr::new(addr, port));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Unable to listen for shutdown signal: {}", err);
            // we also shut down in case of error
            std::process::exit(1);
        }
    }
}
