//! fclab-ce - Annotation Consensus & Reliability Engine
//!
//! `serve` runs the HTTP adapter, `ingest` registers a folder of images and
//! `reset` empties the pool.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fclab_common::config::{resolve_root_folder, RootFolder, ROOT_FOLDER_ENV};
use fclab_common::db::init_database;
use fclab_common::EngineParams;
use fclab_ce::services::{ingest_folder, reset_pool, FsBlobStore, NoopPredictor};
use fclab_ce::{build_router, AppState};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fclab-ce
#[derive(Parser, Debug)]
#[command(name = "fclab-ce")]
#[command(about = "Crowd fish-labeling consensus engine")]
#[command(version)]
struct Args {
    /// Root folder holding the database and image blobs
    #[arg(short, long, global = true)]
    root_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5780", env = "FCLAB_PORT")]
        port: u16,
    },
    /// Register every image in a folder
    Ingest {
        /// Folder containing .jpg/.jpeg/.png files
        folder: PathBuf,
    },
    /// Delete every image, annotation, vote and annotator, plus all blobs
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fclab_ce=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting fclab-ce v{}", env!("CARGO_PKG_VERSION"));

    let root = RootFolder::new(resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
    ));
    root.ensure_directories()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", root.path().display());

    let pool = init_database(&root.database_path())
        .await
        .context("Failed to initialize database")?;
    let blobs = Arc::new(FsBlobStore::new(root.blob_path()));

    match args.command {
        Command::Serve { port } => serve(pool, blobs, port).await,
        Command::Ingest { folder } => {
            let summary = ingest_folder(&pool, blobs.as_ref(), &folder)
                .await
                .with_context(|| format!("Failed to ingest {}", folder.display()))?;
            println!(
                "Ingested {} images ({} calibration), skipped {}",
                summary.ingested, summary.calibration, summary.skipped
            );
            Ok(())
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset {} without --yes", root.path().display());
            }
            let summary = reset_pool(&pool, blobs.as_ref())
                .await
                .context("Failed to reset pool")?;
            println!(
                "Removed {} images, {} annotations, {} votes, {} annotators, {} blobs",
                summary.images,
                summary.annotations,
                summary.votes,
                summary.annotators,
                summary.blobs
            );
            Ok(())
        }
    }
}

async fn serve(pool: SqlitePool, blobs: Arc<FsBlobStore>, port: u16) -> Result<()> {
    let params = EngineParams::load(&pool)
        .await
        .context("Failed to load engine parameters")?;

    let state = AppState::new(pool, params, blobs, Arc::new(NoopPredictor));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
