//! LMS Server Binary
//!
//! Starts the line-protocol server and the video server.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use lms::{Config, LineServer, MemoryStore, Services, VideoServer};
use lms::config::ConfigBuilder;
use tracing_subscriber::{fmt, EnvFilter};

/// LMS Server
#[derive(Parser, Debug)]
#[command(name = "lms-server")]
#[command(about = "Learning-management backend: line protocol plus HTTP video streaming")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Line-protocol listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// HTTP listen address (host:port)
    #[arg(long)]
    http_listen: Option<String>,

    /// Maximum concurrent connections per server
    #[arg(short, long)]
    max_connections: Option<usize>,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lms-server: {}", e);
            process::exit(2);
        }
    };

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("LMS Server v{}", lms::VERSION);
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Line protocol: {}", config.listen_addr);
    tracing::info!("Video HTTP: {}", config.http_listen_addr);

    if config.users.is_empty() {
        tracing::warn!("No [[users]] configured; every login will be rejected");
    }

    let store = Arc::new(MemoryStore::from_seeds(&config.users));
    let services = match Services::new(&config, store) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to prepare data directory: {}", e);
            process::exit(1);
        }
    };

    let mut line_server = LineServer::new(config.clone(), Arc::clone(&services));
    let mut video_server = VideoServer::new(config, &services);

    if let Err(e) = line_server.bind() {
        tracing::error!("Failed to bind line-protocol listener: {}", e);
        process::exit(1);
    }
    if let Err(e) = video_server.bind() {
        tracing::error!("Failed to bind HTTP listener: {}", e);
        process::exit(1);
    }

    // Set up Ctrl+C handler
    let line_shutdown = line_server.shutdown_handle();
    let video_shutdown = video_server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        line_shutdown.shutdown();
        video_shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let video_stop = video_server.shutdown_handle();
    let video_thread = thread::Builder::new()
        .name("http-acceptor".to_string())
        .spawn(move || video_server.run());
    let video_thread = match video_thread {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start video server: {}", e);
            process::exit(1);
        }
    };

    let mut failed = false;
    if let Err(e) = line_server.run() {
        tracing::error!("Line server error: {}", e);
        failed = true;
    }
    video_stop.shutdown();

    match video_thread.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!("Video server error: {}", e);
            failed = true;
        }
        Err(_) => {
            tracing::error!("Video server thread panicked");
            failed = true;
        }
    }

    tracing::info!("Server stopped");
    if failed {
        process::exit(1);
    }
}

/// Defaults, then the config file, then command-line overrides
fn load_config(args: &Args) -> lms::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(dir) = &args.data_dir {
        builder = builder.data_dir(dir);
    }
    if let Some(addr) = &args.listen {
        builder = builder.listen_addr(addr);
    }
    if let Some(addr) = &args.http_listen {
        builder = builder.http_listen_addr(addr);
    }
    if let Some(count) = args.max_connections {
        builder = builder.max_connections(count);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}
