use std::path::PathBuf;

use clap::Parser;

use sortbin_server::ServerConfig;
use sortbin_store::Database;

#[derive(Debug, Parser)]
#[command(name = "sortbin", about = "Waste-sorting assistant backend")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// SQLite database path. Defaults to ~/.sortbin/sortbin.db.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Outbound frames queued per device before writes fail.
    #[arg(long, default_value_t = 256)]
    max_send_queue: usize,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting sortbin server");

    let db_path = cli
        .db_path
        .unwrap_or_else(|| dirs_home().join(".sortbin").join("sortbin.db"));
    let db = Database::open(&db_path).expect("failed to open database");

    let config = ServerConfig {
        port: cli.port,
        max_send_queue: cli.max_send_queue,
    };
    let handle = sortbin_server::start(config, db)
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "sortbin server ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!(
        online_dustbins = handle.registry.online_count(),
        "shutting down"
    );
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
