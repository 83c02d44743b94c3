//! Linus: nine-grid insight integration server.

use std::path::PathBuf;
use std::sync::Arc;

use linus_classify::KeywordClassifier;
use linus_core::{GridState, LinusConfig};
use linus_server::{AppState, build_router};
use linus_store::PersistentStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = LinusConfig::from_env();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "classify" => {
                if args.len() < 3 {
                    eprintln!("Usage: linus classify <text>");
                    std::process::exit(1);
                }
                let text = args[2..].join(" ");
                let assignments = KeywordClassifier::new().classify(&text);
                println!("{}", serde_json::to_string_pretty(&assignments)?);
                return Ok(());
            }
            "export" => {
                let path = args
                    .get(2)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| config.state_path.clone());
                let store = PersistentStore::open(&path, config.save_debounce);
                let mut state = GridState::new();
                store.hydrate(&mut state);
                println!("{}", serde_json::to_string_pretty(&store.snapshot(&state))?);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("Linus: nine-grid insight integration server");
                println!();
                println!("Usage: linus [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  classify <text>          Print keyword classification for text");
                println!("  export [state-path]      Print the persisted state document");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'linus help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let state = Arc::new(AppState::new(config));
    info!("State file: {}", state.config.state_path.display());
    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Linus server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, flushing pending state");
    state.service.shutdown()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
