// node-api/src/main.rs

//! Voting node binary.
//!
//! This binary exposes the `ledger` crate over a small JSON HTTP API:
//! ballot key management, election creation, vote admission, mining,
//! peer gossip ingestion, longest-chain conflict resolution, and the
//! reporting endpoints. One process hosts any number of elections; each
//! ledger sits behind its own mutex and all peer fan-out happens after
//! that lock is released.

mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tokio::signal;
use tokio::sync::{Mutex, RwLock};

use config::ApiConfig;
use ledger::{Ballot, ElectionRegistry, PeerClient, SnapshotConfig};
use state::{AppState, SharedState};

/// Command-line options for the voting node.
#[derive(Debug, Parser)]
#[command(name = "node-api", about = "Permissioned voting-ledger node")]
struct Cli {
    /// Port to bind the HTTP server on.
    #[arg(short, long, default_value_t = 8900)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "node_api=info,ledger=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let api_cfg = ApiConfig::for_port(cli.port);
    let snapshots = SnapshotConfig::default();

    // ---------------------------
    // Node ballot (miner keypair)
    // ---------------------------

    // The port doubles as the node id, so several nodes can share a
    // working directory without clobbering each other's files.
    let mut ballot = Ballot::new(cli.port, snapshots.dir.clone());
    if ballot.load_keys().is_ok() {
        tracing::info!("loaded node ballot from disk");
    } else {
        tracing::info!("no node ballot on disk yet; create one via POST /ballot");
    }

    // ---------------------------
    // Registry + gossip client
    // ---------------------------

    let registry = ElectionRegistry::new(cli.port, snapshots);
    let peers = PeerClient::new(Duration::from_secs(3))
        .map_err(|e| format!("failed to build peer client: {e}"))?;

    let app_state: SharedState = Arc::new(AppState {
        registry: RwLock::new(registry),
        ballot: Mutex::new(ballot),
        peers,
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/", get(routes::status::server_status))
        .route("/generateKeys", post(routes::ballot::generate_keys))
        .route(
            "/ballot",
            post(routes::ballot::create_keys).get(routes::ballot::load_keys),
        )
        .route("/create-election", post(routes::elections::create_election))
        .route("/election", get(routes::elections::election_exists))
        .route("/vote", post(routes::votes::add_vote))
        .route("/broadcast-vote", post(routes::votes::broadcast_vote))
        .route("/votes", post(routes::votes::unverified_votes))
        .route("/vote-eligibility", post(routes::votes::vote_eligibility))
        .route("/mine", post(routes::chain::mine))
        .route("/broadcast-block", post(routes::chain::broadcast_block))
        .route(
            "/resolve-conflicts",
            post(routes::chain::resolve_conflicts),
        )
        .route("/chain", get(routes::chain::get_chain))
        .route("/balance", post(routes::stats::balance))
        .route("/totalmines", post(routes::stats::totalmines))
        .route("/results", post(routes::stats::results))
        .route("/results-voters", post(routes::stats::results_voters))
        .route(
            "/node",
            post(routes::nodes::add_node).delete(routes::nodes::remove_node),
        )
        .route("/nodes", get(routes::nodes::list_nodes))
        .with_state(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 style)
    // ---------------------------

    tracing::info!("voting node listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
