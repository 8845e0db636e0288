mod constants;
mod error;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::Parser;
use ledger_core::{constants::DEFAULT_DIFFICULTY, HashAlgorithm, Ledger, LedgerConfig};
use tracing::{info, Level};

use crate::{
    constants::{DEFAULT_LISTEN, DEFAULT_MINE_TIMEOUT_SECS},
    routes::{build_router, AppState},
};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Leading zero hex characters required of each proof
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Digest algorithm: sha256 or sha512-256
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    hash: HashAlgorithm,

    /// Spread the proof search across all cores
    #[arg(long)]
    parallel: bool,

    /// Abort a mining request after this many seconds (0 = never)
    #[arg(long, default_value_t = DEFAULT_MINE_TIMEOUT_SECS)]
    mine_timeout_secs: u64,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            hash_algorithm: self.hash,
            parallel_search: self.parallel,
            ..LedgerConfig::default()
        }
    }

    fn mine_timeout(&self) -> Option<Duration> {
        (self.mine_timeout_secs > 0).then(|| Duration::from_secs(self.mine_timeout_secs))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ledger = Arc::new(Ledger::new(args.ledger_config())?);
    let state = AppState::new(ledger, args.mine_timeout());
    let app = build_router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!(
        difficulty = args.difficulty,
        hash = %args.hash,
        parallel = args.parallel,
        "ledger-node listening on http://{addr}"
    );
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
