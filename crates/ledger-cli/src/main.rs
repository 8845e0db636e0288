use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ledger_core::{
    constants::DEFAULT_DIFFICULTY, verify_chain, Block, HashAlgorithm, Ledger, LedgerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct Node {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    node: String,
}

#[derive(Args, Debug)]
struct Rules {
    /// Difficulty the chain was mined at
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,
    /// Digest algorithm: sha256 or sha512-256
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    hash: HashAlgorithm,
}

impl Rules {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            hash_algorithm: self.hash,
            ..LedgerConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        #[command(flatten)]
        node: Node,
        /// Transaction descriptor, e.g. "A pays B 5"
        transaction: String,
    },
    /// Ask the node to mine the pending pool into a block
    Mine {
        #[command(flatten)]
        node: Node,
    },
    /// Print the node's chain
    Chain {
        #[command(flatten)]
        node: Node,
    },
    /// Ask the node to validate its own chain
    Validate {
        #[command(flatten)]
        node: Node,
    },
    /// Fetch the chain and re-validate it locally
    Verify {
        #[command(flatten)]
        node: Node,
        #[command(flatten)]
        rules: Rules,
    },
    /// Run a ledger in-process: queue transactions, mine, print the chain
    Demo {
        #[command(flatten)]
        rules: Rules,
        /// Number of blocks to mine after queueing
        #[arg(long, default_value_t = 2)]
        blocks: u32,
        /// Transactions to queue before the first block
        transactions: Vec<String>,
    },
}

#[derive(Serialize)]
struct Tx {
    transaction: String,
}

#[derive(Deserialize)]
struct ChainResponse {
    chain: Vec<Block>,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}

fn demo(config: LedgerConfig, blocks: u32, transactions: Vec<String>) -> Result<()> {
    let ledger = Ledger::new(config)?;
    for tx in transactions {
        ledger.add_transaction(tx);
    }
    for _ in 0..blocks {
        let block = ledger.mine();
        info!(index = block.index, proof = block.proof, "demo block mined");
    }
    println!("{}", serde_json::to_string_pretty(&ledger.chain())?);
    println!("valid: {}", ledger.validate());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Submit { node, transaction } => {
            let res = client
                .post(format!("{}/transactions", node.node))
                .json(&Tx { transaction })
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Mine { node } => {
            let res = client.post(format!("{}/mine", node.node)).send().await?;
            print_response(res).await?;
        }
        Command::Chain { node } => {
            let res = client.get(format!("{}/chain", node.node)).send().await?;
            print_response(res).await?;
        }
        Command::Validate { node } => {
            let res = client
                .get(format!("{}/chain/validate", node.node))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Verify { node, rules } => {
            let res = client
                .get(format!("{}/chain", node.node))
                .send()
                .await?
                .error_for_status()?;
            let ChainResponse { chain } = res
                .json::<ChainResponse>()
                .await
                .context("decoding /chain")?;
            match verify_chain(&chain, &rules.config()) {
                Ok(()) => println!("chain of {} blocks is valid", chain.len()),
                Err(fault) => bail!("chain rejected: {fault}"),
            }
        }
        Command::Demo {
            rules,
            blocks,
            transactions,
        } => {
            // Proof search is CPU-bound; keep it off the async workers.
            tokio::task::spawn_blocking(move || demo(rules.config(), blocks, transactions))
                .await??;
        }
    }
    Ok(())
}
