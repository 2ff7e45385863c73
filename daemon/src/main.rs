//! Terra daemon: entry point for operating a Terra node.
//!
//! Every command opens the node, does one thing, and shuts it down again so
//! queued ledger anchors are delivered before the process exits.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use terra_crypto::{derive_address, generate_keypair, keypair_from_hex_seed};
use terra_node::{init_logging, NodeConfig, Operation, SignedRequest, TerraNode};
use terra_types::{AssetId, CaseId, WalletAddress};

#[derive(Parser)]
#[command(name = "terra-daemon", about = "Terra land registry node")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TERRA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the LMDB environment.
    #[arg(long, env = "TERRA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level, e.g. "info" or "debug,terra_workflow=trace".
    #[arg(long, env = "TERRA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TERRA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Anchor completed transfers to the ledger service at this URL.
    #[arg(long, env = "TERRA_LEDGER_ENDPOINT")]
    ledger_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Generate a new signing key and print its seed and address.
    Keygen,
    /// Sign an operation (JSON, file or "-" for stdin) into a request envelope.
    Sign {
        /// Hex-encoded 32-byte key seed.
        #[arg(long, env = "TERRA_SIGNING_KEY", hide_env_values = true)]
        key: String,
        operation: String,
    },
    /// Apply a signed request (JSON, file or "-" for stdin).
    Apply { request: String },
    /// Show an asset record.
    Asset { id: AssetId },
    /// Show a transfer case.
    Case { id: CaseId },
    /// List every transfer case opened against an asset.
    Cases { asset: AssetId },
    /// List notifications addressed to an account.
    Notifications { account: WalletAddress },
    /// Complete transfers left approved by an interrupted finalization.
    Recover,
    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[derive(Serialize)]
struct KeygenOutput {
    seed: String,
    address: WalletAddress,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path).with_context(|| format!("loading {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(endpoint) = &cli.ledger_endpoint {
        config.ledger.enabled = true;
        config.ledger.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Read `source` as a file path, or stdin when it is "-".
fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Commands that need neither logging nor a database.
    match &cli.command {
        Command::Keygen => {
            let keypair = generate_keypair();
            print_json(&KeygenOutput {
                seed: hex::encode(keypair.private.0),
                address: derive_address(&keypair.public),
            })?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Sign { key, operation } => {
            let Some(keypair) = keypair_from_hex_seed(key) else {
                bail!("signing key must be 64 hex characters");
            };
            let operation: Operation = serde_json::from_str(&read_input(operation)?)
                .context("parsing operation")?;
            print_json(&SignedRequest::sign(&keypair, operation)?)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::DefaultConfig => {
            print!("{}", NodeConfig::default().to_toml_string()?);
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)?;
    let node = TerraNode::open(config).await?;

    let status = match cli.command {
        Command::Apply { request } => {
            let request = SignedRequest::from_json(&read_input(&request)?)?;
            let reply = node.handle(&request).await;
            print_json(&reply)?;
            if reply.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Command::Asset { id } => {
            print_json(&node.get_asset(id)?)?;
            ExitCode::SUCCESS
        }
        Command::Case { id } => {
            print_json(&node.get_case(id)?)?;
            ExitCode::SUCCESS
        }
        Command::Cases { asset } => {
            print_json(&node.cases_for_asset(asset)?)?;
            ExitCode::SUCCESS
        }
        Command::Notifications { account } => {
            print_json(&node.list_notifications(&account)?)?;
            ExitCode::SUCCESS
        }
        Command::Recover => {
            let mut completed = node.recovered_at_startup().to_vec();
            completed.extend(node.recover()?);
            print_json(&completed)?;
            ExitCode::SUCCESS
        }
        Command::Keygen | Command::Sign { .. } | Command::DefaultConfig => ExitCode::SUCCESS,
    };

    if let Some(stats) = node.stop().await? {
        tracing::info!(?stats, "anchor delivery summary");
    }
    Ok(status)
}
