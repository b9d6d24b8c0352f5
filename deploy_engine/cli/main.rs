//! Command-line front end for the deployment pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use deploy_engine::audit::AuditTracker;
use deploy_engine::credential::decode_payload;
use deploy_engine::derivation::{Slip10Deriver, derive_seed, derive_signing_key};
use deploy_engine::encoding;
use deploy_engine::logging::init_logging;
use deploy_engine::node::{GrpcNodeClient, NodeClient, Outcome};
use deploy_engine::{DeployConfig, Pipeline};

#[derive(Parser)]
#[command(name = "deploy", version = "0.1", about = "Credential deployment CLI")]
struct Cli {
    #[arg(long, global = true, help = "JSON config file; DEPLOY_* env vars otherwise")]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    #[arg(long, global = true, help = "Write the log file as JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an issuer payload and print a summary
    Decode {
        payload: PathBuf,
    },

    /// Print the public key derived from a recovery phrase
    Derive {
        #[arg(long)]
        phrase_file: PathBuf,
    },

    /// Build and sign the deployment without submitting it
    Sign {
        #[arg(long)]
        payload: PathBuf,

        #[arg(long)]
        phrase_file: PathBuf,

        #[arg(long, help = "Ignore the payload expiry and use now + expiry_secs")]
        fresh_expiry: bool,
    },

    /// Fetch the node's global cryptographic parameters
    Params {
        #[arg(long, help = "Block hash in hex; the last finalized block otherwise")]
        block: Option<String>,
    },

    /// Sign, submit and wait for finalization
    Submit {
        #[arg(long)]
        payload: PathBuf,

        #[arg(long)]
        phrase_file: PathBuf,

        #[arg(long, help = "Ignore the payload expiry and use now + expiry_secs")]
        fresh_expiry: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _guard = init_logging(&cli.log_dir, cli.json_logs);

    let config = match &cli.config {
        Some(path) => DeployConfig::from_json_file(path)?,
        None => DeployConfig::from_env()?,
    };

    match cli.command {
        Commands::Decode { payload } => {
            let payload = decode_payload(&read(&payload)?)?;
            let cred = &payload.credential;
            let keys: BTreeMap<String, String> = cred
                .public_keys()
                .keys
                .iter()
                .map(|(index, key)| (index.to_string(), key.key.to_hex()))
                .collect();
            let summary = json!({
                "expiry": payload.expiry,
                "credId": cred.cred_id().to_hex(),
                "ipIdentity": cred.ip_identity(),
                "authorities": cred.ar_data().keys().collect::<Vec<_>>(),
                "revocationThreshold": cred.revocation_threshold(),
                "keys": keys,
                "keyThreshold": cred.public_keys().threshold,
                "validTo": cred.policy().valid_to.to_string(),
                "createdAt": cred.policy().created_at.to_string(),
                "revealedAttributes": cred.policy().revealed_attributes,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Derive { phrase_file } => {
            let phrase = read(&phrase_file)?;
            let deriver = Slip10Deriver::new();
            let seed = derive_seed(&deriver, &phrase)?;
            let keys = derive_signing_key(&deriver, &seed, config.network, &config.identity)?;
            println!("{}", keys.verify_key_hex());
        }

        Commands::Sign {
            payload,
            phrase_file,
            fresh_expiry,
        } => {
            let pipeline = Pipeline::grpc(config)?;
            let expiry = fresh_expiry.then(|| pipeline.fresh_expiry());
            let audit = AuditTracker::default();
            let envelope =
                pipeline.prepare(&read(&payload)?, &read(&phrase_file)?, expiry, &audit)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "txHash": envelope.transaction_hash(),
                    "expiry": envelope.expiry(),
                    "envelope": encoding::encode(&envelope.serialize()),
                }))?
            );
        }

        Commands::Params { block } => {
            config.validate()?;
            let block = block.as_deref().map(encoding::decode).transpose()?;
            let mut client = GrpcNodeClient::connect(
                &config.endpoint,
                config.connect_timeout(),
                Some(config.timeout()),
            )
            .await?;
            let fetched = client.cryptographic_parameters(block.as_deref()).await;
            client.close().await?;
            let params = fetched?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "genesisString": params.genesis_string,
                    "bulletproofGenerators": encoding::encode(&params.bulletproof_generators),
                    "onChainCommitmentKey": encoding::encode(&params.on_chain_commitment_key),
                }))?
            );
        }

        Commands::Submit {
            payload,
            phrase_file,
            fresh_expiry,
        } => {
            let pipeline = Pipeline::grpc(config)?;
            let expiry = fresh_expiry.then(|| pipeline.fresh_expiry());
            let endpoint = &pipeline.config().endpoint;
            info!(host = %endpoint.host, port = endpoint.port, tls = endpoint.tls, "submitting credential");

            let report = pipeline
                .deploy(&read(&payload)?, &read(&phrase_file)?, expiry)
                .await;

            match report.outcome {
                Ok(finalization) => {
                    let outcome = match &finalization.outcome {
                        Outcome::Success => json!("success"),
                        Outcome::Reject { reason } => json!({ "reject": reason }),
                    };
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "txHash": finalization.tx_hash,
                            "blockHash": finalization.block_hash,
                            "outcome": outcome,
                        }))?
                    );
                }
                Err(e) if e.is_inconclusive() => {
                    bail!("{e} (the transaction may still finalize; check its status later)")
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
