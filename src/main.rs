// Agora Executor - Entry point
// Principle: Thin shell over the execution core

use agora_core::cli::config::{parse_secret, RunConfig};
use agora_core::cli::runner::{check_txs, deliver_txs, init_genesis, inspect_state, read_txs, sign_send};
use agora_core::cli::{Cli, Commands, KeySubcommand};
use agora_core::execution::Response;
use agora_core::types::AccountId;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_filter = if cli.verbose {
        "debug"
    } else {
        &cli.log_level
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig::from_cli(&cli).map_err(|e| {
        error!("Configuration error: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    match cli.command {
        Commands::Genesis(cmd) => {
            let hash = init_genesis(&config, &cmd)?;
            info!("Genesis stored in {}", config.base_path.display());
            println!("{}", serde_json::json!({ "height": 0, "state_hash": hash.to_string() }));
        }

        Commands::Check(cmd) => {
            let txs = read_txs(&cmd.input)?;
            let responses = check_txs(&config, &txs, cmd.min_gas_price)?;
            print_responses(&responses)?;
        }

        Commands::Deliver(cmd) => {
            let txs = read_txs(&cmd.input)?;
            match deliver_txs(&config, &txs, cmd.suppress_tags) {
                Ok((height, outcome, hash)) => {
                    print_responses(&outcome.responses)?;
                    info!("Height {} state {}", height, hash);
                }
                Err(e) => {
                    error!("Block rejected: {}", e);
                    return Err(e.into());
                }
            }
        }

        Commands::Inspect(cmd) => {
            let summary = inspect_state(&config, cmd.height, cmd.account.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Key(cmd) => match cmd.subcommand {
            KeySubcommand::Generate { output, format } => {
                generate_key(output.as_ref(), &format)?;
            }
            KeySubcommand::Inspect { key } => {
                inspect_key(&key)?;
            }
            KeySubcommand::Send { key, to, coin, value, nonce, gas_coin, gas_price } => {
                let raw = sign_send(&config, &key, &to, coin, &value, nonce, gas_coin, gas_price)?;
                println!("{}", raw);
            }
        },
    }

    Ok(())
}

/// One JSON receipt per line
fn print_responses(responses: &[Response]) -> anyhow::Result<()> {
    for response in responses {
        println!("{}", serde_json::to_string(response)?);
    }
    Ok(())
}

/// Generate a new ed25519 keypair
fn generate_key(output: Option<&std::path::PathBuf>, format: &str) -> anyhow::Result<()> {
    use ed25519_dalek::{SigningKey, VerifyingKey};
    use rand::rngs::OsRng;

    info!("Generating ed25519 keypair");

    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key: VerifyingKey = (&signing_key).into();

    let secret_hex = hex::encode(signing_key.to_bytes());
    let public_hex = hex::encode(verifying_key.to_bytes());
    let address = AccountId::from_public_key(&verifying_key).to_hex();

    match format {
        "json" => {
            let json = serde_json::json!({
                "scheme": "ed25519",
                "secretKey": format!("0x{}", secret_hex),
                "publicKey": format!("0x{}", public_hex),
                "address": address,
            });

            let output_str = serde_json::to_string_pretty(&json)?;

            if let Some(path) = output {
                std::fs::write(path, &output_str)?;
                info!("Key saved to: {}", path.display());
            } else {
                println!("{}", output_str);
            }
        }
        "hex" => {
            println!("Secret Key: 0x{}", secret_hex);
            println!("Public Key: 0x{}", public_hex);
            println!("Address: {}", address);
        }
        _ => {
            return Err(anyhow::anyhow!("Unknown format: {}", format));
        }
    }

    Ok(())
}

/// Inspect a secret key
fn inspect_key(key: &str) -> anyhow::Result<()> {
    let signing_key = parse_secret(key)?;
    let verifying_key = signing_key.verifying_key();

    println!("Type: Secret Key");
    println!("Public Key: 0x{}", hex::encode(verifying_key.to_bytes()));
    println!("Address: {}", AccountId::from_public_key(&verifying_key));
    Ok(())
}
