// Runner - Command execution against the stored state
// Principle: load the best snapshot, run the executor, persist only on deliver

use crate::cli::config::{load_signing_key, resolve_account, KeyError, RunConfig};
use crate::cli::{GenesisCmd, TxInput};
use crate::execution::{BlockOutcome, Executor, Response};
use crate::fault::ProtocolFault;
use crate::genesis::{GenesisBuilder, GenesisError, GenesisSpec};
use crate::mempool::PendingSenders;
use crate::state::{StateDb, StateError, StateRead};
use crate::storage::SnapshotStore;
use crate::types::codec::CodecError;
use crate::types::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Protocol fault: {0}")]
    Fault(#[from] ProtocolFault),

    #[error("Invalid transaction hex at position {0}: {1}")]
    TxHex(usize, String),

    #[error("Invalid amount: {0}")]
    Amount(String),

    #[error("No state found in {0}, run `genesis` first")]
    NoState(PathBuf),

    #[error("State already initialized at height {0} (use --force to replace it)")]
    AlreadyInitialized(BlockNumber),

    #[error("--spec or --dev is required")]
    MissingGenesisSource,
}

/// Collect raw transactions from arguments and/or a file
pub fn read_txs(input: &TxInput) -> Result<Vec<Vec<u8>>, RunnerError> {
    let mut lines: Vec<String> = input.txs.clone();
    if let Some(path) = &input.file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::Io(format!("{}: {}", path.display(), e)))?;
        lines.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let line = line.strip_prefix("0x").unwrap_or(line);
            hex::decode(line).map_err(|e| RunnerError::TxHex(i, e.to_string()))
        })
        .collect()
}

fn open_store(config: &RunConfig) -> Result<SnapshotStore, RunnerError> {
    std::fs::create_dir_all(&config.base_path)
        .map_err(|e| RunnerError::Io(format!("Failed to create data dir: {}", e)))?;
    Ok(SnapshotStore::open(config.db_path())?)
}

fn load_best(store: &SnapshotStore, config: &RunConfig) -> Result<(BlockNumber, StateDb), RunnerError> {
    store
        .load_best()?
        .ok_or_else(|| RunnerError::NoState(config.base_path.clone()))
}

/// Build the genesis state and store it at height 0
pub fn init_genesis(config: &RunConfig, cmd: &GenesisCmd) -> Result<Hash, RunnerError> {
    let spec = match (&cmd.spec, cmd.dev) {
        (Some(path), _) => GenesisSpec::from_file(path)?,
        (None, true) => {
            let owner = match &cmd.owner {
                Some(value) => resolve_account(value)?,
                None => {
                    warn!("No --owner given, development funds go to the zero address");
                    AccountId::from_bytes([0u8; 32])
                }
            };
            let mut spec = GenesisSpec::development(owner);
            spec.chain_id = config.executor.chain_id;
            spec
        }
        (None, false) => return Err(RunnerError::MissingGenesisSource),
    };

    if spec.chain_id != config.executor.chain_id {
        warn!(
            "Genesis chain id {} differs from configured chain id {}",
            spec.chain_id.0, config.executor.chain_id.0
        );
    }

    let store = open_store(config)?;
    if let Some(height) = store.best_height()? {
        if !cmd.force {
            return Err(RunnerError::AlreadyInitialized(height));
        }
        warn!("Replacing existing state (best height {})", height);
        store.clear()?;
    }

    if let Some(path) = &cmd.export {
        spec.to_file(path)?;
        info!("Genesis specification written to {}", path.display());
    }

    let state = GenesisBuilder::new(spec).build()?;
    store.save(0, &state)?;
    Ok(state.state_hash()?)
}

/// Simulate transactions in order against the best state. A sender may
/// only pass once per run, as in a mempool.
pub fn check_txs(
    config: &RunConfig,
    txs: &[Vec<u8>],
    min_gas_price: Option<u64>,
) -> Result<Vec<Response>, RunnerError> {
    let store = open_store(config)?;
    let (height, state) = load_best(&store, config)?;
    let executor = Executor::new(config.executor.clone());
    let pending = PendingSenders::new();
    let min_gas_price = min_gas_price.unwrap_or(config.executor.min_gas_price);

    let mut responses = Vec::with_capacity(txs.len());
    for raw in txs {
        let response = executor.execute_check(&state, raw, height + 1, &pending, min_gas_price)?;
        debug!(code = response.code, "check");
        responses.push(response);
    }
    Ok(responses)
}

/// Execute transactions as block `best + 1` and persist the new state
pub fn deliver_txs(
    config: &RunConfig,
    txs: &[Vec<u8>],
    suppress_tags: bool,
) -> Result<(BlockNumber, BlockOutcome, Hash), RunnerError> {
    let store = open_store(config)?;
    let (best, mut state) = load_best(&store, config)?;
    let height = best + 1;
    let executor = Executor::new(config.executor.clone());

    // A fault leaves `state` half-applied: it is dropped, never saved
    let mut outcome = BlockOutcome::default();
    for raw in txs {
        let response = executor.execute_deliver(&mut state, raw, &mut outcome.rewards, height, suppress_tags)?;
        outcome.responses.push(response);
    }

    store.save(height, &state)?;
    let hash = state.state_hash()?;
    info!(
        "Block {} executed: {}/{} ok, rewards {}, state {}",
        height,
        outcome.ok_count(),
        txs.len(),
        format_coins(&outcome.rewards),
        hash
    );
    Ok((height, outcome, hash))
}

fn coin_json(coin: &Coin) -> Value {
    json!({
        "id": coin.id.0,
        "symbol": coin.symbol,
        "volume": format_coins(&coin.volume),
        "reserve": format_coins(&coin.reserve),
        "crr": coin.crr,
        "type": if coin.id.is_base() { "base" } else if coin.has_reserve() { "bancor" } else { "token" },
    })
}

/// Summary of a stored state, optionally focused on one account
pub fn inspect_state(
    config: &RunConfig,
    height: Option<BlockNumber>,
    account: Option<&str>,
) -> Result<Value, RunnerError> {
    let store = open_store(config)?;
    let (height, state) = match height {
        Some(h) => (h, store.load(h)?),
        None => load_best(&store, config)?,
    };

    let mut summary = json!({
        "height": height,
        "state_hash": state.state_hash()?.to_string(),
        "commission_price": serde_json::to_value(state.commission_price()).unwrap_or(Value::Null),
        "coins": state.coins().map(coin_json).collect::<Vec<_>>(),
        "pools": state.pools().map(|p| json!({
            "id": p.id,
            "pair": format!("{}-{}", p.coin0.0, p.coin1.0),
            "reserve0": format_coins(&p.reserve0),
            "reserve1": format_coins(&p.reserve1),
            "liquidity": p.liquidity.to_string(),
        })).collect::<Vec<_>>(),
        "orders": state.orders().map(|o| json!({
            "id": o.id,
            "owner": o.owner.to_hex(),
            "pool_id": o.pool_id,
            "sell": format!("{} of {}", format_coins(&o.want_sell), o.coin_to_sell.0),
            "buy": format!("{} of {}", format_coins(&o.want_buy), o.coin_to_buy.0),
            "height": o.height,
        })).collect::<Vec<_>>(),
    });

    if let Some(value) = account {
        let account = resolve_account(value)?;
        let balances: serde_json::Map<String, Value> = state
            .balances_of(&account)
            .map(|(coin, amount)| (coin.0.to_string(), Value::String(format_coins(amount))))
            .collect();
        let liquidity: serde_json::Map<String, Value> = state
            .pools()
            .filter_map(|p| {
                let held = state.liquidity(p.id, &account);
                (held != Amount::default()).then(|| (p.id.to_string(), Value::String(held.to_string())))
            })
            .collect();
        summary["account"] = json!({
            "address": account.to_hex(),
            "nonce": state.nonce(&account),
            "balances": balances,
            "liquidity": liquidity,
            "multisig": state.multisig(&account).map(|m| json!({
                "threshold": m.threshold,
                "weights": m.weights,
                "addresses": m.addresses.iter().map(AccountId::to_hex).collect::<Vec<_>>(),
            })),
        });
    }

    Ok(summary)
}

/// Sign a transfer with a key file and return the raw transaction as hex
#[allow(clippy::too_many_arguments)]
pub fn sign_send(
    config: &RunConfig,
    key_path: &Path,
    to: &str,
    coin: u32,
    value: &str,
    nonce: Nonce,
    gas_coin: u32,
    gas_price: u64,
) -> Result<String, RunnerError> {
    let key = load_signing_key(key_path)?;
    let to = resolve_account(to)?;
    let value = parse_coins(value).ok_or_else(|| RunnerError::Amount(value.to_string()))?;

    let data = TxData::Send(SendData {
        coin: CoinId(coin),
        to,
        value,
    });
    let tx = TransactionBuilder::new(config.executor.chain_id, nonce, data)
        .gas_coin(CoinId(gas_coin))
        .gas_price(gas_price)
        .sign(&key)?;
    Ok(hex::encode(tx.encode()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use crate::execution::Code;
    use ed25519_dalek::SigningKey;
    use tempfile::tempdir;

    fn setup(dir: &Path) -> (RunConfig, PathBuf, AccountId) {
        let config = RunConfig {
            base_path: dir.join("data"),
            executor: ExecutorConfig::default(),
        };
        let key = SigningKey::from_bytes(&[11u8; 32]);
        let key_path = dir.join("owner.json");
        std::fs::write(
            &key_path,
            json!({ "secretKey": format!("0x{}", hex::encode(key.to_bytes())) }).to_string(),
        )
        .unwrap();
        let owner = AccountId::from_public_key(&key.verifying_key());
        let cmd = GenesisCmd {
            spec: None,
            dev: true,
            owner: Some(key_path.to_string_lossy().into_owned()),
            export: None,
            force: false,
        };
        init_genesis(&config, &cmd).unwrap();
        (config, key_path, owner)
    }

    #[test]
    fn test_genesis_then_deliver_send() {
        let dir = tempdir().unwrap();
        let (config, key_path, owner) = setup(dir.path());
        let recipient = AccountId::from_bytes([7u8; 32]);

        let raw = sign_send(&config, &key_path, &recipient.to_hex(), 0, "2.5", 1, 0, 1).unwrap();
        let txs = read_txs(&TxInput { txs: vec![raw], file: None }).unwrap();

        let checked = check_txs(&config, &txs, None).unwrap();
        assert!(checked[0].is_ok(), "{:?}", checked[0]);

        let (height, outcome, _) = deliver_txs(&config, &txs, false).unwrap();
        assert_eq!(height, 1);
        assert_eq!(outcome.ok_count(), 1);

        let summary = inspect_state(&config, None, Some(&recipient.to_hex())).unwrap();
        assert_eq!(summary["height"], 1);
        assert_eq!(summary["account"]["balances"]["0"], "2.5");

        let owner_view = inspect_state(&config, None, Some(&owner.to_hex())).unwrap();
        assert_eq!(owner_view["account"]["nonce"], 1);
    }

    #[test]
    fn test_replayed_send_fails_with_wrong_nonce() {
        let dir = tempdir().unwrap();
        let (config, key_path, _) = setup(dir.path());
        let recipient = AccountId::from_bytes([8u8; 32]);

        let raw = sign_send(&config, &key_path, &recipient.to_hex(), 0, "1", 1, 0, 1).unwrap();
        let txs = read_txs(&TxInput { txs: vec![raw.clone(), raw], file: None }).unwrap();

        let (_, outcome, _) = deliver_txs(&config, &txs, false).unwrap();
        assert!(outcome.responses[0].is_ok());
        assert!(outcome.responses[1].has_code(Code::WrongNonce));
    }

    #[test]
    fn test_check_admits_sender_once() {
        let dir = tempdir().unwrap();
        let (config, key_path, _) = setup(dir.path());
        let recipient = AccountId::from_bytes([9u8; 32]);

        let first = sign_send(&config, &key_path, &recipient.to_hex(), 0, "1", 1, 0, 1).unwrap();
        let txs = read_txs(&TxInput { txs: vec![first.clone(), first], file: None }).unwrap();
        let responses = check_txs(&config, &txs, None).unwrap();
        assert!(responses[0].is_ok());
        assert!(responses[1].has_code(Code::TxFromSenderAlreadyInMempool));
    }

    #[test]
    fn test_genesis_twice_requires_force() {
        let dir = tempdir().unwrap();
        let (config, key_path, _) = setup(dir.path());
        let mut cmd = GenesisCmd {
            spec: None,
            dev: true,
            owner: Some(key_path.to_string_lossy().into_owned()),
            export: None,
            force: false,
        };
        assert!(matches!(init_genesis(&config, &cmd), Err(RunnerError::AlreadyInitialized(0))));
        cmd.force = true;
        assert!(init_genesis(&config, &cmd).is_ok());
    }

    #[test]
    fn test_deliver_without_state() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            base_path: dir.path().join("empty"),
            executor: ExecutorConfig::default(),
        };
        assert!(matches!(deliver_txs(&config, &[], false), Err(RunnerError::NoState(_))));
    }

    #[test]
    fn test_read_txs_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("txs.txt");
        std::fs::write(&path, "# block 1\n0xdead\n\nbeef\n").unwrap();
        let txs = read_txs(&TxInput { txs: vec![], file: Some(path) }).unwrap();
        assert_eq!(txs, vec![vec![0xde, 0xad], vec![0xbe, 0xef]]);

        assert!(matches!(
            read_txs(&TxInput { txs: vec!["zz".into()], file: None }),
            Err(RunnerError::TxHex(0, _))
        ));
    }
}
