// Support - Fixtures shared by the executor tests
use crate::config::ExecutorConfig;
use crate::execution::{Executor, Response};
use crate::fault::ProtocolFault;
use crate::mempool::PendingSenders;
use crate::state::{StateDb, StateRead, StateWrite};
use crate::types::*;
use ed25519_dalek::SigningKey;
use num_traits::Zero;

/// A plain token (no reserve)
pub fn token(id: u32, symbol: &str) -> Coin {
    Coin {
        id: CoinId(id),
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        volume: coins(1_000_000_000),
        reserve: Amount::zero(),
        crr: 0,
        max_supply: coins(1_000_000_000),
        owner: None,
        mintable: false,
        burnable: false,
    }
}

/// A coin backed by a base-coin reserve
pub fn bancor_coin(id: u32, symbol: &str, volume: Amount, reserve: Amount, crr: u32) -> Coin {
    Coin {
        volume: volume.clone(),
        reserve,
        crr,
        max_supply: volume * 100u32,
        ..token(id, symbol)
    }
}

/// Deterministic key for a test account
pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn random_key() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

pub fn account(key: &SigningKey) -> AccountId {
    AccountId::from_public_key(&key.verifying_key())
}

/// Executor plus a committed state, one block per delivered tx
pub struct TestChain {
    pub state: StateDb,
    pub executor: Executor,
    pub height: BlockNumber,
    pub rewards: Amount,
}

impl TestChain {
    /// Base coin AGR and tokens 1..=3, V2 rules from genesis
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        let mut state = StateDb::new();
        state.set_coin(Coin::base("AGR", coins(1_000_000_000)));
        state.set_coin(token(1, "USDX"));
        state.set_coin(token(2, "ALT"));
        state.set_coin(token(3, "LONE"));
        Self {
            state,
            executor: Executor::new(config),
            height: 1,
            rewards: Amount::zero(),
        }
    }

    pub fn fund(&mut self, key: &SigningKey, coin: CoinId, amount: Amount) {
        self.state.add_balance(&account(key), coin, &amount);
    }

    pub fn balance(&self, key: &SigningKey, coin: CoinId) -> Amount {
        self.state.balance(&account(key), coin)
    }

    pub fn builder(&self, sender: &AccountId, data: TxData) -> TransactionBuilder {
        TransactionBuilder::new(self.executor.config().chain_id, self.state.nonce(sender) + 1, data)
    }

    /// Raw tx at the sender's next nonce, base coin gas
    pub fn tx(&self, key: &SigningKey, data: TxData) -> Vec<u8> {
        self.builder(&account(key), data)
            .sign(key)
            .and_then(|tx| tx.encode())
            .unwrap()
    }

    pub fn try_deliver(&mut self, raw: &[u8]) -> Result<Response, ProtocolFault> {
        let response = self
            .executor
            .execute_deliver(&mut self.state, raw, &mut self.rewards, self.height, false);
        self.height += 1;
        response
    }

    pub fn deliver(&mut self, raw: &[u8]) -> Response {
        self.try_deliver(raw).unwrap()
    }

    /// Sign and deliver in one go
    pub fn submit(&mut self, key: &SigningKey, data: TxData) -> Response {
        let raw = self.tx(key, data);
        self.deliver(&raw)
    }

    pub fn check(&self, raw: &[u8], pending: &PendingSenders) -> Response {
        let min_gas_price = self.executor.config().min_gas_price;
        self.executor
            .execute_check(&self.state, raw, self.height, pending, min_gas_price)
            .unwrap()
    }

    /// Create a pool through a transaction; the provider is funded first
    pub fn create_pool(&mut self, provider: &SigningKey, coin0: CoinId, volume0: Amount, coin1: CoinId, volume1: Amount) -> Response {
        self.fund(provider, coin0, volume0.clone());
        self.fund(provider, coin1, volume1.clone());
        self.fund(provider, CoinId::BASE, coins(10));
        self.submit(
            provider,
            TxData::CreateSwapPool(CreateSwapPoolData {
                coin0,
                coin1,
                volume0,
                volume1,
            }),
        )
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}
