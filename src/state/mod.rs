// State - Read/write views over accounts, coins, pools and orders
//
// Handlers are written against `StateRead`; mutation goes through
// `StateWrite`, which only the commit path can reach with `&mut`.

pub mod memory;
pub mod overlay;

pub use memory::StateDb;
pub use overlay::{ChangeSet, Overlay};

use crate::commission::CommissionPrice;
use crate::fault::ProtocolFault;
use crate::swap::{LimitOrder, OrderId, Pool, PoolId};
use crate::types::{checked_sub, AccountId, Amount, Coin, CoinId, Multisig, Nonce};

/// Read-only view
pub trait StateRead {
    fn coin(&self, id: CoinId) -> Option<Coin>;

    fn coin_exists(&self, id: CoinId) -> bool {
        self.coin(id).is_some()
    }

    fn balance(&self, account: &AccountId, coin: CoinId) -> Amount;

    fn nonce(&self, account: &AccountId) -> Nonce;

    fn multisig(&self, address: &AccountId) -> Option<Multisig>;

    fn pool(&self, id: PoolId) -> Option<Pool>;

    /// Pool registered for the unordered pair
    fn pool_id_by_pair(&self, a: CoinId, b: CoinId) -> Option<PoolId>;

    fn pool_by_pair(&self, a: CoinId, b: CoinId) -> Option<Pool> {
        self.pool_id_by_pair(a, b).and_then(|id| self.pool(id))
    }

    /// Liquidity shares held by `account` in a pool
    fn liquidity(&self, pool_id: PoolId, account: &AccountId) -> Amount;

    fn order(&self, id: OrderId) -> Option<LimitOrder>;

    /// Orders resting against a pool, ascending id
    fn orders_for_pool(&self, pool_id: PoolId) -> Vec<LimitOrder>;

    fn commission_price(&self) -> CommissionPrice;

    fn last_pool_id(&self) -> PoolId;

    fn last_order_id(&self) -> OrderId;
}

/// Mutating view
pub trait StateWrite: StateRead {
    fn set_coin(&mut self, coin: Coin);

    fn set_balance(&mut self, account: &AccountId, coin: CoinId, amount: Amount);

    fn set_nonce(&mut self, account: &AccountId, nonce: Nonce);

    fn set_multisig(&mut self, multisig: Multisig);

    /// Store a pool and register its pair
    fn set_pool(&mut self, pool: Pool);

    fn set_liquidity(&mut self, pool_id: PoolId, account: &AccountId, amount: Amount);

    fn set_order(&mut self, order: LimitOrder);

    fn remove_order(&mut self, id: OrderId);

    fn set_commission_price(&mut self, price: CommissionPrice);

    fn set_last_pool_id(&mut self, id: PoolId);

    fn set_last_order_id(&mut self, id: OrderId);

    fn add_balance(&mut self, account: &AccountId, coin: CoinId, amount: &Amount) {
        let balance = self.balance(account, coin) + amount;
        self.set_balance(account, coin, balance);
    }

    /// Debit a balance. Callers check funds first, so a shortfall here is
    /// a fault.
    fn sub_balance(&mut self, account: &AccountId, coin: CoinId, amount: &Amount) -> Result<(), ProtocolFault> {
        let available = self.balance(account, coin);
        let balance = checked_sub(&available, amount).ok_or_else(|| ProtocolFault::BalanceUnderflow {
            coin,
            available: available.clone(),
            required: amount.clone(),
        })?;
        self.set_balance(account, coin, balance);
        Ok(())
    }

    /// Register a new pool with the next id; liquidity is `sqrt(a * b)`
    fn create_pool(&mut self, coin_a: CoinId, coin_b: CoinId, volume_a: Amount, volume_b: Amount) -> Pool {
        let id = self.last_pool_id() + 1;
        let pool = Pool::new(id, coin_a, coin_b, volume_a, volume_b);
        self.set_last_pool_id(id);
        self.set_pool(pool.clone());
        pool
    }

    /// Next order id, reserved
    fn allocate_order_id(&mut self) -> OrderId {
        let id = self.last_order_id() + 1;
        self.set_last_order_id(id);
        id
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] crate::storage::DatabaseError),

    #[error("Échec de sérialisation: {0}")]
    SerializationFailed(String),

    #[error("Échec de désérialisation: {0}")]
    DeserializationFailed(String),

    #[error("No snapshot at height {0}")]
    SnapshotNotFound(u64),
}
