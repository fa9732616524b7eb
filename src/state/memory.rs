// Memory - Materialized in-memory state
//
// Ordered maps only, so iteration (and therefore encoding and hashing) is
// identical on every node.

use super::{StateError, StateRead, StateWrite};
use crate::commission::CommissionPrice;
use crate::swap::{LimitOrder, OrderId, Pool, PoolId};
use crate::types::{AccountId, Amount, Coin, CoinId, Hash, Multisig, Nonce};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDb {
    coins: BTreeMap<CoinId, Coin>,
    balances: BTreeMap<(AccountId, CoinId), Amount>,
    nonces: BTreeMap<AccountId, Nonce>,
    multisigs: BTreeMap<AccountId, Multisig>,
    pools: BTreeMap<PoolId, Pool>,
    pairs: BTreeMap<(CoinId, CoinId), PoolId>,
    liquidity: BTreeMap<(PoolId, AccountId), Amount>,
    orders: BTreeMap<OrderId, LimitOrder>,
    pool_orders: BTreeMap<PoolId, BTreeSet<OrderId>>,
    commission_price: CommissionPrice,
    last_pool_id: PoolId,
    last_order_id: OrderId,
}

impl StateDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash of the canonical encoding
    pub fn state_hash(&self) -> Result<Hash, StateError> {
        let bytes = bincode::serialize(self).map_err(|e| StateError::SerializationFailed(e.to_string()))?;
        Ok(Hash::hash(&bytes))
    }

    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.coins.values()
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    pub fn orders(&self) -> impl Iterator<Item = &LimitOrder> {
        self.orders.values()
    }

    /// Non-zero balances of one account
    pub fn balances_of<'a>(&'a self, account: &'a AccountId) -> impl Iterator<Item = (CoinId, &'a Amount)> + 'a {
        self.balances
            .range((*account, CoinId(0))..=(*account, CoinId(u32::MAX)))
            .map(|((_, coin), amount)| (*coin, amount))
    }

    /// Sum of one coin over every account, order escrow included
    pub fn total_held(&self, coin: CoinId) -> Amount {
        let in_accounts: Amount = self
            .balances
            .iter()
            .filter(|((_, c), _)| *c == coin)
            .map(|(_, amount)| amount.clone())
            .sum();
        let in_orders: Amount = self
            .orders
            .values()
            .filter(|o| o.coin_to_sell == coin)
            .map(|o| o.want_sell.clone())
            .sum();
        let in_pools: Amount = self
            .pools
            .values()
            .filter_map(|p| p.reserve_of(coin).cloned())
            .sum();
        in_accounts + in_orders + in_pools
    }
}

impl StateRead for StateDb {
    fn coin(&self, id: CoinId) -> Option<Coin> {
        self.coins.get(&id).cloned()
    }

    fn coin_exists(&self, id: CoinId) -> bool {
        self.coins.contains_key(&id)
    }

    fn balance(&self, account: &AccountId, coin: CoinId) -> Amount {
        self.balances.get(&(*account, coin)).cloned().unwrap_or_default()
    }

    fn nonce(&self, account: &AccountId) -> Nonce {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    fn multisig(&self, address: &AccountId) -> Option<Multisig> {
        self.multisigs.get(address).cloned()
    }

    fn pool(&self, id: PoolId) -> Option<Pool> {
        self.pools.get(&id).cloned()
    }

    fn pool_id_by_pair(&self, a: CoinId, b: CoinId) -> Option<PoolId> {
        self.pairs.get(&Pool::sorted_pair(a, b)).copied()
    }

    fn liquidity(&self, pool_id: PoolId, account: &AccountId) -> Amount {
        self.liquidity.get(&(pool_id, *account)).cloned().unwrap_or_default()
    }

    fn order(&self, id: OrderId) -> Option<LimitOrder> {
        self.orders.get(&id).cloned()
    }

    fn orders_for_pool(&self, pool_id: PoolId) -> Vec<LimitOrder> {
        self.pool_orders
            .get(&pool_id)
            .map(|ids| ids.iter().filter_map(|id| self.orders.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn commission_price(&self) -> CommissionPrice {
        self.commission_price.clone()
    }

    fn last_pool_id(&self) -> PoolId {
        self.last_pool_id
    }

    fn last_order_id(&self) -> OrderId {
        self.last_order_id
    }
}

impl StateWrite for StateDb {
    fn set_coin(&mut self, coin: Coin) {
        self.coins.insert(coin.id, coin);
    }

    fn set_balance(&mut self, account: &AccountId, coin: CoinId, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&(*account, coin));
        } else {
            self.balances.insert((*account, coin), amount);
        }
    }

    fn set_nonce(&mut self, account: &AccountId, nonce: Nonce) {
        self.nonces.insert(*account, nonce);
    }

    fn set_multisig(&mut self, multisig: Multisig) {
        self.multisigs.insert(multisig.address, multisig);
    }

    fn set_pool(&mut self, pool: Pool) {
        self.pairs.insert((pool.coin0, pool.coin1), pool.id);
        self.pools.insert(pool.id, pool);
    }

    fn set_liquidity(&mut self, pool_id: PoolId, account: &AccountId, amount: Amount) {
        if amount.is_zero() {
            self.liquidity.remove(&(pool_id, *account));
        } else {
            self.liquidity.insert((pool_id, *account), amount);
        }
    }

    fn set_order(&mut self, order: LimitOrder) {
        self.pool_orders.entry(order.pool_id).or_default().insert(order.id);
        self.orders.insert(order.id, order);
    }

    fn remove_order(&mut self, id: OrderId) {
        if let Some(order) = self.orders.remove(&id) {
            if let Some(ids) = self.pool_orders.get_mut(&order.pool_id) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.pool_orders.remove(&order.pool_id);
                }
            }
        }
    }

    fn set_commission_price(&mut self, price: CommissionPrice) {
        self.commission_price = price;
    }

    fn set_last_pool_id(&mut self, id: PoolId) {
        self.last_pool_id = id;
    }

    fn set_last_order_id(&mut self, id: OrderId) {
        self.last_order_id = id;
    }
}
