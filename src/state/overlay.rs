// Overlay - Copy-on-write view for one transaction
//
// Reads fall through to the base view, writes are buffered in a ChangeSet.
// Dropping the overlay discards everything; the commit path turns it into
// a ChangeSet and applies it in key order.

use super::{StateRead, StateWrite};
use crate::commission::CommissionPrice;
use crate::swap::{LimitOrder, OrderId, Pool, PoolId};
use crate::types::{AccountId, Amount, Coin, CoinId, Multisig, Nonce};
use std::collections::BTreeMap;

/// Buffered writes of one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    coins: BTreeMap<CoinId, Coin>,
    balances: BTreeMap<(AccountId, CoinId), Amount>,
    nonces: BTreeMap<AccountId, Nonce>,
    multisigs: BTreeMap<AccountId, Multisig>,
    pools: BTreeMap<PoolId, Pool>,
    liquidity: BTreeMap<(PoolId, AccountId), Amount>,
    /// `None` marks a removed order
    orders: BTreeMap<OrderId, Option<LimitOrder>>,
    commission_price: Option<CommissionPrice>,
    last_pool_id: Option<PoolId>,
    last_order_id: Option<OrderId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self == &ChangeSet::default()
    }

    /// Flush into `target`
    pub fn apply<W: StateWrite>(self, target: &mut W) {
        for (_, coin) in self.coins {
            target.set_coin(coin);
        }
        for ((account, coin), amount) in self.balances {
            target.set_balance(&account, coin, amount);
        }
        for (account, nonce) in self.nonces {
            target.set_nonce(&account, nonce);
        }
        for (_, multisig) in self.multisigs {
            target.set_multisig(multisig);
        }
        for (_, pool) in self.pools {
            target.set_pool(pool);
        }
        for ((pool_id, account), amount) in self.liquidity {
            target.set_liquidity(pool_id, &account, amount);
        }
        for (id, order) in self.orders {
            match order {
                Some(order) => target.set_order(order),
                None => target.remove_order(id),
            }
        }
        if let Some(price) = self.commission_price {
            target.set_commission_price(price);
        }
        if let Some(id) = self.last_pool_id {
            target.set_last_pool_id(id);
        }
        if let Some(id) = self.last_order_id {
            target.set_last_order_id(id);
        }
    }
}

pub struct Overlay<'a, R: StateRead> {
    base: &'a R,
    changes: ChangeSet,
}

impl<'a, R: StateRead> Overlay<'a, R> {
    pub fn new(base: &'a R) -> Self {
        Self {
            base,
            changes: ChangeSet::default(),
        }
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}

impl<R: StateRead> StateRead for Overlay<'_, R> {
    fn coin(&self, id: CoinId) -> Option<Coin> {
        match self.changes.coins.get(&id) {
            Some(coin) => Some(coin.clone()),
            None => self.base.coin(id),
        }
    }

    fn balance(&self, account: &AccountId, coin: CoinId) -> Amount {
        match self.changes.balances.get(&(*account, coin)) {
            Some(amount) => amount.clone(),
            None => self.base.balance(account, coin),
        }
    }

    fn nonce(&self, account: &AccountId) -> Nonce {
        match self.changes.nonces.get(account) {
            Some(nonce) => *nonce,
            None => self.base.nonce(account),
        }
    }

    fn multisig(&self, address: &AccountId) -> Option<Multisig> {
        match self.changes.multisigs.get(address) {
            Some(multisig) => Some(multisig.clone()),
            None => self.base.multisig(address),
        }
    }

    fn pool(&self, id: PoolId) -> Option<Pool> {
        match self.changes.pools.get(&id) {
            Some(pool) => Some(pool.clone()),
            None => self.base.pool(id),
        }
    }

    fn pool_id_by_pair(&self, a: CoinId, b: CoinId) -> Option<PoolId> {
        if let Some(id) = self.base.pool_id_by_pair(a, b) {
            return Some(id);
        }
        let (coin0, coin1) = Pool::sorted_pair(a, b);
        self.changes
            .pools
            .values()
            .find(|p| p.coin0 == coin0 && p.coin1 == coin1)
            .map(|p| p.id)
    }

    fn liquidity(&self, pool_id: PoolId, account: &AccountId) -> Amount {
        match self.changes.liquidity.get(&(pool_id, *account)) {
            Some(amount) => amount.clone(),
            None => self.base.liquidity(pool_id, account),
        }
    }

    fn order(&self, id: OrderId) -> Option<LimitOrder> {
        match self.changes.orders.get(&id) {
            Some(order) => order.clone(),
            None => self.base.order(id),
        }
    }

    fn orders_for_pool(&self, pool_id: PoolId) -> Vec<LimitOrder> {
        let mut orders: BTreeMap<OrderId, LimitOrder> = self
            .base
            .orders_for_pool(pool_id)
            .into_iter()
            .map(|o| (o.id, o))
            .collect();
        for (id, change) in &self.changes.orders {
            match change {
                Some(order) if order.pool_id == pool_id => {
                    orders.insert(*id, order.clone());
                }
                _ => {
                    orders.remove(id);
                }
            }
        }
        orders.into_values().collect()
    }

    fn commission_price(&self) -> CommissionPrice {
        match &self.changes.commission_price {
            Some(price) => price.clone(),
            None => self.base.commission_price(),
        }
    }

    fn last_pool_id(&self) -> PoolId {
        self.changes.last_pool_id.unwrap_or_else(|| self.base.last_pool_id())
    }

    fn last_order_id(&self) -> OrderId {
        self.changes.last_order_id.unwrap_or_else(|| self.base.last_order_id())
    }
}

impl<R: StateRead> StateWrite for Overlay<'_, R> {
    fn set_coin(&mut self, coin: Coin) {
        self.changes.coins.insert(coin.id, coin);
    }

    fn set_balance(&mut self, account: &AccountId, coin: CoinId, amount: Amount) {
        self.changes.balances.insert((*account, coin), amount);
    }

    fn set_nonce(&mut self, account: &AccountId, nonce: Nonce) {
        self.changes.nonces.insert(*account, nonce);
    }

    fn set_multisig(&mut self, multisig: Multisig) {
        self.changes.multisigs.insert(multisig.address, multisig);
    }

    fn set_pool(&mut self, pool: Pool) {
        self.changes.pools.insert(pool.id, pool);
    }

    fn set_liquidity(&mut self, pool_id: PoolId, account: &AccountId, amount: Amount) {
        self.changes.liquidity.insert((pool_id, *account), amount);
    }

    fn set_order(&mut self, order: LimitOrder) {
        self.changes.orders.insert(order.id, Some(order));
    }

    fn remove_order(&mut self, id: OrderId) {
        self.changes.orders.insert(id, None);
    }

    fn set_commission_price(&mut self, price: CommissionPrice) {
        self.changes.commission_price = Some(price);
    }

    fn set_last_pool_id(&mut self, id: PoolId) {
        self.changes.last_pool_id = Some(id);
    }

    fn set_last_order_id(&mut self, id: OrderId) {
        self.changes.last_order_id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDb;
    use crate::types::coins;

    fn account() -> AccountId {
        AccountId::from_bytes([7u8; 32])
    }

    #[test]
    fn test_reads_fall_through_and_writes_stay_local() {
        let mut base = StateDb::new();
        base.set_balance(&account(), CoinId::BASE, coins(10));

        let mut overlay = Overlay::new(&base);
        assert_eq!(overlay.balance(&account(), CoinId::BASE), coins(10));
        overlay.set_balance(&account(), CoinId::BASE, coins(3));
        overlay.set_nonce(&account(), 1);
        assert_eq!(overlay.balance(&account(), CoinId::BASE), coins(3));

        drop(overlay);
        assert_eq!(base.balance(&account(), CoinId::BASE), coins(10));
        assert_eq!(base.nonce(&account()), 0);
    }

    #[test]
    fn test_changeset_applies() {
        let mut base = StateDb::new();
        base.set_balance(&account(), CoinId::BASE, coins(10));

        let changes = {
            let mut overlay = Overlay::new(&base);
            overlay.sub_balance(&account(), CoinId::BASE, &coins(4)).unwrap();
            overlay.set_nonce(&account(), 1);
            let pool = overlay.create_pool(CoinId(0), CoinId(1), coins(1), coins(1));
            assert_eq!(overlay.pool_by_pair(CoinId(1), CoinId(0)), Some(pool));
            overlay.into_changes()
        };
        assert!(!changes.is_empty());
        changes.apply(&mut base);

        assert_eq!(base.balance(&account(), CoinId::BASE), coins(6));
        assert_eq!(base.nonce(&account()), 1);
        assert_eq!(base.last_pool_id(), 1);
        assert!(base.pool_by_pair(CoinId(0), CoinId(1)).is_some());
    }

    #[test]
    fn test_removed_order_hidden() {
        let mut base = StateDb::new();
        base.set_order(LimitOrder {
            id: 1,
            owner: account(),
            pool_id: 1,
            coin_to_sell: CoinId(1),
            coin_to_buy: CoinId(0),
            want_sell: coins(1),
            want_buy: coins(1),
            height: 1,
        });
        let mut overlay = Overlay::new(&base);
        overlay.remove_order(1);
        assert!(overlay.order(1).is_none());
        assert!(overlay.orders_for_pool(1).is_empty());
        assert_eq!(base.orders_for_pool(1).len(), 1);
    }
}
