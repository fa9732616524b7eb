// Orders - Resting limit orders against a pool

use super::pool::PoolId;
use crate::types::{amount_serde, div_ceil, AccountId, Amount, BlockNumber, CoinId};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type OrderId = u64;

/// Remaining volume under which a partially filled order is force-closed
/// (10^10 units)
pub fn order_dust() -> Amount {
    BigUint::from(10u64.pow(10))
}

/// A standing offer: sell `want_sell` of `coin_to_sell` for `want_buy` of
/// `coin_to_buy`. Both volumes shrink as the order is filled; `want_sell`
/// is held in escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: OrderId,
    pub owner: AccountId,
    pub pool_id: PoolId,
    pub coin_to_sell: CoinId,
    pub coin_to_buy: CoinId,
    #[serde(with = "amount_serde")]
    pub want_sell: Amount,
    #[serde(with = "amount_serde")]
    pub want_buy: Amount,
    pub height: BlockNumber,
}

impl LimitOrder {
    /// Order priority for a taker: lowest `want_buy / want_sell` first,
    /// then first-come.
    pub fn taker_cmp(&self, other: &LimitOrder) -> Ordering {
        let lhs = &self.want_buy * &other.want_sell;
        let rhs = &other.want_buy * &self.want_sell;
        lhs.cmp(&rhs).then(self.id.cmp(&other.id))
    }

    /// Escrow released for paying `amount_in` of `coin_to_buy`, rounded down
    pub fn out_for_in(&self, amount_in: &Amount) -> Amount {
        if self.want_buy.is_zero() {
            return BigUint::zero();
        }
        amount_in * &self.want_sell / &self.want_buy
    }

    /// Payment owed for taking `amount_out` of escrow, rounded up
    pub fn in_for_out(&self, amount_out: &Amount) -> Amount {
        if self.want_sell.is_zero() {
            return BigUint::zero();
        }
        div_ceil(&(amount_out * &self.want_buy), &self.want_sell)
    }

    pub fn is_dust(&self) -> bool {
        let dust = order_dust();
        self.want_sell < dust || self.want_buy < dust
    }

    /// Apply a fill in place and report how the order ends up
    pub fn fill(&mut self, amount_in: &Amount, amount_out: &Amount) -> FillResult {
        self.want_buy = if amount_in >= &self.want_buy {
            BigUint::zero()
        } else {
            &self.want_buy - amount_in
        };
        self.want_sell = if amount_out >= &self.want_sell {
            BigUint::zero()
        } else {
            &self.want_sell - amount_out
        };

        if self.want_buy.is_zero() || self.want_sell.is_zero() {
            FillResult::Filled {
                refund: std::mem::take(&mut self.want_sell),
            }
        } else if self.is_dust() {
            FillResult::Expired {
                refund: std::mem::take(&mut self.want_sell),
            }
        } else {
            FillResult::Partial
        }
    }
}

/// State of an order after a fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillResult {
    Partial,
    /// Fully filled; any rounding leftover is returned to the owner
    Filled { refund: Amount },
    /// Remainder fell under the dust threshold and was closed
    Expired { refund: Amount },
}

impl FillResult {
    pub fn is_closed(&self) -> bool {
        !matches!(self, FillResult::Partial)
    }

    pub fn refund(&self) -> Option<&Amount> {
        match self {
            FillResult::Partial => None,
            FillResult::Filled { refund } | FillResult::Expired { refund } => Some(refund),
        }
    }
}

/// Orders a taker selling `coin_in` would cross, best price first
pub fn crossing_orders(orders: &[LimitOrder], coin_in: CoinId) -> Vec<LimitOrder> {
    let mut crossing: Vec<LimitOrder> = orders
        .iter()
        .filter(|o| o.coin_to_buy == coin_in && !o.want_sell.is_zero())
        .cloned()
        .collect();
    crossing.sort_by(|a, b| a.taker_cmp(b));
    crossing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::coins;

    fn order(id: OrderId, sell: u64, buy: u64) -> LimitOrder {
        LimitOrder {
            id,
            owner: AccountId::from_bytes([9u8; 32]),
            pool_id: 1,
            coin_to_sell: CoinId(1),
            coin_to_buy: CoinId(0),
            want_sell: coins(sell),
            want_buy: coins(buy),
            height: 1,
        }
    }

    #[test]
    fn test_best_price_first_then_id() {
        let orders = vec![order(3, 5, 15), order(1, 5, 20), order(2, 10, 30), order(4, 1, 2)];
        let sorted: Vec<_> = crossing_orders(&orders, CoinId(0)).iter().map(|o| o.id).collect();
        assert_eq!(sorted, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_crossing_filters_direction() {
        let orders = vec![order(1, 5, 15)];
        assert!(crossing_orders(&orders, CoinId(1)).is_empty());
    }

    #[test]
    fn test_fill_rounding() {
        let o = order(1, 5, 15);
        assert_eq!(o.out_for_in(&coins(3)), coins(1));
        assert_eq!(o.in_for_out(&coins(1)), coins(3));
        assert_eq!(o.in_for_out(&BigUint::from(1u32)), BigUint::from(3u32));
    }

    #[test]
    fn test_partial_fill_keeps_order() {
        let mut o = order(1, 5, 15);
        let result = o.fill(&coins(3), &coins(1));
        assert_eq!(result, FillResult::Partial);
        assert_eq!(o.want_sell, coins(4));
        assert_eq!(o.want_buy, coins(12));
    }

    #[test]
    fn test_full_fill_closes() {
        let mut o = order(1, 5, 15);
        let result = o.fill(&coins(15), &coins(5));
        assert_eq!(result, FillResult::Filled { refund: BigUint::zero() });
    }

    #[test]
    fn test_dust_remainder_expires() {
        let mut o = order(1, 5, 15);
        let almost = coins(15) - BigUint::from(30u32);
        let out = o.out_for_in(&almost);
        let result = o.fill(&almost, &out);
        assert!(matches!(result, FillResult::Expired { .. }));
        assert!(result.is_closed());
        assert_eq!(result.refund(), Some(&BigUint::from(10u32)));
        assert!(o.want_sell.is_zero());
    }
}
