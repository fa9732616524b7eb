// Price - Governance commission table

use crate::types::{amount_serde, Amount, CoinId};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Per-kind base fees, denominated in `coin`. Immutable while a transaction
/// is being priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPrice {
    pub coin: CoinId,
    #[serde(with = "amount_serde")]
    pub payload_byte: Amount,
    #[serde(with = "amount_serde")]
    pub send: Amount,
    #[serde(with = "amount_serde")]
    pub create_multisig: Amount,
    #[serde(with = "amount_serde")]
    pub create_swap_pool: Amount,
    #[serde(with = "amount_serde")]
    pub add_liquidity: Amount,
    #[serde(with = "amount_serde")]
    pub remove_liquidity: Amount,
    #[serde(with = "amount_serde")]
    pub sell_pool_base: Amount,
    #[serde(with = "amount_serde")]
    pub sell_pool_delta: Amount,
    #[serde(with = "amount_serde")]
    pub buy_pool_base: Amount,
    #[serde(with = "amount_serde")]
    pub buy_pool_delta: Amount,
    #[serde(with = "amount_serde")]
    pub sell_all_pool_base: Amount,
    #[serde(with = "amount_serde")]
    pub sell_all_pool_delta: Amount,
    #[serde(with = "amount_serde")]
    pub add_limit_order: Amount,
    #[serde(with = "amount_serde")]
    pub remove_limit_order: Amount,
    #[serde(with = "amount_serde")]
    pub failed_tx: Amount,
}

/// `milli` thousandths of a coin
fn milli(milli: u64) -> Amount {
    BigUint::from(milli) * BigUint::from(10u64.pow(15))
}

impl Default for CommissionPrice {
    fn default() -> Self {
        Self {
            coin: CoinId::BASE,
            payload_byte: milli(2),
            send: milli(10),
            create_multisig: milli(100),
            create_swap_pool: milli(1_000),
            add_liquidity: milli(100),
            remove_liquidity: milli(100),
            sell_pool_base: milli(100),
            sell_pool_delta: milli(50),
            buy_pool_base: milli(100),
            buy_pool_delta: milli(50),
            sell_all_pool_base: milli(100),
            sell_all_pool_delta: milli(50),
            add_limit_order: milli(100),
            remove_limit_order: milli(100),
            failed_tx: milli(10),
        }
    }
}

impl CommissionPrice {
    /// Base fee of a multi-hop swap: `base + delta * (hops - 1)`
    pub fn route_fee(base: &Amount, delta: &Amount, coins_in_route: usize) -> Amount {
        let extra_hops = coins_in_route.saturating_sub(2);
        base + delta * BigUint::from(extra_hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_fee() {
        let price = CommissionPrice::default();
        assert_eq!(
            CommissionPrice::route_fee(&price.sell_pool_base, &price.sell_pool_delta, 2),
            price.sell_pool_base
        );
        assert_eq!(
            CommissionPrice::route_fee(&price.sell_pool_base, &price.sell_pool_delta, 4),
            milli(200)
        );
    }

    #[test]
    fn test_json_amounts_are_strings() {
        let json = serde_json::to_value(CommissionPrice::default()).unwrap();
        assert_eq!(json["send"], "10000000000000000");
        let back: CommissionPrice = serde_json::from_value(json).unwrap();
        assert_eq!(back, CommissionPrice::default());
    }
}
