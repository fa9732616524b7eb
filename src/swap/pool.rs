// Pool - Constant-product AMM pair
//
// Pricing functions are pure; `settle` is the only mutation and it refuses
// to leave the pool with a smaller fee-netted constant product.

use crate::fault::ProtocolFault;
use crate::types::{amount_serde, Amount, CoinId};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

pub type PoolId = u32;

/// Swap fee, charged on the input side: 2/1000 = 0.2%
pub const FEE_NUMERATOR: u32 = 2;
pub const FEE_DENOMINATOR: u32 = 1000;

/// Liquidity locked forever at pool creation
pub const MINIMUM_LIQUIDITY: u64 = 1000;

fn fee_den() -> BigUint {
    BigUint::from(FEE_DENOMINATOR)
}

fn fee_num() -> BigUint {
    BigUint::from(FEE_NUMERATOR)
}

/// Output for an exact input against reserves `(r_in, r_out)`.
/// `None` when the trade yields nothing.
pub fn amount_out(r_in: &Amount, r_out: &Amount, amount_in: &Amount) -> Option<Amount> {
    if amount_in.is_zero() || r_in.is_zero() || r_out.is_zero() {
        return None;
    }
    let k_adjusted = r_in * r_out * fee_den() * fee_den();
    let balance_in_adjusted = (amount_in + r_in) * fee_den() - amount_in * fee_num();
    let remaining_out = k_adjusted / (balance_in_adjusted * fee_den());
    if &remaining_out >= r_out {
        return None;
    }
    let out = r_out - remaining_out;
    if out <= BigUint::one() {
        return None;
    }
    Some(out - BigUint::one())
}

/// Input required for an exact output against reserves `(r_in, r_out)`.
/// `None` when the output is not strictly below the output reserve.
pub fn amount_in(r_in: &Amount, r_out: &Amount, amount_out: &Amount) -> Option<Amount> {
    if amount_out.is_zero() || amount_out >= r_out || r_in.is_zero() {
        return None;
    }
    let k_adjusted = r_in * r_out * fee_den() * fee_den();
    let balance_out_adjusted = (r_out - amount_out) * fee_den();
    let required = k_adjusted / balance_out_adjusted;
    let current = r_in * fee_den();
    let delta = if required > current {
        required - current
    } else {
        BigUint::zero()
    };
    Some(delta / (fee_den() - fee_num()) + BigUint::one())
}

/// A liquidity pair. `coin0 < coin1` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub coin0: CoinId,
    pub coin1: CoinId,
    #[serde(with = "amount_serde")]
    pub reserve0: Amount,
    #[serde(with = "amount_serde")]
    pub reserve1: Amount,
    /// Total liquidity shares, including the locked minimum
    #[serde(with = "amount_serde")]
    pub liquidity: Amount,
}

impl Pool {
    /// Create a pool from volumes given in any coin order
    pub fn new(id: PoolId, coin_a: CoinId, coin_b: CoinId, volume_a: Amount, volume_b: Amount) -> Self {
        let liquidity = (&volume_a * &volume_b).sqrt();
        let (coin0, coin1, reserve0, reserve1) = if coin_a < coin_b {
            (coin_a, coin_b, volume_a, volume_b)
        } else {
            (coin_b, coin_a, volume_b, volume_a)
        };
        Self {
            id,
            coin0,
            coin1,
            reserve0,
            reserve1,
            liquidity,
        }
    }

    /// Key under which the pair is registered
    pub fn sorted_pair(a: CoinId, b: CoinId) -> (CoinId, CoinId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn contains(&self, coin: CoinId) -> bool {
        self.coin0 == coin || self.coin1 == coin
    }

    pub fn reserve_of(&self, coin: CoinId) -> Option<&Amount> {
        if coin == self.coin0 {
            Some(&self.reserve0)
        } else if coin == self.coin1 {
            Some(&self.reserve1)
        } else {
            None
        }
    }

    /// Reserves oriented as (input side, output side)
    pub fn reserves_for(&self, coin_in: CoinId) -> Option<(&Amount, &Amount)> {
        if coin_in == self.coin0 {
            Some((&self.reserve0, &self.reserve1))
        } else if coin_in == self.coin1 {
            Some((&self.reserve1, &self.reserve0))
        } else {
            None
        }
    }

    /// Constant product
    pub fn k(&self) -> Amount {
        &self.reserve0 * &self.reserve1
    }

    /// Amount of the other coin received for selling `amount_in` of `coin_in`
    pub fn buy_for_sell(&self, coin_in: CoinId, amount_in: &Amount) -> Option<Amount> {
        let (r_in, r_out) = self.reserves_for(coin_in)?;
        amount_out(r_in, r_out, amount_in)
    }

    /// Amount of `coin_in` needed to receive `amount_out` of the other coin
    pub fn sell_for_buy(&self, coin_in: CoinId, amount_out: &Amount) -> Option<Amount> {
        let (r_in, r_out) = self.reserves_for(coin_in)?;
        amount_in(r_in, r_out, amount_out)
    }

    /// Output obtainable on the curve before the fee-inclusive marginal
    /// price (in per out) reaches `price_num / price_den`.
    pub fn curve_capacity(&self, coin_in: CoinId, price_num: &Amount, price_den: &Amount) -> Amount {
        let Some((r_in, r_out)) = self.reserves_for(coin_in) else {
            return BigUint::zero();
        };
        if price_num.is_zero() {
            return BigUint::zero();
        }
        let numerator = r_in * r_out * price_den * fee_den();
        let denominator = price_num * (fee_den() - fee_num());
        let target_out = (numerator / denominator).sqrt();
        if target_out.is_zero() || &target_out >= r_out {
            BigUint::zero()
        } else {
            r_out - target_out
        }
    }

    /// True when selling `want_sell` of `coin_sell` for `want_buy` of the
    /// other coin asks at least the pool's current price.
    pub fn accepts_order_price(&self, coin_sell: CoinId, want_sell: &Amount, want_buy: &Amount) -> bool {
        let Some((r_sell, r_buy)) = self.reserves_for(coin_sell) else {
            return false;
        };
        want_buy * r_sell >= r_buy * want_sell
    }

    /// Apply a trade: `+amount_in` on the `coin_in` side, `-amount_out` on
    /// the other. Fails loudly if the fee-netted K would decrease.
    pub fn settle(&mut self, coin_in: CoinId, amount_in: &Amount, amount_out: &Amount) -> Result<(), ProtocolFault> {
        let (r_in, r_out) = match self.reserves_for(coin_in) {
            Some((r_in, r_out)) => (r_in.clone(), r_out.clone()),
            None => {
                return Err(ProtocolFault::Inconsistent(format!(
                    "coin {} is not part of pool {}",
                    coin_in, self.id
                )))
            }
        };
        if amount_out >= &r_out {
            return Err(ProtocolFault::ReserveExhausted {
                pool_id: self.id,
                reserve: r_out,
                amount_out: amount_out.clone(),
            });
        }

        let new_in = &r_in + amount_in;
        let new_out = &r_out - amount_out;

        let adjusted_in = &new_in * fee_den() - amount_in * fee_num();
        let adjusted_out = &new_out * fee_den();
        let k_before = &r_in * &r_out;
        if adjusted_in * adjusted_out < &k_before * fee_den() * fee_den() {
            return Err(ProtocolFault::KInvariant {
                pool_id: self.id,
                k_before,
                k_after: &new_in * &new_out,
            });
        }

        if coin_in == self.coin0 {
            self.reserve0 = new_in;
            self.reserve1 = new_out;
        } else {
            self.reserve1 = new_in;
            self.reserve0 = new_out;
        }
        Ok(())
    }

    // ===== Liquidity =====

    /// For a deposit of `volume` of `coin`: the volume of the other coin
    /// required alongside it, and the liquidity minted
    pub fn deposit_for(&self, coin: CoinId, volume: &Amount) -> Option<(Amount, Amount)> {
        let (reserve, reserve_other) = self.reserves_for(coin)?;
        if reserve.is_zero() {
            return None;
        }
        let other = volume * reserve_other / reserve + BigUint::one();
        let liquidity = volume * &self.liquidity / reserve;
        Some((other, liquidity))
    }

    /// Volumes (coin0, coin1) returned for burning `liquidity` shares
    pub fn amounts_for(&self, liquidity: &Amount) -> (Amount, Amount) {
        if self.liquidity.is_zero() {
            return (BigUint::zero(), BigUint::zero());
        }
        (
            liquidity * &self.reserve0 / &self.liquidity,
            liquidity * &self.reserve1 / &self.liquidity,
        )
    }

    /// Add a deposit of `volume` of `coin` plus `other_volume` of the other coin
    pub fn mint(&mut self, coin: CoinId, volume: &Amount, other_volume: &Amount, liquidity: &Amount) {
        if coin == self.coin0 {
            self.reserve0 += volume;
            self.reserve1 += other_volume;
        } else {
            self.reserve1 += volume;
            self.reserve0 += other_volume;
        }
        self.liquidity += liquidity;
    }

    /// Remove liquidity; the caller has validated the amounts
    pub fn burn(&mut self, volume0: &Amount, volume1: &Amount, liquidity: &Amount) -> Result<(), ProtocolFault> {
        if volume0 >= &self.reserve0 || volume1 >= &self.reserve1 || liquidity >= &self.liquidity {
            return Err(ProtocolFault::ReserveExhausted {
                pool_id: self.id,
                reserve: self.liquidity.clone(),
                amount_out: liquidity.clone(),
            });
        }
        self.reserve0 -= volume0;
        self.reserve1 -= volume1;
        self.liquidity -= liquidity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::coins;

    fn pool_10_10() -> Pool {
        Pool::new(1, CoinId(0), CoinId(1), coins(10), coins(10))
    }

    #[test]
    fn test_new_pool_sorts_coins() {
        let pool = Pool::new(1, CoinId(5), CoinId(2), coins(1), coins(4));
        assert_eq!(pool.coin0, CoinId(2));
        assert_eq!(pool.coin1, CoinId(5));
        assert_eq!(pool.reserve0, coins(4));
        assert_eq!(pool.reserve1, coins(1));
        assert_eq!(pool.liquidity, coins(2));
    }

    #[test]
    fn test_buy_for_sell_charges_fee() {
        let pool = pool_10_10();
        let out = pool.buy_for_sell(CoinId(0), &coins(1)).unwrap();
        // Without fee: 10 - 100/11 = 0.909...; with 0.2% fee strictly less
        assert!(out < coins(10) - coins(100) / 11u32);
        assert!(out > coins(9) / 10u32);
    }

    #[test]
    fn test_sell_for_buy_rejects_full_reserve() {
        let pool = pool_10_10();
        assert!(pool.sell_for_buy(CoinId(0), &coins(10)).is_none());
        assert!(pool.sell_for_buy(CoinId(0), &coins(11)).is_none());
        assert!(pool.sell_for_buy(CoinId(0), &Amount::zero()).is_none());
    }

    #[test]
    fn test_sell_for_buy_is_enough_to_buy() {
        let pool = pool_10_10();
        let want = coins(3);
        let needed = pool.sell_for_buy(CoinId(0), &want).unwrap();
        let got = pool.buy_for_sell(CoinId(0), &needed).unwrap();
        assert!(got + BigUint::from(2u32) >= want);
    }

    #[test]
    fn test_unknown_coin_has_no_price() {
        let pool = pool_10_10();
        assert!(pool.buy_for_sell(CoinId(7), &coins(1)).is_none());
    }

    #[test]
    fn test_settle_keeps_k() {
        let mut pool = pool_10_10();
        let k_before = pool.k();
        let out = pool.buy_for_sell(CoinId(0), &coins(2)).unwrap();
        pool.settle(CoinId(0), &coins(2), &out).unwrap();
        assert!(pool.k() >= k_before);
        assert_eq!(pool.reserve0, coins(12));
    }

    #[test]
    fn test_settle_rejects_k_decrease() {
        let mut pool = pool_10_10();
        let err = pool.settle(CoinId(0), &coins(1), &coins(1)).unwrap_err();
        assert!(matches!(err, ProtocolFault::KInvariant { pool_id: 1, .. }));
        // Pool untouched after a fault
        assert_eq!(pool.reserve0, coins(10));
    }

    #[test]
    fn test_settle_rejects_draining_reserve() {
        let mut pool = pool_10_10();
        let err = pool.settle(CoinId(1), &coins(100), &coins(10)).unwrap_err();
        assert!(matches!(err, ProtocolFault::ReserveExhausted { .. }));
    }

    #[test]
    fn test_curve_capacity_moves_to_price() {
        let pool = pool_10_10();
        // Price 3 coin0 per coin1: reserves move to about (17.3, 5.77)
        let cap = pool.curve_capacity(CoinId(0), &coins(15), &coins(5));
        assert!(cap > coins(4) && cap < coins(5));
        // Price below the current one: nothing to take from the curve
        let none = pool.curve_capacity(CoinId(0), &coins(1), &coins(2));
        assert!(none.is_zero());
    }

    #[test]
    fn test_accepts_order_price() {
        let pool = pool_10_10();
        // Selling coin1 at 3 coin0 each: above pool price, accepted
        assert!(pool.accepts_order_price(CoinId(1), &coins(5), &coins(15)));
        // Selling coin1 at 0.5 coin0 each: below pool price, rejected
        assert!(!pool.accepts_order_price(CoinId(1), &coins(10), &coins(5)));
    }

    #[test]
    fn test_liquidity_roundtrip() {
        let mut pool = pool_10_10();
        let (volume1, minted) = pool.deposit_for(CoinId(0), &coins(5)).unwrap();
        assert_eq!(minted, coins(5));
        pool.mint(CoinId(0), &coins(5), &volume1, &minted);
        let (a0, a1) = pool.amounts_for(&minted);
        assert!(a0 <= coins(5));
        assert!(a1 <= volume1);
        pool.burn(&a0, &a1, &minted).unwrap();
        assert_eq!(pool.liquidity, coins(10));
    }
}
