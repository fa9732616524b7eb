// Commission - Fee pricing and collection
//
// Fees are set in the governance table, converted to the base coin, then
// priced in the sender's gas coin. A non-base gas coin is paid either by
// trading it through its base pool or by selling it against its own
// bancor reserve, whichever is cheaper.

pub mod bancor;
pub mod price;

pub use price::CommissionPrice;

use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::swap::{apply_plan, plan_buy, plan_sell, OrderFill, SwapError, TradePlan};
use crate::types::{checked_sub, coin::min_coin_reserve, AccountId, Amount, Coin, CoinId};
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;
use tracing::trace;

/// How a commission reaches the base coin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    None,
    Pool,
    Bancor,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Conversion::None => write!(f, "none"),
            Conversion::Pool => write!(f, "pool"),
            Conversion::Bancor => write!(f, "bancor"),
        }
    }
}

/// A priced fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commission {
    /// Coin the sender pays in
    pub coin: CoinId,
    /// Amount debited from the sender
    pub amount: Amount,
    /// Base-coin value realized by the conversion
    pub base: Amount,
    pub conversion: Conversion,
    /// Pool trade for `Conversion::Pool`
    pub plan: Option<TradePlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommissionError {
    #[error("coin {coin} does not exist")]
    CoinNotExists { coin: CoinId },

    #[error("not enough liquidity to pay {base} base units of commission in coin {coin}")]
    NotSufficient { coin: CoinId, base: Amount },

    #[error("selling coin {coin} for commission would leave reserve {reserve} under {min_reserve}")]
    ReserveUnderflow {
        coin: CoinId,
        reserve: Amount,
        min_reserve: Amount,
    },

    #[error(transparent)]
    Fault(#[from] ProtocolFault),
}

/// Fee in table units: `(base + payload bytes * per-byte) * gas price`
pub fn fee_units(price: &CommissionPrice, commission_base: &Amount, payload_len: usize, gas_price: u64) -> Amount {
    let payload_fee = &price.payload_byte * BigUint::from(payload_len);
    (commission_base + payload_fee) * BigUint::from(gas_price)
}

/// Convert an amount in the table's denomination to the base coin through
/// that coin's base pool (curve only).
pub fn table_to_base<S: StateRead>(state: &S, price: &CommissionPrice, units: &Amount) -> Result<Amount, CommissionError> {
    if price.coin.is_base() || units.is_zero() {
        return Ok(units.clone());
    }
    state
        .pool_by_pair(price.coin, CoinId::BASE)
        .and_then(|pool| pool.buy_for_sell(price.coin, units))
        .ok_or(CommissionError::NotSufficient {
            coin: price.coin,
            base: units.clone(),
        })
}

fn bancor_quote(coin: &Coin, base: &Amount) -> Result<Amount, CommissionError> {
    let min_reserve = min_coin_reserve();
    if coin.reserve < base + &min_reserve {
        return Err(CommissionError::ReserveUnderflow {
            coin: coin.id,
            reserve: coin.reserve.clone(),
            min_reserve,
        });
    }
    bancor::calculate_sale_amount(&coin.volume, &coin.reserve, coin.crr, base).ok_or(
        CommissionError::NotSufficient {
            coin: coin.id,
            base: base.clone(),
        },
    )
}

fn pool_quote<S: StateRead>(state: &S, coin: CoinId, base: &Amount, with_orders: bool) -> Result<Option<TradePlan>, ProtocolFault> {
    if state.pool_by_pair(coin, CoinId::BASE).is_none() {
        return Ok(None);
    }
    match plan_buy(state, &[coin, CoinId::BASE], base, with_orders) {
        Ok(plan) => Ok(Some(plan)),
        Err(SwapError::Fault(fault)) => Err(fault),
        Err(_) => Ok(None),
    }
}

/// Price `base` (base units) in `gas_coin`
pub fn calculate<S: StateRead>(state: &S, gas_coin: CoinId, base: &Amount, with_orders: bool) -> Result<Commission, CommissionError> {
    let coin = state
        .coin(gas_coin)
        .ok_or(CommissionError::CoinNotExists { coin: gas_coin })?;

    if gas_coin.is_base() || base.is_zero() {
        return Ok(Commission {
            coin: gas_coin,
            amount: base.clone(),
            base: base.clone(),
            conversion: Conversion::None,
            plan: None,
        });
    }

    let pool = pool_quote(state, gas_coin, base, with_orders)?;
    let bancor = if coin.has_reserve() {
        Some(bancor_quote(&coin, base))
    } else {
        None
    };

    let commission = match (pool, bancor) {
        (Some(plan), Some(Ok(amount))) if amount <= plan.amount_in => Commission {
            coin: gas_coin,
            amount,
            base: base.clone(),
            conversion: Conversion::Bancor,
            plan: None,
        },
        (Some(plan), _) => Commission {
            coin: gas_coin,
            amount: plan.amount_in.clone(),
            base: plan.amount_out.clone(),
            conversion: Conversion::Pool,
            plan: Some(plan),
        },
        (None, Some(Ok(amount))) => Commission {
            coin: gas_coin,
            amount,
            base: base.clone(),
            conversion: Conversion::Bancor,
            plan: None,
        },
        (None, Some(Err(err))) => return Err(err),
        (None, None) => {
            return Err(CommissionError::NotSufficient {
                coin: gas_coin,
                base: base.clone(),
            })
        }
    };
    trace!(coin = %gas_coin, amount = %commission.amount, conversion = %commission.conversion, "commission priced");
    Ok(commission)
}

impl Commission {
    /// Shrink the commission to what the sender can pay, re-pricing the
    /// base value actually realized. `None` when nothing can be collected.
    pub fn clamp_to<S: StateRead>(self, state: &S, available: &Amount, with_orders: bool) -> Result<Option<Commission>, ProtocolFault> {
        if available.is_zero() {
            return Ok(None);
        }
        if &self.amount <= available {
            return Ok(Some(self));
        }
        let clamped = match self.conversion {
            Conversion::None => Some(Commission {
                amount: available.clone(),
                base: available.clone(),
                ..self
            }),
            Conversion::Pool => match plan_sell(state, &[self.coin, CoinId::BASE], available, with_orders) {
                Ok(plan) => Some(Commission {
                    amount: available.clone(),
                    base: plan.amount_out.clone(),
                    plan: Some(plan),
                    ..self
                }),
                Err(SwapError::Fault(fault)) => return Err(fault),
                Err(_) => None,
            },
            Conversion::Bancor => state
                .coin(self.coin)
                .and_then(|coin| bancor::calculate_sale_return(&coin.volume, &coin.reserve, coin.crr, available))
                .map(|base| Commission {
                    amount: available.clone(),
                    base,
                    ..self
                }),
        };
        Ok(clamped)
    }

    /// Order fills of the pool conversion, settled by `apply`
    pub fn fills(&self) -> impl Iterator<Item = &OrderFill> {
        self.plan.iter().flat_map(|plan| plan.fills())
    }

    /// Collect the commission from `sender`; the base value goes to `rewards`
    pub fn apply<S: StateWrite>(&self, state: &mut S, sender: &AccountId, rewards: &mut Amount) -> Result<(), ProtocolFault> {
        state.sub_balance(sender, self.coin, &self.amount)?;
        match self.conversion {
            Conversion::None => {
                *rewards += &self.amount;
            }
            Conversion::Pool => {
                let plan = self
                    .plan
                    .as_ref()
                    .ok_or_else(|| ProtocolFault::Inconsistent("pool commission without plan".into()))?;
                apply_plan(state, plan)?;
                *rewards += &plan.amount_out;
            }
            Conversion::Bancor => {
                let mut coin = state
                    .coin(self.coin)
                    .ok_or_else(|| ProtocolFault::Inconsistent(format!("coin {} vanished", self.coin)))?;
                coin.volume = checked_sub(&coin.volume, &self.amount)
                    .ok_or_else(|| ProtocolFault::Inconsistent(format!("coin {} volume underflow", self.coin)))?;
                coin.reserve = checked_sub(&coin.reserve, &self.base)
                    .ok_or_else(|| ProtocolFault::Inconsistent(format!("coin {} reserve underflow", self.coin)))?;
                state.set_coin(coin);
                *rewards += &self.base;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDb;
    use crate::tests::support::{bancor_coin, token};
    use crate::types::coins;

    fn state() -> StateDb {
        let mut state = StateDb::default();
        state.set_coin(Coin::base("AGR", coins(1_000_000)));
        state.set_coin(token(1, "POOL"));
        state.set_coin(bancor_coin(2, "BNC", coins(1_000), coins(500), 50));
        state.set_coin(token(3, "LONE"));
        state.create_pool(CoinId(1), CoinId::BASE, coins(1_000), coins(1_000));
        state
    }

    #[test]
    fn test_base_coin_needs_no_conversion() {
        let commission = calculate(&state(), CoinId::BASE, &coins(1), true).unwrap();
        assert_eq!(commission.amount, coins(1));
        assert_eq!(commission.conversion, Conversion::None);
    }

    #[test]
    fn test_pool_conversion() {
        let commission = calculate(&state(), CoinId(1), &coins(1), true).unwrap();
        assert_eq!(commission.conversion, Conversion::Pool);
        assert!(commission.amount > coins(1));
        assert!(commission.base >= coins(1));
    }

    #[test]
    fn test_bancor_conversion() {
        let commission = calculate(&state(), CoinId(2), &coins(1), true).unwrap();
        assert_eq!(commission.conversion, Conversion::Bancor);
        assert_eq!(commission.base, coins(1));
    }

    #[test]
    fn test_bancor_reserve_underflow() {
        let err = calculate(&state(), CoinId(2), &coins(495), true).unwrap_err();
        assert!(matches!(err, CommissionError::ReserveUnderflow { .. }));
    }

    #[test]
    fn test_unconvertible_coin() {
        let err = calculate(&state(), CoinId(3), &coins(1), true).unwrap_err();
        assert!(matches!(err, CommissionError::NotSufficient { .. }));
        let err = calculate(&state(), CoinId(9), &coins(1), true).unwrap_err();
        assert_eq!(err, CommissionError::CoinNotExists { coin: CoinId(9) });
    }

    #[test]
    fn test_pool_too_shallow() {
        let err = calculate(&state(), CoinId(1), &coins(1_000), true).unwrap_err();
        assert!(matches!(err, CommissionError::NotSufficient { .. }));
    }

    #[test]
    fn test_apply_pool_commission() {
        let mut state = state();
        let sender = AccountId::from_bytes([1u8; 32]);
        state.set_balance(&sender, CoinId(1), coins(10));
        let commission = calculate(&state, CoinId(1), &coins(1), true).unwrap();

        let mut rewards = Amount::zero();
        commission.apply(&mut state, &sender, &mut rewards).unwrap();
        assert_eq!(rewards, commission.base);
        assert_eq!(state.balance(&sender, CoinId(1)), coins(10) - &commission.amount);
        let pool = state.pool_by_pair(CoinId(1), CoinId::BASE).unwrap();
        assert_eq!(pool.reserve_of(CoinId(1)).cloned(), Some(coins(1_000) + &commission.amount));
    }

    #[test]
    fn test_clamp_to_balance() {
        let state = state();
        let commission = calculate(&state, CoinId(1), &coins(1), true).unwrap();
        let clamped = commission.clone().clamp_to(&state, &(coins(1) / 2u32), true).unwrap().unwrap();
        assert_eq!(clamped.amount, coins(1) / 2u32);
        assert!(clamped.base < commission.base);
        assert!(commission.clone().clamp_to(&state, &Amount::zero(), true).unwrap().is_none());
    }

    #[test]
    fn test_table_in_other_coin() {
        let state = state();
        let price = CommissionPrice {
            coin: CoinId(1),
            ..CommissionPrice::default()
        };
        let base = table_to_base(&state, &price, &coins(1)).unwrap();
        assert!(base < coins(1));
        let lone = CommissionPrice {
            coin: CoinId(3),
            ..CommissionPrice::default()
        };
        assert!(table_to_base(&state, &lone, &coins(1)).is_err());
    }
}
