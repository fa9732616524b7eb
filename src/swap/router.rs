// Router - Multi-hop planning and settlement
//
// Planning runs on scratch copies of the pools and orders it reads, so a
// plan is a pure value. Settlement replays the plan step by step against a
// writable state and re-runs the K check on every curve leg.

use super::orders::{crossing_orders, FillResult, LimitOrder, OrderId};
use super::pool::{Pool, PoolId};
use super::SwapError;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::types::{AccountId, Amount, CoinId};
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::BTreeSet;
use tracing::trace;

/// Longest route accepted, in coins
pub const MAX_ROUTE_COINS: usize = 5;

/// One order touched by a trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFill {
    pub order_id: OrderId,
    pub owner: AccountId,
    /// Coin the owner receives (the taker's input on this hop)
    pub coin_paid: CoinId,
    pub amount_paid: Amount,
    /// Coin released from escrow to the taker
    pub coin_taken: CoinId,
    pub amount_taken: Amount,
    /// Order volumes after the fill
    pub remaining_sell: Amount,
    pub remaining_buy: Amount,
    pub result: FillResult,
}

impl OrderFill {
    pub fn is_expired(&self) -> bool {
        matches!(self.result, FillResult::Expired { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopStep {
    /// Trade against the constant-product curve
    Curve { amount_in: Amount, amount_out: Amount },
    /// Trade against a resting order
    Fill(OrderFill),
}

/// Settlement of a single pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopPlan {
    pub pool_id: PoolId,
    pub coin_in: CoinId,
    pub coin_out: CoinId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub steps: Vec<HopStep>,
}

impl HopPlan {
    pub fn fills(&self) -> impl Iterator<Item = &OrderFill> {
        self.steps.iter().filter_map(|step| match step {
            HopStep::Fill(fill) => Some(fill),
            HopStep::Curve { .. } => None,
        })
    }
}

/// A fully priced route, ready to settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePlan {
    pub hops: Vec<HopPlan>,
    pub amount_in: Amount,
    pub amount_out: Amount,
}

impl TradePlan {
    pub fn coin_in(&self) -> Option<CoinId> {
        self.hops.first().map(|h| h.coin_in)
    }

    pub fn coin_out(&self) -> Option<CoinId> {
        self.hops.last().map(|h| h.coin_out)
    }

    pub fn fills(&self) -> impl Iterator<Item = &OrderFill> {
        self.hops.iter().flat_map(|h| h.fills())
    }
}

/// Pools along `coins`, validated: length, existing pairs, no pool twice
pub fn resolve_route<S: StateRead>(state: &S, coins: &[CoinId]) -> Result<Vec<Pool>, SwapError> {
    if coins.len() > MAX_ROUTE_COINS {
        return Err(SwapError::TooLongRoute { len: coins.len() });
    }
    if coins.len() < 2 {
        return Err(SwapError::InvalidRoute { len: coins.len() });
    }

    let mut pools = Vec::with_capacity(coins.len() - 1);
    for pair in coins.windows(2) {
        if pair[0] == pair[1] {
            return Err(SwapError::CrossConvert { coin: pair[0] });
        }
        let pool = state
            .pool_by_pair(pair[0], pair[1])
            .ok_or(SwapError::PairNotExists {
                coin0: pair[0],
                coin1: pair[1],
            })?;
        pools.push(pool);
    }

    let mut seen = BTreeSet::new();
    for pool in &pools {
        if !seen.insert(pool.id) {
            return Err(SwapError::DuplicatePool { pool_id: pool.id });
        }
    }
    Ok(pools)
}

/// Price selling exactly `amount_in` of `coins[0]` along the route
pub fn plan_sell<S: StateRead>(
    state: &S,
    coins: &[CoinId],
    amount_in: &Amount,
    with_orders: bool,
) -> Result<TradePlan, SwapError> {
    let pools = resolve_route(state, coins)?;
    let mut hops = Vec::with_capacity(pools.len());
    let mut amount = amount_in.clone();

    for (pool, pair) in pools.into_iter().zip(coins.windows(2)) {
        let orders = if with_orders {
            state.orders_for_pool(pool.id)
        } else {
            Vec::new()
        };
        let hop = plan_hop_sell(pool, &orders, pair[0], pair[1], &amount)?;
        amount = hop.amount_out.clone();
        hops.push(hop);
    }

    Ok(TradePlan {
        hops,
        amount_in: amount_in.clone(),
        amount_out: amount,
    })
}

/// Price buying exactly `amount_out` of the last coin along the route
pub fn plan_buy<S: StateRead>(
    state: &S,
    coins: &[CoinId],
    amount_out: &Amount,
    with_orders: bool,
) -> Result<TradePlan, SwapError> {
    let pools = resolve_route(state, coins)?;
    let mut hops = Vec::with_capacity(pools.len());
    let mut amount = amount_out.clone();

    for (pool, pair) in pools.into_iter().zip(coins.windows(2)).rev() {
        let orders = if with_orders {
            state.orders_for_pool(pool.id)
        } else {
            Vec::new()
        };
        let hop = plan_hop_buy(pool, &orders, pair[0], pair[1], &amount)?;
        amount = hop.amount_in.clone();
        hops.push(hop);
    }
    hops.reverse();

    Ok(TradePlan {
        hops,
        amount_in: amount,
        amount_out: amount_out.clone(),
    })
}

fn take_order(order: &mut LimitOrder, amount_in: &Amount, amount_out: &Amount) -> OrderFill {
    let result = order.fill(amount_in, amount_out);
    OrderFill {
        order_id: order.id,
        owner: order.owner,
        coin_paid: order.coin_to_buy,
        amount_paid: amount_in.clone(),
        coin_taken: order.coin_to_sell,
        amount_taken: amount_out.clone(),
        remaining_sell: order.want_sell.clone(),
        remaining_buy: order.want_buy.clone(),
        result,
    }
}

fn plan_hop_sell(
    mut pool: Pool,
    orders: &[LimitOrder],
    coin_in: CoinId,
    coin_out: CoinId,
    amount_in: &Amount,
) -> Result<HopPlan, SwapError> {
    let mut remaining = amount_in.clone();
    let mut amount_out = BigUint::zero();
    let mut steps = Vec::new();

    for mut order in crossing_orders(orders, coin_in) {
        if remaining.is_zero() {
            break;
        }

        // Walk the curve up to the order's price first
        let capacity = pool.curve_capacity(coin_in, &order.want_buy, &order.want_sell);
        if !capacity.is_zero() {
            let Some(needed) = pool.sell_for_buy(coin_in, &capacity) else {
                break;
            };
            if needed >= remaining {
                break;
            }
            let Some(out) = pool.buy_for_sell(coin_in, &needed) else {
                break;
            };
            pool.settle(coin_in, &needed, &out)?;
            remaining -= &needed;
            amount_out += &out;
            steps.push(HopStep::Curve {
                amount_in: needed,
                amount_out: out,
            });
        }

        let fill_in = remaining.clone().min(order.want_buy.clone());
        let fill_out = order.out_for_in(&fill_in);
        if fill_out.is_zero() {
            break;
        }
        trace!(order_id = order.id, pool_id = pool.id, "order crossed by sell");
        remaining -= &fill_in;
        amount_out += &fill_out;
        steps.push(HopStep::Fill(take_order(&mut order, &fill_in, &fill_out)));
    }

    if !remaining.is_zero() {
        match pool.buy_for_sell(coin_in, &remaining) {
            Some(out) => {
                pool.settle(coin_in, &remaining, &out)?;
                amount_out += &out;
                steps.push(HopStep::Curve {
                    amount_in: remaining,
                    amount_out: out,
                });
            }
            // Leftover too small to move the curve: it stays in the pool
            None if !amount_out.is_zero() => {
                let zero = BigUint::zero();
                pool.settle(coin_in, &remaining, &zero)?;
                steps.push(HopStep::Curve {
                    amount_in: remaining,
                    amount_out: zero,
                });
            }
            None => {
                return Err(SwapError::InsufficientLiquidity {
                    pool_id: pool.id,
                    coin_in,
                    coin_out,
                })
            }
        }
    }

    Ok(HopPlan {
        pool_id: pool.id,
        coin_in,
        coin_out,
        amount_in: amount_in.clone(),
        amount_out,
        steps,
    })
}

fn plan_hop_buy(
    mut pool: Pool,
    orders: &[LimitOrder],
    coin_in: CoinId,
    coin_out: CoinId,
    amount_out: &Amount,
) -> Result<HopPlan, SwapError> {
    let mut remaining = amount_out.clone();
    let mut amount_in = BigUint::zero();
    let mut steps = Vec::new();

    for mut order in crossing_orders(orders, coin_in) {
        if remaining.is_zero() {
            break;
        }

        let capacity = pool.curve_capacity(coin_in, &order.want_buy, &order.want_sell);
        if !capacity.is_zero() {
            if capacity >= remaining {
                break;
            }
            let Some(needed) = pool.sell_for_buy(coin_in, &capacity) else {
                break;
            };
            pool.settle(coin_in, &needed, &capacity)?;
            remaining -= &capacity;
            amount_in += &needed;
            steps.push(HopStep::Curve {
                amount_in: needed,
                amount_out: capacity,
            });
        }

        let fill_out = remaining.clone().min(order.want_sell.clone());
        let fill_in = order.in_for_out(&fill_out).min(order.want_buy.clone());
        trace!(order_id = order.id, pool_id = pool.id, "order crossed by buy");
        remaining -= &fill_out;
        amount_in += &fill_in;
        steps.push(HopStep::Fill(take_order(&mut order, &fill_in, &fill_out)));
    }

    if !remaining.is_zero() {
        let needed = pool
            .sell_for_buy(coin_in, &remaining)
            .ok_or(SwapError::InsufficientLiquidity {
                pool_id: pool.id,
                coin_in,
                coin_out,
            })?;
        pool.settle(coin_in, &needed, &remaining)?;
        amount_in += &needed;
        steps.push(HopStep::Curve {
            amount_in: needed,
            amount_out: remaining,
        });
    }

    Ok(HopPlan {
        pool_id: pool.id,
        coin_in,
        coin_out,
        amount_in,
        amount_out: amount_out.clone(),
        steps,
    })
}

/// Settle a plan: pool reserves, order volumes and order owners' balances.
/// The taker's own balances are the caller's business.
pub fn apply_plan<S: StateWrite>(state: &mut S, plan: &TradePlan) -> Result<(), ProtocolFault> {
    for hop in &plan.hops {
        let mut pool = state
            .pool(hop.pool_id)
            .ok_or(ProtocolFault::StalePlan { pool_id: hop.pool_id })?;

        for step in &hop.steps {
            match step {
                HopStep::Curve {
                    amount_in,
                    amount_out,
                } => pool.settle(hop.coin_in, amount_in, amount_out)?,
                HopStep::Fill(fill) => apply_fill(state, hop.pool_id, fill)?,
            }
        }
        state.set_pool(pool);
    }
    Ok(())
}

fn apply_fill<S: StateWrite>(state: &mut S, pool_id: PoolId, fill: &OrderFill) -> Result<(), ProtocolFault> {
    let mut order = state
        .order(fill.order_id)
        .ok_or(ProtocolFault::StalePlan { pool_id })?;

    state.add_balance(&fill.owner, fill.coin_paid, &fill.amount_paid);
    if !fill.result.is_closed() {
        order.want_sell = fill.remaining_sell.clone();
        order.want_buy = fill.remaining_buy.clone();
        state.set_order(order);
        return Ok(());
    }

    if let Some(refund) = fill.result.refund().filter(|r| !r.is_zero()) {
        state.add_balance(&fill.owner, fill.coin_taken, refund);
    }
    state.remove_order(fill.order_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDb;
    use crate::tests::support::token;
    use crate::types::coins;

    fn state_with_pools() -> StateDb {
        let mut state = StateDb::default();
        for id in 0..4 {
            state.set_coin(token(id, "TKN"));
        }
        state.create_pool(CoinId(0), CoinId(1), coins(10), coins(10));
        state.create_pool(CoinId(1), CoinId(2), coins(100), coins(100));
        state.create_pool(CoinId(2), CoinId(3), coins(100), coins(50));
        state
    }

    #[test]
    fn test_route_length_bounds() {
        let state = state_with_pools();
        let long = [CoinId(0), CoinId(1), CoinId(2), CoinId(3), CoinId(2), CoinId(1)];
        assert_eq!(
            resolve_route(&state, &long).unwrap_err(),
            SwapError::TooLongRoute { len: 6 }
        );
        assert!(matches!(
            resolve_route(&state, &[CoinId(0)]),
            Err(SwapError::InvalidRoute { len: 1 })
        ));
    }

    #[test]
    fn test_missing_pair() {
        let state = state_with_pools();
        let err = resolve_route(&state, &[CoinId(0), CoinId(3)]).unwrap_err();
        assert_eq!(
            err,
            SwapError::PairNotExists {
                coin0: CoinId(0),
                coin1: CoinId(3)
            }
        );
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let state = state_with_pools();
        let err = resolve_route(&state, &[CoinId(0), CoinId(1), CoinId(0)]).unwrap_err();
        assert_eq!(err, SwapError::DuplicatePool { pool_id: 1 });
    }

    #[test]
    fn test_multi_hop_sell_then_apply() {
        let mut state = state_with_pools();
        let route = [CoinId(0), CoinId(1), CoinId(2), CoinId(3)];
        let plan = plan_sell(&state, &route, &coins(1), true).unwrap();
        assert_eq!(plan.hops.len(), 3);
        assert_eq!(plan.hops[1].amount_in, plan.hops[0].amount_out);
        assert!(!plan.amount_out.is_zero());

        apply_plan(&mut state, &plan).unwrap();
        let pool = state.pool_by_pair(CoinId(0), CoinId(1)).unwrap();
        assert_eq!(pool.reserve0, coins(11));
    }

    #[test]
    fn test_buy_plans_backwards() {
        let state = state_with_pools();
        let route = [CoinId(0), CoinId(1), CoinId(2)];
        let plan = plan_buy(&state, &route, &coins(1), true).unwrap();
        assert_eq!(plan.amount_out, coins(1));
        assert_eq!(plan.hops[1].amount_out, coins(1));
        assert_eq!(plan.hops[0].amount_out, plan.hops[1].amount_in);
    }

    #[test]
    fn test_buy_more_than_reserve_fails() {
        let state = state_with_pools();
        let err = plan_buy(&state, &[CoinId(0), CoinId(1)], &coins(10), true).unwrap_err();
        assert!(matches!(err, SwapError::InsufficientLiquidity { pool_id: 1, .. }));
    }

    #[test]
    fn test_sell_crosses_order() {
        let mut state = state_with_pools();
        let owner = AccountId::from_bytes([5u8; 32]);
        state.set_order(LimitOrder {
            id: 1,
            owner,
            pool_id: 1,
            coin_to_sell: CoinId(1),
            coin_to_buy: CoinId(0),
            want_sell: coins(5),
            want_buy: coins(15),
            height: 1,
        });

        let plan = plan_sell(&state, &[CoinId(0), CoinId(1)], &coins(23), true).unwrap();
        let fills: Vec<_> = plan.fills().collect();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, 1);

        let curve_only = plan_sell(&state, &[CoinId(0), CoinId(1)], &coins(23), false).unwrap();
        assert!(plan.amount_out > curve_only.amount_out);

        apply_plan(&mut state, &plan).unwrap();
        assert_eq!(state.balance(&owner, CoinId(0)), fills_paid(&plan));
    }

    fn fills_paid(plan: &TradePlan) -> Amount {
        plan.fills().map(|f| f.amount_paid.clone()).sum()
    }
}
