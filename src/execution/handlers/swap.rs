// Swap - Sell, sell-all and buy along a pool route
use super::{bump_nonce, check_coins_exist, swap_error, try_response, Needs};
use crate::commission::Commission;
use crate::execution::code::Code;
use crate::execution::handler::TxContext;
use crate::execution::response::{insufficient_funds, Event, Response};
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::swap::{apply_plan, plan_buy, plan_sell, resolve_route, TradePlan};
use crate::types::{checked_sub, Amount, BuySwapPoolData, CoinId, SellAllSwapPoolData, SellSwapPoolData};
use num_traits::Zero;
use serde_json::json;
use tracing::debug;

pub fn check_route<S: StateRead>(coins: &[CoinId], state: &S) -> Result<(), Response> {
    check_coins_exist(state, coins)?;
    match resolve_route(state, coins) {
        Ok(_) => Ok(()),
        // A fault while only reading pools cannot happen
        Err(err) => Err(swap_error(err).unwrap_or_else(|fault| {
            Response::error(Code::InsufficientLiquidity, fault.to_string(), json!({}))
        })),
    }
}

/// Route endpoints; callers run `check_route` first
fn endpoints(coins: &[CoinId]) -> Result<(CoinId, CoinId), ProtocolFault> {
    match (coins.first(), coins.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(ProtocolFault::Inconsistent("empty swap route".into())),
    }
}

/// Settle the plan and move the taker's funds, then build the receipt
fn settle<S: StateWrite>(plan: &TradePlan, ctx: &TxContext, state: &mut S) -> Result<Response, ProtocolFault> {
    let (coin_in, coin_out) = match (plan.coin_in(), plan.coin_out()) {
        (Some(coin_in), Some(coin_out)) => (coin_in, coin_out),
        _ => return Err(ProtocolFault::Inconsistent("plan without hops".into())),
    };

    apply_plan(state, plan)?;
    state.sub_balance(&ctx.sender, coin_in, &plan.amount_in)?;
    state.add_balance(&ctx.sender, coin_out, &plan.amount_out);
    bump_nonce(state, ctx);

    let pools: Vec<_> = plan
        .hops
        .iter()
        .map(|hop| {
            json!({
                "pool_id": hop.pool_id,
                "coin_in": hop.coin_in.to_string(),
                "value_in": hop.amount_in.to_string(),
                "coin_out": hop.coin_out.to_string(),
                "value_out": hop.amount_out.to_string(),
                "orders": hop.fills().map(|f| f.order_id).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut response = Response::ok()
        .with_tag("tx.coin_to_sell", coin_in.to_string(), true)
        .with_tag("tx.coin_to_buy", coin_out.to_string(), true)
        .with_tag("tx.return", plan.amount_out.to_string(), false)
        .with_tag("tx.sell_amount", plan.amount_in.to_string(), false)
        .with_tag("tx.pools", serde_json::Value::Array(pools).to_string(), false);
    response.events = Event::from_fills(plan.fills());
    if !response.events.is_empty() {
        debug!(expired = response.events.len(), "orders expired during swap");
    }
    Ok(response)
}

fn minimum_reached(plan: &TradePlan, minimum: &Amount, coin: CoinId) -> Response {
    Response::error(
        Code::MinimumValueToBuyReached,
        format!(
            "You wanted to buy minimum {}, but currently you buy only {}",
            minimum, plan.amount_out
        ),
        json!({
            "coin_id_to_buy": coin.to_string(),
            "minimum_value_to_buy": minimum.to_string(),
            "will_get_value": plan.amount_out.to_string(),
        }),
    )
}

fn maximum_reached(plan: &TradePlan, maximum: &Amount, coin: CoinId) -> Response {
    Response::error(
        Code::MaximumValueToSellReached,
        format!(
            "You wanted to sell maximum {}, but currently you need to spend {} to complete tx",
            maximum, plan.amount_in
        ),
        json!({
            "coin_id_to_sell": coin.to_string(),
            "maximum_value_to_sell": maximum.to_string(),
            "needed_spend_value": plan.amount_in.to_string(),
        }),
    )
}

fn sell_amount<S: StateWrite>(
    coins: &[CoinId],
    amount: &Amount,
    minimum: &Amount,
    ctx: &TxContext,
    state: &mut S,
    with_orders: bool,
) -> Result<Response, ProtocolFault> {
    let (_, coin_out) = endpoints(coins)?;
    let plan = match plan_sell(state, coins, amount, with_orders) {
        Ok(plan) => plan,
        Err(err) => return swap_error(err),
    };
    if &plan.amount_out < minimum {
        return Ok(minimum_reached(&plan, minimum, coin_out));
    }
    settle(&plan, ctx, state)
}

// =============================================================================
// SELL
// =============================================================================

pub fn run_sell<S: StateWrite>(
    data: &SellSwapPoolData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
    with_orders: bool,
) -> Result<Response, ProtocolFault> {
    let (coin_in, _) = endpoints(&data.coins)?;
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .add(coin_in, &data.value_to_sell)
        .check(state, &ctx.sender));

    // The commission may trade in a pool of the route; price after it
    commission.apply(state, &ctx.sender, rewards)?;
    sell_amount(&data.coins, &data.value_to_sell, &data.minimum_value_to_buy, ctx, state, with_orders)
}

pub fn run_sell_all<S: StateWrite>(
    data: &SellAllSwapPoolData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
    with_orders: bool,
) -> Result<Response, ProtocolFault> {
    let (coin_in, _) = endpoints(&data.coins)?;
    let balance = state.balance(&ctx.sender, coin_in);

    let amount = if commission.coin == coin_in {
        match checked_sub(&balance, &commission.amount) {
            Some(rest) => rest,
            None => return Ok(insufficient_funds(&ctx.sender, coin_in, &commission.amount, &balance)),
        }
    } else {
        try_response!(Needs::new()
            .add(commission.coin, &commission.amount)
            .check(state, &ctx.sender));
        balance.clone()
    };
    if amount.is_zero() {
        return Ok(insufficient_funds(&ctx.sender, coin_in, &commission.amount, &balance));
    }

    commission.apply(state, &ctx.sender, rewards)?;
    sell_amount(&data.coins, &amount, &data.minimum_value_to_buy, ctx, state, with_orders)
}

// =============================================================================
// BUY
// =============================================================================

fn plan_or_response<S: StateRead>(
    state: &S,
    coins: &[CoinId],
    amount_out: &Amount,
    with_orders: bool,
) -> Result<Result<TradePlan, Response>, ProtocolFault> {
    match plan_buy(state, coins, amount_out, with_orders) {
        Ok(plan) => Ok(Ok(plan)),
        Err(err) => swap_error(err).map(Err),
    }
}

fn buy_settle<S: StateWrite>(plan: TradePlan, ctx: &TxContext, state: &mut S) -> Result<Response, ProtocolFault> {
    let coin_in = plan
        .coin_in()
        .ok_or_else(|| ProtocolFault::Inconsistent("plan without hops".into()))?;
    let available = state.balance(&ctx.sender, coin_in);
    if available < plan.amount_in {
        return Ok(insufficient_funds(&ctx.sender, coin_in, &plan.amount_in, &available));
    }
    settle(&plan, ctx, state)
}

/// Curve-only buy with the historical price-cap check.
///
/// The cap is checked on a quote taken before the commission moves any pool,
/// except when the commission is paid in the coin sold and the coin bought
/// is the base coin. The settlement itself is re-priced after the
/// commission and only checked against the balance.
pub fn run_buy_v1<S: StateWrite>(
    data: &BuySwapPoolData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    let (coin_in, coin_out) = endpoints(&data.coins)?;
    let gas_coin = ctx.tx.gas_coin;
    let shares_commission_pool = if gas_coin == coin_in && coin_out.is_base() {
        true
    } else if gas_coin == coin_in && coin_out.is_base() {
        // Kept as deployed: the reverse direction was never recognised
        true
    } else {
        false
    };

    if !shares_commission_pool {
        let quote = try_response!(plan_or_response(state, &data.coins, &data.value_to_buy, false)?);
        if quote.amount_in > data.maximum_value_to_sell {
            return Ok(maximum_reached(&quote, &data.maximum_value_to_sell, coin_in));
        }
    }

    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    let plan = try_response!(plan_or_response(state, &data.coins, &data.value_to_buy, false)?);
    if shares_commission_pool && plan.amount_in > data.maximum_value_to_sell {
        return Ok(maximum_reached(&plan, &data.maximum_value_to_sell, coin_in));
    }
    buy_settle(plan, ctx, state)
}

pub fn run_buy_v2<S: StateWrite>(
    data: &BuySwapPoolData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    let (coin_in, _) = endpoints(&data.coins)?;
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    let plan = try_response!(plan_or_response(state, &data.coins, &data.value_to_buy, true)?);
    if plan.amount_in > data.maximum_value_to_sell {
        return Ok(maximum_reached(&plan, &data.maximum_value_to_sell, coin_in));
    }
    buy_settle(plan, ctx, state)
}
