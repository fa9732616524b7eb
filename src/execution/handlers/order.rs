// Order - Placement and cancellation of limit orders
use super::{bump_nonce, check_coins_exist, cross_convert, pair_not_exists, try_response, Needs};
use crate::commission::Commission;
use crate::execution::code::Code;
use crate::execution::handler::TxContext;
use crate::execution::response::Response;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::swap::{order_dust, LimitOrder, OrderId};
use crate::types::{AccountId, AddLimitOrderData, Amount, RemoveLimitOrderData};
use num_traits::Zero;
use serde_json::json;
use tracing::debug;

pub fn check_add<S: StateRead>(data: &AddLimitOrderData, state: &S) -> Result<(), Response> {
    if data.coin_to_sell == data.coin_to_buy {
        return Err(cross_convert(data.coin_to_sell));
    }
    check_coins_exist(state, &[data.coin_to_sell, data.coin_to_buy])?;
    if state.pool_id_by_pair(data.coin_to_sell, data.coin_to_buy).is_none() {
        return Err(pair_not_exists(data.coin_to_sell, data.coin_to_buy));
    }

    let dust = order_dust();
    if data.value_to_sell < dust || data.value_to_buy < dust {
        return Err(Response::error(
            Code::OrderVolumeTooSmall,
            format!("Order volume must be at least {} units on both sides", dust),
            json!({
                "value_to_sell": data.value_to_sell.to_string(),
                "value_to_buy": data.value_to_buy.to_string(),
                "min_volume": dust.to_string(),
            }),
        ));
    }
    Ok(())
}

pub fn run_add<S: StateWrite>(
    data: &AddLimitOrderData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .add(data.coin_to_sell, &data.value_to_sell)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    // Price against the pool as the commission left it
    let pool = try_response!(state
        .pool_by_pair(data.coin_to_sell, data.coin_to_buy)
        .ok_or_else(|| pair_not_exists(data.coin_to_sell, data.coin_to_buy)));
    if !pool.accepts_order_price(data.coin_to_sell, &data.value_to_sell, &data.value_to_buy) {
        return Ok(Response::error(
            Code::WrongOrderPrice,
            "Wrong order price: the pool already offers a better one",
            json!({
                "pool_id": pool.id,
                "coin_to_sell": data.coin_to_sell.to_string(),
                "value_to_sell": data.value_to_sell.to_string(),
                "coin_to_buy": data.coin_to_buy.to_string(),
                "value_to_buy": data.value_to_buy.to_string(),
            }),
        ));
    }

    let id = state.allocate_order_id();
    state.sub_balance(&ctx.sender, data.coin_to_sell, &data.value_to_sell)?;
    state.set_order(LimitOrder {
        id,
        owner: ctx.sender,
        pool_id: pool.id,
        coin_to_sell: data.coin_to_sell,
        coin_to_buy: data.coin_to_buy,
        want_sell: data.value_to_sell.clone(),
        want_buy: data.value_to_buy.clone(),
        height: ctx.height,
    });
    bump_nonce(state, ctx);
    debug!(order_id = id, pool_id = pool.id, "limit order placed");

    Ok(Response::ok()
        .with_tag("tx.order_id", id.to_string(), true)
        .with_tag("tx.pool_id", pool.id.to_string(), true))
}

fn order_not_exists(id: OrderId, detail: &str) -> Response {
    Response::error(
        Code::OrderNotExists,
        format!("limit order {} not exists", id),
        json!({ "order_id": id.to_string(), "detail": detail }),
    )
}

fn owned_order<S: StateRead>(id: OrderId, sender: &AccountId, state: &S) -> Result<LimitOrder, Response> {
    let order = state.order(id).ok_or_else(|| order_not_exists(id, "not found"))?;
    if &order.owner != sender {
        return Err(Response::error(
            Code::IsNotOwnerOfOrder,
            "Sender is not an owner of this order",
            json!({ "order_id": id.to_string(), "owner": order.owner.to_hex() }),
        ));
    }
    Ok(order)
}

pub fn check_remove<S: StateRead>(data: &RemoveLimitOrderData, ctx: &TxContext, state: &S) -> Result<(), Response> {
    owned_order(data.id, &ctx.sender, state).map(|_| ())
}

pub fn run_remove<S: StateWrite>(
    data: &RemoveLimitOrderData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    // The commission trade may have crossed this very order
    let Some(order) = state.order(data.id) else {
        return Ok(order_not_exists(data.id, "filled by commission"));
    };

    state.remove_order(order.id);
    if !order.want_sell.is_zero() {
        state.add_balance(&order.owner, order.coin_to_sell, &order.want_sell);
    }
    bump_nonce(state, ctx);

    Ok(Response::ok()
        .with_tag("tx.order_id", order.id.to_string(), true)
        .with_tag("tx.refund", order.want_sell.to_string(), false))
}
