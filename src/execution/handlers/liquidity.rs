// Liquidity - Pool creation, deposits and withdrawals
use super::{bump_nonce, check_coins_exist, cross_convert, pair_not_exists, try_response, Needs};
use crate::commission::Commission;
use crate::execution::code::Code;
use crate::execution::handler::TxContext;
use crate::execution::response::Response;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::swap::{Pool, MINIMUM_LIQUIDITY};
use crate::types::{checked_sub, AddLiquidityData, Amount, CoinId, CreateSwapPoolData, RemoveLiquidityData};
use num_bigint::BigUint;
use num_traits::Zero;
use serde_json::json;

fn check_pair<S: StateRead>(coin0: CoinId, coin1: CoinId, state: &S) -> Result<(), Response> {
    if coin0 == coin1 {
        return Err(cross_convert(coin0));
    }
    check_coins_exist(state, &[coin0, coin1])
}

fn existing_pool<S: StateRead>(coin0: CoinId, coin1: CoinId, state: &S) -> Result<Pool, Response> {
    state
        .pool_by_pair(coin0, coin1)
        .ok_or_else(|| pair_not_exists(coin0, coin1))
}

// =============================================================================
// CREATE
// =============================================================================

pub fn check_create<S: StateRead>(data: &CreateSwapPoolData, state: &S) -> Result<(), Response> {
    check_pair(data.coin0, data.coin1, state)?;
    if let Some(id) = state.pool_id_by_pair(data.coin0, data.coin1) {
        return Err(Response::error(
            Code::PairAlreadyExists,
            format!("swap pool already exists: {}", id),
            json!({ "pool_id": id }),
        ));
    }
    let liquidity = (&data.volume0 * &data.volume1).sqrt();
    if liquidity <= BigUint::from(MINIMUM_LIQUIDITY) {
        return Err(Response::error(
            Code::InsufficientLiquidityMinted,
            format!("Initial liquidity must exceed {}", MINIMUM_LIQUIDITY),
            json!({
                "coin0": data.coin0.to_string(),
                "volume0": data.volume0.to_string(),
                "coin1": data.coin1.to_string(),
                "volume1": data.volume1.to_string(),
            }),
        ));
    }
    Ok(())
}

pub fn run_create<S: StateWrite>(
    data: &CreateSwapPoolData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .add(data.coin0, &data.volume0)
        .add(data.coin1, &data.volume1)
        .check(state, &ctx.sender));

    commission.apply(state, &ctx.sender, rewards)?;

    state.sub_balance(&ctx.sender, data.coin0, &data.volume0)?;
    state.sub_balance(&ctx.sender, data.coin1, &data.volume1)?;
    let pool = state.create_pool(data.coin0, data.coin1, data.volume0.clone(), data.volume1.clone());

    // The minimum stays locked in the pool forever
    let provided = &pool.liquidity - BigUint::from(MINIMUM_LIQUIDITY);
    state.set_liquidity(pool.id, &ctx.sender, provided.clone());
    bump_nonce(state, ctx);

    Ok(Response::ok()
        .with_tag("tx.pool_id", pool.id.to_string(), true)
        .with_tag("tx.pair_ids", format!("{}-{}", pool.coin0, pool.coin1), true)
        .with_tag("tx.liquidity", provided.to_string(), false))
}

// =============================================================================
// ADD
// =============================================================================

pub fn check_add<S: StateRead>(data: &AddLiquidityData, state: &S) -> Result<(), Response> {
    check_pair(data.coin0, data.coin1, state)?;
    existing_pool(data.coin0, data.coin1, state).map(|_| ())
}

pub fn run_add<S: StateWrite>(
    data: &AddLiquidityData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    // Reserves may have moved with the commission trade
    let mut pool = try_response!(existing_pool(data.coin0, data.coin1, state));
    let (volume1, liquidity) = pool
        .deposit_for(data.coin0, &data.volume0)
        .ok_or_else(|| ProtocolFault::Inconsistent(format!("pool {} has an empty reserve", pool.id)))?;

    if volume1 > data.maximum_volume1 {
        return Ok(Response::error(
            Code::InsufficientInputAmount,
            "You wanted to add less than one coin to the pool, increase maximum_volume1",
            json!({
                "coin0": data.coin0.to_string(),
                "volume0": data.volume0.to_string(),
                "coin1": data.coin1.to_string(),
                "maximum_volume1": data.maximum_volume1.to_string(),
                "needed_volume1": volume1.to_string(),
            }),
        ));
    }
    if liquidity.is_zero() {
        return Ok(Response::error(
            Code::InsufficientLiquidityMinted,
            "You wanted to add too few coins to the pool",
            json!({ "volume0": data.volume0.to_string(), "volume1": volume1.to_string() }),
        ));
    }

    try_response!(Needs::new()
        .add(data.coin0, &data.volume0)
        .add(data.coin1, &volume1)
        .check(state, &ctx.sender));

    state.sub_balance(&ctx.sender, data.coin0, &data.volume0)?;
    state.sub_balance(&ctx.sender, data.coin1, &volume1)?;
    pool.mint(data.coin0, &data.volume0, &volume1, &liquidity);
    let pool_id = pool.id;
    state.set_pool(pool);

    let shares = state.liquidity(pool_id, &ctx.sender) + &liquidity;
    state.set_liquidity(pool_id, &ctx.sender, shares);
    bump_nonce(state, ctx);

    Ok(Response::ok()
        .with_tag("tx.pool_id", pool_id.to_string(), true)
        .with_tag("tx.volume1", volume1.to_string(), false)
        .with_tag("tx.liquidity", liquidity.to_string(), false))
}

// =============================================================================
// REMOVE
// =============================================================================

pub fn check_remove<S: StateRead>(data: &RemoveLiquidityData, ctx: &TxContext, state: &S) -> Result<(), Response> {
    check_pair(data.coin0, data.coin1, state)?;
    let pool = existing_pool(data.coin0, data.coin1, state)?;
    if data.liquidity.is_zero() {
        return Err(Response::error(
            Code::InsufficientLiquidityBurned,
            "Liquidity to remove must be positive",
            json!({ "pool_id": pool.id }),
        ));
    }
    let held = state.liquidity(pool.id, &ctx.sender);
    if held < data.liquidity {
        return Err(Response::error(
            Code::InsufficientLiquidityBalance,
            format!("Insufficient liquidity balance: have {}, want {}", held, data.liquidity),
            json!({
                "pool_id": pool.id,
                "liquidity": held.to_string(),
                "requested_liquidity": data.liquidity.to_string(),
            }),
        ));
    }
    Ok(())
}

pub fn run_remove<S: StateWrite>(
    data: &RemoveLiquidityData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));
    commission.apply(state, &ctx.sender, rewards)?;

    let mut pool = try_response!(existing_pool(data.coin0, data.coin1, state));
    let (amount0, amount1) = pool.amounts_for(&data.liquidity);
    // Back to the caller's coin order
    let (volume0, volume1) = if data.coin0 == pool.coin0 {
        (amount0.clone(), amount1.clone())
    } else {
        (amount1.clone(), amount0.clone())
    };

    if volume0.is_zero() || volume1.is_zero() {
        return Ok(Response::error(
            Code::InsufficientLiquidityBurned,
            "Liquidity to remove is too small to return any coins",
            json!({ "pool_id": pool.id, "liquidity": data.liquidity.to_string() }),
        ));
    }
    if volume0 < data.minimum_volume0 || volume1 < data.minimum_volume1 {
        return Ok(Response::error(
            Code::InsufficientOutputAmount,
            "You wanted to get more coins than the pool returns",
            json!({
                "coin0": data.coin0.to_string(),
                "volume0": volume0.to_string(),
                "minimum_volume0": data.minimum_volume0.to_string(),
                "coin1": data.coin1.to_string(),
                "volume1": volume1.to_string(),
                "minimum_volume1": data.minimum_volume1.to_string(),
            }),
        ));
    }

    let held = state.liquidity(pool.id, &ctx.sender);
    let remaining = checked_sub(&held, &data.liquidity)
        .ok_or_else(|| ProtocolFault::Inconsistent(format!("liquidity of {} in pool {} changed", ctx.sender, pool.id)))?;

    pool.burn(&amount0, &amount1, &data.liquidity)?;
    let pool_id = pool.id;
    state.set_pool(pool);
    state.set_liquidity(pool_id, &ctx.sender, remaining);
    state.add_balance(&ctx.sender, data.coin0, &volume0);
    state.add_balance(&ctx.sender, data.coin1, &volume1);
    bump_nonce(state, ctx);

    Ok(Response::ok()
        .with_tag("tx.pool_id", pool_id.to_string(), true)
        .with_tag("tx.volume0", volume0.to_string(), false)
        .with_tag("tx.volume1", volume1.to_string(), false))
}
