// Send - Transfert simple
use super::{bump_nonce, check_coins_exist, try_response, Needs};
use crate::commission::Commission;
use crate::execution::handler::TxContext;
use crate::execution::response::Response;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::types::{Amount, SendData};

pub fn check<S: StateRead>(data: &SendData, state: &S) -> Result<(), Response> {
    check_coins_exist(state, &[data.coin])
}

pub fn run<S: StateWrite>(
    data: &SendData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .add(data.coin, &data.value)
        .check(state, &ctx.sender));

    commission.apply(state, &ctx.sender, rewards)?;
    state.sub_balance(&ctx.sender, data.coin, &data.value)?;
    state.add_balance(&data.to, data.coin, &data.value);
    bump_nonce(state, ctx);

    Ok(Response::ok()
        .with_tag("tx.to", data.to.to_hex(), true)
        .with_tag("tx.coin_id", data.coin.to_string(), true))
}
