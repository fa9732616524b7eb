// Handlers - Per-kind checks and effects
//
// Every `run` follows the same order: verify funds on the unmodified view,
// collect the fee, apply the principal effect, advance the nonce.

pub mod liquidity;
pub mod multisig;
pub mod order;
pub mod send;
pub mod swap;

use super::code::Code;
use super::handler::TxContext;
use super::response::{coin_not_exists, insufficient_funds, Response};
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::swap::SwapError;
use crate::types::{AccountId, Amount, CoinId};
use serde_json::json;
use std::collections::BTreeMap;

/// Unwrap a `Result<_, Response>` inside a `run` function, returning the
/// rejection as a normal response
macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(response) => return Ok(response),
        }
    };
}
pub(crate) use try_response;

/// Balances a transaction must be able to cover, summed per coin
#[derive(Debug, Default)]
pub struct Needs {
    needs: BTreeMap<CoinId, Amount>,
}

impl Needs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, coin: CoinId, amount: &Amount) -> Self {
        *self.needs.entry(coin).or_default() += amount;
        self
    }

    pub fn check<S: StateRead>(&self, state: &S, sender: &AccountId) -> Result<(), Response> {
        for (coin, needed) in &self.needs {
            let available = state.balance(sender, *coin);
            if &available < needed {
                return Err(insufficient_funds(sender, *coin, needed, &available));
            }
        }
        Ok(())
    }
}

pub fn check_coins_exist<S: StateRead>(state: &S, coins: &[CoinId]) -> Result<(), Response> {
    match coins.iter().find(|c| !state.coin_exists(**c)) {
        Some(missing) => Err(coin_not_exists(*missing)),
        None => Ok(()),
    }
}

/// Advance the sender's nonce to the transaction's
pub fn bump_nonce<S: StateWrite>(state: &mut S, ctx: &TxContext) {
    state.set_nonce(&ctx.sender, ctx.tx.nonce);
}

pub fn cross_convert(coin: CoinId) -> Response {
    Response::error(
        Code::CrossConvert,
        "\"From\" coin equals to \"to\" coin",
        json!({ "coin_id": coin.to_string() }),
    )
}

pub fn pair_not_exists(coin0: CoinId, coin1: CoinId) -> Response {
    Response::error(
        Code::PairNotExists,
        format!("swap pool between coins {} and {} not exists", coin0, coin1),
        json!({ "coin0": coin0.to_string(), "coin1": coin1.to_string() }),
    )
}

/// Map a pricing failure onto a response; faults keep propagating
pub fn swap_error(err: SwapError) -> Result<Response, ProtocolFault> {
    let response = match err {
        SwapError::TooLongRoute { len } => Response::error(
            Code::TooLongSwapRoute,
            format!("swap route too long: {} coins", len),
            json!({ "coins": len }),
        ),
        SwapError::InvalidRoute { len } => Response::error(
            Code::DecodeError,
            format!("swap route needs at least 2 coins, got {}", len),
            json!({ "coins": len }),
        ),
        SwapError::CrossConvert { coin } => cross_convert(coin),
        SwapError::PairNotExists { coin0, coin1 } => pair_not_exists(coin0, coin1),
        SwapError::DuplicatePool { pool_id } => Response::error(
            Code::DuplicatePoolInRoute,
            format!("Forbidden to repeat the pool in the route, pool duplicate {}", pool_id),
            json!({ "pool_id": pool_id }),
        ),
        SwapError::InsufficientLiquidity {
            pool_id,
            coin_in,
            coin_out,
        } => Response::error(
            Code::InsufficientLiquidity,
            format!("Insufficient liquidity in pool {}", pool_id),
            json!({
                "pool_id": pool_id,
                "coin_to_sell": coin_in.to_string(),
                "coin_to_buy": coin_out.to_string(),
            }),
        ),
        SwapError::Fault(fault) => return Err(fault),
    };
    Ok(response)
}

