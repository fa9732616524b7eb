// Handler - One closed set of transaction kinds
//
// A transaction is resolved once, from (kind, protocol version), into a
// `Handler` value. Each variant keeps the behaviour of the version it was
// introduced in; a new version adds a variant instead of editing an old one.

use super::code::Code;
use super::gas::{costs, route_gas};
use super::handlers::{liquidity, multisig, order, send, swap};
use super::response::Response;
use crate::commission::{Commission, CommissionPrice};
use crate::config::ProtocolVersion;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::types::*;
use serde_json::json;

/// Per-transaction facts shared by every handler
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    pub tx: &'a Transaction,
    pub sender: AccountId,
    pub height: BlockNumber,
    pub version: ProtocolVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    Send(SendData),
    CreateMultisig(CreateMultisigData),
    CreateSwapPool(CreateSwapPoolData),
    AddLiquidity(AddLiquidityData),
    RemoveLiquidity(RemoveLiquidityData),
    /// Curve-only
    SellSwapPoolV1(SellSwapPoolData),
    /// Order-aware
    SellSwapPoolV2(SellSwapPoolData),
    SellAllSwapPoolV1(SellAllSwapPoolData),
    SellAllSwapPoolV2(SellAllSwapPoolData),
    /// Curve-only, price cap checked on pre-commission reserves
    BuySwapPoolV1(BuySwapPoolData),
    BuySwapPoolV2(BuySwapPoolData),
    AddLimitOrder(AddLimitOrderData),
    RemoveLimitOrder(RemoveLimitOrderData),
}

impl Handler {
    /// Registry: decode `data` for `kind` under the rules of `version`
    pub fn resolve(kind: u8, version: ProtocolVersion, data: &[u8]) -> Result<Handler, Response> {
        let unknown = || {
            Response::error(
                Code::UnknownTxKind,
                format!("Unknown transaction type {:#04x}", kind),
                json!({ "type": format!("{:#04x}", kind), "version": version.to_string() }),
            )
        };
        let tx_kind = TxKind::from_u8(kind).ok_or_else(unknown)?;
        if !version.has_orders() && matches!(tx_kind, TxKind::AddLimitOrder | TxKind::RemoveLimitOrder) {
            return Err(unknown());
        }

        let decoded = TxData::decode(tx_kind, data).map_err(|e| {
            Response::error(
                Code::DecodeError,
                format!("Decode error: {}", e),
                json!({ "type": tx_kind.to_string() }),
            )
        })?;

        let v2 = version >= ProtocolVersion::V2;
        Ok(match decoded {
            TxData::Send(d) => Handler::Send(d),
            TxData::CreateMultisig(d) => Handler::CreateMultisig(d),
            TxData::CreateSwapPool(d) => Handler::CreateSwapPool(d),
            TxData::AddLiquidity(d) => Handler::AddLiquidity(d),
            TxData::RemoveLiquidity(d) => Handler::RemoveLiquidity(d),
            TxData::SellSwapPool(d) if v2 => Handler::SellSwapPoolV2(d),
            TxData::SellSwapPool(d) => Handler::SellSwapPoolV1(d),
            TxData::SellAllSwapPool(d) if v2 => Handler::SellAllSwapPoolV2(d),
            TxData::SellAllSwapPool(d) => Handler::SellAllSwapPoolV1(d),
            TxData::BuySwapPool(d) if v2 => Handler::BuySwapPoolV2(d),
            TxData::BuySwapPool(d) => Handler::BuySwapPoolV1(d),
            TxData::AddLimitOrder(d) => Handler::AddLimitOrder(d),
            TxData::RemoveLimitOrder(d) => Handler::RemoveLimitOrder(d),
        })
    }

    pub fn kind(&self) -> TxKind {
        match self {
            Handler::Send(_) => TxKind::Send,
            Handler::CreateMultisig(_) => TxKind::CreateMultisig,
            Handler::CreateSwapPool(_) => TxKind::CreateSwapPool,
            Handler::AddLiquidity(_) => TxKind::AddLiquidity,
            Handler::RemoveLiquidity(_) => TxKind::RemoveLiquidity,
            Handler::SellSwapPoolV1(_) | Handler::SellSwapPoolV2(_) => TxKind::SellSwapPool,
            Handler::SellAllSwapPoolV1(_) | Handler::SellAllSwapPoolV2(_) => TxKind::SellAllSwapPool,
            Handler::BuySwapPoolV1(_) | Handler::BuySwapPoolV2(_) => TxKind::BuySwapPool,
            Handler::AddLimitOrder(_) => TxKind::AddLimitOrder,
            Handler::RemoveLimitOrder(_) => TxKind::RemoveLimitOrder,
        }
    }

    pub fn gas(&self) -> u64 {
        match self {
            Handler::Send(_) => costs::SEND,
            Handler::CreateMultisig(_) => costs::CREATE_MULTISIG,
            Handler::CreateSwapPool(_) => costs::CREATE_SWAP_POOL,
            Handler::AddLiquidity(_) => costs::ADD_LIQUIDITY,
            Handler::RemoveLiquidity(_) => costs::REMOVE_LIQUIDITY,
            Handler::SellSwapPoolV1(d) | Handler::SellSwapPoolV2(d) => route_gas(d.coins.len()),
            Handler::SellAllSwapPoolV1(d) | Handler::SellAllSwapPoolV2(d) => route_gas(d.coins.len()),
            Handler::BuySwapPoolV1(d) | Handler::BuySwapPoolV2(d) => route_gas(d.coins.len()),
            Handler::AddLimitOrder(_) => costs::ADD_LIMIT_ORDER,
            Handler::RemoveLimitOrder(_) => costs::REMOVE_LIMIT_ORDER,
        }
    }

    /// Fee before payload bytes and gas price, in table units
    pub fn commission_base(&self, price: &CommissionPrice) -> Amount {
        match self {
            Handler::Send(_) => price.send.clone(),
            Handler::CreateMultisig(_) => price.create_multisig.clone(),
            Handler::CreateSwapPool(_) => price.create_swap_pool.clone(),
            Handler::AddLiquidity(_) => price.add_liquidity.clone(),
            Handler::RemoveLiquidity(_) => price.remove_liquidity.clone(),
            Handler::SellSwapPoolV1(d) | Handler::SellSwapPoolV2(d) => {
                CommissionPrice::route_fee(&price.sell_pool_base, &price.sell_pool_delta, d.coins.len())
            }
            Handler::SellAllSwapPoolV1(d) | Handler::SellAllSwapPoolV2(d) => {
                CommissionPrice::route_fee(&price.sell_all_pool_base, &price.sell_all_pool_delta, d.coins.len())
            }
            Handler::BuySwapPoolV1(d) | Handler::BuySwapPoolV2(d) => {
                CommissionPrice::route_fee(&price.buy_pool_base, &price.buy_pool_delta, d.coins.len())
            }
            Handler::AddLimitOrder(_) => price.add_limit_order.clone(),
            Handler::RemoveLimitOrder(_) => price.remove_limit_order.clone(),
        }
    }

    /// Preconditions that need no mutation
    pub fn basic_check<S: StateRead>(&self, ctx: &TxContext, state: &S) -> Result<(), Response> {
        match self {
            Handler::Send(d) => send::check(d, state),
            Handler::CreateMultisig(d) => multisig::check(d, ctx, state),
            Handler::CreateSwapPool(d) => liquidity::check_create(d, state),
            Handler::AddLiquidity(d) => liquidity::check_add(d, state),
            Handler::RemoveLiquidity(d) => liquidity::check_remove(d, ctx, state),
            Handler::SellSwapPoolV1(d) | Handler::SellSwapPoolV2(d) => swap::check_route(&d.coins, state),
            Handler::SellAllSwapPoolV1(d) | Handler::SellAllSwapPoolV2(d) => swap::check_route(&d.coins, state),
            Handler::BuySwapPoolV1(d) | Handler::BuySwapPoolV2(d) => swap::check_route(&d.coins, state),
            Handler::AddLimitOrder(d) => order::check_add(d, state),
            Handler::RemoveLimitOrder(d) => order::check_remove(d, ctx, state),
        }
    }

    /// Apply the transaction: fee, principal effect, nonce. A non-OK
    /// response means the caller must discard `state`.
    pub fn run<S: StateWrite>(
        &self,
        ctx: &TxContext,
        state: &mut S,
        commission: &Commission,
        rewards: &mut Amount,
    ) -> Result<Response, ProtocolFault> {
        match self {
            Handler::Send(d) => send::run(d, ctx, state, commission, rewards),
            Handler::CreateMultisig(d) => multisig::run(d, ctx, state, commission, rewards),
            Handler::CreateSwapPool(d) => liquidity::run_create(d, ctx, state, commission, rewards),
            Handler::AddLiquidity(d) => liquidity::run_add(d, ctx, state, commission, rewards),
            Handler::RemoveLiquidity(d) => liquidity::run_remove(d, ctx, state, commission, rewards),
            Handler::SellSwapPoolV1(d) => swap::run_sell(d, ctx, state, commission, rewards, false),
            Handler::SellSwapPoolV2(d) => swap::run_sell(d, ctx, state, commission, rewards, true),
            Handler::SellAllSwapPoolV1(d) => swap::run_sell_all(d, ctx, state, commission, rewards, false),
            Handler::SellAllSwapPoolV2(d) => swap::run_sell_all(d, ctx, state, commission, rewards, true),
            Handler::BuySwapPoolV1(d) => swap::run_buy_v1(d, ctx, state, commission, rewards),
            Handler::BuySwapPoolV2(d) => swap::run_buy_v2(d, ctx, state, commission, rewards),
            Handler::AddLimitOrder(d) => order::run_add(d, ctx, state, commission, rewards),
            Handler::RemoveLimitOrder(d) => order::run_remove(d, ctx, state, commission, rewards),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::codec;

    fn sell_data(route: usize) -> Vec<u8> {
        codec::encode(&SellSwapPoolData {
            coins: (0..route as u32).map(CoinId).collect(),
            value_to_sell: coins(1),
            minimum_value_to_buy: Amount::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_by_version() {
        let data = sell_data(3);
        let v1 = Handler::resolve(TxKind::SellSwapPool.as_u8(), ProtocolVersion::V1, &data).unwrap();
        let v2 = Handler::resolve(TxKind::SellSwapPool.as_u8(), ProtocolVersion::V2, &data).unwrap();
        assert!(matches!(v1, Handler::SellSwapPoolV1(_)));
        assert!(matches!(v2, Handler::SellSwapPoolV2(_)));
        assert_eq!(v1.kind(), v2.kind());
    }

    #[test]
    fn test_orders_unknown_before_v2() {
        let data = codec::encode(&RemoveLimitOrderData { id: 1 }).unwrap();
        let err = Handler::resolve(TxKind::RemoveLimitOrder.as_u8(), ProtocolVersion::V1, &data).unwrap_err();
        assert!(err.has_code(Code::UnknownTxKind));
        assert!(Handler::resolve(TxKind::RemoveLimitOrder.as_u8(), ProtocolVersion::V2, &data).is_ok());
    }

    #[test]
    fn test_unknown_kind_and_bad_payload() {
        let err = Handler::resolve(0xEE, ProtocolVersion::V2, &[]).unwrap_err();
        assert!(err.has_code(Code::UnknownTxKind));
        let err = Handler::resolve(TxKind::Send.as_u8(), ProtocolVersion::V2, &[0xFF, 0xFF]).unwrap_err();
        assert!(err.has_code(Code::DecodeError));
    }

    #[test]
    fn test_route_gas_and_fee() {
        let price = CommissionPrice::default();
        let handler = Handler::resolve(TxKind::SellSwapPool.as_u8(), ProtocolVersion::V2, &sell_data(4)).unwrap();
        assert_eq!(handler.gas(), 200);
        assert_eq!(
            handler.commission_base(&price),
            &price.sell_pool_base + price.sell_pool_delta.clone() * 2u32
        );
    }
}
