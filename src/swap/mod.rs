// Swap - AMM pools, limit orders and routing

pub mod orders;
pub mod pool;
pub mod router;

pub use orders::{crossing_orders, order_dust, FillResult, LimitOrder, OrderId};
pub use pool::{Pool, PoolId, FEE_DENOMINATOR, FEE_NUMERATOR, MINIMUM_LIQUIDITY};
pub use router::{apply_plan, plan_buy, plan_sell, resolve_route, HopPlan, HopStep, OrderFill, TradePlan, MAX_ROUTE_COINS};

use crate::fault::ProtocolFault;
use crate::types::CoinId;

/// Why a trade could not be priced
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("route has {len} coins, at most {} allowed", MAX_ROUTE_COINS)]
    TooLongRoute { len: usize },

    #[error("route has {len} coins, at least 2 required")]
    InvalidRoute { len: usize },

    #[error("coin {coin} cannot be swapped for itself")]
    CrossConvert { coin: CoinId },

    #[error("pair {coin0}-{coin1} does not exist")]
    PairNotExists { coin0: CoinId, coin1: CoinId },

    #[error("pool {pool_id} appears twice in route")]
    DuplicatePool { pool_id: PoolId },

    #[error("not enough liquidity in pool {pool_id} to swap {coin_in} for {coin_out}")]
    InsufficientLiquidity {
        pool_id: PoolId,
        coin_in: CoinId,
        coin_out: CoinId,
    },

    #[error(transparent)]
    Fault(#[from] ProtocolFault),
}
