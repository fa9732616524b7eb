// Fault - Protocol-safety faults
//
// A fault means the deterministic math disagreed with its own invariant.
// It is never turned into a response: it aborts the containing block.

use crate::swap::PoolId;
use crate::types::{Amount, CoinId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolFault {
    #[error("K invariant violated on pool {pool_id}: before {k_before}, after {k_after}")]
    KInvariant {
        pool_id: PoolId,
        k_before: Amount,
        k_after: Amount,
    },

    #[error("settlement would drain pool {pool_id}: reserve {reserve}, out {amount_out}")]
    ReserveExhausted {
        pool_id: PoolId,
        reserve: Amount,
        amount_out: Amount,
    },

    #[error("planned settlement does not match pool {pool_id} state")]
    StalePlan { pool_id: PoolId },

    #[error("balance underflow for coin {coin}: have {available}, debit {required}")]
    BalanceUnderflow {
        coin: CoinId,
        available: Amount,
        required: Amount,
    },

    #[error("state inconsistency: {0}")]
    Inconsistent(String),
}
