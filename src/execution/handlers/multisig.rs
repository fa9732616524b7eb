// Multisig - Création d'un compte multisig pondéré
use super::{bump_nonce, try_response, Needs};
use crate::commission::Commission;
use crate::execution::code::Code;
use crate::execution::handler::TxContext;
use crate::execution::response::Response;
use crate::fault::ProtocolFault;
use crate::state::{StateRead, StateWrite};
use crate::types::{AccountId, Amount, CreateMultisigData, Multisig, MAX_MULTISIG_OWNERS, MAX_MULTISIG_WEIGHT};
use serde_json::json;
use std::collections::BTreeSet;

pub fn check<S: StateRead>(data: &CreateMultisigData, ctx: &TxContext, state: &S) -> Result<(), Response> {
    let owners = data.addresses.len();
    if owners > MAX_MULTISIG_OWNERS {
        return Err(Response::error(
            Code::TooLargeOwnersList,
            format!("The number of owners on the multisig cannot exceed {}", MAX_MULTISIG_OWNERS),
            json!({ "count": owners }),
        ));
    }
    if data.weights.len() != owners {
        return Err(Response::error(
            Code::DifferentCountAddressesAndWeights,
            "Different count addresses and weights",
            json!({ "count_weights": data.weights.len(), "count_addresses": owners }),
        ));
    }
    if let Some(weight) = data.weights.iter().find(|w| **w == 0 || **w > MAX_MULTISIG_WEIGHT) {
        return Err(Response::error(
            Code::IncorrectWeights,
            format!("Incorrect multisig weights: {} not in 1..={}", weight, MAX_MULTISIG_WEIGHT),
            json!({ "weight": weight }),
        ));
    }

    let mut seen = BTreeSet::new();
    if let Some(dup) = data.addresses.iter().find(|a| !seen.insert(**a)) {
        return Err(Response::error(
            Code::DuplicatedAddresses,
            format!("Duplicated multisig addresses: {}", dup),
            json!({ "address": dup.to_hex() }),
        ));
    }

    if data.threshold == 0 {
        return Err(Response::error(
            Code::IncorrectTotalWeights,
            "Incorrect multisig threshold: must be positive",
            json!({ "threshold": data.threshold }),
        ));
    }
    let total: u64 = data.weights.iter().map(|w| *w as u64).sum();
    if total < data.threshold as u64 {
        return Err(Response::error(
            Code::IncorrectTotalWeights,
            "Incorrect multisig weights: total below threshold",
            json!({ "total_weight": total, "threshold": data.threshold }),
        ));
    }

    let address = AccountId::multisig(&ctx.sender, ctx.tx.nonce);
    if state.multisig(&address).is_some() {
        return Err(Response::error(
            Code::MultisigExists,
            format!("Multisig {} already exists", address),
            json!({ "multisig_address": address.to_hex() }),
        ));
    }
    Ok(())
}

pub fn run<S: StateWrite>(
    data: &CreateMultisigData,
    ctx: &TxContext,
    state: &mut S,
    commission: &Commission,
    rewards: &mut Amount,
) -> Result<Response, ProtocolFault> {
    try_response!(Needs::new()
        .add(commission.coin, &commission.amount)
        .check(state, &ctx.sender));

    commission.apply(state, &ctx.sender, rewards)?;

    let address = AccountId::multisig(&ctx.sender, ctx.tx.nonce);
    state.set_multisig(Multisig {
        address,
        threshold: data.threshold,
        weights: data.weights.clone(),
        addresses: data.addresses.clone(),
    });
    bump_nonce(state, ctx);

    Ok(Response::ok().with_tag("tx.created_multisig", address.to_hex(), true))
}
