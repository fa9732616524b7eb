// Pipeline - Admission and execution of raw transactions
//
// The same steps serve simulation (mempool check, read-only) and commit
// (block delivery). Every step is terminal on failure. A failure after the
// sender is known may still be billed on commit from V2 on.

use super::code::Code;
use super::handler::{Handler, TxContext};
use super::response::{coin_not_exists, Event, Response};
use crate::commission::{calculate, fee_units, table_to_base, Commission, CommissionError};
use crate::config::{ExecutorConfig, ProtocolVersion};
use crate::fault::ProtocolFault;
use crate::mempool::PendingSenders;
use crate::state::{Overlay, StateRead, StateWrite};
use crate::types::{
    format_coins, AccountId, Amount, BlockNumber, SignatureData, Transaction, MAX_PAYLOAD_LENGTH,
    MAX_SERVICE_DATA_LENGTH,
};
use num_traits::Zero;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{debug, error};

/// A transaction that passed structural, signature and nonce checks
struct Admitted {
    tx: Transaction,
    handler: Handler,
    sender: AccountId,
    version: ProtocolVersion,
}

/// Responses of a committed block and the base-coin fees it collected
#[derive(Debug, Clone, Default)]
pub struct BlockOutcome {
    pub responses: Vec<Response>,
    pub rewards: Amount,
}

impl BlockOutcome {
    pub fn ok_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_ok()).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Simulate a transaction for mempool admission. Nothing is written;
    /// on success the sender is marked pending.
    pub fn execute_check<S: StateRead>(
        &self,
        state: &S,
        raw: &[u8],
        height: BlockNumber,
        pending: &PendingSenders,
        min_gas_price: u64,
    ) -> Result<Response, ProtocolFault> {
        let admitted = match self.admit(state, raw, height, Some(min_gas_price)) {
            Ok(admitted) => admitted,
            Err(response) => return Ok(rejected(response, height)),
        };

        let mut overlay = Overlay::new(state);
        let mut rewards = Amount::zero();
        let mut response = match self.execute(&mut overlay, &admitted, height, &mut rewards)? {
            Ok(response) => response,
            Err(response) => return Ok(rejected(response, height)),
        };
        drop(overlay);

        if !pending.try_admit(admitted.sender) {
            return Ok(rejected(
                Response::error(
                    Code::TxFromSenderAlreadyInMempool,
                    format!("Tx from {} already exists in mempool", admitted.sender),
                    json!({ "sender": admitted.sender.to_hex() }),
                ),
                height,
            ));
        }

        response.strip_tags();
        Ok(response)
    }

    /// Execute a transaction inside a block and commit its effects.
    /// Collected fees are added to `rewards`.
    pub fn execute_deliver<S: StateWrite>(
        &self,
        state: &mut S,
        raw: &[u8],
        rewards: &mut Amount,
        height: BlockNumber,
        suppress_tags: bool,
    ) -> Result<Response, ProtocolFault> {
        let admitted = match self.admit(&*state, raw, height, None) {
            Ok(admitted) => admitted,
            Err(response) => return Ok(rejected(response, height)),
        };

        let mut tx_rewards = Amount::zero();
        let mut overlay = Overlay::new(&*state);
        let outcome = self.execute(&mut overlay, &admitted, height, &mut tx_rewards);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(fault) => {
                error!(height, sender = %admitted.sender, %fault, "protocol fault, aborting block");
                return Err(fault);
            }
        };

        let mut response = match outcome {
            Ok(response) => {
                overlay.into_changes().apply(state);
                *rewards += &tx_rewards;
                debug!(height, sender = %admitted.sender, kind = %admitted.handler.kind(), "tx committed");
                response
            }
            // Past admission: the sender is known and may be billed
            Err(response) => {
                drop(overlay);
                let mut response = rejected(response, height);
                if admitted.version.charges_failure_fee() {
                    self.charge_failure(state, &admitted, rewards, &mut response)?;
                }
                response
            }
        };

        if suppress_tags {
            response.strip_tags();
        }
        Ok(response)
    }

    /// Deliver a list of raw transactions in order; stops at the first fault
    pub fn execute_block<S: StateWrite>(
        &self,
        state: &mut S,
        txs: &[Vec<u8>],
        height: BlockNumber,
    ) -> Result<BlockOutcome, ProtocolFault> {
        let mut outcome = BlockOutcome::default();
        for raw in txs {
            let response = self.execute_deliver(state, raw, &mut outcome.rewards, height, false)?;
            outcome.responses.push(response);
        }
        debug!(
            height,
            txs = txs.len(),
            ok = outcome.ok_count(),
            rewards = %format_coins(&outcome.rewards),
            "block executed"
        );
        Ok(outcome)
    }

    // =========================================================================
    // STEPS
    // =========================================================================

    /// Size, decode, chain, gas price, lengths, signature, nonce
    fn admit<S: StateRead>(
        &self,
        state: &S,
        raw: &[u8],
        height: BlockNumber,
        min_gas_price: Option<u64>,
    ) -> Result<Admitted, Response> {
        if raw.len() > self.config.max_tx_length {
            return Err(Response::error(
                Code::TxTooLarge,
                format!("TX length is over {} bytes", self.config.max_tx_length),
                json!({ "max_tx_length": self.config.max_tx_length, "got_tx_length": raw.len() }),
            ));
        }

        let tx = Transaction::decode(raw).map_err(|e| {
            Response::error(Code::DecodeError, format!("Decode error: {}", e), json!({}))
        })?;
        let version = self.config.version_at(height);
        let handler = Handler::resolve(tx.kind, version, &tx.data)?;

        if tx.chain_id != self.config.chain_id {
            return Err(Response::error(
                Code::WrongChainId,
                "Wrong chain id",
                json!({
                    "current_chain_id": self.config.chain_id.0,
                    "got_chain_id": tx.chain_id.0,
                }),
            ));
        }
        if !state.coin_exists(tx.gas_coin) {
            return Err(coin_not_exists(tx.gas_coin));
        }

        if let Some(min) = min_gas_price {
            if tx.gas_price < min {
                return Err(Response::error(
                    Code::TooLowGasPrice,
                    format!("Gas price of tx is too low to be included in mempool. Expected {}", min),
                    json!({ "min_gas_price": min, "got_gas_price": tx.gas_price }),
                ));
            }
        }

        if tx.payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(Response::error(
                Code::TxPayloadTooLarge,
                format!("TX payload length is over {} bytes", MAX_PAYLOAD_LENGTH),
                json!({ "max_payload_length": MAX_PAYLOAD_LENGTH, "got_payload_length": tx.payload.len() }),
            ));
        }
        if tx.service_data.len() > MAX_SERVICE_DATA_LENGTH {
            return Err(Response::error(
                Code::TxServiceDataTooLarge,
                format!("TX service data length is over {} bytes", MAX_SERVICE_DATA_LENGTH),
                json!({
                    "max_service_data_length": MAX_SERVICE_DATA_LENGTH,
                    "got_service_data_length": tx.service_data.len(),
                }),
            ));
        }

        let sender = recover_sender(&tx, state)?;

        let expected = state.nonce(&sender) + 1;
        if tx.nonce != expected {
            return Err(Response::error(
                Code::WrongNonce,
                format!("Unexpected nonce. Expected: {}, got {}.", expected, tx.nonce),
                json!({ "expected_nonce": expected.to_string(), "got_nonce": tx.nonce.to_string() }),
            ));
        }

        Ok(Admitted {
            tx,
            handler,
            sender,
            version,
        })
    }

    /// Price the commission, dispatch, and decorate a successful receipt.
    /// `Ok(Err(_))` is a rejection; `state` must then be discarded.
    fn execute<S: StateWrite>(
        &self,
        state: &mut S,
        admitted: &Admitted,
        height: BlockNumber,
        rewards: &mut Amount,
    ) -> Result<Result<Response, Response>, ProtocolFault> {
        let tx = &admitted.tx;
        let price = state.commission_price();

        let units = fee_units(
            &price,
            &admitted.handler.commission_base(&price),
            tx.payload_and_service_data_len(),
            tx.gas_price,
        );
        let base = match table_to_base(&*state, &price, &units) {
            Ok(base) => base,
            Err(err) => return Ok(Err(commission_rejection(err, tx)?)),
        };
        let commission = match calculate(&*state, tx.gas_coin, &base, admitted.version.has_orders()) {
            Ok(commission) => commission,
            Err(err) => return Ok(Err(commission_rejection(err, tx)?)),
        };

        let ctx = TxContext {
            tx,
            sender: admitted.sender,
            height,
            version: admitted.version,
        };
        if let Err(response) = admitted.handler.basic_check(&ctx, &*state) {
            return Ok(Err(response));
        }

        let response = admitted.handler.run(&ctx, state, &commission, rewards)?;
        if !response.is_ok() {
            return Ok(Err(response));
        }

        let gas = admitted.handler.gas();
        Ok(Ok(receipt(response, admitted, &commission, &base).with_gas(gas, tx.gas_price)))
    }

    /// Bill `failed_tx` for a rejected transaction and advance its nonce
    fn charge_failure<S: StateWrite>(
        &self,
        state: &mut S,
        admitted: &Admitted,
        rewards: &mut Amount,
        response: &mut Response,
    ) -> Result<(), ProtocolFault> {
        let tx = &admitted.tx;
        let mut overlay = Overlay::new(&*state);
        let mut fee = Amount::zero();

        let price = overlay.commission_price();
        let units = fee_units(&price, &price.failed_tx, tx.payload_and_service_data_len(), tx.gas_price);
        let priced = table_to_base(&overlay, &price, &units)
            .and_then(|base| calculate(&overlay, tx.gas_coin, &base, true));
        let commission = match priced {
            Ok(commission) => {
                let available = overlay.balance(&admitted.sender, tx.gas_coin);
                commission.clamp_to(&overlay, &available, true)?
            }
            Err(CommissionError::Fault(fault)) => return Err(fault),
            Err(err) => {
                debug!(sender = %admitted.sender, %err, "failure fee not convertible, skipped");
                None
            }
        };

        if let Some(commission) = &commission {
            commission.apply(&mut overlay, &admitted.sender, &mut fee)?;
            response.events.extend(Event::from_fills(commission.fills()));
        }
        overlay.set_nonce(&admitted.sender, tx.nonce);
        overlay.into_changes().apply(state);
        *rewards += &fee;

        let charged = commission.map(|c| c.amount).unwrap_or_default();
        response.push_tag("tx.commission_amount", charged.to_string(), false);
        Ok(())
    }
}

fn rejected(response: Response, height: BlockNumber) -> Response {
    debug!(height, code = response.code, log = %response.log, "tx rejected");
    response
}

fn invalid_signature() -> Response {
    Response::error(Code::DecodeError, "invalid signature", json!({ "detail": "invalid signature" }))
}

/// Sender of a single-signed tx, or the multisig account whose owners
/// signed with enough weight
fn recover_sender<S: StateRead>(tx: &Transaction, state: &S) -> Result<AccountId, Response> {
    let signature = tx.signature().map_err(|e| {
        Response::error(Code::DecodeError, format!("Decode error: {}", e), json!({}))
    })?;

    match signature {
        SignatureData::Single(single) => {
            let message = tx.signing_message(None).map_err(|_| invalid_signature())?;
            if !single.signer.verify(&message, single.signature.as_bytes()) {
                return Err(invalid_signature());
            }
            Ok(single.signer)
        }
        SignatureData::Multi(multi) => {
            let multisig = state.multisig(&multi.multisig).ok_or_else(|| {
                Response::error(
                    Code::MultisigNotExists,
                    "Multisig does not exists",
                    json!({ "multisig_address": multi.multisig.to_hex() }),
                )
            })?;

            if multi.signatures.is_empty() || multi.signatures.len() > multisig.weights.len() {
                return Err(Response::error(
                    Code::IncorrectMultiSignature,
                    format!(
                        "Multisig {} has {} owners, got {} signatures",
                        multi.multisig,
                        multisig.weights.len(),
                        multi.signatures.len()
                    ),
                    json!({
                        "multisig_address": multi.multisig.to_hex(),
                        "owners": multisig.weights.len(),
                        "signatures": multi.signatures.len(),
                    }),
                ));
            }

            let message = tx.signing_message(Some(multi.multisig)).map_err(|_| invalid_signature())?;
            let mut seen = BTreeSet::new();
            let mut votes = 0u64;
            for signature in &multi.signatures {
                if !seen.insert(signature.signer) {
                    return Err(Response::error(
                        Code::DuplicatedAddresses,
                        format!("Duplicated multisig signer {}", signature.signer),
                        json!({ "address": signature.signer.to_hex() }),
                    ));
                }
                if !signature.signer.verify(&message, signature.signature.as_bytes()) {
                    return Err(invalid_signature());
                }
                votes += multisig.weight_of(&signature.signer) as u64;
            }

            if votes < multisig.threshold as u64 {
                return Err(Response::error(
                    Code::NotEnoughMultisigVotes,
                    format!(
                        "Not enough multisig votes. Needed {}, has {}",
                        multisig.threshold, votes
                    ),
                    json!({ "needed_votes": multisig.threshold, "got_votes": votes }),
                ));
            }
            Ok(multi.multisig)
        }
    }
}

fn commission_rejection(err: CommissionError, tx: &Transaction) -> Result<Response, ProtocolFault> {
    let response = match err {
        CommissionError::CoinNotExists { coin } => coin_not_exists(coin),
        CommissionError::NotSufficient { coin, base } => Response::error(
            Code::CommissionCoinNotSufficient,
            format!("Not enough liquidity to pay {} base units of commission in coin {}", base, coin),
            json!({ "coin_id": coin.to_string(), "value": base.to_string(), "gas_coin": tx.gas_coin.to_string() }),
        ),
        CommissionError::ReserveUnderflow {
            coin,
            reserve,
            min_reserve,
        } => Response::error(
            Code::CommissionCoinNotSufficient,
            format!("Coin {} reserve would fall under {}", coin, format_coins(&min_reserve)),
            json!({
                "coin_id": coin.to_string(),
                "reserve": reserve.to_string(),
                "min_reserve": min_reserve.to_string(),
                "detail": Code::CoinReserveUnderflow.as_u32().to_string(),
            }),
        ),
        CommissionError::Fault(fault) => return Err(fault),
    };
    Ok(response)
}

/// Standard receipt tags, appended after the handler's own
fn receipt(mut response: Response, admitted: &Admitted, commission: &Commission, base: &Amount) -> Response {
    let tx = &admitted.tx;
    // The commission leg settles before the transaction body
    let mut events = Event::from_fills(commission.fills());
    events.append(&mut response.events);
    response.events = events;

    response.push_tag("tx.commission_in_base_coin", base.to_string(), false);
    response.push_tag("tx.commission_conversion", commission.conversion.to_string(), true);
    response.push_tag("tx.commission_amount", commission.amount.to_string(), false);
    response.push_tag("tx.commission_price", tx.gas_price.to_string(), false);
    response.push_tag("tx.commission_coin", tx.gas_coin.to_string(), true);
    response.push_tag("tx.from", admitted.sender.to_hex(), true);
    response.push_tag("tx.type", admitted.handler.kind().to_string(), true);
    response
}
