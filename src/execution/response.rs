// Response - Deterministic transaction receipt
use super::code::Code;
use crate::swap::{OrderFill, OrderId};
use crate::types::{format_coins, AccountId, Amount, CoinId};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Event tag attached to a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
    /// Indexed by the node's event search
    pub index: bool,
}

/// Informational events emitted during settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An order was closed under the dust threshold and refunded
    OrderExpired {
        order_id: OrderId,
        owner: String,
        coin: CoinId,
        amount: String,
    },
}

impl Event {
    pub fn order_expired(order_id: OrderId, owner: &AccountId, coin: CoinId, refund: &Amount) -> Self {
        Event::OrderExpired {
            order_id,
            owner: owner.to_hex(),
            coin,
            amount: refund.to_string(),
        }
    }

    /// Events for every expired order in a set of fills
    pub fn from_fills<'a>(fills: impl Iterator<Item = &'a OrderFill>) -> Vec<Event> {
        fills
            .filter(|f| f.is_expired())
            .map(|f| {
                let refund = f.result.refund().cloned().unwrap_or_default();
                Event::order_expired(f.order_id, &f.owner, f.coin_taken, &refund)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub code: u32,
    pub log: String,
    /// Machine-readable detail, `{"code": "...", ...}` for failures
    pub info: Option<Value>,
    pub tags: Vec<Tag>,
    pub events: Vec<Event>,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub gas_price: u64,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            code: Code::Ok.as_u32(),
            log: String::new(),
            info: None,
            tags: Vec::new(),
            events: Vec::new(),
            gas_wanted: 0,
            gas_used: 0,
            gas_price: 0,
        }
    }

    /// Failure response; `info` must be a JSON object (or null)
    pub fn error(code: Code, log: impl Into<String>, info: Value) -> Self {
        let mut detail = match info {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        detail.insert("code".into(), Value::String(code.to_string()));
        Self {
            code: code.as_u32(),
            log: log.into(),
            info: Some(Value::Object(detail)),
            ..Self::ok()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok.as_u32()
    }

    pub fn has_code(&self, code: Code) -> bool {
        self.code == code.as_u32()
    }

    pub fn with_gas(mut self, gas: u64, gas_price: u64) -> Self {
        self.gas_wanted = gas;
        self.gas_used = gas;
        self.gas_price = gas_price;
        self
    }

    pub fn push_tag(&mut self, key: &str, value: impl Into<String>, index: bool) {
        self.tags.push(Tag {
            key: key.to_string(),
            value: value.into(),
            index,
        });
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>, index: bool) -> Self {
        self.push_tag(key, value, index);
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|t| t.key == key).map(|t| t.value.as_str())
    }

    pub fn strip_tags(&mut self) {
        self.tags.clear();
    }
}

/// Insufficient balance for one coin
pub fn insufficient_funds(sender: &AccountId, coin: CoinId, needed: &Amount, available: &Amount) -> Response {
    Response::error(
        Code::InsufficientFunds,
        format!(
            "Insufficient funds for sender account: {}. Wanted {} coin {}",
            sender,
            format_coins(needed),
            coin
        ),
        json!({
            "sender": sender.to_hex(),
            "coin_id": coin.to_string(),
            "needed_value": needed.to_string(),
            "available_value": available.to_string(),
        }),
    )
}

pub fn coin_not_exists(coin: CoinId) -> Response {
    Response::error(
        Code::CoinNotExists,
        format!("Coin {} not exists", coin),
        json!({ "coin_id": coin.to_string() }),
    )
}
