// Transaction - Wire shape, kinds and payload data
use super::account::AccountId;
use super::codec::{self, CodecError};
use super::primitives::{Amount, ChainId, CoinId, Hash, Nonce};
use super::signature::{
    domain_separate, MultiSignature, SignatureData, SignatureType, SingleSignature,
    DOMAIN_TRANSACTION,
};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum free-form payload attached to a transaction
pub const MAX_PAYLOAD_LENGTH: usize = 10_000;

/// Maximum service data attached to a transaction
pub const MAX_SERVICE_DATA_LENGTH: usize = 128;

/// Maximum encoded transaction length
pub const MAX_TX_LENGTH: usize = 6144 + MAX_PAYLOAD_LENGTH;

/// Transaction kinds (one byte on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxKind {
    Send = 0x01,
    CreateMultisig = 0x0C,
    AddLiquidity = 0x15,
    RemoveLiquidity = 0x16,
    SellSwapPool = 0x17,
    BuySwapPool = 0x18,
    SellAllSwapPool = 0x19,
    CreateSwapPool = 0x22,
    AddLimitOrder = 0x23,
    RemoveLimitOrder = 0x24,
}

impl TxKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => TxKind::Send,
            0x0C => TxKind::CreateMultisig,
            0x15 => TxKind::AddLiquidity,
            0x16 => TxKind::RemoveLiquidity,
            0x17 => TxKind::SellSwapPool,
            0x18 => TxKind::BuySwapPool,
            0x19 => TxKind::SellAllSwapPool,
            0x22 => TxKind::CreateSwapPool,
            0x23 => TxKind::AddLimitOrder,
            0x24 => TxKind::RemoveLimitOrder,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}", self.as_u8())
    }
}

// =============================================================================
// PAYLOAD DATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendData {
    pub coin: CoinId,
    pub to: AccountId,
    pub value: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMultisigData {
    pub threshold: u32,
    pub weights: Vec<u32>,
    pub addresses: Vec<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSwapPoolData {
    pub coin0: CoinId,
    pub coin1: CoinId,
    pub volume0: Amount,
    pub volume1: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityData {
    pub coin0: CoinId,
    pub coin1: CoinId,
    pub volume0: Amount,
    pub maximum_volume1: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityData {
    pub coin0: CoinId,
    pub coin1: CoinId,
    pub liquidity: Amount,
    pub minimum_volume0: Amount,
    pub minimum_volume1: Amount,
}

/// Sell an exact amount along a route of 2..=5 coins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellSwapPoolData {
    pub coins: Vec<CoinId>,
    pub value_to_sell: Amount,
    pub minimum_value_to_buy: Amount,
}

/// Sell the whole balance of the first coin along a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellAllSwapPoolData {
    pub coins: Vec<CoinId>,
    pub minimum_value_to_buy: Amount,
}

/// Buy an exact amount of the last coin along a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuySwapPoolData {
    pub coins: Vec<CoinId>,
    pub value_to_buy: Amount,
    pub maximum_value_to_sell: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLimitOrderData {
    pub coin_to_sell: CoinId,
    pub value_to_sell: Amount,
    pub coin_to_buy: CoinId,
    pub value_to_buy: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLimitOrderData {
    pub id: u64,
}

/// Decoded payload, one variant per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxData {
    Send(SendData),
    CreateMultisig(CreateMultisigData),
    CreateSwapPool(CreateSwapPoolData),
    AddLiquidity(AddLiquidityData),
    RemoveLiquidity(RemoveLiquidityData),
    SellSwapPool(SellSwapPoolData),
    SellAllSwapPool(SellAllSwapPoolData),
    BuySwapPool(BuySwapPoolData),
    AddLimitOrder(AddLimitOrderData),
    RemoveLimitOrder(RemoveLimitOrderData),
}

impl TxData {
    pub fn kind(&self) -> TxKind {
        match self {
            TxData::Send(_) => TxKind::Send,
            TxData::CreateMultisig(_) => TxKind::CreateMultisig,
            TxData::CreateSwapPool(_) => TxKind::CreateSwapPool,
            TxData::AddLiquidity(_) => TxKind::AddLiquidity,
            TxData::RemoveLiquidity(_) => TxKind::RemoveLiquidity,
            TxData::SellSwapPool(_) => TxKind::SellSwapPool,
            TxData::SellAllSwapPool(_) => TxKind::SellAllSwapPool,
            TxData::BuySwapPool(_) => TxKind::BuySwapPool,
            TxData::AddLimitOrder(_) => TxKind::AddLimitOrder,
            TxData::RemoveLimitOrder(_) => TxKind::RemoveLimitOrder,
        }
    }

    /// Canonical bytes of the payload
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            TxData::Send(d) => codec::encode(d),
            TxData::CreateMultisig(d) => codec::encode(d),
            TxData::CreateSwapPool(d) => codec::encode(d),
            TxData::AddLiquidity(d) => codec::encode(d),
            TxData::RemoveLiquidity(d) => codec::encode(d),
            TxData::SellSwapPool(d) => codec::encode(d),
            TxData::SellAllSwapPool(d) => codec::encode(d),
            TxData::BuySwapPool(d) => codec::encode(d),
            TxData::AddLimitOrder(d) => codec::encode(d),
            TxData::RemoveLimitOrder(d) => codec::encode(d),
        }
    }

    /// Decode the payload for a known kind
    pub fn decode(kind: TxKind, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(match kind {
            TxKind::Send => TxData::Send(codec::decode(bytes)?),
            TxKind::CreateMultisig => TxData::CreateMultisig(codec::decode(bytes)?),
            TxKind::CreateSwapPool => TxData::CreateSwapPool(codec::decode(bytes)?),
            TxKind::AddLiquidity => TxData::AddLiquidity(codec::decode(bytes)?),
            TxKind::RemoveLiquidity => TxData::RemoveLiquidity(codec::decode(bytes)?),
            TxKind::SellSwapPool => TxData::SellSwapPool(codec::decode(bytes)?),
            TxKind::SellAllSwapPool => TxData::SellAllSwapPool(codec::decode(bytes)?),
            TxKind::BuySwapPool => TxData::BuySwapPool(codec::decode(bytes)?),
            TxKind::AddLimitOrder => TxData::AddLimitOrder(codec::decode(bytes)?),
            TxKind::RemoveLimitOrder => TxData::RemoveLimitOrder(codec::decode(bytes)?),
        })
    }
}

// =============================================================================
// WIRE TRANSACTION
// =============================================================================

/// Transaction as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: Nonce,
    pub gas_price: u64,
    pub chain_id: ChainId,
    pub gas_coin: CoinId,
    pub kind: u8,
    pub data: Vec<u8>,
    pub payload: Vec<u8>,
    pub service_data: Vec<u8>,
    pub signature_type: u8,
    pub signature_data: Vec<u8>,
}

/// Fields covered by the signature
#[derive(Serialize)]
struct SigningPayload<'a> {
    nonce: Nonce,
    gas_price: u64,
    chain_id: ChainId,
    gas_coin: CoinId,
    kind: u8,
    data: &'a [u8],
    payload: &'a [u8],
    service_data: &'a [u8],
    signature_type: u8,
    multisig: Option<AccountId>,
}

impl Transaction {
    /// Decode a raw transaction
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        codec::decode(raw)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Hash de la transaction (over its canonical bytes)
    pub fn hash(&self) -> Hash {
        match self.encode() {
            Ok(bytes) => Hash::hash(&bytes),
            Err(_) => {
                let mut data = Vec::new();
                data.extend_from_slice(&self.nonce.to_le_bytes());
                data.extend_from_slice(&self.data);
                data.extend_from_slice(&self.signature_data);
                Hash::hash(&data)
            }
        }
    }

    /// Domain-separated message the signer(s) sign
    pub fn signing_message(&self, multisig: Option<AccountId>) -> Result<Vec<u8>, CodecError> {
        let payload = SigningPayload {
            nonce: self.nonce,
            gas_price: self.gas_price,
            chain_id: self.chain_id,
            gas_coin: self.gas_coin,
            kind: self.kind,
            data: &self.data,
            payload: &self.payload,
            service_data: &self.service_data,
            signature_type: self.signature_type,
            multisig,
        };
        let bytes = codec::encode(&payload)?;
        Ok(domain_separate(DOMAIN_TRANSACTION, &bytes))
    }

    /// Decode the signature payload according to the type tag
    pub fn signature(&self) -> Result<SignatureData, CodecError> {
        match SignatureType::from_u8(self.signature_type) {
            Some(SignatureType::Single) => {
                Ok(SignatureData::Single(codec::decode(&self.signature_data)?))
            }
            Some(SignatureType::Multi) => {
                Ok(SignatureData::Multi(codec::decode(&self.signature_data)?))
            }
            None => Err(CodecError::Decode(format!(
                "unknown signature type {}",
                self.signature_type
            ))),
        }
    }

    /// Length of payload plus service data, billed per byte
    pub fn payload_and_service_data_len(&self) -> usize {
        self.payload.len() + self.service_data.len()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builds and signs transactions (wallets, tests, CLI)
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    nonce: Nonce,
    gas_price: u64,
    chain_id: ChainId,
    gas_coin: CoinId,
    data: TxData,
    payload: Vec<u8>,
    service_data: Vec<u8>,
}

impl TransactionBuilder {
    pub fn new(chain_id: ChainId, nonce: Nonce, data: TxData) -> Self {
        Self {
            nonce,
            gas_price: 1,
            chain_id,
            gas_coin: CoinId::BASE,
            data,
            payload: Vec::new(),
            service_data: Vec::new(),
        }
    }

    pub fn gas_coin(mut self, coin: CoinId) -> Self {
        self.gas_coin = coin;
        self
    }

    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn service_data(mut self, service_data: Vec<u8>) -> Self {
        self.service_data = service_data;
        self
    }

    fn unsigned(&self, signature_type: SignatureType) -> Result<Transaction, CodecError> {
        Ok(Transaction {
            nonce: self.nonce,
            gas_price: self.gas_price,
            chain_id: self.chain_id,
            gas_coin: self.gas_coin,
            kind: self.data.kind().as_u8(),
            data: self.data.encode()?,
            payload: self.payload.clone(),
            service_data: self.service_data.clone(),
            signature_type: signature_type as u8,
            signature_data: Vec::new(),
        })
    }

    /// Sign with a single key
    pub fn sign(&self, key: &SigningKey) -> Result<Transaction, CodecError> {
        let mut tx = self.unsigned(SignatureType::Single)?;
        let message = tx.signing_message(None)?;
        let signature = SingleSignature {
            signer: AccountId::from_public_key(&key.verifying_key()),
            signature: key.sign(&message).to_bytes().into(),
        };
        tx.signature_data = codec::encode(&signature)?;
        Ok(tx)
    }

    /// Sign on behalf of a multisig account with each of `keys`
    pub fn sign_multi(
        &self,
        multisig: AccountId,
        keys: &[&SigningKey],
    ) -> Result<Transaction, CodecError> {
        let mut tx = self.unsigned(SignatureType::Multi)?;
        let message = tx.signing_message(Some(multisig))?;
        let signatures = keys
            .iter()
            .map(|key| SingleSignature {
                signer: AccountId::from_public_key(&key.verifying_key()),
                signature: key.sign(&message).to_bytes().into(),
            })
            .collect();
        tx.signature_data = codec::encode(&MultiSignature {
            multisig,
            signatures,
        })?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primitives::coins;

    fn test_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn send_data() -> TxData {
        TxData::Send(SendData {
            coin: CoinId::BASE,
            to: AccountId::from_bytes([2u8; 32]),
            value: coins(1),
        })
    }

    #[test]
    fn test_transaction_hash_deterministic() {
        let tx = TransactionBuilder::new(ChainId::MAINNET, 1, send_data())
            .sign(&test_key(1))
            .unwrap();
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn test_signed_transaction_roundtrip() {
        let tx = TransactionBuilder::new(ChainId::MAINNET, 1, send_data())
            .payload(b"hello".to_vec())
            .sign(&test_key(1))
            .unwrap();
        let raw = tx.encode().unwrap();
        let decoded = Transaction::decode(&raw).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.encode().unwrap(), raw);
    }

    #[test]
    fn test_single_signature_verifies() {
        let key = test_key(3);
        let tx = TransactionBuilder::new(ChainId::MAINNET, 1, send_data())
            .sign(&key)
            .unwrap();
        let SignatureData::Single(sig) = tx.signature().unwrap() else {
            panic!("expected single signature");
        };
        let message = tx.signing_message(None).unwrap();
        assert!(sig.signer.verify(&message, sig.signature.as_bytes()));
        assert_eq!(sig.signer, AccountId::from_public_key(&key.verifying_key()));
    }

    #[test]
    fn test_unknown_kind_byte() {
        assert_eq!(TxKind::from_u8(0x17), Some(TxKind::SellSwapPool));
        assert_eq!(TxKind::from_u8(0xEE), None);
    }

    #[test]
    fn test_payload_decode_rejects_wrong_kind_bytes() {
        let bytes = TxData::RemoveLimitOrder(RemoveLimitOrderData { id: 5 })
            .encode()
            .unwrap();
        assert!(TxData::decode(TxKind::Send, &bytes).is_err());
    }
}
