// Signature - Wire forms of single and multisig signatures
use super::account::AccountId;
use serde::{Deserialize, Serialize};

/// Prefix of every transaction signing message
pub const DOMAIN_TRANSACTION: &[u8] = b"AGORA_TRANSACTION_V1:";

pub fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    [domain, message].concat()
}

/// Raw ed25519 signature; serialized as a length-checked byte string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Signature64([u8; 64]);

impl Signature64 {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl From<[u8; 64]> for Signature64 {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl From<Signature64> for Vec<u8> {
    fn from(signature: Signature64) -> Self {
        signature.0.to_vec()
    }
}

impl TryFrom<Vec<u8>> for Signature64 {
    type Error = String;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let len = bytes.len();
        <[u8; 64]>::try_from(bytes)
            .map(Self)
            .map_err(|_| format!("signature must be 64 bytes, got {}", len))
    }
}

/// Signature type tag carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignatureType {
    Single = 1,
    Multi = 2,
}

impl SignatureType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(SignatureType::Single),
            2 => Some(SignatureType::Multi),
            _ => None,
        }
    }
}

/// One ed25519 signature together with the key that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSignature {
    pub signer: AccountId,
    pub signature: Signature64,
}

/// Signatures of a multisig account's owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSignature {
    pub multisig: AccountId,
    pub signatures: Vec<SingleSignature>,
}

/// Decoded signature payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureData {
    Single(SingleSignature),
    Multi(MultiSignature),
}
