// Account - Adresses et comptes multisig
use super::primitives::{Hash, Nonce};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of owners in a multisig account
pub const MAX_MULTISIG_OWNERS: usize = 32;

/// Maximum weight of a single multisig owner
pub const MAX_MULTISIG_WEIGHT: u32 = 1023;

/// Domain used to derive multisig addresses
const DOMAIN_MULTISIG_ADDRESS: &[u8] = b"AGORA_MULTISIG_V1:";

/// AccountId = clé publique Ed25519 (32 bytes)
/// Multisig accounts use a derived 32-byte address that is not a valid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        AccountId(key.to_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Address of the multisig created by `creator` at `nonce`
    pub fn multisig(creator: &AccountId, nonce: Nonce) -> Self {
        let mut data = Vec::with_capacity(DOMAIN_MULTISIG_ADDRESS.len() + 40);
        data.extend_from_slice(DOMAIN_MULTISIG_ADDRESS);
        data.extend_from_slice(&creator.0);
        data.extend_from_slice(&nonce.to_be_bytes());
        AccountId(*Hash::hash(&data).as_bytes())
    }

    /// Vérifie une signature
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let public_key = match VerifyingKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let sig = Signature::from_bytes(signature);

        public_key.verify(message, &sig).is_ok()
    }

    /// Full hex form used in tags and JSON detail
    pub fn to_hex(&self) -> String {
        format!("Mx{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

impl FromStr for AccountId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("Mx").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(raw, &mut bytes)?;
        Ok(AccountId(bytes))
    }
}

/// Weighted multisig account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multisig {
    pub address: AccountId,
    pub threshold: u32,
    pub weights: Vec<u32>,
    pub addresses: Vec<AccountId>,
}

impl Multisig {
    /// Weight of `account`, zero when it is not an owner
    pub fn weight_of(&self, account: &AccountId) -> u32 {
        self.addresses
            .iter()
            .position(|a| a == account)
            .map(|i| self.weights[i])
            .unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.weights.iter().map(|w| *w as u64).sum()
    }
}
