// Primitives - Types fondamentaux minimaux
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash universel (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash des données avec Blake3
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

/// Block height
pub type BlockNumber = u64;

/// Nonce pour prévenir replay attacks
pub type Nonce = u64;

/// Arbitrary-precision, non-negative token amount.
/// Every balance, reserve, volume and fee in the core is an `Amount`.
pub type Amount = BigUint;

/// 1 coin = 10^18 units
pub const DECIMALS: u32 = 18;

/// Number of units in one whole coin.
pub fn unit() -> Amount {
    BigUint::from(10u32).pow(DECIMALS)
}

/// `n` whole coins expressed in units.
pub fn coins(n: u64) -> Amount {
    BigUint::from(n) * unit()
}

/// Parse a decimal string ("1.5", "100") into units.
pub fn parse_coins(s: &str) -> Option<Amount> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if frac_part.len() > DECIMALS as usize || (int_part.is_empty() && frac_part.is_empty()) {
        return None;
    }
    let int_value = if int_part.is_empty() {
        BigUint::zero()
    } else {
        int_part.parse::<BigUint>().ok()?
    };
    let mut frac_digits = frac_part.to_string();
    while frac_digits.len() < DECIMALS as usize {
        frac_digits.push('0');
    }
    let frac_value = frac_digits.parse::<BigUint>().ok()?;
    Some(int_value * unit() + frac_value)
}

/// Render units as a decimal coin string, trailing zeros trimmed.
pub fn format_coins(amount: &Amount) -> String {
    let unit = unit();
    let int_part = amount / &unit;
    let frac_part = amount % &unit;
    if frac_part.is_zero() {
        return int_part.to_string();
    }
    let mut frac = format!("{:0>width$}", frac_part.to_string(), width = DECIMALS as usize);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{}.{}", int_part, frac)
}

/// Checked subtraction on amounts; `None` when the result would be negative.
pub fn checked_sub(a: &Amount, b: &Amount) -> Option<Amount> {
    if a < b {
        None
    } else {
        Some(a - b)
    }
}

/// Ceiling division, `den` must be non-zero.
pub fn div_ceil(num: &Amount, den: &Amount) -> Amount {
    let q = num / den;
    if (num % den).is_zero() {
        q
    } else {
        q + BigUint::one()
    }
}

/// Coin identifier. `CoinId::BASE` is the network's base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(pub u32);

impl CoinId {
    /// Base currency toujours ID 0
    pub const BASE: CoinId = CoinId(0);

    pub fn is_base(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ChainId - distinguishes mainnet from testnets in signed transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const TESTNET: ChainId = ChainId(2);
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}
