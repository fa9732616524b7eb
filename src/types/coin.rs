// Coin - Registre des coins (bancor coins et tokens)
use super::account::AccountId;
use super::primitives::{Amount, CoinId};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Minimum reserve a bancor coin must keep, in base units (10 coins)
pub fn min_coin_reserve() -> Amount {
    super::primitives::coins(10)
}

/// Coin record as held by the coin registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub symbol: String,
    pub name: String,
    /// Circulating supply
    #[serde(with = "super::amount_serde")]
    pub volume: Amount,
    /// Base currency backing the coin (zero for tokens)
    #[serde(with = "super::amount_serde")]
    pub reserve: Amount,
    /// Constant reserve ratio in percent (zero for tokens)
    pub crr: u32,
    #[serde(with = "super::amount_serde")]
    pub max_supply: Amount,
    pub owner: Option<AccountId>,
    pub mintable: bool,
    pub burnable: bool,
}

impl Coin {
    /// The base currency record
    pub fn base(symbol: &str, volume: Amount) -> Self {
        Self {
            id: CoinId::BASE,
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            max_supply: volume.clone(),
            volume,
            reserve: Amount::zero(),
            crr: 0,
            owner: None,
            mintable: false,
            burnable: false,
        }
    }

    /// Bancor coins carry a reserve and a CRR; tokens do not
    pub fn has_reserve(&self) -> bool {
        !self.reserve.is_zero() && self.crr > 0
    }

    pub fn is_token(&self) -> bool {
        !self.id.is_base() && !self.has_reserve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primitives::coins;

    #[test]
    fn test_reserve_classification() {
        let base = Coin::base("AGR", coins(1_000));
        assert!(!base.has_reserve());
        assert!(!base.is_token());

        let bancor = Coin {
            id: CoinId(1),
            symbol: "BNC".into(),
            name: "Bancor coin".into(),
            volume: coins(1_000),
            reserve: coins(500),
            crr: 50,
            max_supply: coins(1_000_000),
            owner: None,
            mintable: false,
            burnable: false,
        };
        assert!(bancor.has_reserve());
        assert!(!bancor.is_token());

        let token = Coin { reserve: Amount::zero(), crr: 0, ..bancor };
        assert!(token.is_token());
    }
}
