// Spécification du genesis - état initial de l'exécuteur
use crate::commission::CommissionPrice;
use crate::state::{StateDb, StateRead, StateWrite};
use crate::swap::{LimitOrder, MINIMUM_LIQUIDITY};
use crate::types::*;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisError {
    #[error("Erreur I/O sur {0}: {1}")]
    Io(String, String),

    #[error("Genesis invalide: {0}")]
    Parse(String),

    #[error("base coin (id 0) missing from genesis")]
    MissingBaseCoin,

    #[error("coin {0} declared twice")]
    DuplicateCoin(CoinId),

    #[error("coin {0} not declared")]
    UnknownCoin(CoinId),

    #[error("pool {0}-{1} declared twice or with identical coins")]
    InvalidPool(CoinId, CoinId),

    #[error("pool {0}-{1} has too little initial liquidity")]
    InsufficientLiquidity(CoinId, CoinId),

    #[error("no pool between {0} and {1} for order")]
    MissingPool(CoinId, CoinId),

    #[error("{account} cannot fund {amount} of coin {coin}")]
    InsufficientBalance {
        account: AccountId,
        coin: CoinId,
        amount: Amount,
    },

    #[error("multisig {0} is invalid: {1}")]
    InvalidMultisig(AccountId, String),
}

/// Balance initiale d'un compte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account: AccountId,
    pub coin: CoinId,
    #[serde(with = "amount_serde")]
    pub amount: Amount,
}

/// Pool created at genesis, funded from the provider's balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisPool {
    pub provider: AccountId,
    pub coin0: CoinId,
    pub coin1: CoinId,
    #[serde(with = "amount_serde")]
    pub volume0: Amount,
    #[serde(with = "amount_serde")]
    pub volume1: Amount,
}

/// Resting order at genesis, escrowed from the owner's balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisOrder {
    pub owner: AccountId,
    pub coin_to_sell: CoinId,
    #[serde(with = "amount_serde")]
    pub value_to_sell: Amount,
    pub coin_to_buy: CoinId,
    #[serde(with = "amount_serde")]
    pub value_to_buy: Amount,
}

/// Spécification du genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisSpec {
    pub chain_id: ChainId,
    pub coins: Vec<Coin>,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    #[serde(default)]
    pub pools: Vec<GenesisPool>,
    #[serde(default)]
    pub orders: Vec<GenesisOrder>,
    #[serde(default)]
    pub multisigs: Vec<Multisig>,
    #[serde(default)]
    pub commission: CommissionPrice,
}

impl GenesisSpec {
    /// Development chain: a base coin, a token and a bancor coin, all held by
    /// `owner`, with a base pool for each
    pub fn development(owner: AccountId) -> Self {
        let token = Coin {
            id: CoinId(1),
            symbol: "USDX".into(),
            name: "Dev stable token".into(),
            volume: coins(10_000_000),
            reserve: Amount::default(),
            crr: 0,
            max_supply: coins(10_000_000),
            owner: Some(owner),
            mintable: false,
            burnable: false,
        };
        let bancor = Coin {
            id: CoinId(2),
            symbol: "BNC".into(),
            name: "Dev bancor coin".into(),
            volume: coins(1_000_000),
            reserve: coins(500_000),
            crr: 50,
            max_supply: coins(100_000_000),
            owner: Some(owner),
            mintable: false,
            burnable: false,
        };

        let balances = vec![
            GenesisBalance {
                account: owner,
                coin: CoinId::BASE,
                amount: coins(1_000_000_000),
            },
            GenesisBalance {
                account: owner,
                coin: token.id,
                amount: token.volume.clone(),
            },
            GenesisBalance {
                account: owner,
                coin: bancor.id,
                amount: bancor.volume.clone(),
            },
        ];
        let pools = vec![
            GenesisPool {
                provider: owner,
                coin0: CoinId::BASE,
                coin1: token.id,
                volume0: coins(1_000_000),
                volume1: coins(1_000_000),
            },
            GenesisPool {
                provider: owner,
                coin0: CoinId::BASE,
                coin1: bancor.id,
                volume0: coins(100_000),
                volume1: coins(200_000),
            },
        ];

        Self {
            chain_id: ChainId::TESTNET,
            coins: vec![Coin::base("AGR", coins(1_000_000_000)), token, bancor],
            balances,
            pools,
            orders: Vec::new(),
            multisigs: Vec::new(),
            commission: CommissionPrice::default(),
        }
    }

    /// Charge depuis un fichier JSON
    pub fn from_file(path: &Path) -> Result<Self, GenesisError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenesisError::Io(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| GenesisError::Parse(e.to_string()))
    }

    /// Sauvegarde vers un fichier JSON
    pub fn to_file(&self, path: &Path) -> Result<(), GenesisError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| GenesisError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| GenesisError::Io(path.display().to_string(), e.to_string()))
    }
}

/// Builder pour l'état genesis
pub struct GenesisBuilder {
    spec: GenesisSpec,
}

impl GenesisBuilder {
    pub fn new(spec: GenesisSpec) -> Self {
        Self { spec }
    }

    /// Construit l'état initial. Sections are applied in order: coins,
    /// balances, pools, orders, multisigs.
    pub fn build(self) -> Result<StateDb, GenesisError> {
        let mut state = StateDb::new();
        let spec = self.spec;

        let mut ids = BTreeSet::new();
        for coin in &spec.coins {
            if !ids.insert(coin.id) {
                return Err(GenesisError::DuplicateCoin(coin.id));
            }
            state.set_coin(coin.clone());
        }
        if !ids.contains(&CoinId::BASE) {
            return Err(GenesisError::MissingBaseCoin);
        }
        let known = |coin: CoinId| {
            if ids.contains(&coin) {
                Ok(())
            } else {
                Err(GenesisError::UnknownCoin(coin))
            }
        };

        for balance in &spec.balances {
            known(balance.coin)?;
            state.add_balance(&balance.account, balance.coin, &balance.amount);
        }

        for pool in &spec.pools {
            known(pool.coin0)?;
            known(pool.coin1)?;
            if pool.coin0 == pool.coin1 || state.pool_id_by_pair(pool.coin0, pool.coin1).is_some() {
                return Err(GenesisError::InvalidPool(pool.coin0, pool.coin1));
            }
            let minimum = BigUint::from(MINIMUM_LIQUIDITY);
            if (&pool.volume0 * &pool.volume1).sqrt() <= minimum {
                return Err(GenesisError::InsufficientLiquidity(pool.coin0, pool.coin1));
            }
            debit(&mut state, &pool.provider, pool.coin0, &pool.volume0)?;
            debit(&mut state, &pool.provider, pool.coin1, &pool.volume1)?;
            let created = state.create_pool(pool.coin0, pool.coin1, pool.volume0.clone(), pool.volume1.clone());
            state.set_liquidity(created.id, &pool.provider, &created.liquidity - minimum);
        }

        for order in &spec.orders {
            let pool = state
                .pool_by_pair(order.coin_to_sell, order.coin_to_buy)
                .ok_or(GenesisError::MissingPool(order.coin_to_sell, order.coin_to_buy))?;
            debit(&mut state, &order.owner, order.coin_to_sell, &order.value_to_sell)?;
            let id = state.allocate_order_id();
            state.set_order(LimitOrder {
                id,
                owner: order.owner,
                pool_id: pool.id,
                coin_to_sell: order.coin_to_sell,
                coin_to_buy: order.coin_to_buy,
                want_sell: order.value_to_sell.clone(),
                want_buy: order.value_to_buy.clone(),
                height: 0,
            });
        }

        for multisig in &spec.multisigs {
            if multisig.weights.len() != multisig.addresses.len() {
                return Err(GenesisError::InvalidMultisig(multisig.address, "weights and addresses differ".into()));
            }
            if multisig.addresses.len() > MAX_MULTISIG_OWNERS {
                return Err(GenesisError::InvalidMultisig(multisig.address, "too many owners".into()));
            }
            if multisig.threshold == 0 {
                return Err(GenesisError::InvalidMultisig(multisig.address, "zero threshold".into()));
            }
            if multisig.total_weight() < multisig.threshold as u64 {
                return Err(GenesisError::InvalidMultisig(multisig.address, "threshold unreachable".into()));
            }
            state.set_multisig(multisig.clone());
        }

        state.set_commission_price(spec.commission);

        info!(
            coins = spec.coins.len(),
            pools = spec.pools.len(),
            orders = spec.orders.len(),
            "genesis state built"
        );
        Ok(state)
    }
}

fn debit(state: &mut StateDb, account: &AccountId, coin: CoinId, amount: &Amount) -> Result<(), GenesisError> {
    state.sub_balance(account, coin, amount).map_err(|_| GenesisError::InsufficientBalance {
        account: *account,
        coin,
        amount: amount.clone(),
    })
}
