// Gas - Coût en gas par type de transaction
//
// Gas is a fixed weight per kind; the fee itself comes from the commission
// table, so gas only feeds the receipt and block limits.

/// Coûts par type
pub mod costs {
    pub const SEND: u64 = 10;
    pub const CREATE_MULTISIG: u64 = 100;
    pub const CREATE_SWAP_POOL: u64 = 1_000;
    pub const ADD_LIQUIDITY: u64 = 100;
    pub const REMOVE_LIQUIDITY: u64 = 100;
    pub const SWAP_POOL: u64 = 100;
    /// Par hop supplémentaire d'une route
    pub const SWAP_POOL_EXTRA_HOP: u64 = 50;
    pub const ADD_LIMIT_ORDER: u64 = 100;
    pub const REMOVE_LIMIT_ORDER: u64 = 100;
}

/// Gas of a swap along a route of `coins_in_route` coins
pub fn route_gas(coins_in_route: usize) -> u64 {
    let extra_hops = coins_in_route.saturating_sub(2) as u64;
    costs::SWAP_POOL + costs::SWAP_POOL_EXTRA_HOP * extra_hops
}
