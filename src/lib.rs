// Agora Core - Deterministic execution of coins, pools and limit orders
// Principle: Minimal, auditable, déterministe

pub mod cli;
pub mod commission;
pub mod config;
pub mod execution;
pub mod fault;
pub mod genesis;
pub mod mempool;
pub mod state;
pub mod storage;
pub mod swap;
pub mod types;

#[cfg(test)]
mod tests;
