// Types fondamentaux d'Agora
// Principe: Minimal, auditable, déterministe

pub mod primitives;
pub mod amount_serde;
pub mod codec;
pub mod signature;
pub mod account;
pub mod coin;
pub mod transaction;

pub use primitives::*;
pub use signature::*;
pub use account::*;
pub use coin::*;
pub use transaction::*;
