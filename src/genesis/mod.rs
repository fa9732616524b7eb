// Genesis - État initial de l'exécuteur
pub mod spec;

pub use spec::{GenesisBalance, GenesisBuilder, GenesisError, GenesisOrder, GenesisPool, GenesisSpec};
