// Storage - Persistance des snapshots d'état (RocksDB)

pub mod db;
pub mod snapshot;

pub use db::*;
pub use snapshot::SnapshotStore;
