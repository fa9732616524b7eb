// Snapshot - Per-height persisted StateDb
use super::db::{Batch, Database};
use crate::state::{StateDb, StateError};
use crate::types::BlockNumber;
use std::path::Path;
use tracing::debug;

const PREFIX_SNAPSHOT: &[u8] = b"snapshot:";
const KEY_BEST_HEIGHT: &[u8] = b"best_height";

/// Snapshots keyed by height; `best_height` tracks the newest one
pub struct SnapshotStore {
    db: Database,
}

impl SnapshotStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        Ok(Self {
            db: Database::open(path)?,
        })
    }

    fn snapshot_key(height: BlockNumber) -> Vec<u8> {
        let mut key = PREFIX_SNAPSHOT.to_vec();
        key.extend_from_slice(&height.to_be_bytes());
        key
    }

    /// Persist the state reached after `height` and mark it as best
    pub fn save(&self, height: BlockNumber, state: &StateDb) -> Result<(), StateError> {
        let value = bincode::serialize(state).map_err(|e| StateError::SerializationFailed(e.to_string()))?;
        self.db.commit(
            Batch::new()
                .put(Self::snapshot_key(height), value)
                .put(KEY_BEST_HEIGHT, height.to_be_bytes()),
        )?;
        debug!(height, hash = %state.state_hash()?, "snapshot saved");
        Ok(())
    }

    pub fn load(&self, height: BlockNumber) -> Result<StateDb, StateError> {
        let data = self
            .db
            .get(&Self::snapshot_key(height))?
            .ok_or(StateError::SnapshotNotFound(height))?;
        bincode::deserialize(&data).map_err(|e| StateError::DeserializationFailed(e.to_string()))
    }

    pub fn best_height(&self) -> Result<Option<BlockNumber>, StateError> {
        match self.db.get(KEY_BEST_HEIGHT)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StateError::DeserializationFailed("best_height is not 8 bytes".into()))?;
                Ok(Some(BlockNumber::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Newest snapshot, if any
    pub fn load_best(&self) -> Result<Option<(BlockNumber, StateDb)>, StateError> {
        match self.best_height()? {
            Some(height) => Ok(Some((height, self.load(height)?))),
            None => Ok(None),
        }
    }

    /// Drop every snapshot and the best-height marker
    pub fn clear(&self) -> Result<(), StateError> {
        let batch = self
            .db
            .keys_with_prefix(PREFIX_SNAPSHOT)
            .fold(Batch::new(), |batch, key| batch.delete(key));
        self.db.commit(batch.delete(KEY_BEST_HEIGHT))?;
        Ok(())
    }

    /// Heights with a stored snapshot, ascending
    pub fn heights(&self) -> Vec<BlockNumber> {
        self.db
            .keys_with_prefix(PREFIX_SNAPSHOT)
            .filter_map(|key| {
                let raw: [u8; 8] = key[PREFIX_SNAPSHOT.len()..].try_into().ok()?;
                Some(BlockNumber::from_be_bytes(raw))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateWrite;
    use crate::types::{coins, AccountId, CoinId};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_best() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(temp_dir.path()).unwrap();
        assert!(store.load_best().unwrap().is_none());

        let mut state = StateDb::new();
        state.set_balance(&AccountId::from_bytes([1u8; 32]), CoinId::BASE, coins(3));
        store.save(0, &StateDb::new()).unwrap();
        store.save(5, &state).unwrap();

        let (height, loaded) = store.load_best().unwrap().unwrap();
        assert_eq!(height, 5);
        assert_eq!(loaded, state);
        assert_eq!(store.heights(), vec![0, 5]);
        assert!(matches!(store.load(3), Err(StateError::SnapshotNotFound(3))));
    }
}
