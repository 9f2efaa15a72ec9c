//! In-memory per-chain database.

use crate::{
    DerivationStorageReader, DerivationStorageWriter, HeadRefStorageReader, HeadRefStorageWriter,
    LogStorageReader, LogStorageWriter, StorageError,
};
use alloy_eips::BlockNumHash;
use kona_interop::{BlockInfo, DerivedRefPair, SafetyLevel, SuperHead};
use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Tables {
    /// Blocks by number, starting at the activation block.
    blocks: BTreeMap<u64, BlockInfo>,
    /// Derived blocks by number, with the L1 block each was derived from.
    derived: BTreeMap<u64, DerivedRefPair>,
    heads: SuperHead,
}

/// Keeps the log, derivation records and safety heads of a single chain in memory.
///
/// Useful for tests and for embedders that rebuild state from the node on startup.
#[derive(Debug, Default)]
pub struct InMemoryChainDb {
    tables: RwLock<Tables>,
}

impl InMemoryChainDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl DerivationStorageReader for InMemoryChainDb {
    fn derived_to_source(&self, derived_block_id: BlockNumHash) -> Result<BlockInfo, StorageError> {
        let tables = self.read()?;
        let pair = tables.derived.get(&derived_block_id.number).ok_or_else(|| {
            StorageError::EntryNotFound(format!("derived block #{}", derived_block_id.number))
        })?;
        if pair.derived.hash != derived_block_id.hash {
            return Err(StorageError::ConflictError(pair.derived.id()));
        }
        Ok(pair.source)
    }

    fn latest_derivation_state(&self) -> Result<DerivedRefPair, StorageError> {
        let tables = self.read()?;
        tables
            .derived
            .last_key_value()
            .map(|(_, pair)| *pair)
            .ok_or(StorageError::DatabaseNotInitialised)
    }

    fn is_local_safe(&self, block: BlockNumHash) -> Result<(), StorageError> {
        let tables = self.read()?;
        let (latest, _) =
            tables.derived.last_key_value().ok_or(StorageError::DatabaseNotInitialised)?;
        if block.number > *latest {
            return Err(StorageError::FutureData(block));
        }

        match tables.derived.get(&block.number) {
            Some(pair) if pair.derived.hash == block.hash => Ok(()),
            Some(pair) => Err(StorageError::ConflictError(pair.derived.id())),
            None => Err(StorageError::EntryNotFound(format!("derived block #{}", block.number))),
        }
    }
}

impl DerivationStorageWriter for InMemoryChainDb {
    fn save_derived_block(&self, pair: DerivedRefPair) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        if let Some((_, latest)) = tables.derived.last_key_value() {
            let same_block = latest.derived == pair.derived;
            if !same_block && !latest.derived.is_parent_of(&pair.derived) {
                warn!(
                    target: "supervisor::storage",
                    latest = %latest.derived,
                    incoming = %pair.derived,
                    "Derived block does not extend the latest derived block"
                );
                return Err(StorageError::BlockOutOfOrder);
            }
        }

        debug!(target: "supervisor::storage", derived = %pair.derived, source = %pair.source, "Saved derived block");
        tables.derived.insert(pair.derived.number, pair);
        tables.heads.local_safe = Some(pair.derived);
        Ok(())
    }
}

impl HeadRefStorageReader for InMemoryChainDb {
    fn get_safety_head_ref(&self, safety_level: SafetyLevel) -> Result<BlockInfo, StorageError> {
        self.read()?
            .heads
            .get(safety_level)
            .ok_or_else(|| StorageError::EntryNotFound(format!("{safety_level} head")))
    }

    fn get_super_head(&self) -> Result<SuperHead, StorageError> {
        Ok(self.read()?.heads)
    }
}

impl HeadRefStorageWriter for InMemoryChainDb {
    fn update_safety_head_ref(
        &self,
        safety_level: SafetyLevel,
        block: &BlockInfo,
    ) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        let heads = &mut tables.heads;
        let slot = match safety_level {
            SafetyLevel::Finalized => &mut heads.finalized,
            SafetyLevel::CrossSafe => &mut heads.cross_safe,
            SafetyLevel::LocalSafe => &mut heads.local_safe,
            SafetyLevel::CrossUnsafe => &mut heads.cross_unsafe,
            SafetyLevel::LocalUnsafe => &mut heads.local_unsafe,
        };
        *slot = Some(*block);
        debug!(target: "supervisor::storage", %safety_level, %block, "Updated safety head");
        Ok(())
    }
}

impl LogStorageReader for InMemoryChainDb {
    fn get_block(&self, block_number: u64) -> Result<BlockInfo, StorageError> {
        self.read()?
            .blocks
            .get(&block_number)
            .copied()
            .ok_or_else(|| StorageError::EntryNotFound(format!("block #{block_number}")))
    }

    fn get_latest_block(&self) -> Result<BlockInfo, StorageError> {
        self.read()?
            .blocks
            .last_key_value()
            .map(|(_, block)| *block)
            .ok_or(StorageError::DatabaseNotInitialised)
    }

    fn get_activation_block(&self) -> Result<BlockInfo, StorageError> {
        self.read()?
            .blocks
            .first_key_value()
            .map(|(_, block)| *block)
            .ok_or(StorageError::DatabaseNotInitialised)
    }
}

impl LogStorageWriter for InMemoryChainDb {
    fn initialise_log_storage(&self, activation_block: BlockInfo) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        if let Some((_, first)) = tables.blocks.first_key_value() {
            if *first == activation_block {
                return Ok(());
            }
            return Err(StorageError::ConflictError(first.id()));
        }

        tables.blocks.insert(activation_block.number, activation_block);
        tables.heads.local_unsafe = Some(activation_block);
        debug!(target: "supervisor::storage", block = %activation_block, "Initialised log storage");
        Ok(())
    }

    fn store_block(&self, block: &BlockInfo) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        let (_, latest) =
            tables.blocks.last_key_value().ok_or(StorageError::DatabaseNotInitialised)?;
        if !latest.is_parent_of(block) {
            return Err(StorageError::BlockOutOfOrder);
        }

        tables.blocks.insert(block.number, *block);
        tables.heads.local_unsafe = Some(*block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn block(number: u64) -> BlockInfo {
        BlockInfo::new(
            B256::with_last_byte(number as u8),
            number,
            B256::with_last_byte(number.saturating_sub(1) as u8),
            1000 + number * 2,
        )
    }

    fn l1(number: u64) -> BlockInfo {
        BlockInfo::new(B256::repeat_byte(0xaa), number, B256::ZERO, number * 12)
    }

    fn db_with_local_safe(up_to: u64) -> InMemoryChainDb {
        let db = InMemoryChainDb::new();
        for number in 1..=up_to {
            db.save_derived_block(DerivedRefPair::new(l1(number), block(number))).unwrap();
        }
        db
    }

    #[test]
    fn test_is_local_safe_outcomes() {
        let db = db_with_local_safe(5);

        assert_eq!(db.is_local_safe(block(3).id()), Ok(()));
        assert_eq!(
            db.is_local_safe(block(6).id()),
            Err(StorageError::FutureData(block(6).id()))
        );

        let other = BlockNumHash { number: 4, hash: B256::repeat_byte(0xff) };
        assert_eq!(db.is_local_safe(other), Err(StorageError::ConflictError(block(4).id())));
    }

    #[test]
    fn test_is_local_safe_uninitialised() {
        let db = InMemoryChainDb::new();
        assert_eq!(
            db.is_local_safe(block(1).id()),
            Err(StorageError::DatabaseNotInitialised)
        );
    }

    #[test]
    fn test_save_derived_block_rejects_gap() {
        let db = db_with_local_safe(2);
        let err = db.save_derived_block(DerivedRefPair::new(l1(4), block(4))).unwrap_err();
        assert_eq!(err, StorageError::BlockOutOfOrder);

        // Re-deriving the latest block from a newer source is fine.
        db.save_derived_block(DerivedRefPair::new(l1(3), block(2))).unwrap();
        assert_eq!(db.derived_to_source(block(2).id()).unwrap(), l1(3));
        assert_eq!(db.get_safety_head_ref(SafetyLevel::LocalSafe).unwrap(), block(2));
    }

    #[test]
    fn test_log_storage() {
        let db = InMemoryChainDb::new();
        assert_eq!(db.get_activation_block(), Err(StorageError::DatabaseNotInitialised));
        assert_eq!(db.store_block(&block(1)), Err(StorageError::DatabaseNotInitialised));

        db.initialise_log_storage(block(1)).unwrap();
        db.initialise_log_storage(block(1)).unwrap();
        assert!(matches!(
            db.initialise_log_storage(block(2)),
            Err(StorageError::ConflictError(_))
        ));

        db.store_block(&block(2)).unwrap();
        assert_eq!(db.store_block(&block(4)), Err(StorageError::BlockOutOfOrder));

        assert_eq!(db.get_activation_block().unwrap(), block(1));
        assert_eq!(db.get_latest_block().unwrap(), block(2));
        assert_eq!(db.get_block(2).unwrap(), block(2));
        assert!(matches!(db.get_block(3), Err(StorageError::EntryNotFound(_))));
    }

    #[test]
    fn test_safety_heads() {
        let db = InMemoryChainDb::new();
        assert!(matches!(
            db.get_safety_head_ref(SafetyLevel::Finalized),
            Err(StorageError::EntryNotFound(_))
        ));

        db.update_safety_head_ref(SafetyLevel::Finalized, &block(3)).unwrap();
        db.update_safety_head_ref(SafetyLevel::CrossUnsafe, &block(7)).unwrap();

        let head = db.get_super_head().unwrap();
        assert_eq!(head.finalized, Some(block(3)));
        assert_eq!(head.cross_unsafe, Some(block(7)));
        assert_eq!(head.cross_safe, None);
    }
}
