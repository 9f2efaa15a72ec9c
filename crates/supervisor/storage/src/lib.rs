//! Storage interfaces the supervisor keeps per chain, and an in-memory implementation of them.

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{
    DerivationStorageReader, DerivationStorageWriter, HeadRefStorageReader, HeadRefStorageWriter,
    LogStorageReader, LogStorageWriter,
};

mod chaindb;
pub use chaindb::InMemoryChainDb;
