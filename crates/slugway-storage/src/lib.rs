//! Storage backends for the Slugway slug cascade service.
//!
//! Both stores implement every storage port of `slugway_core`:
//! [`InMemoryStore`] for tests and embedding, [`MySqlStore`] for production.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use slugway_core::{
    PageRepository, PageWriter, RecordHistory, RedirectRepository, Result, StorageError,
};
