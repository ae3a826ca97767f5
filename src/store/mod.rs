//! Storage layer for lti-resolver.
//!
//! The resolver and the history service only read, through [`ToolStore`] and
//! [`MessageStore`]. Installation writes go through [`ToolWriter`]. Two
//! implementations are provided:
//! - **MemoryStore**: ordered in-memory maps, for tests and one-off fixtures
//! - **SqliteStore**: durable SQLite database
//!
//! # Example
//!
//! ```ignore
//! use lti_resolver::store::{Fixture, SqliteStore};
//!
//! let mut store = SqliteStore::open(Path::new("lti.db"))?;
//! Fixture::load(Path::new("tools.yml"))?.apply(&mut store)?;
//! ```

mod fixture;
mod memory;
mod sqlite;
mod traits;

pub use fixture::{Fixture, ImportSummary};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{MessageQuery, MessageStore, ToolStore, ToolWriter};
