//! Persistence Adapters - Session Blob Storage
//!
//! Implements the `ProfileStore` port: an atomic JSON file for real runs
//! and an in-memory cell for tests and ephemeral sessions.

pub mod memory;
pub mod state;

pub use memory::MemoryProfileStore;
pub use state::FileProfileStore;
