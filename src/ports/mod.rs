//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Interfaces the session needs from the outside world. Adapters
//! implement these traits; tests substitute mocks.
//!
//! Port categories:
//! - `ProfileStore`: load/save of the session blob under a fixed key
//! - `RandomSource`: injectable uniform sampling for outcomes and mock data

pub mod profile_store;
pub mod random;

pub use profile_store::ProfileStore;
pub use random::RandomSource;
