//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! dependencies and hosts the outer surfaces of the dojo.
//!
//! Adapter categories:
//! - `console`: stdin command parsing and event rendering
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: profile blob stores (JSON file, in-memory)
//! - `random`: seedable PCG random source

pub mod console;
pub mod metrics;
pub mod persistence;
pub mod random;
