//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept a Postgres executor (the pool or an open transaction) as the
//! first argument.

pub mod preparation_repo;

pub use preparation_repo::PreparationRepo;
