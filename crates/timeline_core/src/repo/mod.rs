//! Store collaborator contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the read/write contract the engine needs from a backing store.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Multi-record writes are all-or-nothing.
//! - Reads reject invalid persisted state instead of masking it.

pub mod timeline_repo;
