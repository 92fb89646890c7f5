//! Timeline use-case services.
//!
//! # Responsibility
//! - Enforce grouping/visibility invariants above the store.
//! - Own the per-day controller state machine.
//! - Keep callers decoupled from storage details.

pub mod client_directory;
pub mod controller;
pub mod error;
pub mod grouping_service;
pub mod selection;
