//! Public facade crate for `transcheck`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the backend-agnostic types/traits from `transcheck-core`.

pub use transcheck_core::*;
