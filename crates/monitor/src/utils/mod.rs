//! Shared utilities

pub mod serde;
