//! Shared utilities

pub mod crypto;
pub mod error;
