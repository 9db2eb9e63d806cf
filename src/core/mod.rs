//! Batch execution engine core

pub mod credential;
pub mod dispatcher;
pub mod processor;
pub mod provider;
pub mod retry;
pub mod types;
