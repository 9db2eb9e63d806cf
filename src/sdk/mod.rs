//! Client-side SDK

pub mod poller;

pub use poller::{PollSnapshot, StatusPoller};
