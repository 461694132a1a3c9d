//! Host actions for ftbar.
//!
//! Turns the effects produced by click templates into host calls and
//! defines the bridge the host implements.

pub mod bridge;
pub mod dispatcher;
pub mod error;
pub mod types;

pub use bridge::{fetch_brightness, HostBridge, RecordingBridge};
pub use dispatcher::ActionDispatcher;
pub use error::ActionError;
pub use types::{Brightness, HostCommand};
