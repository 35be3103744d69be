//! Training bridge - example training application for an XML-RPC platform
//!
//! This library provides both directions of the bridge: an inbound
//! listener the platform calls and an outbound notifier that calls it.

pub mod cli;
pub mod commands;
pub mod common;
pub mod display;
pub mod listener;
pub mod notifier;
pub mod testing;
pub mod xmlrpc;

// Re-export commonly used types for tests
pub use common::{EndpointConfig, Error, Result};
pub use display::{DisplayEvent, DisplayLog, DisplaySink};
pub use listener::{Listener, ListenerState};
pub use notifier::Notifier;
