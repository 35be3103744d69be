//! Common utilities shared by the listener, notifier and front end

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::EndpointConfig;
pub use error::{Error, ErrorKind, Result};
