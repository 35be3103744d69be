//! Inbound listener - the XML-RPC server the platform calls
//!
//! Serves `load`, `blob` and `closeApplication` on `127.0.0.1:{port}`:
//! 1. Serves HTTP with axum on a background task
//! 2. Decodes each request and validates it against the method table
//! 3. Forwards payloads to the display sink
//! 4. Stops itself after answering `closeApplication`

pub mod handler;
mod server;

pub use handler::{InboundCall, MethodSignature, METHODS};
pub use server::{Listener, ListenerState};
