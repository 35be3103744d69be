//! XML-RPC wire protocol
//!
//! Value model and XML body codec, plus the axum glue shared by the
//! inbound listener and the stub platform. Outbound calls reuse the body
//! codec over `reqwest`.

pub mod codec;
pub mod service;
pub mod value;

pub use value::{fault_code, Fault, MethodCall, MethodResponse, Value, ValueKind};
