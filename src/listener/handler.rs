//! Inbound call dispatch
//!
//! The method table below is the whole RPC surface the platform can call.
//! A decoded [`MethodCall`] is checked against its signature and turned
//! into an [`InboundCall`] before anything touches the display.

use std::fmt::Write;

use crate::common::{Error, Result};
use crate::display::DisplaySink;
use crate::xmlrpc::{codec, Fault, MethodCall, MethodResponse, Value, ValueKind};

pub const LOAD_METHOD: &str = "load";
pub const BLOB_METHOD: &str = "blob";
pub const CLOSE_METHOD: &str = "closeApplication";

/// Returned by `load`
pub const LOAD_SUCCESS: &str = "success";

/// Declared shape of one inbound method
#[derive(Debug)]
pub struct MethodSignature {
    pub name: &'static str,
    pub params: &'static [ValueKind],
    /// `None` for methods that return nothing
    pub returns: Option<ValueKind>,
    pub description: &'static str,
}

pub const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: LOAD_METHOD,
        params: &[ValueKind::String],
        returns: Some(ValueKind::String),
        description: "The platform is providing a load message with the course's scenario name.",
    },
    MethodSignature {
        name: BLOB_METHOD,
        params: &[ValueKind::String],
        returns: None,
        description: "The platform is providing a generic message containing a string.",
    },
    MethodSignature {
        name: CLOSE_METHOD,
        params: &[],
        returns: None,
        description: "The platform is ordering this application to close.",
    },
];

/// Look up a method signature by wire name
pub fn signature(name: &str) -> Option<&'static MethodSignature> {
    METHODS.iter().find(|sig| sig.name == name)
}

/// A validated inbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCall {
    Load { scenario_name: String },
    Blob { text: String },
    CloseApplication,
}

impl InboundCall {
    /// Validate a decoded call against the method table
    pub fn from_call(call: MethodCall) -> Result<Self> {
        let sig = signature(&call.method).ok_or_else(|| Error::UnknownMethod(call.method.clone()))?;

        if call.params.len() != sig.params.len() {
            return Err(Error::invalid_params(
                sig.name,
                format!(
                    "expected {} parameter(s), got {}",
                    sig.params.len(),
                    call.params.len()
                ),
            ));
        }

        for (idx, (param, expected)) in call.params.iter().zip(sig.params).enumerate() {
            if param.kind() != *expected {
                return Err(Error::invalid_params(
                    sig.name,
                    format!("parameter {} must be {}, got {}", idx + 1, expected, param.kind()),
                ));
            }
        }

        let mut params = call.params.into_iter();
        let mut next_string = || params.next().and_then(Value::into_string).unwrap_or_default();

        Ok(match sig.name {
            LOAD_METHOD => InboundCall::Load {
                scenario_name: next_string(),
            },
            BLOB_METHOD => InboundCall::Blob {
                text: next_string(),
            },
            _ => InboundCall::CloseApplication,
        })
    }
}

/// Result of dispatching one request
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: MethodResponse,
    /// Stop the listener once the response has been flushed
    pub close_after_response: bool,
}

/// Apply a validated call to the display
pub fn handle_call(call: InboundCall, sink: &DisplaySink) -> Outcome {
    match call {
        InboundCall::Load { scenario_name } => {
            sink.received(format!("load w/ scenario name of {}", scenario_name));
            sink.set_controls_enabled(true);
            Outcome {
                response: MethodResponse::Success(Some(Value::from(LOAD_SUCCESS))),
                close_after_response: false,
            }
        }
        InboundCall::Blob { text } => {
            sink.received(text);
            Outcome {
                response: MethodResponse::Success(None),
                close_after_response: false,
            }
        }
        InboundCall::CloseApplication => Outcome {
            response: MethodResponse::Success(None),
            close_after_response: true,
        },
    }
}

/// Decode, validate and handle a request body
///
/// Every failure becomes a fault response; nothing here can stop the
/// server.
pub fn dispatch(body: &[u8], sink: &DisplaySink) -> Outcome {
    let result = std::str::from_utf8(body)
        .map_err(|e| Error::Protocol(format!("body is not UTF-8: {}", e)))
        .and_then(codec::decode_call)
        .and_then(|call| {
            tracing::debug!(method = %call.method, params = call.params.len(), "Inbound call");
            InboundCall::from_call(call)
        });

    match result {
        Ok(call) => handle_call(call, sink),
        Err(e) => {
            tracing::warn!("Rejecting inbound call: {}", e);
            Outcome {
                response: MethodResponse::Fault(Fault::from(&e)),
                close_after_response: false,
            }
        }
    }
}

/// Plain-text description of the method table, served on GET
pub fn describe() -> String {
    let mut out = String::from("Training application XML-RPC service\n\n");
    for sig in METHODS {
        let params: Vec<String> = sig.params.iter().map(ToString::to_string).collect();
        let returns = sig
            .returns
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "void".to_string());
        let _ = writeln!(
            out,
            "{} {}({})\n    {}",
            returns,
            sig.name,
            params.join(", "),
            sig.description
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayEvent, DisplayLog};
    use crate::xmlrpc::fault_code;

    fn call(method: &str, params: Vec<Value>) -> Vec<u8> {
        codec::encode_call(&MethodCall::new(method, params)).into_bytes()
    }

    #[test]
    fn test_load_returns_success() {
        let (sink, mut rx) = DisplaySink::channel();
        let outcome = dispatch(&call("load", vec!["Scenario1".into()]), &sink);

        assert_eq!(
            outcome.response,
            MethodResponse::Success(Some(Value::from("success")))
        );
        assert!(!outcome.close_after_response);

        let mut log = DisplayLog::new();
        log.drain(&mut rx);
        assert_eq!(log.received, vec!["load w/ scenario name of Scenario1"]);
        assert!(log.controls_enabled);
    }

    #[test]
    fn test_blob_is_verbatim() {
        let (sink, mut rx) = DisplaySink::channel();
        let outcome = dispatch(&call("blob", vec!["  Pause message received ".into()]), &sink);
        assert_eq!(outcome.response, MethodResponse::Success(None));
        assert_eq!(
            rx.try_recv().unwrap(),
            DisplayEvent::Received("  Pause message received ".to_string())
        );
    }

    #[test]
    fn test_close_defers_to_caller() {
        let (sink, mut rx) = DisplaySink::channel();
        let outcome = dispatch(&call("closeApplication", vec![]), &sink);
        assert!(outcome.close_after_response);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_method_faults() {
        let (sink, mut rx) = DisplaySink::channel();
        let outcome = dispatch(&call("reload", vec![]), &sink);
        match outcome.response {
            MethodResponse::Fault(fault) => assert_eq!(fault.code, fault_code::METHOD_NOT_FOUND),
            other => panic!("Expected fault, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_wrong_params_fault() {
        let (sink, _rx) = DisplaySink::channel();
        for body in [
            call("load", vec![]),
            call("load", vec![Value::Int(3)]),
            call("blob", vec!["a".into(), "b".into()]),
            call("closeApplication", vec!["now".into()]),
        ] {
            match dispatch(&body, &sink).response {
                MethodResponse::Fault(fault) => assert_eq!(fault.code, fault_code::INVALID_PARAMS),
                other => panic!("Expected fault, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_malformed_body_faults() {
        let (sink, _rx) = DisplaySink::channel();
        for body in [&b"<methodCall>"[..], &[0xff, 0xfe][..]] {
            match dispatch(body, &sink).response {
                MethodResponse::Fault(fault) => assert_eq!(fault.code, fault_code::PARSE_ERROR),
                other => panic!("Expected fault, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_describe_lists_all_methods() {
        let text = describe();
        assert!(text.contains("string load(string)"));
        assert!(text.contains("void blob(string)"));
        assert!(text.contains("void closeApplication()"));
    }
}
