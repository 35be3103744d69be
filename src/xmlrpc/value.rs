//! XML-RPC data model
//!
//! Only the types the bridge and its peers exchange are modelled. Dates and
//! base64 blobs are rejected by the decoder.

use std::fmt;

use crate::common::Error;

/// A single XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i32),
    Bool(bool),
    Double(f64),
    Nil,
    Array(Vec<Value>),
    /// Members in document order
    Struct(Vec<(String, Value)>),
}

/// Type tag of a [`Value`], used by method signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Bool,
    Double,
    Nil,
    Array,
    Struct,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Double(_) => ValueKind::Double,
            Value::Nil => ValueKind::Nil,
            Value::Array(_) => ValueKind::Array,
            Value::Struct(_) => ValueKind::Struct,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up a struct member by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Bool => "boolean",
            ValueKind::Double => "double",
            ValueKind::Nil => "nil",
            ValueKind::Array => "array",
            ValueKind::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// A remote procedure call
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Fault codes from the XML-RPC fault code interoperability convention
pub mod fault_code {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// An XML-RPC fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl From<&Error> for Fault {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::Protocol(_) => fault_code::PARSE_ERROR,
            Error::UnknownMethod(_) => fault_code::METHOD_NOT_FOUND,
            Error::InvalidParams { .. } => fault_code::INVALID_PARAMS,
            _ => fault_code::INTERNAL_ERROR,
        };

        Self {
            code,
            message: e.to_string(),
        }
    }
}

/// The answer to a [`MethodCall`]
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// `None` for methods that return nothing
    Success(Option<Value>),
    Fault(Fault),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_lookup() {
        let value = Value::Struct(vec![
            ("faultCode".to_string(), Value::Int(4)),
            ("faultString".to_string(), "boom".into()),
        ]);
        assert_eq!(value.member("faultCode").and_then(Value::as_int), Some(4));
        assert_eq!(value.member("faultString").and_then(Value::as_str), Some("boom"));
        assert!(value.member("missing").is_none());
    }

    #[test]
    fn test_fault_from_error() {
        let fault = Fault::from(&Error::UnknownMethod("reload".to_string()));
        assert_eq!(fault.code, fault_code::METHOD_NOT_FOUND);
        assert!(fault.message.contains("reload"));
    }
}
