//! XML-RPC body codec
//!
//! Encodes and decodes `<methodCall>` and `<methodResponse>` documents:
//! ```text
//! <?xml version="1.0"?>
//! <methodCall>
//!   <methodName>blob</methodName>
//!   <params><param><value><string>hello</string></value></param></params>
//! </methodCall>
//! ```
//! The XML reader handles elements, text, entities, CDATA and comments. It
//! ignores attributes and processing instructions.

use std::fmt::Write;

use crate::common::{Error, Result};

use super::value::{Fault, MethodCall, MethodResponse, Value};

/// Nesting limit for decoded documents
const MAX_DEPTH: usize = 64;

// === Encoding ===

/// Encode a method call document
pub fn encode_call(call: &MethodCall) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    let _ = write!(out, "<methodName>{}</methodName>", escape(&call.method));
    out.push_str("<params>");
    for param in &call.params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

/// Encode a method response document
///
/// A successful response with no value has an empty `<params/>`.
pub fn encode_response(response: &MethodResponse) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse>");
    match response {
        MethodResponse::Success(Some(value)) => {
            out.push_str("<params><param>");
            encode_value(&mut out, value);
            out.push_str("</param></params>");
        }
        MethodResponse::Success(None) => out.push_str("<params/>"),
        MethodResponse::Fault(fault) => {
            out.push_str("<fault>");
            encode_value(
                &mut out,
                &Value::Struct(vec![
                    ("faultCode".to_string(), Value::Int(fault.code)),
                    ("faultString".to_string(), Value::String(fault.message.clone())),
                ]),
            );
            out.push_str("</fault>");
        }
    }
    out.push_str("</methodResponse>\n");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s));
        }
        Value::Int(i) => {
            let _ = write!(out, "<i4>{}</i4>", i);
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::Nil => out.push_str("<nil/>"),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name));
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Escape text for use in element content
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// === Decoding ===

/// Decode a method call document
pub fn decode_call(xml: &str) -> Result<MethodCall> {
    let root = parse_document(xml)?;
    if root.name != "methodCall" {
        return Err(protocol(format!("expected <methodCall>, found <{}>", root.name)));
    }

    let method = root
        .child("methodName")
        .ok_or_else(|| protocol("missing <methodName>"))?
        .text()
        .trim()
        .to_string();
    if method.is_empty() {
        return Err(protocol("empty <methodName>"));
    }

    let params = match root.child("params") {
        Some(params) => decode_params(params)?,
        None => Vec::new(),
    };

    Ok(MethodCall { method, params })
}

/// Decode a method response document
pub fn decode_response(xml: &str) -> Result<MethodResponse> {
    let root = parse_document(xml)?;
    if root.name != "methodResponse" {
        return Err(protocol(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = decode_value(
            fault
                .child("value")
                .ok_or_else(|| protocol("missing fault <value>"))?,
        )?;
        let code = value
            .member("faultCode")
            .and_then(Value::as_int)
            .ok_or_else(|| protocol("fault without integer faultCode"))?;
        let message = value
            .member("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(MethodResponse::Fault(Fault { code, message }));
    }

    let params = match root.child("params") {
        Some(params) => decode_params(params)?,
        None => return Err(protocol("response has neither <params> nor <fault>")),
    };

    if params.len() > 1 {
        return Err(protocol(format!(
            "response carries {} values, expected at most one",
            params.len()
        )));
    }

    Ok(MethodResponse::Success(params.into_iter().next()))
}

fn decode_params(params: &Element) -> Result<Vec<Value>> {
    params
        .elements()
        .map(|param| {
            if param.name != "param" {
                return Err(protocol(format!("unexpected <{}> in <params>", param.name)));
            }
            let value = param
                .child("value")
                .ok_or_else(|| protocol("<param> without <value>"))?;
            decode_value(value)
        })
        .collect()
}

fn decode_value(value: &Element) -> Result<Value> {
    let mut typed = value.elements();
    let Some(inner) = typed.next() else {
        // Untyped content defaults to string
        return Ok(Value::String(value.text()));
    };
    if typed.next().is_some() {
        return Err(protocol("<value> holds more than one element"));
    }

    let text = inner.text();
    match inner.name.as_str() {
        "string" => Ok(Value::String(text)),
        "i4" | "int" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| protocol(format!("invalid int '{}'", text.trim()))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(protocol(format!("invalid boolean '{}'", other))),
        },
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| protocol(format!("invalid double '{}'", text.trim()))),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = inner
                .child("data")
                .ok_or_else(|| protocol("<array> without <data>"))?;
            data.elements()
                .map(decode_value)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => inner
            .elements()
            .map(|member| {
                let name = member
                    .child("name")
                    .ok_or_else(|| protocol("<member> without <name>"))?
                    .text();
                let value = member
                    .child("value")
                    .ok_or_else(|| protocol("<member> without <value>"))?;
                Ok((name, decode_value(value)?))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Struct),
        other => Err(protocol(format!("unsupported value type <{}>", other))),
    }
}

fn protocol(msg: impl Into<String>) -> Error {
    Error::Protocol(msg.into())
}

// === Minimal XML tree ===

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated direct text content
    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut parser = Parser { src: xml, pos: 0 };
    parser.skip_misc()?;
    if !parser.rest().starts_with('<') {
        return Err(protocol("document has no root element"));
    }
    let root = parser.parse_element(0)?;
    parser.skip_misc()?;
    if parser.pos < parser.src.len() {
        return Err(protocol("trailing content after root element"));
    }
    Ok(root)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Advance past `terminator`, failing if it never appears
    fn skip_past(&mut self, terminator: &str) -> Result<&'a str> {
        let rest = self.rest();
        let idx = rest
            .find(terminator)
            .ok_or_else(|| protocol(format!("unterminated markup, expected '{}'", terminator)))?;
        self.pos += idx + terminator.len();
        Ok(&rest[..idx])
    }

    /// Skip whitespace, the prolog, comments and doctype declarations
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<!DOCTYPE") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(protocol("missing element name"));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn parse_element(&mut self, depth: usize) -> Result<Element> {
        if depth > MAX_DEPTH {
            return Err(protocol("document nested too deeply"));
        }

        // Opening '<'
        self.pos += 1;
        let name = self.parse_name()?;

        // Attributes are skipped, honouring quotes
        let mut quote: Option<char> = None;
        let self_closing = loop {
            let c = self
                .rest()
                .chars()
                .next()
                .ok_or_else(|| protocol(format!("unterminated <{}> tag", name)))?;
            self.pos += c.len_utf8();
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => break false,
                (None, '/') if self.rest().starts_with('>') => {
                    self.pos += 1;
                    break true;
                }
                _ => {}
            }
        };

        let mut element = Element {
            name,
            children: Vec::new(),
        };
        if self_closing {
            return Ok(element);
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(protocol(format!("unclosed <{}>", element.name)));
            } else if let Some(after) = rest.strip_prefix("</") {
                let end = after
                    .find('>')
                    .ok_or_else(|| protocol("unterminated closing tag"))?;
                let closing = after[..end].trim();
                if closing != element.name {
                    return Err(protocol(format!(
                        "mismatched </{}>, expected </{}>",
                        closing, element.name
                    )));
                }
                self.pos += 2 + end + 1;
                return Ok(element);
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let text = self.skip_past("]]>")?;
                element.children.push(Node::Text(text.to_string()));
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                let child = self.parse_element(depth + 1)?;
                element.children.push(Node::Element(child));
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = unescape(&rest[..end])?;
                self.pos += end;
                element.children.push(Node::Text(text));
            }
        }
    }
}

/// Resolve the predefined entities and numeric character references
fn unescape(raw: &str) -> Result<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| protocol("unterminated entity reference"))?;
        let entity = &after[..semi];
        let c = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| protocol(format!("unknown entity '&{};'", entity)))?
            }
        };
        out.push(c);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call() {
        let call = MethodCall::new("blob", vec!["a < b & c".into()]);
        let xml = encode_call(&call);
        assert!(xml.contains("<methodName>blob</methodName>"));
        assert!(xml.contains("<value><string>a &lt; b &amp; c</string></value>"));
        assert_eq!(decode_call(&xml).unwrap(), call);
    }

    #[test]
    fn test_decode_call_with_whitespace_and_untyped_value() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- sent by the platform -->
<methodCall>
  <methodName>load</methodName>
  <params>
    <param>
      <value>Scenario One</value>
    </param>
  </params>
</methodCall>"#;
        let call = decode_call(xml).unwrap();
        assert_eq!(call.method, "load");
        assert_eq!(call.params, vec![Value::String("Scenario One".to_string())]);
    }

    #[test]
    fn test_decode_call_without_params() {
        let xml = "<methodCall><methodName>closeApplication</methodName></methodCall>";
        let call = decode_call(xml).unwrap();
        assert_eq!(call.method, "closeApplication");
        assert!(call.params.is_empty());
    }

    #[test]
    fn test_decode_typed_values() {
        let xml = "<methodCall><methodName>m</methodName><params>\
            <param><value><int>-7</int></value></param>\
            <param><value><boolean>1</boolean></value></param>\
            <param><value><double>2.5</double></value></param>\
            <param><value><nil/></value></param>\
            <param><value><array><data><value><i4>1</i4></value><value>x</value></data></array></value></param>\
            <param><value><struct><member><name>k</name><value><string><![CDATA[<raw>]]></string></value></member></struct></value></param>\
            </params></methodCall>";
        let call = decode_call(xml).unwrap();
        assert_eq!(
            call.params,
            vec![
                Value::Int(-7),
                Value::Bool(true),
                Value::Double(2.5),
                Value::Nil,
                Value::Array(vec![Value::Int(1), "x".into()]),
                Value::Struct(vec![("k".to_string(), "<raw>".into())]),
            ]
        );
    }

    #[test]
    fn test_numeric_entities() {
        let xml = "<methodCall><methodName>blob</methodName><params><param><value>caf&#233; &#x41;</value></param></params></methodCall>";
        let call = decode_call(xml).unwrap();
        assert_eq!(call.params[0].as_str(), Some("café A"));
    }

    #[test]
    fn test_response_fault() {
        let fault = Fault {
            code: -32601,
            message: "Unknown method 'x'".to_string(),
        };
        let xml = encode_response(&MethodResponse::Fault(fault.clone()));
        assert_eq!(decode_response(&xml).unwrap(), MethodResponse::Fault(fault));
    }

    #[test]
    fn test_void_response() {
        let xml = encode_response(&MethodResponse::Success(None));
        assert!(xml.contains("<params/>"));
        assert_eq!(decode_response(&xml).unwrap(), MethodResponse::Success(None));
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "",
            "not xml",
            "<methodCall><methodName>x</methodName>",
            "<methodCall><methodName>x</methodCall>",
            "<methodResponse/>",
            "<methodCall><methodName></methodName></methodCall>",
            "<methodCall><methodName>x</methodName><params><param><value><i4>abc</i4></value></param></params></methodCall>",
            "<methodCall><methodName>a&bogus;</methodName></methodCall>",
        ] {
            let call = decode_call(xml);
            let response = decode_response(xml);
            assert!(call.is_err() && response.is_err(), "accepted {xml:?}");
        }
    }

    #[test]
    fn test_attributes_are_ignored() {
        let xml = "<methodCall xmlns:x='a>b'><methodName>blob</methodName></methodCall>";
        assert_eq!(decode_call(xml).unwrap().method, "blob");
    }
}
