//! XML-RPC client over HTTP
//!
//! Posts an encoded `<methodCall>` and decodes the `<methodResponse>`.
//! Every failure, including a fault from the remote, comes back as a
//! transport error naming the method.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::common::{Error, Result};
use crate::xmlrpc::{codec, MethodCall, MethodResponse, Value};

/// Client for one XML-RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a client for `url` with a per-call timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(&url, e))?;

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a call and wait for its result
    ///
    /// Returns `None` for methods without a return value.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Option<Value>> {
        let body = codec::encode_call(&MethodCall::new(method, params));
        tracing::debug!(method, url = %self.url, "Outbound call");

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(method, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(method, e))?;

        match codec::decode_response(&text) {
            Ok(MethodResponse::Fault(fault)) => Err(Error::RemoteFault {
                method: method.to_string(),
                code: fault.code,
                message: fault.message,
            }),
            Ok(MethodResponse::Success(value)) if status.is_success() => Ok(value),
            Ok(MethodResponse::Success(_)) => Err(Error::transport(method, format!("HTTP {}", status))),
            Err(_) if !status.is_success() => {
                Err(Error::transport(method, format!("HTTP {}", status)))
            }
            Err(e) => Err(Error::transport(method, format!("malformed response: {}", e))),
        }
    }
}
