//! Stub training-management platform
//!
//! Hosts the three methods the notifier calls, echoes `test`, and records
//! every call it receives. Backs the `mock-platform` binary and the
//! notifier tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::common::{Error, Result};
use crate::notifier::{FINISHED_METHOD, STATE_MESSAGE_METHOD, TEST_METHOD};
use crate::xmlrpc::{codec, fault_code, service, Fault, MethodCall, MethodResponse, Value};

/// Stand-in for the platform's integer "empty" return value
const EMPTY_RETURN: i32 = 0;

type CallLog = Arc<Mutex<Vec<MethodCall>>>;

/// A running stub platform
pub struct StubPlatform {
    addr: SocketAddr,
    calls: CallLog,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StubPlatform {
    /// Bind `127.0.0.1:{port}` (0 for ephemeral) and start serving
    pub async fn start(port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let app = Router::new()
            .route("/", post(handle))
            .route("/{*path}", post(handle))
            .layer(DefaultBodyLimit::max(service::MAX_BODY))
            .with_state(calls.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = service::serve(listener, app, shutdown_rx).await {
                tracing::error!("Stub platform failed: {}", e);
            }
        });

        Ok(Self {
            addr,
            calls,
            shutdown,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<MethodCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::error!("Stub platform task failed: {}", e);
        }
    }
}

/// Answer a call the way the platform does
pub fn respond(call: &MethodCall) -> MethodResponse {
    match call.method.as_str() {
        TEST_METHOD => match call.params.first() {
            Some(Value::String(text)) => MethodResponse::Success(Some(Value::String(text.clone()))),
            _ => MethodResponse::Fault(Fault {
                code: fault_code::INVALID_PARAMS,
                message: "test expects one string".to_string(),
            }),
        },
        STATE_MESSAGE_METHOD | FINISHED_METHOD => {
            MethodResponse::Success(Some(Value::Int(EMPTY_RETURN)))
        }
        other => MethodResponse::Fault(Fault {
            code: fault_code::METHOD_NOT_FOUND,
            message: format!("No such handler: {}", other),
        }),
    }
}

async fn handle(State(calls): State<CallLog>, body: Bytes) -> MethodResponse {
    let decoded = std::str::from_utf8(&body)
        .map_err(|e| Error::Protocol(format!("body is not UTF-8: {}", e)))
        .and_then(codec::decode_call);

    match decoded {
        Ok(call) => {
            tracing::info!(method = %call.method, params = ?call.params, "Platform received call");
            let response = respond(&call);
            calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(call);
            response
        }
        Err(e) => MethodResponse::Fault(Fault::from(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_echoes() {
        let call = MethodCall::new(TEST_METHOD, vec!["echo".into()]);
        assert_eq!(
            respond(&call),
            MethodResponse::Success(Some(Value::from("echo")))
        );
    }

    #[test]
    fn test_respond_unknown() {
        let call = MethodCall::new("nope", vec![]);
        assert!(matches!(respond(&call), MethodResponse::Fault(_)));
    }

    #[tokio::test]
    async fn test_records_calls_and_stops() {
        let platform = StubPlatform::start(0).await.unwrap();
        let client = crate::notifier::RpcClient::new(
            platform.url(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let reply = client.call(TEST_METHOD, vec!["ping".into()]).await.unwrap();
        assert_eq!(reply, Some(Value::from("ping")));
        assert_eq!(platform.calls().len(), 1);

        // The client's pooled connection must not hold the stub open
        let started = std::time::Instant::now();
        platform.stop().await;
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }
}
