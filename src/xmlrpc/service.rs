//! Serving XML-RPC over axum
//!
//! [`MethodResponse`] converts straight into an HTTP response: successes
//! are `200 OK`, faults `500` with the fault struct as the body. [`serve`]
//! runs a router until a `watch` flag flips, then gives open connections a
//! short grace period before the listening socket is released.

use std::future::IntoFuture;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::{codec, MethodResponse};

/// Largest request body accepted
pub const MAX_BODY: usize = 10 * 1024 * 1024;

/// How long in-flight calls may run once shutdown starts
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

impl IntoResponse for MethodResponse {
    fn into_response(self) -> Response {
        let status = match &self {
            MethodResponse::Success(_) => StatusCode::OK,
            MethodResponse::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/xml")],
            codec::encode_response(&self),
        )
            .into_response()
    }
}

/// Serve `app` on `listener` until `shutdown` becomes true
///
/// Idle or slow connections do not hold the listener open past
/// [`SHUTDOWN_GRACE`].
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = signal.wait_for(|stop| *stop).await;
            tracing::debug!("Graceful shutdown started");
        })
        .into_future();

    let mut deadline = shutdown;
    let grace = async move {
        let _ = deadline.wait_for(|stop| *stop).await;
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    tokio::select! {
        result = server => result,
        _ = grace => {
            tracing::warn!("Connections still open after {:?}, closing anyway", SHUTDOWN_GRACE);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::{Fault, Value};
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_success_is_ok() {
        let response = MethodResponse::Success(Some(Value::from("success"))).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );
        assert!(body_text(response).await.contains("<string>success</string>"));
    }

    #[tokio::test]
    async fn test_fault_is_server_error() {
        let response = MethodResponse::Fault(Fault {
            code: 4,
            message: "boom".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("<fault>"));
    }
}
