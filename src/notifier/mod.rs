//! Outbound notifier - calls into the training-management platform
//!
//! Each operator action becomes one synchronous XML-RPC call. Every attempt
//! is mirrored to the display as a sent entry whatever the remote outcome;
//! reporting a failure is left to the caller.

pub mod client;

use crate::common::{EndpointConfig, Error, Result};
use crate::display::DisplaySink;
use crate::xmlrpc::Value;

pub use client::RpcClient;

/// Remote method receiving free-text state messages
pub const STATE_MESSAGE_METHOD: &str = "mil.arl.gift.gateway.interop.simple.SimpleExampleTAPluginInterface$SimpleExampleTAPluginXMLRPC.handleTrainingApplicationMessage";

/// Remote method receiving the finished signal
pub const FINISHED_METHOD: &str = "mil.arl.gift.gateway.interop.simple.SimpleExampleTAPluginInterface$SimpleExampleTAPluginXMLRPC.handleTrainingApplicationFinished";

/// Echo method hosted by the platform's standalone test server
pub const TEST_METHOD: &str = "mil.arl.gift.net.xmlrpc.XMLRPCServer$Example.test";

/// Sent entry recorded for the finished signal
pub const FINISHED_NOTIFICATION: &str = "finished notification";

/// Sends operator events to the platform
pub struct Notifier {
    client: RpcClient,
    test_mode: bool,
    sink: DisplaySink,
}

impl Notifier {
    pub fn new(config: &EndpointConfig, sink: DisplaySink) -> Result<Self> {
        let client = RpcClient::new(config.remote_url(), config.request_timeout)?;
        Ok(Self::with_client(client, config.test_mode, sink))
    }

    pub fn with_client(client: RpcClient, test_mode: bool, sink: DisplaySink) -> Self {
        Self {
            client,
            test_mode,
            sink,
        }
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Send a free-text state notification
    ///
    /// In test mode the text goes to the echo method instead and the reply
    /// is shown as a received entry.
    pub async fn notify_state(&self, text: &str) -> Result<()> {
        let result = if self.test_mode {
            self.notify_test(text)
                .await
                .map(|reply| self.sink.received(reply))
        } else {
            self.client
                .call(STATE_MESSAGE_METHOD, vec![Value::from(text)])
                .await
                .map(|_| ())
        };

        self.sink.sent(text);
        result
    }

    /// Tell the platform this application is finished
    ///
    /// The platform's test server has no finished method, so test mode only
    /// records the sent entry.
    pub async fn notify_finished(&self) -> Result<()> {
        let result = if self.test_mode {
            tracing::debug!("Test mode, not sending finished notification");
            Ok(())
        } else {
            self.client.call(FINISHED_METHOD, Vec::new()).await.map(|_| ())
        };

        self.sink.sent(FINISHED_NOTIFICATION);
        result
    }

    /// Call the platform's echo method and return its reply
    pub async fn notify_test(&self, text: &str) -> Result<String> {
        match self.client.call(TEST_METHOD, vec![Value::from(text)]).await? {
            Some(Value::String(reply)) => Ok(reply),
            other => Err(Error::transport(
                TEST_METHOD,
                format!(
                    "expected a string reply, got {}",
                    other.map_or("nothing".to_string(), |v| v.kind().to_string())
                ),
            )),
        }
    }
}
