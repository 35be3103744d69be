//! CLI command handling
//!
//! Loads configuration, then either runs the application or performs a
//! single outbound call.

mod app;

use std::path::Path;

use crate::commands::{CallCommands, Commands, SendCommands};
use crate::common::{paths, EndpointConfig, Error, Result};
use crate::display::{DisplayLog, DisplaySink};
use crate::listener::handler::{BLOB_METHOD, CLOSE_METHOD, LOAD_METHOD};
use crate::notifier::{Notifier, RpcClient};
use crate::xmlrpc::Value;

pub use app::{Action, App};

/// Load the endpoint configuration, failing if none can be found
pub fn load_config(explicit: Option<&Path>) -> Result<EndpointConfig> {
    let path = paths::resolve_config(explicit).ok_or(Error::ConfigNotFound)?;
    tracing::info!(path = %path.display(), "Loading configuration");
    EndpointConfig::from_file(&path)
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        Commands::Run => App::new(config).run().await,

        Commands::Send(send) => {
            let (sink, mut events) = DisplaySink::channel();
            let notifier = Notifier::new(&config, sink)?;

            let result = match send {
                SendCommands::State { text } => notifier.notify_state(&text).await,
                SendCommands::Finished => notifier.notify_finished().await,
                SendCommands::Test { text } => notifier.notify_test(&text).await.map(|reply| {
                    println!("{}", reply);
                }),
            };

            let mut log = DisplayLog::new();
            for event in log.drain(&mut events) {
                app::show(&event);
            }
            result
        }

        Commands::Call { url, method } => {
            let url = url.unwrap_or_else(|| format!("http://127.0.0.1:{}/", config.listen_port));
            let client = RpcClient::new(url, config.request_timeout)?;

            let (name, params) = match method {
                CallCommands::Load { scenario_name } => {
                    (LOAD_METHOD, vec![Value::from(scenario_name)])
                }
                CallCommands::Blob { text } => (BLOB_METHOD, vec![Value::from(text)]),
                CallCommands::CloseApplication => (CLOSE_METHOD, Vec::new()),
            };

            match client.call(name, params).await? {
                Some(Value::String(reply)) => println!("{}", reply),
                Some(other) => println!("{:?}", other),
                None => println!("{} delivered", name),
            }
            Ok(())
        }
    }
}
