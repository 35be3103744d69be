//! Interactive training application
//!
//! Stands in for the original window: operator lines on stdin play the
//! role of the three buttons, and display events are printed as they are
//! drained. Controls start disabled and are enabled by the platform's
//! `load` call.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::common::{EndpointConfig, Result};
use crate::display::{DisplayEvent, DisplayLog, DisplaySink};
use crate::listener::Listener;
use crate::notifier::Notifier;

const HELP: &str = "\
Commands:
  1 | 2            send the \"button 1\" / \"button 2\" state message
  state <text>   send a free-text state message
  3 | finished   notify the platform that the application is finished
  clear received|sent
  show           print both lists
  quit";

/// One operator action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    State(String),
    Finished,
    ClearReceived,
    ClearSent,
    Show,
    Help,
    Quit,
}

impl Action {
    /// Parse an input line; blank lines yield `None`
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let action = match (word, rest) {
            ("", _) => return Ok(None),
            ("1", "") => Action::State("button 1".to_string()),
            ("2", "") => Action::State("button 2".to_string()),
            ("state", "") => return Err("usage: state <text>".to_string()),
            ("state", text) => Action::State(text.to_string()),
            ("3" | "finished", "") => Action::Finished,
            ("clear", "received") => Action::ClearReceived,
            ("clear", "sent") => Action::ClearSent,
            ("show", "") => Action::Show,
            ("help" | "?", "") => Action::Help,
            ("quit" | "exit", "") => Action::Quit,
            _ => return Err(format!("unknown command '{}', try 'help'", line)),
        };
        Ok(Some(action))
    }
}

/// The application: listener, notifier and the display owner
pub struct App {
    config: EndpointConfig,
}

impl App {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    /// Run against stdin until quit, end of input, or a close request
    pub async fn run(self) -> Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin())).await?;
        Ok(())
    }

    /// Run against any line source and return the final display state
    pub async fn run_with<R: AsyncBufRead + Unpin>(self, input: R) -> Result<DisplayLog> {
        let (sink, mut events) = DisplaySink::channel();

        let mut listener = Listener::new(self.config.listen_port, sink.clone());
        listener.start().await?;

        let notifier = Notifier::new(&self.config, sink.clone())?;
        if notifier.test_mode() {
            tracing::info!("Test mode: state messages go to the platform's echo method");
        }

        let mut log = DisplayLog::new();
        let mut lines = input.lines();
        println!("{}", HELP);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    show(&event);
                    log.apply(event);
                    if log.close_requested {
                        tracing::info!("Platform requested close");
                        break;
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        tracing::debug!("Input closed");
                        break;
                    };

                    // Apply anything pending so the controls flag is current
                    for event in log.drain(&mut events) {
                        show(&event);
                    }
                    if log.close_requested {
                        break;
                    }

                    match Action::parse(&line) {
                        Ok(Some(Action::Quit)) => break,
                        Ok(Some(action)) => perform(action, &notifier, &sink, &mut log).await,
                        Ok(None) => {}
                        Err(msg) => println!("{}", msg),
                    }
                }
            }
        }

        listener.stop().await;
        for event in log.drain(&mut events) {
            show(&event);
        }
        Ok(log)
    }
}

async fn perform(action: Action, notifier: &Notifier, sink: &DisplaySink, log: &mut DisplayLog) {
    match action {
        Action::State(text) => {
            if !log.controls_enabled {
                println!("Controls are disabled until the platform loads a scenario");
                return;
            }
            if let Err(e) = notifier.notify_state(&text).await {
                tracing::warn!("State message failed: {}", e);
                sink.error(format!("Failed to send state message: {}", e));
            }
        }
        Action::Finished => {
            if !log.controls_enabled {
                println!("Controls are disabled until the platform loads a scenario");
                return;
            }
            sink.set_controls_enabled(false);
            if let Err(e) = notifier.notify_finished().await {
                tracing::warn!("Finished notification failed: {}", e);
                sink.error(format!("Failed to notify the platform of the finished state: {}", e));
            }
        }
        Action::ClearReceived => log.clear_received(),
        Action::ClearSent => log.clear_sent(),
        Action::Show => {
            println!("Received:");
            for text in &log.received {
                println!("  {}", text);
            }
            println!("Sent:");
            for text in &log.sent {
                println!("  {}", text);
            }
        }
        Action::Help => println!("{}", HELP),
        Action::Quit => {}
    }
}

/// Print one display event
pub(crate) fn show(event: &DisplayEvent) {
    match event {
        DisplayEvent::Received(text) => println!("<- {}", text),
        DisplayEvent::Sent(text) => println!("-> {}", text),
        DisplayEvent::Error(text) => println!("!! {}", text),
        DisplayEvent::ControlsEnabled(true) => println!("[controls enabled]"),
        DisplayEvent::ControlsEnabled(false) => println!("[controls disabled]"),
        DisplayEvent::CloseRequested => println!("[platform requested close]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use crate::notifier::{RpcClient, FINISHED_METHOD, STATE_MESSAGE_METHOD};
    use crate::testing::StubPlatform;
    use crate::xmlrpc::Value;

    fn config(remote_port: u16, listen_port: u16) -> EndpointConfig {
        EndpointConfig {
            remote_host: "127.0.0.1".to_string(),
            remote_port,
            listen_port,
            test_mode: false,
            request_timeout: Duration::from_secs(1),
        }
    }

    /// A port nothing is listening on
    async fn free_port() -> u16 {
        let socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        socket.local_addr().unwrap().port()
    }

    /// Call `load` as the platform would, retrying until the app is listening
    async fn load_scenario(port: u16) {
        let client =
            RpcClient::new(format!("http://127.0.0.1:{}/", port), Duration::from_secs(1)).unwrap();
        for _ in 0..100 {
            if let Ok(reply) = client.call("load", vec!["Scenario1".into()]).await {
                assert_eq!(reply, Some(Value::from("success")));
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("application never started listening on {}", port);
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            Action::parse("1").unwrap(),
            Some(Action::State("button 1".to_string()))
        );
        assert_eq!(
            Action::parse("state  hello world ").unwrap(),
            Some(Action::State("hello world".to_string()))
        );
        assert_eq!(Action::parse("3").unwrap(), Some(Action::Finished));
        assert_eq!(Action::parse("clear sent").unwrap(), Some(Action::ClearSent));
        assert_eq!(Action::parse("   ").unwrap(), None);
        assert!(Action::parse("state").is_err());
        assert!(Action::parse("launch").is_err());
    }

    #[tokio::test]
    async fn test_controls_start_disabled() {
        let input = BufReader::new(&b"1\nfinished\nquit\n"[..]);
        let log = App::new(config(9, 0)).run_with(input).await.unwrap();

        assert!(log.sent.is_empty());
        assert!(!log.controls_enabled);
    }

    #[tokio::test]
    async fn test_end_of_input_stops() {
        let input = BufReader::new(&b""[..]);
        let log = App::new(config(9, 0)).run_with(input).await.unwrap();
        assert!(log.received.is_empty());
    }

    #[tokio::test]
    async fn test_load_enables_then_finished_disables() {
        let platform = StubPlatform::start(0).await.unwrap();
        let listen_port = free_port().await;

        let (mut operator, input) = tokio::io::duplex(1024);
        let app = App::new(config(platform.addr().port(), listen_port));
        let running = tokio::spawn(app.run_with(BufReader::new(input)));

        load_scenario(listen_port).await;
        operator
            .write_all(b"state hello\nfinished\nstate too late\nquit\n")
            .await
            .unwrap();

        let log = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(log.received, vec!["load w/ scenario name of Scenario1"]);
        assert_eq!(log.sent, vec!["hello", "finished notification"]);
        assert!(log.errors.is_empty());
        assert!(!log.controls_enabled);

        let methods: Vec<String> = platform.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec![STATE_MESSAGE_METHOD, FINISHED_METHOD]);
        platform.stop().await;
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let remote_port = free_port().await;
        let listen_port = free_port().await;

        let (mut operator, input) = tokio::io::duplex(1024);
        let app = App::new(config(remote_port, listen_port));
        let running = tokio::spawn(app.run_with(BufReader::new(input)));

        load_scenario(listen_port).await;
        operator.write_all(b"2\nquit\n").await.unwrap();

        let log = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(log.sent, vec!["button 2"]);
        assert_eq!(log.errors.len(), 1);
        assert!(log.errors[0].starts_with("Failed to send state message"));
        assert!(log.controls_enabled);
    }
}
