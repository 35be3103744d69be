//! Display sink
//!
//! Worker tasks never touch the operator's lists directly. They hold a
//! cloneable [`DisplaySink`] and post events; the single [`DisplayLog`]
//! owner drains them in arrival order.

use tokio::sync::mpsc;

/// Everything the front end can be told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Text received from the platform
    Received(String),
    /// Text sent (or attempted) to the platform
    Sent(String),
    /// A recoverable error worth showing the operator
    Error(String),
    /// Enable or disable the outbound controls
    ControlsEnabled(bool),
    /// The platform asked the application to close
    CloseRequested,
}

/// Thread-safe handle for appending to the display
#[derive(Debug, Clone)]
pub struct DisplaySink {
    tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl DisplaySink {
    /// Create a sink and the receiver its owner drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DisplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn post(&self, event: DisplayEvent) {
        // The owner is gone only during teardown
        if self.tx.send(event).is_err() {
            tracing::debug!("Display closed, dropping event");
        }
    }

    pub fn received(&self, text: impl Into<String>) {
        self.post(DisplayEvent::Received(text.into()));
    }

    pub fn sent(&self, text: impl Into<String>) {
        self.post(DisplayEvent::Sent(text.into()));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.post(DisplayEvent::Error(text.into()));
    }

    pub fn set_controls_enabled(&self, enabled: bool) {
        self.post(DisplayEvent::ControlsEnabled(enabled));
    }

    pub fn request_close(&self) {
        self.post(DisplayEvent::CloseRequested);
    }
}

/// The operator-visible state, owned by exactly one task
#[derive(Debug, Default)]
pub struct DisplayLog {
    pub received: Vec<String>,
    pub sent: Vec<String>,
    pub errors: Vec<String>,
    pub controls_enabled: bool,
    pub close_requested: bool,
}

impl DisplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event
    pub fn apply(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::Received(text) => self.received.push(text),
            DisplayEvent::Sent(text) => self.sent.push(text),
            DisplayEvent::Error(text) => self.errors.push(text),
            DisplayEvent::ControlsEnabled(enabled) => self.controls_enabled = enabled,
            DisplayEvent::CloseRequested => self.close_requested = true,
        }
    }

    /// Apply everything queued without waiting, returning what was applied
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<DisplayEvent>) -> Vec<DisplayEvent> {
        let mut applied = Vec::new();
        while let Ok(event) = rx.try_recv() {
            self.apply(event.clone());
            applied.push(event);
        }
        applied
    }

    pub fn clear_received(&mut self) {
        self.received.clear();
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}
