//! Append-only run event log.
//!
//! Threaded explicitly through the pipeline instead of accumulating
//! diagnostics by side effect; rendered once into the posted comment.

use chrono::{DateTime, Utc};

/// One timestamped event.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Append-only event log for a single run.
#[derive(Debug)]
pub struct RunLog {
    run_id: String,
    events: Vec<RunEvent>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn push(&mut self, message: impl Into<String>) {
        self.events.push(RunEvent {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Render the log as a compact Markdown list.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&format!(
                "- `{}` {}\n",
                event.at.format("%H:%M:%S%.3f"),
                event.message
            ));
        }
        out
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
