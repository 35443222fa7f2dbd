//! Captured process output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single line captured from a job's process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    /// The line content without its trailing newline.
    pub text: String,
    /// True when the line came from stderr.
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConsoleLine {
    /// Create a line stamped with the current time.
    pub fn new(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            text: text.into(),
            is_error,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only output history for one job.
///
/// Cloning shares the same history; the reader tasks and the job hold clones.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Arc<Mutex<Vec<ConsoleLine>>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ConsoleLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: ConsoleLine) {
        self.guard().push(line);
    }

    /// Snapshot of the whole history.
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.guard().clone()
    }

    /// Lines after the first `offset`, for incremental polling.
    pub fn since(&self, offset: usize) -> Vec<ConsoleLine> {
        self.guard().iter().skip(offset).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    /// The history joined with newlines.
    pub fn text(&self) -> String {
        let lines = self.guard();
        let mut out = String::new();
        for line in lines.iter() {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_history() {
        let console = Console::new();
        let writer = console.clone();
        writer.push(ConsoleLine::new("one", false));
        writer.push(ConsoleLine::new("two", true));

        assert_eq!(console.len(), 2);
        assert_eq!(console.since(1)[0].text, "two");
        assert!(console.since(1)[0].is_error);
        assert_eq!(console.text(), "one\ntwo\n");
    }

    #[test]
    fn clear_empties_history() {
        let console = Console::new();
        console.push(ConsoleLine::new("line", false));
        console.clear();
        assert!(console.is_empty());
        assert!(console.since(5).is_empty());
    }
}
