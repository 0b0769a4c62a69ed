//! Elapsed-time reporting for enumeration, items and whole runs.

use std::time::{Duration, Instant};
use tracing::info;

/// Measures one labelled span of work and logs it when finished.
#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    started: Instant,
}

impl Stopwatch {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            label = %self.label,
            elapsed_ms = elapsed.as_millis() as u64,
            "{}: {}",
            self.label,
            format_elapsed(elapsed)
        );
        elapsed
    }
}

/// Human-readable duration: `850ms`, `12.345s`, `3m 07.2s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    if millis < 60_000 {
        return format!("{}.{:03}s", millis / 1_000, millis % 1_000);
    }
    // Round to tenths before splitting so 119.96s reads `2m 00.0s`.
    let tenths = (millis + 50) / 100;
    let (minutes, rest) = (tenths / 600, tenths % 600);
    format!("{minutes}m {:02}.{}s", rest / 10, rest % 10)
}
