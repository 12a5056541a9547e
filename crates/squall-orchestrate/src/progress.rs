//! Scoped timing and diagnostics around build phases.

use std::time::Instant;

use crate::config::OrchestrationConfig;

/// RAII timer around one labeled build phase.
///
/// Construction prints `[<mode>] <label>...`; dropping the guard prints
/// the same line suffixed with the elapsed seconds. The drop fires on
/// every exit path, including early returns and unwinds, and never
/// alters control flow.
pub struct BuildProgress {
    prefix: String,
    label: String,
    start: Instant,
}

impl BuildProgress {
    pub fn new(config: &OrchestrationConfig, label: impl Into<String>) -> Self {
        let prefix = format!("[{}]", config.mode());
        let label = label.into();
        Self::log(&prefix, &format!("{}...", label));
        Self {
            prefix,
            label,
            start: Instant::now(),
        }
    }

    /// Prints one progress line with the mode prefix.
    pub fn log(prefix: &str, message: &str) {
        println!("{} {}", prefix, message);
    }

    /// Seconds since the phase started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for BuildProgress {
    fn drop(&mut self) {
        let elapsed = self.elapsed_secs();
        Self::log(&self.prefix, &format!("{}...{}s.", self.label, elapsed));
    }
}
