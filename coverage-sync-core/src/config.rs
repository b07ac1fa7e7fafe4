use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

/// Pause between two processed commits unless configured otherwise.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Run-time settings the driver needs. Built by the CLI, never read from globals.
#[derive(Clone)]
pub struct SynchroniseConfig {
    /// Passed through to the publisher on every call.
    pub api_token: String,
    /// Fixed pause after each processed commit.
    pub pause: Duration,
}

impl SynchroniseConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            api_token_set = !self.api_token.is_empty(),
            pause_ms = self.pause.as_millis() as u64,
            "Loaded SynchroniseConfig"
        );
        debug!(?self, "SynchroniseConfig loaded (full debug)");
    }
}

impl fmt::Debug for SynchroniseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchroniseConfig")
            .field("api_token", &"<redacted>")
            .field("pause", &self.pause)
            .finish()
    }
}
