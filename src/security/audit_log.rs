use std::path::Path;

use tracing::{info, warn};

/// Authentication lifecycle events, emitted under the `audit` target.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn token_cache_hit(&self, path: &Path, age_minutes: u64) {
        info!(target: "audit", event = "token_cache_hit", path = %path.display(), age_minutes);
    }

    pub fn auth_success(&self, username: &str) {
        info!(target: "audit", event = "auth_success", username);
    }

    pub fn auth_failure(&self, username: &str, step: &str, reason: &str) {
        warn!(target: "audit", event = "auth_failure", username, step, reason);
    }

    pub fn token_cache_write_failed(&self, path: &Path, error_msg: &str) {
        warn!(target: "audit", event = "token_cache_write_failed", path = %path.display(), error = error_msg);
    }
}
