//! Guest session configuration.

use serde::{Deserialize, Serialize};

/// Guest session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a guest session credential in minutes.
    #[serde(default = "default_guest_ttl")]
    pub guest_ttl_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            guest_ttl_minutes: default_guest_ttl(),
        }
    }
}

fn default_guest_ttl() -> u64 {
    60
}
