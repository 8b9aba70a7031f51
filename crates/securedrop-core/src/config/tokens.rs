//! Token housekeeping configuration.

use serde::{Deserialize, Serialize};

/// Token listing and reaping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Delete tokens whose `expires_at` lies more than this many days in
    /// the past. `None` keeps expired tokens forever.
    #[serde(default)]
    pub reap_expired_after_days: Option<u32>,
    /// How often the reaper runs, in minutes.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_minutes: u64,
    /// Default `limit` for the admin token list.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            reap_expired_after_days: None,
            reap_interval_minutes: default_reap_interval(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_reap_interval() -> u64 {
    60
}

fn default_page_size() -> u64 {
    20
}
