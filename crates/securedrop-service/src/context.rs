//! Request context carrying who is acting and from where.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context for the current request.
///
/// Built by the HTTP extractors and passed into service methods so that
/// access log entries know *who* acted and from *which* address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated admin, for admin routes.
    pub admin_id: Option<i64>,
    /// The admin username (convenience field from the claims).
    pub admin_username: Option<String>,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Context for an anonymous or guest request.
    pub fn guest(ip_address: Option<String>) -> Self {
        Self {
            admin_id: None,
            admin_username: None,
            ip_address,
            request_time: Utc::now(),
        }
    }

    /// Context for an authenticated admin request.
    pub fn admin(admin_id: i64, username: impl Into<String>, ip_address: Option<String>) -> Self {
        Self {
            admin_id: Some(admin_id),
            admin_username: Some(username.into()),
            ip_address,
            request_time: Utc::now(),
        }
    }

    /// Context for background jobs and the CLI.
    pub fn system() -> Self {
        Self::guest(None)
    }
}
