//! Pagination query parameter extractor.

use serde::{Deserialize, Serialize};

use securedrop_core::types::pagination::PageRequest;

/// Query parameters for paginated endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-based, default: 1).
    pub page: Option<u64>,
    /// Items per page (default from `tokens.default_page_size`, max: 100).
    pub limit: Option<u64>,
}

impl PaginationParams {
    /// Converts to a `PageRequest`, filling gaps with the configured default.
    pub fn into_page_request(self, default_limit: u64) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
        )
    }
}
