//! Paging limits for list endpoints.

use serde::{Deserialize, Serialize};

/// Default and maximum page sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the caller does not ask for one.
    #[serde(default = "default_size")]
    pub default_size: u64,
    /// Upper bound applied to any requested page size.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_size: default_size(),
            max_size: default_max_size(),
        }
    }
}

fn default_size() -> u64 {
    50
}

fn default_max_size() -> u64 {
    100
}
