// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// ApiConfig
// =============================================================================

/// Configuration for the REST client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `https://api.lumina.example`.
    pub base_url: String,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(15),
            user_agent: format!("lumina/{}", crate::VERSION),
        }
    }
}

impl ApiConfig {
    /// Creates a configuration for `base_url` with default values.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humantime_timeout() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"base_url":"https://api.test","timeout":"2s 500ms"}"#)
                .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert!(config.user_agent.starts_with("lumina/"));
    }
}
