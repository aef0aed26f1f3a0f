// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Entitlement backend contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EntitlementResult;
use crate::types::{Role, Tier};

/// User record as returned by `GET /users/{email}`.
///
/// The tier travels as `user_status` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    /// Account email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name stored by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw role string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Raw tier string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_status: Option<String>,
}

impl UserRecord {
    /// Creates a record with role and tier set.
    pub fn new(role: Role, tier: Tier) -> Self {
        Self {
            email: None,
            name: None,
            role: Some(role.as_str().to_string()),
            user_status: Some(tier.as_str().to_string()),
        }
    }

    /// Parsed role; absent stays absent.
    pub fn role(&self) -> Option<Role> {
        Role::from_wire(self.role.as_deref())
    }

    /// Parsed tier; absent or unknown is `Explorer`.
    pub fn tier(&self) -> Tier {
        Tier::from_wire(self.user_status.as_deref())
    }
}

/// Resolves user records by email.
#[async_trait]
pub trait EntitlementApi: Send + Sync {
    /// Fetches the user record for an email.
    async fn fetch_user(&self, email: &str) -> EntitlementResult<UserRecord>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "entitlement-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_wire_format() {
        let record: UserRecord =
            serde_json::from_str(r#"{"email":"a@x.com","role":"admin","user_status":"creator"}"#)
                .unwrap();
        assert_eq!(record.role(), Some(Role::Admin));
        assert_eq!(record.tier(), Tier::Creator);
    }

    #[test]
    fn test_user_record_missing_fields() {
        let record: UserRecord = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(record.role(), None);
        assert_eq!(record.tier(), Tier::Explorer);

        let record: UserRecord = serde_json::from_str(r#"{"user_status":"premium"}"#).unwrap();
        assert_eq!(record.tier(), Tier::Explorer);
    }
}
