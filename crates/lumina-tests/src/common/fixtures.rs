// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built account records, configuration documents and assembled access
//! contexts.

use std::sync::Arc;

use lumina_core::{
    AccessContext, EntitlementConfig, EntitlementSnapshot, ImageId, ImageSummary, Role,
    RouteTable, Tier, UserRecord,
};

use super::mocks::{MockEntitlementApi, MockIdentityProvider};

/// Password every fixture account is created with.
pub const FIXTURE_PASSWORD: &str = "password";

// =============================================================================
// Record Fixtures
// =============================================================================

/// Backend records for each kind of account.
pub struct Fixtures;

impl Fixtures {
    /// Free-tier user.
    pub fn explorer() -> UserRecord {
        UserRecord::new(Role::User, Tier::Explorer)
    }

    /// Basic paid user.
    pub fn artist() -> UserRecord {
        UserRecord::new(Role::User, Tier::Artist)
    }

    /// Top paid user.
    pub fn creator() -> UserRecord {
        UserRecord::new(Role::User, Tier::Creator)
    }

    /// Administrator on the free tier.
    pub fn admin() -> UserRecord {
        UserRecord::new(Role::Admin, Tier::Explorer)
    }

    /// Record as the backend stores it, with wire strings.
    pub fn raw(role: Option<&str>, user_status: Option<&str>) -> UserRecord {
        UserRecord {
            role: role.map(str::to_string),
            user_status: user_status.map(str::to_string),
            ..UserRecord::default()
        }
    }

    /// `count` images spread over the `nature` and `city` categories.
    pub fn images(count: usize) -> Vec<ImageSummary> {
        (0..count)
            .map(|i| ImageSummary {
                id: ImageId::new(format!("img-{:03}", i)),
                name: format!("Image {}", i),
                category: if i % 2 == 0 { "nature" } else { "city" }.to_string(),
                url: format!("https://cdn.example.com/img-{:03}.jpg", i),
                owner_email: Some("artist@x.com".to_string()),
                owner_name: None,
            })
            .collect()
    }
}

// =============================================================================
// Configuration Fixtures
// =============================================================================

/// Configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Minimal YAML document.
    pub fn minimal_yaml() -> &'static str {
        r#"
api:
  base_url: "https://api.lumina.example/api"
"#
    }

    /// YAML document exercising every section.
    pub fn full_yaml() -> &'static str {
        r#"
api:
  base_url: "https://api.lumina.example/api"
  timeout: 15s
  user_agent: "lumina-tests"

entitlement:
  fetch_timeout: 3s

routes:
  - path: "/dashboard"
    requirements:
      - kind: authenticated_only
  - path: "/studio/*"
    requirements:
      - kind: authenticated_only
      - kind: tier_in
        tiers: [artist, creator]
  - path: "/admin/*"
    requirements:
      - kind: authenticated_only
      - kind: role_at_least
        role: admin

logging:
  level: debug
  format: json
"#
    }

    /// TOML document.
    pub fn toml() -> &'static str {
        r#"
[api]
base_url = "http://localhost:5000/api"
timeout = "5s"

[entitlement]
fetch_timeout = "2s"

[logging]
level = "warn"
format = "compact"
"#
    }

    /// JSON document.
    pub fn json() -> &'static str {
        r#"{
  "api": { "base_url": "http://localhost:5000/api" },
  "logging": { "level": "error" }
}"#
    }

    /// JSON document with a route that has no requirements.
    pub fn empty_route_json() -> &'static str {
        r#"{
  "api": { "base_url": "https://api.lumina.example/api" },
  "routes": [{ "path": "/dashboard", "requirements": [] }]
}"#
    }
}

// =============================================================================
// Access Context Fixture
// =============================================================================

/// An identity provider, an entitlement backend and a started context.
pub struct AccessFixture {
    /// The identity provider.
    pub provider: Arc<MockIdentityProvider>,
    /// The entitlement backend.
    pub api: Arc<MockEntitlementApi>,
    /// The context under test.
    pub context: AccessContext,
}

impl AccessFixture {
    /// Context for a signed-out visitor.
    pub fn signed_out() -> Self {
        Self::with_provider(MockIdentityProvider::new())
    }

    /// Context signed in as `email`, whose backend record is `record`.
    pub fn signed_in(email: &str, record: UserRecord) -> Self {
        let api = MockEntitlementApi::new();
        api.insert(email, record);
        Self::assemble(
            MockIdentityProvider::new()
                .with_account(email, FIXTURE_PASSWORD)
                .signed_in_as(email),
            api,
            RouteTable::standard(),
            EntitlementConfig::default(),
        )
    }

    /// Started context around `provider` with the standard routes.
    pub fn with_provider(provider: MockIdentityProvider) -> Self {
        Self::build(provider, RouteTable::standard(), EntitlementConfig::default())
    }

    /// Started context with explicit routes and fetcher settings.
    pub fn build(
        provider: MockIdentityProvider,
        routes: RouteTable,
        config: EntitlementConfig,
    ) -> Self {
        Self::assemble(provider, MockEntitlementApi::new(), routes, config)
    }

    /// Waits until the context tracks the signed-in email and its
    /// entitlement has settled.
    pub async fn settled(&self) -> EntitlementSnapshot {
        let session = self.context.session().settled().await;
        let email = session.email().map(str::to_string);
        let entitlements = self.context.entitlements();
        let mut rx = entitlements.subscribe();
        if let Some(email) = email.as_deref() {
            entitlements.ensure(email);
        }
        loop {
            let snapshot = entitlements.snapshot();
            let tracked = entitlements.active_email() == email;
            let settled = email.as_deref().map_or(true, |e| snapshot.is_settled_for(e));
            if (tracked && settled) || rx.changed().await.is_err() {
                return snapshot;
            }
        }
    }

    fn assemble(
        provider: MockIdentityProvider,
        api: MockEntitlementApi,
        routes: RouteTable,
        config: EntitlementConfig,
    ) -> Self {
        let provider = Arc::new(provider);
        let api = Arc::new(api);
        let context = AccessContext::builder()
            .identity_provider(provider.clone())
            .entitlement_api(api.clone())
            .routes(routes)
            .entitlement_config(config)
            .build()
            .expect("fixture context has every input");
        context.start();
        Self {
            provider,
            api,
            context,
        }
    }
}
