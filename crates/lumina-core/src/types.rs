// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core domain types shared across the crate.
//!
//! Wire strings from the backend are parsed leniently: anything missing or
//! unknown resolves to the least-privileged value.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Identity
// =============================================================================

/// The authenticated principal returned by the identity provider.
///
/// Only `email` is meaningful to access resolution; it is the join key to
/// backend entitlement records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Account email.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Avatar URL.
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

impl Identity {
    /// Creates an identity with only an email set.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: String::new(),
            photo_url: String::new(),
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the photo URL.
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = url.into();
        self
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.email)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Sign-in credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Email and password.
    Password {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Hosted OAuth popup flow.
    OAuthPopup,
}

impl Credentials {
    /// Creates password credentials.
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns the sign-in method name for logging.
    pub fn method(&self) -> &'static str {
        match self {
            Credentials::Password { .. } => "password",
            Credentials::OAuthPopup => "oauth_popup",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::OAuthPopup => f.write_str("OAuthPopup"),
        }
    }
}

/// New account registration.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Display name applied after the account is created.
    pub display_name: Option<String>,
    /// Photo URL applied after the account is created.
    pub photo_url: Option<String>,
}

impl Registration {
    /// Creates a registration with no profile fields.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            display_name: None,
            photo_url: None,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the photo URL.
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Returns the profile fields to apply after account creation.
    pub fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .finish()
    }
}

/// Profile fields to update on the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New photo URL.
    #[serde(skip_serializing_if = "Option::is_none", rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` if nothing would change.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }

    /// Applies the update to an identity.
    pub fn apply_to(&self, identity: &mut Identity) {
        if let Some(name) = &self.display_name {
            identity.display_name = name.clone();
        }
        if let Some(url) = &self.photo_url {
            identity.photo_url = url.clone();
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Account role. Ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Maps a backend `role` field.
    ///
    /// Absent or empty stays absent; unrecognised values become `User`.
    pub fn from_wire(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(Self::parse(s).unwrap_or(Role::User)),
        }
    }

    /// The least-privileged role.
    pub const fn least_privileged() -> Self {
        Role::User
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::least_privileged()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tier
// =============================================================================

/// Subscription tier, ascending privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier.
    Explorer,
    /// Paid tier with upload.
    Artist,
    /// Top paid tier.
    Creator,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Explorer, Tier::Artist, Tier::Creator];

    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Explorer => "explorer",
            Tier::Artist => "artist",
            Tier::Creator => "creator",
        }
    }

    /// Parses a tier from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "explorer" => Some(Tier::Explorer),
            "artist" => Some(Tier::Artist),
            "creator" => Some(Tier::Creator),
            _ => None,
        }
    }

    /// Maps the backend `user_status` field. Absent or unknown is `Explorer`.
    pub fn from_wire(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or(Tier::Explorer)
    }

    /// Returns `true` for paid tiers.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Tier::Explorer)
    }

    /// The least-privileged tier.
    pub const fn least_privileged() -> Self {
        Tier::Explorer
    }

    fn bit(self) -> u8 {
        match self {
            Tier::Explorer => 0b001,
            Tier::Artist => 0b010,
            Tier::Creator => 0b100,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::least_privileged()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// TierSet
// =============================================================================

/// A small set of tiers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TierSet(u8);

impl TierSet {
    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The paid tiers (`artist`, `creator`).
    pub fn paid() -> Self {
        Self::from_iter([Tier::Artist, Tier::Creator])
    }

    /// Adds a tier.
    pub fn insert(&mut self, tier: Tier) {
        self.0 |= tier.bit();
    }

    /// Returns `true` if the set contains the tier.
    pub fn contains(&self, tier: Tier) -> bool {
        self.0 & tier.bit() != 0
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates tiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<Tier> for TierSet {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut set = Self::empty();
        for tier in iter {
            set.insert(tier);
        }
        set
    }
}

impl fmt::Debug for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|t| t.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl Serialize for TierSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for TierSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tiers = Vec::<Tier>::deserialize(deserializer)?;
        Ok(tiers.into_iter().collect())
    }
}

// =============================================================================
// ImageId
// =============================================================================

/// Backend image identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an image id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_wire() {
        assert_eq!(Role::from_wire(Some("admin")), Some(Role::Admin));
        assert_eq!(Role::from_wire(Some("ADMIN")), Some(Role::Admin));
        assert_eq!(Role::from_wire(Some("superuser")), Some(Role::User));
        assert_eq!(Role::from_wire(Some("")), None);
        assert_eq!(Role::from_wire(None), None);
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::User);
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_tier_from_wire() {
        assert_eq!(Tier::from_wire(Some("artist")), Tier::Artist);
        assert_eq!(Tier::from_wire(Some("Creator")), Tier::Creator);
        assert_eq!(Tier::from_wire(Some("free")), Tier::Explorer);
        assert_eq!(Tier::from_wire(None), Tier::Explorer);
        assert!(!Tier::Explorer.is_paid());
        assert!(Tier::Artist.is_paid());
    }

    #[test]
    fn test_tier_set() {
        let set = TierSet::paid();
        assert!(set.contains(Tier::Artist));
        assert!(set.contains(Tier::Creator));
        assert!(!set.contains(Tier::Explorer));
        assert_eq!(set.to_string(), "{artist, creator}");
        assert!(TierSet::empty().is_empty());
    }

    #[test]
    fn test_tier_set_serde() {
        let set: TierSet = serde_json::from_str(r#"["creator", "artist"]"#).unwrap();
        assert_eq!(set, TierSet::paid());
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["artist","creator"]"#);
    }

    #[test]
    fn test_identity_wire_names() {
        let identity: Identity = serde_json::from_str(
            r#"{"email":"a@x.com","displayName":"A","photoURL":"https://cdn/a.png"}"#,
        )
        .unwrap();
        assert_eq!(identity.display_name, "A");
        assert_eq!(identity.photo_url, "https://cdn/a.png");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::password("a@x.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("hunter2"));
    }
}
