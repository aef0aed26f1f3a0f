// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Static route requirement table.
//!
//! Patterns are `/`-separated. A `:name` segment matches any one segment and a
//! trailing `*` matches the remaining segments, including none. Paths that no
//! entry matches are public.
//!
//! When several entries match, the most specific wins. Patterns are compared
//! segment by segment: a literal beats a `:name`, which beats the end of the
//! pattern, which beats `*`. Equal patterns fall back to table order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::RouteRequirement;

// =============================================================================
// Errors
// =============================================================================

/// Invalid route pattern or table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern does not start with `/`.
    #[error("Route pattern must start with '/': {0}")]
    NotAbsolute(String),

    /// `*` somewhere other than the last segment.
    #[error("Wildcard must be the last segment: {0}")]
    MisplacedWildcard(String),

    /// `:` with no parameter name.
    #[error("Empty parameter name in route pattern: {0}")]
    EmptyParam(String),

    /// A listed route with no requirements.
    #[error("Route has no requirements: {0}")]
    NoRequirements(String),

    /// The same pattern listed twice.
    #[error("Duplicate route pattern: {0}")]
    Duplicate(String),
}

// =============================================================================
// RoutePattern
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

/// A parsed route pattern such as `/payment/:id/:amount`.
#[derive(Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parses a pattern.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::NotAbsolute(pattern.to_string()));
        }

        let parts = split_path(pattern);
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(RouteError::MisplacedWildcard(pattern.to_string()));
                }
                Segment::Rest
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteError::EmptyParam(pattern.to_string()));
                }
                Segment::Param(name.to_string())
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if `path` matches.
    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Matches `path` and returns its named parameters.
    ///
    /// Query strings and fragments are ignored, as is a trailing `/`.
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts = split_path(strip_query(path));
        let mut params = BTreeMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest => return Some(params),
                Segment::Literal(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Orders patterns by how narrowly they match.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        self.ranks().cmp(other.ranks())
    }

    fn ranks(&self) -> impl Iterator<Item = u8> + '_ {
        let end = (!matches!(self.segments.last(), Some(Segment::Rest))).then_some(1);
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(_) => 3,
                Segment::Param(_) => 2,
                Segment::Rest => 0,
            })
            .chain(end)
    }

    /// Builds a pattern known to be well formed: absolute, with `*` only as
    /// the last segment and no empty `:` names.
    fn well_formed(raw: &'static str) -> Self {
        let parts = split_path(raw);
        let segments = parts
            .iter()
            .map(|part| match *part {
                "*" => Segment::Rest,
                part => match part.strip_prefix(':') {
                    Some(name) => Segment::Param(name.to_string()),
                    None => Segment::Literal(part.to_string()),
                },
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl FromStr for RoutePattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutePattern({})", self.raw)
    }
}

impl Serialize for RoutePattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for RoutePattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// RouteTable
// =============================================================================

/// One protected route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Path pattern.
    #[serde(rename = "path")]
    pub pattern: RoutePattern,
    /// Requirements, outer to inner.
    pub requirements: Vec<RouteRequirement>,
}

impl RouteEntry {
    /// Creates an entry.
    pub fn new(pattern: RoutePattern, requirements: Vec<RouteRequirement>) -> Self {
        Self {
            pattern,
            requirements,
        }
    }
}

/// Protected routes. The most specific matching entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Creates a table from entries.
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Builds a table from `(pattern, requirements)` pairs.
    pub fn from_rules<'a, I>(rules: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (&'a str, Vec<RouteRequirement>)>,
    {
        let entries = rules
            .into_iter()
            .map(|(pattern, requirements)| {
                Ok(RouteEntry::new(RoutePattern::parse(pattern)?, requirements))
            })
            .collect::<Result<Vec<_>, RouteError>>()?;
        Ok(Self::new(entries))
    }

    /// The gallery's protected routes.
    pub fn standard() -> Self {
        use RouteRequirement::AuthenticatedOnly;

        let authenticated = [
            "/subscription",
            "/payment/:id/:amount",
            "/dashboard",
            "/dashboard/profile",
            "/dashboard/settings",
            "/dashboard/user-gallery/my-gallery",
            "/dashboard/user-gallery/my-image",
        ];

        let mut entries: Vec<RouteEntry> = authenticated
            .into_iter()
            .map(|p| RouteEntry::new(RoutePattern::well_formed(p), vec![AuthenticatedOnly]))
            .collect();

        let gated = [
            (
                "/dashboard/user-gallery/add-image",
                RouteRequirement::paid_tier(),
            ),
            (
                "/dashboard/user-gallery/premium-downloads",
                RouteRequirement::not_explorer(),
            ),
            ("/dashboard/admin-dashboard/*", RouteRequirement::admin()),
        ];
        entries.extend(gated.into_iter().map(|(p, requirement)| {
            RouteEntry::new(
                RoutePattern::well_formed(p),
                vec![AuthenticatedOnly, requirement],
            )
        }));

        Self::new(entries)
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most specific entry matching `path`; the earlier entry on a tie.
    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.pattern.matches(path))
            .max_by(|(i, a), (j, b)| {
                a.pattern
                    .cmp_specificity(&b.pattern)
                    .then_with(|| j.cmp(i))
            })
            .map(|(_, e)| e)
    }

    /// Requirements for `path`; empty for public paths.
    pub fn requirements_for(&self, path: &str) -> &[RouteRequirement] {
        self.lookup(path)
            .map(|e| e.requirements.as_slice())
            .unwrap_or(&[])
    }

    /// Rejects empty requirement lists and duplicate patterns.
    pub fn validate(&self) -> Result<(), RouteError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.requirements.is_empty() {
                return Err(RouteError::NoRequirements(entry.pattern.to_string()));
            }
            if !seen.insert(entry.pattern.as_str()) {
                return Err(RouteError::Duplicate(entry.pattern.to_string()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
