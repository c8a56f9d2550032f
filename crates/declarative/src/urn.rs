//! Resource URNs
//!
//! A URN has the shape
//! `urn:pulumi:<stack>::<project>::<qualified type>::<name>`, where the
//! qualified type chains parent types with `$`.

use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: &str = "::";

/// A resource URN
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(urn: impl Into<String>) -> Self {
        Self(urn.into())
    }

    /// Build a URN for a top-level resource
    pub fn for_resource(stack: &str, project: &str, resource_type: &str, name: &str) -> Self {
        Self(format!(
            "urn:pulumi:{stack}{SEPARATOR}{project}{SEPARATOR}{resource_type}{SEPARATOR}{name}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource's own type token, without parent types
    ///
    /// Returns an empty string for malformed URNs.
    pub fn resource_type(&self) -> &str {
        self.qualified_type()
            .rsplit('$')
            .next()
            .unwrap_or_default()
    }

    /// The `$`-joined type chain including parents
    pub fn qualified_type(&self) -> &str {
        self.0.splitn(4, SEPARATOR).nth(2).unwrap_or_default()
    }

    /// The resource name; may itself contain `::`
    pub fn name(&self) -> &str {
        self.0.splitn(4, SEPARATOR).nth(3).unwrap_or_default()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Urn {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
