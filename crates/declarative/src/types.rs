//! Request and response types for the provider lifecycle
//!
//! Field names follow the orchestrator's camelCase wire form. Property
//! bags are carried as [`PropertyMap`] so unknown values and nulls are
//! normalised as soon as a request is decoded.

use crate::diff::{DiffKind, ObjectDiff};
use crate::property::PropertyMap;
use crate::urn::Urn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validate resource inputs (also used for provider configuration)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckRequest {
    pub urn: Urn,
    pub olds: PropertyMap,
    pub news: PropertyMap,
}

/// A single input that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub property: String,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub inputs: PropertyMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CheckFailure>,
}

/// Compare recorded state against new inputs (also used for configuration)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffRequest {
    pub id: String,
    pub urn: Urn,
    pub olds: PropertyMap,
    pub news: PropertyMap,
    pub ignore_changes: Vec<String>,
}

/// Overall outcome of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffChanges {
    /// The provider did not decide; the orchestrator falls back to its own diff
    #[default]
    #[serde(rename = "DIFF_UNKNOWN")]
    Unknown,
    #[serde(rename = "DIFF_NONE")]
    None,
    #[serde(rename = "DIFF_SOME")]
    Some,
}

/// Per-property entry of a detailed diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDiff {
    pub kind: DiffKind,
    pub input_diff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffResponse {
    pub changes: DiffChanges,
    pub diffs: Vec<String>,
    pub detailed_diff: BTreeMap<String, PropertyDiff>,
    pub has_detailed_diff: bool,
    pub replaces: Vec<String>,
    pub delete_before_replace: bool,
}

impl DiffResponse {
    /// Response for an unchanged resource
    pub fn none() -> Self {
        Self {
            changes: DiffChanges::None,
            ..Self::default()
        }
    }

    /// Response carrying every changed key of `diff` as an input diff
    pub fn from_object_diff(diff: &ObjectDiff) -> Self {
        let detailed_diff: BTreeMap<String, PropertyDiff> = diff
            .kinds()
            .into_iter()
            .map(|(key, kind)| {
                (
                    key,
                    PropertyDiff {
                        kind,
                        input_diff: true,
                    },
                )
            })
            .collect();

        Self {
            changes: DiffChanges::Some,
            diffs: detailed_diff.keys().cloned().collect(),
            detailed_diff,
            has_detailed_diff: true,
            ..Self::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        self.changes == DiffChanges::Some
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigureRequest {
    pub variables: BTreeMap<String, String>,
    pub args: PropertyMap,
    pub accept_secrets: bool,
    pub accept_resources: bool,
}

/// Capabilities the provider advertises after configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    pub accept_secrets: bool,
    pub supports_preview: bool,
    pub accept_resources: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvokeRequest {
    pub tok: String,
    pub args: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    pub r#return: PropertyMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CheckFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRequest {
    pub urn: Urn,
    pub properties: PropertyMap,
    /// Seconds the orchestrator is willing to wait; advisory only
    pub timeout: f64,
    /// Planning-time call; must not touch the outside world
    pub preview: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub id: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRequest {
    pub id: String,
    pub urn: Urn,
    pub properties: PropertyMap,
    pub inputs: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub id: String,
    pub properties: PropertyMap,
    #[serde(default)]
    pub inputs: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    pub id: String,
    pub urn: Urn,
    pub olds: PropertyMap,
    pub news: PropertyMap,
    pub timeout: f64,
    pub ignore_changes: Vec<String>,
    pub preview: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteRequest {
    pub id: String,
    pub urn: Urn,
    pub properties: PropertyMap,
    pub timeout: f64,
}

/// Component construction request; only the fields needed for logging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstructRequest {
    pub r#type: String,
    pub name: String,
    pub inputs: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructResponse {
    pub urn: Urn,
    pub state: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallRequest {
    pub tok: String,
    pub args: PropertyMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub r#return: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSchemaRequest {
    pub version: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSchemaResponse {
    pub schema: String,
}
