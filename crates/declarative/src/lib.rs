//! # Declarative
//!
//! Vocabulary for resource providers driven by a declarative orchestrator.
//!
//! The orchestrator owns the desired state of every resource and asks a
//! provider to check inputs, diff them against recorded state, and then
//! create, update or delete the real thing. This crate holds the pieces
//! that are independent of any particular resource type.
//!
//! ## Core Concepts
//!
//! - **PropertyMap**: Loosely typed resource inputs and outputs, with
//!   unknown values modelled as [`PropertyValue::Computed`]
//! - **ObjectDiff**: Key-level add/delete/update classification of two maps
//! - **ResourceProvider**: The lifecycle contract a provider implements
//! - **HostLogger**: Where a provider sends messages meant for the user
//!
//! ## Example
//!
//! ```
//! use declarative::{DiffKind, DiffResponse, PropertyMap};
//!
//! let mut old = PropertyMap::new();
//! old.insert("name", "registry.example.com/app:1");
//!
//! let mut new = old.clone();
//! new.insert("target", "release");
//!
//! let response = old
//!     .diff(&new)
//!     .map_or_else(DiffResponse::none, |d| DiffResponse::from_object_diff(&d));
//! assert_eq!(response.detailed_diff["target"].kind, DiffKind::Add);
//! ```

pub mod context;
pub mod diff;
pub mod error;
pub mod property;
pub mod provider;
pub mod types;
pub mod urn;

// Re-export main types at crate root
pub use context::{HostLogger, Severity};
pub use diff::{DiffKind, DiffSummary, ObjectDiff, ValueDiff};
pub use error::{ProviderError, Result};
pub use property::{PropertyMap, PropertyValue, UNKNOWN_SENTINEL};
pub use provider::ResourceProvider;
pub use types::{
    CallRequest, CallResponse, CheckFailure, CheckRequest, CheckResponse, ConfigureRequest,
    ConfigureResponse, ConstructRequest, ConstructResponse, CreateRequest, CreateResponse,
    DeleteRequest, DiffChanges, DiffRequest, DiffResponse, GetSchemaRequest, GetSchemaResponse,
    InvokeRequest, InvokeResponse, PluginInfo, PropertyDiff, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
pub use urn::Urn;
