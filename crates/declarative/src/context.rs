//! Host logging seam
//!
//! Providers report progress to the orchestrator rather than to their own
//! stderr, attributed to the resource being worked on. This trait lets the
//! lifecycle code stay independent of how those messages travel.

use crate::urn::Urn;
use serde::{Deserialize, Serialize};

/// Severity of a host log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => Self::Debug,
            Severity::Info => Self::Info,
            Severity::Warning => Self::Warn,
            Severity::Error => Self::Error,
        }
    }
}

/// Sink for messages addressed to the orchestrator
///
/// Implementations must be safe to call from several requests at once;
/// each call carries one complete line of output.
pub trait HostLogger: Send + Sync {
    fn log(&self, severity: Severity, urn: &Urn, message: &str);

    fn info(&self, urn: &Urn, message: &str) {
        self.log(Severity::Info, urn, message);
    }

    fn warning(&self, urn: &Urn, message: &str) {
        self.log(Severity::Warning, urn, message);
    }
}
