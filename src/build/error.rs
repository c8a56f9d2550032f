//! Error types for image builds.

use std::io;
use thiserror::Error;

/// Errors that can occur while logging in, building or inspecting.
///
/// Tool failures carry the tool's captured output so the orchestrator can
/// show why the step failed. None of these are retried here.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build tool could not be started
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Registry authentication was rejected
    #[error("docker login to {server} failed ({status}):\n{output}")]
    Login {
        server: String,
        status: String,
        output: String,
    },

    /// The build or push exited unsuccessfully
    #[error("image build of {image} failed ({status}):\n{output}")]
    Build {
        image: String,
        status: String,
        output: String,
    },

    /// Repository digests of the built image could not be read
    #[error("docker inspect of {image} failed: {reason}\n{output}")]
    Inspect {
        image: String,
        reason: String,
        output: String,
    },

    /// The build succeeded but no pushed digest matches the image name
    #[error("failed to find repo digest for {image} (repository {repository}) in {digests:?}\n{output}")]
    RepoDigestNotFound {
        image: String,
        repository: String,
        digests: Vec<String>,
        /// Build output, for diagnosis
        output: String,
    },

    /// A concurrent login panicked while holding the login lock
    #[error("registry login lock poisoned")]
    LockPoisoned,
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
