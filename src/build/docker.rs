//! Build tool backed by the `docker` CLI.

use super::error::{BuildError, Result};
use super::{BuildPlan, BuildTool, Credentials};
use crate::runner;
use std::ffi::{OsStr, OsString};

/// Format string that makes `docker image inspect` print only the digests
const REPO_DIGESTS_FORMAT: &str = "{{json .RepoDigests}}";

/// Build tool that executes real `docker` commands.
pub struct DockerCli {
    /// Path or name of the docker executable
    program: OsString,
    /// buildx builder instance, when not the default one
    builder: Option<String>,
}

impl DockerCli {
    pub fn new(program: impl Into<OsString>, builder: Option<String>) -> Self {
        Self {
            program: program.into(),
            builder,
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> BuildError {
        BuildError::Spawn {
            program: self.program.to_string_lossy().into_owned(),
            source,
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker", None)
    }
}

impl BuildTool for DockerCli {
    fn login(&self, credentials: &Credentials) -> Result<()> {
        let args = [
            "login",
            "--username",
            credentials.username.as_str(),
            "--password-stdin",
            credentials.server.as_str(),
        ];
        let transcript = runner::run_streaming(
            &self.program,
            &args,
            Some(credentials.password.as_bytes()),
            |line| log::debug!("docker login: {line}"),
        )
        .map_err(|e| self.spawn_error(e))?;

        if !transcript.success() {
            return Err(BuildError::Login {
                server: credentials.server.clone(),
                status: transcript.status.to_string(),
                output: transcript.output,
            });
        }
        Ok(())
    }

    fn build(&self, plan: &BuildPlan, on_line: &(dyn Fn(&str) + Sync)) -> Result<String> {
        let args = plan.to_args(self.builder.as_deref());
        log::debug!(
            "Running {} {}",
            self.program.to_string_lossy(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let transcript = runner::run_streaming(&self.program, &args, None, on_line)
            .map_err(|e| self.spawn_error(e))?;

        if !transcript.success() {
            return Err(BuildError::Build {
                image: plan.name.clone(),
                status: transcript.status.to_string(),
                output: transcript.output,
            });
        }
        Ok(transcript.output)
    }

    fn repo_digests(&self, image: &str) -> Result<Vec<String>> {
        let args: [&OsStr; 5] = [
            "image".as_ref(),
            "inspect".as_ref(),
            image.as_ref(),
            "--format".as_ref(),
            REPO_DIGESTS_FORMAT.as_ref(),
        ];
        let output = runner::run_capture(&self.program, &args).map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BuildError::Inspect {
                image: image.to_string(),
                reason: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_repo_digests(&stdout).map_err(|e| BuildError::Inspect {
            image: image.to_string(),
            reason: format!("unexpected output: {e}"),
            output: stdout.into_owned(),
        })
    }
}

/// Parse the JSON array printed by `docker image inspect`.
///
/// Images that were never pushed report `null`.
pub fn parse_repo_digests(output: &str) -> serde_json::Result<Vec<String>> {
    let digests: Option<Vec<String>> = serde_json::from_str(output.trim())?;
    Ok(digests.unwrap_or_default())
}
