use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("docker-buildkit"))
}

/// Default location of the provider config file
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_jobs() -> usize {
    4
}

/// Process-level settings; per-resource inputs never come from here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Docker executable, `~` expanded
    #[serde(default = "default_docker")]
    pub docker: String,

    /// buildx builder instance to build with
    #[serde(default)]
    pub builder: Option<String>,

    /// Maximum number of requests served at once
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            builder: None,
            jobs: default_jobs(),
        }
    }
}

impl ProviderConfig {
    /// Load from `path`, or from the default location; a missing file
    /// yields the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
            None => config_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line and environment overrides
    pub fn with_overrides(
        mut self,
        docker: Option<String>,
        builder: Option<String>,
        jobs: Option<usize>,
    ) -> Self {
        if let Some(docker) = docker {
            self.docker = docker;
        }
        if builder.is_some() {
            self.builder = builder;
        }
        if let Some(jobs) = jobs {
            self.jobs = jobs;
        }
        self
    }

    /// Docker executable with `~` expanded
    pub fn docker_program(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.docker).as_ref())
    }
}
