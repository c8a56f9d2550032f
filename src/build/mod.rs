//! Image build orchestration.
//!
//! The [`BuildTool`] trait is the seam between the provider and the
//! external image builder, allowing for different implementations (the
//! docker CLI, fakes for testing). [`build_and_push`] runs the fixed
//! login, build and inspect sequence on top of it.

pub mod docker;
pub mod error;

pub use docker::DockerCli;
pub use error::{BuildError, Result};

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// Registry credentials used for `docker login`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to build and push one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Image reference to tag and push
    pub name: String,
    /// Build context root
    pub context: PathBuf,
    /// Build file, relative to `context`
    pub dockerfile: PathBuf,
    pub platforms: Vec<String>,
    pub target: Option<String>,
    pub args: Vec<(String, String)>,
}

impl BuildPlan {
    /// Argument vector for `docker buildx build`
    pub fn to_args(&self, builder: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["buildx".into(), "build".into()];
        if let Some(builder) = builder {
            args.push("--builder".into());
            args.push(builder.into());
        }
        args.push("--platform".into());
        args.push(self.platforms.join(",").into());
        args.push("--cache-from".into());
        args.push(format!("type=registry,ref={}", self.name).into());
        args.push("--cache-to".into());
        args.push("type=inline".into());
        args.push("-f".into());
        args.push(self.context.join(&self.dockerfile).into_os_string());
        if let Some(target) = &self.target {
            args.push("--target".into());
            args.push(target.into());
        }
        for (key, value) in &self.args {
            args.push("--build-arg".into());
            args.push(format!("{key}={value}").into());
        }
        args.push("-t".into());
        args.push(self.name.as_str().into());
        args.push("--push".into());
        args.push(self.context.clone().into_os_string());
        args
    }
}

/// Interface to the external image builder.
pub trait BuildTool: Send + Sync {
    /// Authenticate against a registry.
    fn login(&self, credentials: &Credentials) -> Result<()>;

    /// Build and push, forwarding each output line as it is produced.
    ///
    /// Returns the combined output of the build.
    fn build(&self, plan: &BuildPlan, on_line: &(dyn Fn(&str) + Sync)) -> Result<String>;

    /// Repository digests recorded for a local image.
    fn repo_digests(&self, image: &str) -> Result<Vec<String>>;
}

/// Repository part of an image reference: no `@digest`, no `:tag`.
///
/// A `:` before the last `/` belongs to a registry port and is kept.
pub fn repository_of(reference: &str) -> &str {
    let name = reference.split_once('@').map_or(reference, |(name, _)| name);
    match name.rfind(':') {
        Some(colon) if name.rfind('/').is_none_or(|slash| colon > slash) => &name[..colon],
        _ => name,
    }
}

/// Pick the digest whose repository matches the repository of `name`.
pub fn select_repo_digest<'a>(name: &str, digests: &'a [String]) -> Option<&'a str> {
    let repository = repository_of(name);
    digests
        .iter()
        .map(String::as_str)
        .find(|digest| repository_of(digest) == repository)
}

/// Log in (when credentials are given), build and push, then resolve the
/// pushed repository digest.
///
/// Logins are serialised through `login_lock`; builds are not.
pub fn build_and_push(
    tool: &dyn BuildTool,
    login_lock: &Mutex<()>,
    plan: &BuildPlan,
    credentials: Option<&Credentials>,
    on_line: &(dyn Fn(&str) + Sync),
) -> Result<String> {
    if let Some(credentials) = credentials {
        let _guard = login_lock.lock().map_err(|_| BuildError::LockPoisoned)?;
        log::debug!("Logging in to {}", credentials.server);
        tool.login(credentials)?;
    }

    log::info!("Building {}", plan.name);
    let output = tool.build(plan, on_line)?;

    let digests = tool.repo_digests(&plan.name)?;
    match select_repo_digest(&plan.name, &digests) {
        Some(digest) => {
            log::info!("Pushed {digest}");
            Ok(digest.to_string())
        }
        None => Err(BuildError::RepoDigestNotFound {
            image: plan.name.clone(),
            repository: repository_of(&plan.name).to_string(),
            digests,
            output,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn plan(name: &str) -> BuildPlan {
        BuildPlan {
            name: name.to_string(),
            context: PathBuf::from("app"),
            dockerfile: PathBuf::from("Dockerfile"),
            platforms: vec!["linux/amd64".into()],
            target: None,
            args: Vec::new(),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            server: "registry.example.com".into(),
            username: "ci".into(),
            password: "s3cret".into(),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[derive(Default)]
    struct FakeTool {
        calls: Mutex<Vec<String>>,
        digests: Vec<String>,
        fail_build: bool,
        active_logins: AtomicUsize,
        max_concurrent_logins: AtomicUsize,
    }

    impl BuildTool for FakeTool {
        fn login(&self, credentials: &Credentials) -> Result<()> {
            let active = self.active_logins.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent_logins.fetch_max(active, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.calls
                .lock()
                .unwrap()
                .push(format!("login {}", credentials.server));
            self.active_logins.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn build(&self, plan: &BuildPlan, on_line: &(dyn Fn(&str) + Sync)) -> Result<String> {
            self.calls.lock().unwrap().push(format!("build {}", plan.name));
            on_line("#1 building");
            if self.fail_build {
                return Err(BuildError::Build {
                    image: plan.name.clone(),
                    status: "exit status: 1".into(),
                    output: "#1 ERROR".into(),
                });
            }
            Ok("#1 building\n".into())
        }

        fn repo_digests(&self, image: &str) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push(format!("inspect {image}"));
            Ok(self.digests.clone())
        }
    }

    #[test]
    fn test_repository_of() {
        assert_eq!(repository_of("app"), "app");
        assert_eq!(repository_of("app:1.0"), "app");
        assert_eq!(repository_of("registry.io/team/app:latest"), "registry.io/team/app");
        assert_eq!(repository_of("localhost:5000/app"), "localhost:5000/app");
        assert_eq!(repository_of("localhost:5000/app:v2"), "localhost:5000/app");
        assert_eq!(repository_of("registry.io/app@sha256:abc"), "registry.io/app");
        assert_eq!(repository_of("registry.io/app:v1@sha256:abc"), "registry.io/app");
    }

    #[test]
    fn test_select_repo_digest() {
        let digests = vec![
            "other.io/app@sha256:111".to_string(),
            "localhost:5000/app@sha256:222".to_string(),
        ];
        assert_eq!(
            select_repo_digest("localhost:5000/app:v2", &digests),
            Some("localhost:5000/app@sha256:222")
        );
        assert_eq!(select_repo_digest("localhost:5000/web", &digests), None);
    }

    #[test]
    fn test_build_args_minimal() {
        let args = strings(&plan("registry.io/app:1").to_args(None));
        assert_eq!(
            args,
            vec![
                "buildx",
                "build",
                "--platform",
                "linux/amd64",
                "--cache-from",
                "type=registry,ref=registry.io/app:1",
                "--cache-to",
                "type=inline",
                "-f",
                "app/Dockerfile",
                "-t",
                "registry.io/app:1",
                "--push",
                "app",
            ]
        );
    }

    #[test]
    fn test_build_args_full() {
        let mut plan = plan("app:1");
        plan.platforms = vec!["linux/amd64".into(), "linux/arm64".into()];
        plan.target = Some("release".into());
        plan.args = vec![("A".into(), "1".into()), ("B".into(), "x=y".into())];

        let args = strings(&plan.to_args(Some("multi")));
        let joined = args.join(" ");
        assert!(
            joined.starts_with("buildx build --builder multi --platform linux/amd64,linux/arm64")
        );
        assert!(joined.contains("--target release --build-arg A=1 --build-arg B=x=y -t app:1"));
        assert_eq!(args.last().map(String::as_str), Some("app"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("registry.example.com"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_build_and_push_without_credentials_skips_login() {
        let tool = FakeTool {
            digests: vec!["app@sha256:abc".into()],
            ..FakeTool::default()
        };
        let lines = Mutex::new(Vec::new());
        let digest = build_and_push(&tool, &Mutex::new(()), &plan("app:1"), None, &|line| {
            lines.lock().unwrap().push(line.to_string());
        })
        .unwrap();

        assert_eq!(digest, "app@sha256:abc");
        assert_eq!(*tool.calls.lock().unwrap(), vec!["build app:1", "inspect app:1"]);
        assert_eq!(*lines.lock().unwrap(), vec!["#1 building"]);
    }

    #[test]
    fn test_build_and_push_logs_in_first() {
        let tool = FakeTool {
            digests: vec!["app@sha256:abc".into()],
            ..FakeTool::default()
        };
        build_and_push(&tool, &Mutex::new(()), &plan("app"), Some(&credentials()), &|_| {})
            .unwrap();
        assert_eq!(
            *tool.calls.lock().unwrap(),
            vec!["login registry.example.com", "build app", "inspect app"]
        );
    }

    #[test]
    fn test_missing_digest_is_distinct_error() {
        let tool = FakeTool {
            digests: vec!["other@sha256:abc".into()],
            ..FakeTool::default()
        };
        let err = build_and_push(&tool, &Mutex::new(()), &plan("app:1"), None, &|_| {})
            .unwrap_err();

        match err {
            BuildError::RepoDigestNotFound {
                repository,
                digests,
                output,
                ..
            } => {
                assert_eq!(repository, "app");
                assert_eq!(digests, vec!["other@sha256:abc"]);
                assert!(output.contains("#1 building"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_failure_stops_before_inspect() {
        let tool = FakeTool {
            fail_build: true,
            ..FakeTool::default()
        };
        let err = build_and_push(&tool, &Mutex::new(()), &plan("app"), None, &|_| {})
            .unwrap_err();
        assert!(matches!(err, BuildError::Build { .. }));
        assert_eq!(*tool.calls.lock().unwrap(), vec!["build app"]);
    }

    #[test]
    fn test_logins_are_serialised() {
        let tool = Arc::new(FakeTool {
            digests: vec!["app@sha256:abc".into()],
            ..FakeTool::default()
        });
        let lock = Arc::new(Mutex::new(()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tool = Arc::clone(&tool);
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    build_and_push(&*tool, &lock, &plan("app"), Some(&credentials()), &|_| {})
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(tool.max_concurrent_logins.load(Ordering::SeqCst), 1);
    }
}
