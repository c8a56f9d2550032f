//! The `Image` resource: defaults, desired state and diffing
//!
//! Recorded state is the declaration with defaults filled in, `registry`
//! flattened to `registryServer`, and `contextDigest`/`repoDigest` added.
//! Keeping the declared values verbatim means an unchanged declaration
//! always reproduces the recorded state exactly.

use crate::build::{BuildPlan, Credentials};
use anyhow::Context;
use declarative::{
    CheckFailure, DiffResponse, DiffSummary, PropertyMap, PropertyValue, ProviderError, Result,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const RESOURCE_TYPE: &str = "docker-buildkit:index:Image";

pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";
pub const DEFAULT_CONTEXT: &str = ".";
pub const DEFAULT_PLATFORM: &str = "linux/amd64";

pub const DOCKERFILE: &str = "dockerfile";
pub const CONTEXT: &str = "context";
pub const NAME: &str = "name";
pub const REGISTRY: &str = "registry";
pub const PLATFORMS: &str = "platforms";
pub const TARGET: &str = "target";
pub const ARGS: &str = "args";
pub const REGISTRY_SERVER: &str = "registryServer";
pub const CONTEXT_DIGEST: &str = "contextDigest";
pub const REPO_DIGEST: &str = "repoDigest";

/// Fill in absent inputs; explicitly given values, even empty ones, are kept
pub fn apply_defaults(props: &mut PropertyMap) {
    if !props.contains_key(DOCKERFILE) {
        props.insert(DOCKERFILE, DEFAULT_DOCKERFILE);
    }
    if !props.contains_key(CONTEXT) {
        props.insert(CONTEXT, DEFAULT_CONTEXT);
    }
    if !props.contains_key(PLATFORMS) {
        props.insert(PLATFORMS, vec![PropertyValue::from(DEFAULT_PLATFORM)]);
    }
}

/// Replace the `registry` object with its `server`, dropping credentials
pub fn flatten_registry(props: &mut PropertyMap) {
    let server = props
        .remove(REGISTRY)
        .and_then(|registry| match registry {
            PropertyValue::Object(mut fields) => fields.remove("server"),
            PropertyValue::Computed => Some(PropertyValue::Computed),
            _ => None,
        });
    match server {
        Some(server) if !server.is_null() => props.insert(REGISTRY_SERVER, server),
        _ => {
            props.remove(REGISTRY_SERVER);
        }
    }
}

/// Digest of the declared build context, or `Computed` while the context
/// or build file is not known yet
pub fn context_digest(props: &PropertyMap) -> Result<PropertyValue> {
    let (Some(context), Some(dockerfile)) = (props.get_str(CONTEXT), props.get_str(DOCKERFILE))
    else {
        return Ok(PropertyValue::Computed);
    };

    let digest = buildcontext::hash_context(Path::new(context), Path::new(dockerfile))
        .with_context(|| format!("Failed to hash build context {context}"))?;
    log::debug!("Context digest of {context} ({dockerfile}): {digest}");
    Ok(PropertyValue::String(digest))
}

/// The state a successful build of `news` would record, minus `repoDigest`
pub fn desired_state(mut news: PropertyMap) -> Result<PropertyMap> {
    apply_defaults(&mut news);
    let digest = context_digest(&news)?;
    flatten_registry(&mut news);
    news.insert(CONTEXT_DIGEST, digest);
    Ok(news)
}

/// Compare recorded state with a new declaration without building anything
pub fn diff(olds: &PropertyMap, news: &PropertyMap) -> Result<DiffResponse> {
    let mut olds = olds.clone();
    olds.remove(REPO_DIGEST);
    let news = desired_state(news.clone())?;

    Ok(match olds.diff(&news) {
        Some(diff) => {
            log::debug!(
                "{} ({})",
                DiffSummary::from_diff(&diff),
                diff.changed_keys().join(", ")
            );
            DiffResponse::from_object_diff(&diff)
        }
        None => DiffResponse::none(),
    })
}

/// Report missing required inputs without touching the inputs themselves
pub fn check_inputs(news: &PropertyMap) -> Vec<CheckFailure> {
    let mut failures = Vec::new();
    if !news.contains_key(NAME) {
        failures.push(CheckFailure::new(NAME, "missing required property 'name'"));
    }
    match news.get(REGISTRY).filter(|r| !r.is_null()) {
        None => failures.push(CheckFailure::new(
            REGISTRY,
            "missing required property 'registry'",
        )),
        Some(PropertyValue::Object(registry)) if !registry.contains_key("server") => {
            failures.push(CheckFailure::new(
                "registry.server",
                "missing required property 'server'",
            ));
        }
        Some(_) => {}
    }
    failures
}

/// Typed view of a fully known declaration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageArgs {
    pub dockerfile: String,
    pub context: String,
    pub name: String,
    pub registry: Registry,
    pub platforms: Vec<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub args: Vec<BuildArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registry {
    pub server: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Registry {
    /// Login credentials; only when both username and password are given
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                server: self.server.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildArg {
    pub key: String,
    pub value: String,
}

impl ImageArgs {
    /// Read a declaration with defaults applied
    ///
    /// Unknown values are rejected: a build needs every input.
    pub fn from_properties(props: &PropertyMap) -> Result<Self> {
        if props.contains_computed() {
            return Err(ProviderError::InvalidProperties(
                "cannot build an image from inputs that are not known yet".into(),
            ));
        }
        serde_json::from_value(serde_json::Value::Object(props.to_json()))
            .map_err(|e| ProviderError::InvalidProperties(e.to_string()))
    }

    pub fn build_plan(&self) -> BuildPlan {
        BuildPlan {
            name: self.name.clone(),
            context: PathBuf::from(&self.context),
            dockerfile: PathBuf::from(&self.dockerfile),
            platforms: self.platforms.clone(),
            target: self.target.clone(),
            args: self
                .args
                .iter()
                .map(|arg| (arg.key.clone(), arg.value.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{DiffChanges, DiffKind};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn props(value: serde_json::Value) -> PropertyMap {
        PropertyMap::from_json(value).unwrap()
    }

    fn context_with_dockerfile() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        fs::write(dir.path().join("a.txt"), "hi").unwrap();
        dir
    }

    fn declaration(context: &Path) -> PropertyMap {
        props(json!({
            "name": "registry.example.com/app:1",
            "context": context.to_str().unwrap(),
            "registry": {
                "server": "registry.example.com",
                "username": "ci",
                "password": "s3cret"
            }
        }))
    }

    #[test]
    fn test_apply_defaults_fills_absent() {
        let mut map = props(json!({ "name": "app" }));
        apply_defaults(&mut map);
        assert_eq!(map.get_str(DOCKERFILE), Some("Dockerfile"));
        assert_eq!(map.get_str(CONTEXT), Some("."));
        assert_eq!(
            map.get(PLATFORMS),
            Some(&PropertyValue::from(vec![PropertyValue::from("linux/amd64")]))
        );
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let mut map = props(json!({ "platforms": [], "dockerfile": "build/Dockerfile" }));
        apply_defaults(&mut map);
        assert_eq!(map.get(PLATFORMS), Some(&PropertyValue::from(Vec::new())));
        assert_eq!(map.get_str(DOCKERFILE), Some("build/Dockerfile"));

        let once = map.clone();
        apply_defaults(&mut map);
        assert_eq!(map, once);
    }

    #[test]
    fn test_apply_defaults_treats_null_as_absent() {
        let mut map = PropertyMap::new();
        map.insert(PLATFORMS, PropertyValue::Null);
        apply_defaults(&mut map);
        assert!(map.get(PLATFORMS).and_then(PropertyValue::as_array).is_some());
    }

    #[test]
    fn test_flatten_registry_drops_credentials() {
        let mut map = props(json!({
            "registry": { "server": "r.io", "username": "u", "password": "p" }
        }));
        flatten_registry(&mut map);

        assert!(map.get(REGISTRY).is_none());
        assert_eq!(map.get_str(REGISTRY_SERVER), Some("r.io"));
        let text = serde_json::to_string(&map).unwrap();
        assert!(!text.contains("username"));
        assert!(!text.contains("password"));
    }

    #[test]
    fn test_flatten_registry_unknown() {
        let mut map = PropertyMap::new();
        map.insert(REGISTRY, PropertyValue::Computed);
        flatten_registry(&mut map);
        assert_eq!(map.get(REGISTRY_SERVER), Some(&PropertyValue::Computed));
    }

    #[test]
    fn test_context_digest_unknown_context() {
        let mut map = PropertyMap::new();
        map.insert(CONTEXT, PropertyValue::Computed);
        map.insert(DOCKERFILE, "Dockerfile");
        assert_eq!(context_digest(&map).unwrap(), PropertyValue::Computed);
    }

    #[test]
    fn test_context_digest_missing_context_is_error() {
        let mut map = PropertyMap::new();
        map.insert(CONTEXT, "/definitely/not/a/context");
        map.insert(DOCKERFILE, "Dockerfile");
        let err = context_digest(&map).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/a/context"));
    }

    #[test]
    fn test_desired_state() {
        let dir = context_with_dockerfile();
        let state = desired_state(declaration(dir.path())).unwrap();

        assert_eq!(state.get_str(REGISTRY_SERVER), Some("registry.example.com"));
        assert!(state.get(REGISTRY).is_none());
        let digest = state.get_str(CONTEXT_DIGEST).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(state.get(REPO_DIGEST).is_none());
    }

    #[test]
    fn test_diff_reproduced_state_is_unchanged() {
        let dir = context_with_dockerfile();
        let news = declaration(dir.path());
        let mut olds = desired_state(news.clone()).unwrap();
        olds.insert(REPO_DIGEST, "registry.example.com/app@sha256:abc");

        assert_eq!(diff(&olds, &news).unwrap().changes, DiffChanges::None);
        // and again, with nothing changed on disk
        assert_eq!(diff(&olds, &news).unwrap().changes, DiffChanges::None);
    }

    #[test]
    fn test_diff_detects_context_change() {
        let dir = context_with_dockerfile();
        let news = declaration(dir.path());
        let olds = desired_state(news.clone()).unwrap();

        fs::write(dir.path().join("a.txt"), "changed").unwrap();
        let response = diff(&olds, &news).unwrap();
        assert_eq!(response.changes, DiffChanges::Some);
        assert_eq!(response.diffs, vec![CONTEXT_DIGEST]);
        assert_eq!(response.detailed_diff[CONTEXT_DIGEST].kind, DiffKind::Update);
    }

    #[test]
    fn test_diff_classifies_fields() {
        let dir = context_with_dockerfile();
        let mut news = declaration(dir.path());
        news.insert(TARGET, "release");
        let mut olds = desired_state(declaration(dir.path())).unwrap();
        olds.insert("legacy", "gone");
        olds.insert(NAME, "registry.example.com/app:0");

        let response = diff(&olds, &news).unwrap();
        assert_eq!(response.detailed_diff[TARGET].kind, DiffKind::Add);
        assert_eq!(response.detailed_diff["legacy"].kind, DiffKind::Delete);
        assert_eq!(response.detailed_diff[NAME].kind, DiffKind::Update);
        assert!(!response.detailed_diff.contains_key(CONTEXT_DIGEST));
    }

    #[test]
    fn test_diff_credentials_do_not_matter() {
        let dir = context_with_dockerfile();
        let olds = desired_state(declaration(dir.path())).unwrap();
        let mut news = declaration(dir.path());
        news.insert(
            REGISTRY,
            props(json!({ "server": "registry.example.com", "password": "rotated" })),
        );
        assert_eq!(diff(&olds, &news).unwrap().changes, DiffChanges::None);
    }

    #[test]
    fn test_diff_unknown_input_is_update() {
        let dir = context_with_dockerfile();
        let olds = desired_state(declaration(dir.path())).unwrap();
        let mut news = declaration(dir.path());
        news.insert(CONTEXT, PropertyValue::Computed);

        let response = diff(&olds, &news).unwrap();
        assert_eq!(response.detailed_diff[CONTEXT].kind, DiffKind::Update);
        assert_eq!(response.detailed_diff[CONTEXT_DIGEST].kind, DiffKind::Update);
    }

    #[test]
    fn test_check_inputs() {
        assert!(check_inputs(&props(json!({ "name": "a", "registry": { "server": "r" } })))
            .is_empty());

        let failures = check_inputs(&props(json!({ "registry": {} })));
        let names: Vec<_> = failures.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(names, vec!["name", "registry.server"]);

        let failures = check_inputs(&PropertyMap::new());
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_image_args_from_properties() {
        let mut map = props(json!({
            "name": "app:1",
            "registry": { "server": "r.io", "username": "u", "password": "p" },
            "target": "release",
            "args": [{ "key": "A", "value": "1" }]
        }));
        apply_defaults(&mut map);
        let args = ImageArgs::from_properties(&map).unwrap();

        assert_eq!(args.platforms, vec!["linux/amd64"]);
        let plan = args.build_plan();
        assert_eq!(plan.args, vec![("A".to_string(), "1".to_string())]);
        assert_eq!(plan.target.as_deref(), Some("release"));
        assert_eq!(plan.dockerfile, PathBuf::from("Dockerfile"));

        let credentials = args.registry.credentials().unwrap();
        assert_eq!(credentials.username, "u");
    }

    #[test]
    fn test_credentials_need_username_and_password() {
        let registry = Registry {
            server: "r.io".into(),
            username: Some("u".into()),
            password: None,
        };
        assert!(registry.credentials().is_none());
    }

    #[test]
    fn test_image_args_rejects_unknowns() {
        let mut map = props(json!({ "name": "app", "registry": { "server": "r" } }));
        apply_defaults(&mut map);
        map.insert(TARGET, PropertyValue::Computed);
        assert!(matches!(
            ImageArgs::from_properties(&map),
            Err(ProviderError::InvalidProperties(_))
        ));
    }
}
