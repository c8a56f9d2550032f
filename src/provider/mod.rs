//! Provider lifecycle for `docker-buildkit:index:Image`

pub mod image;

use crate::build::{self, BuildTool};
use declarative::{
    CheckRequest, CheckResponse, ConfigureRequest, ConfigureResponse, CreateRequest,
    CreateResponse, DeleteRequest, DiffRequest, DiffResponse, HostLogger, PluginInfo,
    PropertyMap, PropertyValue, ProviderError, ReadRequest, ReadResponse, ResourceProvider,
    Result, UpdateRequest, UpdateResponse, Urn,
};
use image::{ImageArgs, NAME, REPO_DIGEST, RESOURCE_TYPE};
use std::sync::{Arc, Mutex};

/// Version reported to the orchestrator, injected at build time when set
pub const VERSION: &str = match option_env!("PROVIDER_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

pub struct DockerBuildkitProvider {
    host: Arc<dyn HostLogger>,
    tool: Box<dyn BuildTool>,
    /// Serialises registry logins across concurrent requests
    login_lock: Mutex<()>,
    version: String,
}

impl DockerBuildkitProvider {
    pub fn new(host: Arc<dyn HostLogger>, tool: Box<dyn BuildTool>) -> Self {
        Self {
            host,
            tool,
            login_lock: Mutex::new(()),
            version: VERSION.to_string(),
        }
    }

    fn check_type(urn: &Urn) -> Result<()> {
        match urn.resource_type() {
            RESOURCE_TYPE => Ok(()),
            other => Err(ProviderError::UnknownResourceType(other.to_string())),
        }
    }

    /// State to report during planning: nothing is built, so the pushed
    /// digest stays unknown
    fn preview_state(news: PropertyMap) -> Result<PropertyMap> {
        let mut state = image::desired_state(news)?;
        state.insert(REPO_DIGEST, PropertyValue::Computed);
        Ok(state)
    }

    /// Build and push `news`, returning the full new state
    fn build(&self, urn: &Urn, news: PropertyMap) -> Result<PropertyMap> {
        let mut inputs = news.clone();
        image::apply_defaults(&mut inputs);
        let args = ImageArgs::from_properties(&inputs)?;

        let mut state = image::desired_state(news)?;
        let credentials = args.registry.credentials();
        if credentials.is_none()
            && (args.registry.username.is_some() || args.registry.password.is_some())
        {
            self.host.warning(
                urn,
                &format!(
                    "Skipping login to {}: both username and password are required",
                    args.registry.server
                ),
            );
        }
        let repo_digest = build::build_and_push(
            self.tool.as_ref(),
            &self.login_lock,
            &args.build_plan(),
            credentials.as_ref(),
            &|line| self.host.info(urn, line),
        )
        .map_err(anyhow::Error::new)?;

        state.insert(REPO_DIGEST, repo_digest);
        Ok(state)
    }
}

impl ResourceProvider for DockerBuildkitProvider {
    fn configure(&self, _req: ConfigureRequest) -> Result<ConfigureResponse> {
        Ok(ConfigureResponse {
            accept_secrets: false,
            supports_preview: false,
            accept_resources: false,
        })
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        Self::check_type(&req.urn)?;
        let failures = image::check_inputs(&req.news);
        Ok(CheckResponse {
            inputs: req.news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResponse> {
        Self::check_type(&req.urn)?;
        image::diff(&req.olds, &req.news)
    }

    fn create(&self, req: CreateRequest) -> Result<CreateResponse> {
        Self::check_type(&req.urn)?;
        let id = req.properties.get_str(NAME).unwrap_or_default().to_string();
        let properties = if req.preview {
            Self::preview_state(req.properties)?
        } else {
            self.build(&req.urn, req.properties)?
        };
        Ok(CreateResponse { id, properties })
    }

    fn read(&self, req: ReadRequest) -> Result<ReadResponse> {
        Self::check_type(&req.urn)?;
        Ok(ReadResponse {
            id: req.id,
            properties: req.properties,
            inputs: req.inputs,
        })
    }

    fn update(&self, req: UpdateRequest) -> Result<UpdateResponse> {
        Self::check_type(&req.urn)?;
        let properties = if req.preview {
            Self::preview_state(req.news)?
        } else {
            self.build(&req.urn, req.news)?
        };
        Ok(UpdateResponse { properties })
    }

    fn delete(&self, req: DeleteRequest) -> Result<()> {
        Self::check_type(&req.urn)?;
        // Pushed images cannot be deleted from here
        log::debug!("Leaving {} in place", req.id);
        Ok(())
    }

    fn get_plugin_info(&self) -> Result<PluginInfo> {
        Ok(PluginInfo {
            version: self.version.clone(),
        })
    }
}
