//! Resource provider lifecycle
//!
//! A provider is driven by the orchestrator through a fixed set of calls.
//! Planning calls (`check`, `diff`, and `create`/`update` with `preview`
//! set) must never change anything outside the process; apply calls do
//! the real work.

use crate::error::{ProviderError, Result};
use crate::types::{
    CallRequest, CallResponse, CheckRequest, CheckResponse, ConfigureRequest, ConfigureResponse,
    ConstructRequest, ConstructResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, DiffResponse, GetSchemaRequest, GetSchemaResponse, InvokeRequest, InvokeResponse,
    PluginInfo, ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};

/// Core trait for resource providers
///
/// Every method may be called concurrently with any other, including
/// several calls of the same method for different resources.
///
/// # Example
///
/// ```ignore
/// use declarative::{
///     CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest, DiffRequest,
///     DiffResponse, PluginInfo, ReadRequest, ReadResponse, ResourceProvider, Result,
///     UpdateRequest, UpdateResponse,
/// };
///
/// struct Echo;
///
/// impl ResourceProvider for Echo {
///     fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
///         Ok(CheckResponse { inputs: req.news, failures: Vec::new() })
///     }
///
///     fn diff(&self, req: DiffRequest) -> Result<DiffResponse> {
///         Ok(req.olds.diff(&req.news).map_or_else(DiffResponse::none, |d| {
///             DiffResponse::from_object_diff(&d)
///         }))
///     }
///
///     fn create(&self, req: CreateRequest) -> Result<CreateResponse> {
///         Ok(CreateResponse { id: req.urn.name().to_string(), properties: req.properties })
///     }
///
///     fn read(&self, req: ReadRequest) -> Result<ReadResponse> {
///         Ok(ReadResponse { id: req.id, properties: req.properties, inputs: req.inputs })
///     }
///
///     fn update(&self, req: UpdateRequest) -> Result<UpdateResponse> {
///         Ok(UpdateResponse { properties: req.news })
///     }
///
///     fn delete(&self, _req: DeleteRequest) -> Result<()> {
///         Ok(())
///     }
///
///     fn get_plugin_info(&self) -> Result<PluginInfo> {
///         Ok(PluginInfo { version: "0.1.0".into() })
///     }
/// }
/// ```
pub trait ResourceProvider: Send + Sync {
    /// Validate provider configuration
    ///
    /// Default accepts the new configuration as given.
    fn check_config(&self, req: CheckRequest) -> Result<CheckResponse> {
        Ok(CheckResponse {
            inputs: req.news,
            failures: Vec::new(),
        })
    }

    /// Diff provider configuration
    ///
    /// Default leaves the decision to the orchestrator.
    fn diff_config(&self, _req: DiffRequest) -> Result<DiffResponse> {
        Ok(DiffResponse::default())
    }

    /// Apply provider configuration and report capabilities
    fn configure(&self, _req: ConfigureRequest) -> Result<ConfigureResponse> {
        Ok(ConfigureResponse::default())
    }

    /// Call a provider function
    fn invoke(&self, req: InvokeRequest) -> Result<InvokeResponse> {
        Err(ProviderError::UnknownInvokeToken(req.tok))
    }

    /// Call a provider function that streams several results
    fn stream_invoke(&self, req: InvokeRequest) -> Result<Vec<InvokeResponse>> {
        Err(ProviderError::UnknownInvokeToken(req.tok))
    }

    /// Validate resource inputs
    fn check(&self, req: CheckRequest) -> Result<CheckResponse>;

    /// Compare recorded state with new inputs; must not change anything
    fn diff(&self, req: DiffRequest) -> Result<DiffResponse>;

    /// Bring a new resource into existence
    fn create(&self, req: CreateRequest) -> Result<CreateResponse>;

    /// Refresh recorded state
    fn read(&self, req: ReadRequest) -> Result<ReadResponse>;

    /// Replace the state of an existing resource
    fn update(&self, req: UpdateRequest) -> Result<UpdateResponse>;

    /// Tear a resource down
    fn delete(&self, req: DeleteRequest) -> Result<()>;

    /// Construct a component resource
    fn construct(&self, _req: ConstructRequest) -> Result<ConstructResponse> {
        Err(ProviderError::Unimplemented("Construct"))
    }

    /// Call a method on a component resource
    fn call(&self, _req: CallRequest) -> Result<CallResponse> {
        Err(ProviderError::Unimplemented("Call"))
    }

    /// Abort outstanding work before shutdown
    fn cancel(&self) -> Result<()> {
        Ok(())
    }

    /// Version information for the plugin
    fn get_plugin_info(&self) -> Result<PluginInfo>;

    /// Package schema; empty when published out-of-band
    fn get_schema(&self, _req: GetSchemaRequest) -> Result<GetSchemaResponse> {
        Ok(GetSchemaResponse::default())
    }
}
