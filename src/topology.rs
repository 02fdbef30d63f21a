//! Service topology
//!
//! Declares an HTTP Cloud Function fronted by API Gateway:
//! bucket -> source object -> function -> public invoker binding -> API ->
//! API config (rendered OpenAPI document) -> gateway.

use crate::engine::{Engine, Input, Output, Resource, ResourceDeclaration, ResourceKind, Urn};
use crate::error::{Result, ValidationError};
use crate::render::{render, RenderRequest};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Component type token for the service handle
pub const SERVICE_TYPE: &str = "fngate:gcp:Service";

/// Name of the stack output carrying the gateway hostname
pub const URL_EXPORT: &str = "url";

/// Default OpenAPI template, relative to the working directory
pub const DEFAULT_TEMPLATE: &str = "openapi.yaml";

const BUCKET_LOCATION: &str = "EU";
const FUNCTION_NAME: &str = "function";
const FUNCTION_RUNTIME: &str = "go116";
const FUNCTION_ENTRY_POINT: &str = "Handler";
const FUNCTION_MEMORY_MB: u32 = 128;
const INVOKER_ROLE: &str = "roles/cloudfunctions.invoker";
/// Unauthenticated callers may invoke the function
const INVOKER_MEMBER: &str = "allUsers";
const API_ID: &str = "api";
const API_CONFIG_ID: &str = "cfg";
const OPENAPI_DOCUMENT_PATH: &str = "openapi.yaml";
const GATEWAY_ID: &str = "gateway";

/// Arguments for [`build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceArgs {
    pub project: String,
    pub region: String,
    /// Directory containing the function source code, e.g. `pkg/helloworld`
    pub path: PathBuf,
    /// OpenAPI template rendered into the API config
    pub template: PathBuf,
}

impl ServiceArgs {
    pub fn new(project: &str, region: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            project: project.to_string(),
            region: region.to_string(),
            path: path.into(),
            template: PathBuf::from(DEFAULT_TEMPLATE),
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = template.into();
        self
    }

    /// Check required fields in order: project, region, path
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.project.is_empty() {
            return Err(ValidationError::MissingProject);
        }
        if self.region.is_empty() {
            return Err(ValidationError::MissingRegion);
        }
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::MissingPath);
        }
        Ok(())
    }
}

/// Handle for one built topology
#[derive(Debug, Clone)]
pub struct Service {
    pub urn: Urn,
    pub name: String,
    /// Child resources in declaration order
    pub resources: Vec<Resource>,
    pub exports: BTreeMap<String, Value>,
}

impl Service {
    /// Gateway default hostname
    pub fn url(&self) -> Option<&str> {
        self.exports.get(URL_EXPORT).and_then(|v| v.as_str())
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&Resource> {
        self.resources.iter().find(|r| r.kind == kind)
    }
}

/// Declare the service topology.
///
/// Validation failures are returned before the engine is called. Any later
/// failure is a provisioning error; resources already declared are left to
/// the engine.
pub async fn build<E: Engine + ?Sized>(
    engine: &mut E,
    name: &str,
    args: &ServiceArgs,
) -> Result<Service> {
    args.validate()?;

    let urn = engine.register_component(SERVICE_TYPE, name).await?;
    tracing::info!(
        "Building {} [project: {}, region: {}]",
        name,
        args.project,
        args.region
    );

    let mut resources = Vec::with_capacity(7);

    let bucket = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::Bucket, "bucket", &urn)
                .input("location", BUCKET_LOCATION),
        )
        .await?;
    resources.push(bucket.clone());

    let object = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::BucketObject, "go-zip", &urn)
                .input("bucket", bucket.output("name")?)
                .input("source", Input::Archive(args.path.clone())),
        )
        .await?;
    resources.push(object.clone());

    let function = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::Function, "function", &urn)
                .input("name", FUNCTION_NAME)
                .input("sourceArchiveBucket", bucket.output("name")?)
                .input("sourceArchiveObject", object.output("name")?)
                .input("runtime", FUNCTION_RUNTIME)
                .input("entryPoint", FUNCTION_ENTRY_POINT)
                .input("triggerHttp", true)
                .input("availableMemoryMb", FUNCTION_MEMORY_MB),
        )
        .await?;
    resources.push(function.clone());

    let invoker = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::FunctionIamMember, "invoker", &urn)
                .input("project", function.output("project")?)
                .input("cloudFunction", function.output("name")?)
                .input("role", INVOKER_ROLE)
                .input("member", INVOKER_MEMBER),
        )
        .await?;
    resources.push(invoker);

    let api = engine
        .declare(ResourceDeclaration::new(ResourceKind::Api, "api", &urn).input("apiId", API_ID))
        .await?;
    resources.push(api.clone());

    let document = render(&RenderRequest {
        source_path: args.template.clone(),
        project: args.project.clone(),
        region: args.region.clone(),
        function_name: FUNCTION_NAME.to_string(),
    })?;

    let api_config = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::ApiConfig, "apiConfig", &urn)
                .input("api", api.output("apiId")?)
                .input("apiConfigId", API_CONFIG_ID)
                .input(
                    "openapiDocuments",
                    json!([{
                        "document": {
                            "path": OPENAPI_DOCUMENT_PATH,
                            "contents": document.into_string(),
                        }
                    }]),
                ),
        )
        .await?;
    resources.push(api_config.clone());

    let gateway = engine
        .declare(
            ResourceDeclaration::new(ResourceKind::Gateway, "gateway", &urn)
                .input("apiConfig", api_config.output("id")?)
                .input("gatewayId", GATEWAY_ID),
        )
        .await?;
    resources.push(gateway.clone());

    let hostname: Output = gateway.output("defaultHostname")?;
    engine.export(URL_EXPORT, &hostname).await?;

    let mut exports = BTreeMap::new();
    exports.insert(URL_EXPORT.to_string(), hostname.value);

    Ok(Service {
        urn,
        name: name.to_string(),
        resources,
        exports,
    })
}
