//! Local Plan Engine
//!
//! Records declarations in submission order without touching any cloud
//! API. Computed outputs (auto-generated names, hostnames) are synthesized
//! so that downstream declarations and exports can be previewed.

use super::declaration::{Input, Output, Resource, ResourceDeclaration, ResourceKind, Urn};
use super::Engine;
use crate::error::ProvisioningError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Length of the random suffix appended to auto-named resources
const AUTO_NAME_SUFFIX_LEN: usize = 7;

/// Length of the random hash in a gateway hostname
const HOSTNAME_HASH_LEN: usize = 8;

/// One accepted registration or declaration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub urn: Urn,
    #[serde(rename = "type")]
    pub type_token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Urn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Urn>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, Input>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Value>,
}

/// Everything the engine accepted during one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub stack: String,
    pub project: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<PlanStep>,
    pub exports: BTreeMap<String, Value>,
}

impl Plan {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Dry-run engine
///
/// `project` and `region` play the role of provider configuration: they
/// fill in outputs that a real provider would derive from its defaults.
pub struct PlanEngine {
    stack: String,
    project: String,
    region: String,
    created_at: DateTime<Utc>,
    /// URN -> type token of everything registered so far
    known: HashMap<Urn, String>,
    steps: Vec<PlanStep>,
    exports: BTreeMap<String, Value>,
}

impl PlanEngine {
    pub fn new(stack: &str, project: &str, region: &str) -> Self {
        Self {
            stack: stack.to_string(),
            project: project.to_string(),
            region: region.to_string(),
            created_at: Utc::now(),
            known: HashMap::new(),
            steps: Vec::new(),
            exports: BTreeMap::new(),
        }
    }

    /// Accepted steps, in submission order
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn exports(&self) -> &BTreeMap<String, Value> {
        &self.exports
    }

    pub fn into_plan(self) -> Plan {
        Plan {
            stack: self.stack,
            project: self.project,
            region: self.region,
            created_at: self.created_at,
            steps: self.steps,
            exports: self.exports,
        }
    }

    fn mint_urn(&self, type_token: &str, name: &str, parent: Option<&Urn>) -> Urn {
        let qualified = match parent.and_then(|p| self.known.get(p)) {
            Some(parent_type) => format!("{}${}", parent_type, type_token),
            None => type_token.to_string(),
        };
        Urn::new(format!("urn:fngate:{}::{}::{}", self.stack, qualified, name))
    }

    /// Check a declaration against what has been accepted so far
    fn check(
        &self,
        declaration: &ResourceDeclaration,
        urn: &Urn,
    ) -> Result<(), ProvisioningError> {
        if !self.known.contains_key(&declaration.parent) {
            return Err(ProvisioningError::UnknownParent(declaration.parent.to_string()));
        }

        for dep in declaration.dependencies() {
            if !self.known.contains_key(dep) {
                return Err(ProvisioningError::UnknownDependency {
                    name: declaration.name.clone(),
                    urn: dep.to_string(),
                });
            }
        }

        if self.known.contains_key(urn) {
            return Err(ProvisioningError::DuplicateResource(urn.to_string()));
        }

        for input in declaration.inputs.values() {
            if let Input::Archive(path) = input {
                if !path.is_dir() {
                    return Err(ProvisioningError::MissingArchive(path.clone()));
                }
            }
        }

        Ok(())
    }

    /// Outputs a provider would report for the declaration
    fn synthesize_outputs(&self, declaration: &ResourceDeclaration) -> Map<String, Value> {
        let mut out = Map::new();
        let input = |field: &str| {
            declaration
                .get(field)
                .and_then(|i| i.as_str())
                .unwrap_or_default()
                .to_string()
        };

        match declaration.kind {
            ResourceKind::Bucket => {
                let name = auto_name(&declaration.name);
                out.insert("id".into(), Value::String(name.clone()));
                out.insert("url".into(), Value::String(format!("gs://{}", name)));
                out.insert("location".into(), Value::String(input("location")));
                out.insert("name".into(), Value::String(name));
            }
            ResourceKind::BucketObject => {
                let name = auto_name(&declaration.name);
                let bucket = input("bucket");
                out.insert("id".into(), Value::String(format!("{}-{}", bucket, name)));
                out.insert("bucket".into(), Value::String(bucket));
                out.insert("name".into(), Value::String(name));
            }
            ResourceKind::Function => {
                let name = input("name");
                out.insert(
                    "id".into(),
                    Value::String(format!(
                        "projects/{}/locations/{}/functions/{}",
                        self.project, self.region, name
                    )),
                );
                out.insert(
                    "httpsTriggerUrl".into(),
                    Value::String(format!(
                        "https://{}-{}.cloudfunctions.net/{}",
                        self.region, self.project, name
                    )),
                );
                out.insert("project".into(), Value::String(self.project.clone()));
                out.insert("region".into(), Value::String(self.region.clone()));
                out.insert("name".into(), Value::String(name));
            }
            ResourceKind::FunctionIamMember => {
                let id = format!(
                    "projects/{}/locations/{}/functions/{}/{}/{}",
                    input("project"),
                    self.region,
                    input("cloudFunction"),
                    input("role"),
                    input("member")
                );
                out.insert("id".into(), Value::String(id));
                out.insert("etag".into(), Value::String(random_hex(12)));
            }
            ResourceKind::Api => {
                let api_id = input("apiId");
                out.insert(
                    "id".into(),
                    Value::String(format!(
                        "projects/{}/locations/global/apis/{}",
                        self.project, api_id
                    )),
                );
                out.insert("apiId".into(), Value::String(api_id));
            }
            ResourceKind::ApiConfig => {
                let config_id = input("apiConfigId");
                out.insert(
                    "id".into(),
                    Value::String(format!(
                        "projects/{}/locations/global/apis/{}/configs/{}",
                        self.project,
                        input("api"),
                        config_id
                    )),
                );
                out.insert("apiConfigId".into(), Value::String(config_id));
            }
            ResourceKind::Gateway => {
                let gateway_id = input("gatewayId");
                out.insert(
                    "id".into(),
                    Value::String(format!(
                        "projects/{}/locations/{}/gateways/{}",
                        self.project, self.region, gateway_id
                    )),
                );
                out.insert(
                    "defaultHostname".into(),
                    Value::String(format!(
                        "{}-{}.{}.gateway.dev",
                        gateway_id,
                        random_hex(HOSTNAME_HASH_LEN),
                        self.region
                    )),
                );
                out.insert("gatewayId".into(), Value::String(gateway_id));
            }
        }

        out
    }
}

#[async_trait]
impl Engine for PlanEngine {
    async fn register_component(
        &mut self,
        type_token: &str,
        name: &str,
    ) -> Result<Urn, ProvisioningError> {
        let urn = self.mint_urn(type_token, name, None);
        if self.known.contains_key(&urn) {
            return Err(ProvisioningError::DuplicateResource(urn.to_string()));
        }

        tracing::info!("Registered component {}", urn);

        self.known.insert(urn.clone(), type_token.to_string());
        self.steps.push(PlanStep {
            urn: urn.clone(),
            type_token: type_token.to_string(),
            name: name.to_string(),
            parent: None,
            depends_on: Vec::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        });

        Ok(urn)
    }

    async fn declare(
        &mut self,
        declaration: ResourceDeclaration,
    ) -> Result<Resource, ProvisioningError> {
        let type_token = declaration.kind.type_token();
        let urn = self.mint_urn(type_token, &declaration.name, Some(&declaration.parent));

        self.check(&declaration, &urn)?;

        let outputs: BTreeMap<String, Value> =
            self.synthesize_outputs(&declaration).into_iter().collect();
        let depends_on: Vec<Urn> = declaration.dependencies().into_iter().cloned().collect();

        tracing::info!("Declared {} ({} dependencies)", urn, depends_on.len());
        tracing::debug!("Inputs for {}: {:?}", declaration.name, declaration.inputs.keys());

        self.known.insert(urn.clone(), type_token.to_string());
        self.steps.push(PlanStep {
            urn: urn.clone(),
            type_token: type_token.to_string(),
            name: declaration.name.clone(),
            parent: Some(declaration.parent),
            depends_on,
            inputs: declaration.inputs,
            outputs: outputs.clone(),
        });

        Ok(Resource {
            urn,
            kind: declaration.kind,
            name: declaration.name,
            outputs,
        })
    }

    async fn export(&mut self, name: &str, value: &Output) -> Result<(), ProvisioningError> {
        if !self.known.contains_key(&value.urn) {
            return Err(ProvisioningError::Export {
                name: name.to_string(),
                reason: format!("unknown resource {}", value.urn),
            });
        }

        tracing::info!("Exported {} = {}", name, value.value);
        self.exports.insert(name.to_string(), value.value.clone());
        Ok(())
    }
}

/// `<name>-<random hex>`, the way providers auto-name resources
fn auto_name(name: &str) -> String {
    format!("{}-{}", name, random_hex(AUTO_NAME_SUFFIX_LEN))
}

fn random_hex(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_length() {
        let hex = random_hex(HOSTNAME_HASH_LEN);
        assert_eq!(hex.len(), HOSTNAME_HASH_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_auto_name_keeps_logical_prefix() {
        let name = auto_name("bucket");
        assert!(name.starts_with("bucket-"));
        assert_eq!(name.len(), "bucket-".len() + AUTO_NAME_SUFFIX_LEN);
    }

    #[tokio::test]
    async fn test_child_urn_is_qualified_by_parent_type() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let parent = engine
            .register_component("fngate:gcp:Service", "svc")
            .await
            .unwrap();
        assert_eq!(parent.to_string(), "urn:fngate:dev::fngate:gcp:Service::svc");

        let api = engine
            .declare(
                ResourceDeclaration::new(ResourceKind::Api, "api", &parent).input("apiId", "api"),
            )
            .await
            .unwrap();
        assert_eq!(
            api.urn.to_string(),
            "urn:fngate:dev::fngate:gcp:Service$gcp:apigateway/api:Api::api"
        );
        assert_eq!(api.outputs["apiId"], "api");
    }

    #[tokio::test]
    async fn test_rejects_unknown_parent() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let orphan = Urn::new("urn:fngate:dev::fngate:gcp:Service::ghost");
        let err = engine
            .declare(ResourceDeclaration::new(ResourceKind::Bucket, "bucket", &orphan))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::UnknownParent(_)));
        assert!(engine.steps().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_forward_reference() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let parent = engine
            .register_component("fngate:gcp:Service", "svc")
            .await
            .unwrap();
        let phantom = Output {
            urn: Urn::new("urn:fngate:dev::gcp:storage/bucket:Bucket::later"),
            field: "name".to_string(),
            value: Value::String("later".to_string()),
        };
        let err = engine
            .declare(
                ResourceDeclaration::new(ResourceKind::BucketObject, "obj", &parent)
                    .input("bucket", phantom),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::UnknownDependency { .. }));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_declaration() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let parent = engine
            .register_component("fngate:gcp:Service", "svc")
            .await
            .unwrap();
        let decl = ResourceDeclaration::new(ResourceKind::Bucket, "bucket", &parent)
            .input("location", "EU");
        engine.declare(decl.clone()).await.unwrap();
        let err = engine.declare(decl).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::DuplicateResource(_)));
    }

    #[tokio::test]
    async fn test_rejects_missing_archive_directory() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let parent = engine
            .register_component("fngate:gcp:Service", "svc")
            .await
            .unwrap();
        let err = engine
            .declare(
                ResourceDeclaration::new(ResourceKind::BucketObject, "go-zip", &parent)
                    .input("source", Input::Archive("/nonexistent/source".into())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::MissingArchive(_)));
    }

    #[tokio::test]
    async fn test_export_requires_known_resource() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let stray = Output {
            urn: Urn::new("urn:fngate:dev::gcp:apigateway/gateway:Gateway::gateway"),
            field: "defaultHostname".to_string(),
            value: Value::String("x.gateway.dev".to_string()),
        };
        let err = engine.export("url", &stray).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Export { .. }));
        assert!(engine.exports().is_empty());
    }

    #[tokio::test]
    async fn test_plan_serializes_to_json_and_yaml() {
        let mut engine = PlanEngine::new("dev", "proj", "europe-west2");
        let parent = engine
            .register_component("fngate:gcp:Service", "svc")
            .await
            .unwrap();
        engine
            .declare(
                ResourceDeclaration::new(ResourceKind::Bucket, "bucket", &parent)
                    .input("location", "EU"),
            )
            .await
            .unwrap();

        let plan = engine.into_plan();
        let json: Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["steps"][1]["type"], "gcp:storage/bucket:Bucket");
        assert_eq!(json["steps"][1]["inputs"]["location"]["value"], "EU");

        let yaml = plan.to_yaml().unwrap();
        assert!(yaml.contains("stack: dev"));
    }
}
