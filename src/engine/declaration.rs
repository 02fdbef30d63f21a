//! Resource declarations
//!
//! A declaration is a description of a desired remote resource: its kind,
//! logical name, parent handle and input fields. Inputs may reference
//! outputs of resources declared earlier, which is how ordering
//! dependencies are expressed.

use crate::error::ProvisioningError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Unique resource name minted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(urn: impl Into<String>) -> Self {
        Self(urn.into())
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource kinds this crate declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Bucket,
    BucketObject,
    Function,
    FunctionIamMember,
    Api,
    ApiConfig,
    Gateway,
}

impl ResourceKind {
    /// Provider type token
    pub fn type_token(&self) -> &'static str {
        match self {
            Self::Bucket => "gcp:storage/bucket:Bucket",
            Self::BucketObject => "gcp:storage/bucketObject:BucketObject",
            Self::Function => "gcp:cloudfunctions/function:Function",
            Self::FunctionIamMember => "gcp:cloudfunctions/functionIamMember:FunctionIamMember",
            Self::Api => "gcp:apigateway/api:Api",
            Self::ApiConfig => "gcp:apigateway/apiConfig:ApiConfig",
            Self::Gateway => "gcp:apigateway/gateway:Gateway",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_token())
    }
}

/// Reference to an output field of an accepted declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub urn: Urn,
    pub field: String,
    /// Value reported by the engine
    pub value: Value,
}

/// Value of one input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Input {
    /// Literal value
    Value(Value),
    /// Output of an earlier declaration
    Output(Output),
    /// Directory to be archived by the engine
    Archive(PathBuf),
}

impl Input {
    /// Resolved JSON value, if the input has one
    pub fn resolved(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Output(o) => Some(&o.value),
            Self::Archive(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.resolved().and_then(|v| v.as_str())
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<u32> for Input {
    fn from(value: u32) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Output> for Input {
    fn from(value: Output) -> Self {
        Self::Output(value)
    }
}

/// Description of a desired resource, handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    pub kind: ResourceKind,
    pub name: String,
    pub parent: Urn,
    pub inputs: BTreeMap<String, Input>,
}

impl ResourceDeclaration {
    pub fn new(kind: ResourceKind, name: impl Into<String>, parent: &Urn) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: parent.clone(),
            inputs: BTreeMap::new(),
        }
    }

    /// Set an input field
    pub fn input(mut self, field: &str, value: impl Into<Input>) -> Self {
        self.inputs.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Input> {
        self.inputs.get(field)
    }

    /// URNs of every resource whose outputs this declaration consumes
    pub fn dependencies(&self) -> Vec<&Urn> {
        let mut deps: Vec<&Urn> = self
            .inputs
            .values()
            .filter_map(|input| match input {
                Input::Output(o) => Some(&o.urn),
                _ => None,
            })
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }
}

/// Resource accepted by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub urn: Urn,
    pub kind: ResourceKind,
    pub name: String,
    pub outputs: BTreeMap<String, Value>,
}

impl Resource {
    /// Reference an output field for use as another declaration's input
    pub fn output(&self, field: &str) -> Result<Output, ProvisioningError> {
        let value = self
            .outputs
            .get(field)
            .cloned()
            .ok_or_else(|| ProvisioningError::MissingOutput {
                name: self.name.clone(),
                field: field.to_string(),
            })?;

        Ok(Output {
            urn: self.urn.clone(),
            field: field.to_string(),
            value,
        })
    }
}
