//! Provisioning engine boundary
//!
//! The topology builder never talks to a cloud API. It hands resource
//! declarations to an [`Engine`], which decides what actually happens to
//! them and reports back the resolved output fields.
//!
//! # Module Structure
//!
//! - [`declaration`] - Resource kinds, inputs, outputs and declarations
//! - [`plan`] - Local dry-run engine that records declarations into a plan
//!
//! # Example
//!
//! ```ignore
//! use fngate::engine::PlanEngine;
//! use fngate::topology::{build, ServiceArgs};
//!
//! async fn example() -> fngate::error::Result<()> {
//!     let mut engine = PlanEngine::new("dev", "my-project", "europe-west2");
//!     let args = ServiceArgs::new("my-project", "europe-west2", "pkg/helloworld");
//!     let service = build(&mut engine, "myService", &args).await?;
//!     println!("{:?}", service.url());
//!     Ok(())
//! }
//! ```

pub mod declaration;
pub mod plan;

pub use declaration::{Input, Output, Resource, ResourceDeclaration, ResourceKind, Urn};
pub use plan::{Plan, PlanEngine, PlanStep};

use crate::error::ProvisioningError;
use async_trait::async_trait;

/// Capabilities the topology builder needs from a provisioning engine.
///
/// Calls are issued one at a time; each is awaited before the next.
#[async_trait]
pub trait Engine: Send {
    /// Register a component handle that later declarations use as parent
    async fn register_component(
        &mut self,
        type_token: &str,
        name: &str,
    ) -> Result<Urn, ProvisioningError>;

    /// Submit one resource declaration and receive its resolved outputs
    async fn declare(
        &mut self,
        declaration: ResourceDeclaration,
    ) -> Result<Resource, ProvisioningError>;

    /// Publish a named stack output
    async fn export(&mut self, name: &str, value: &Output) -> Result<(), ProvisioningError>;
}
