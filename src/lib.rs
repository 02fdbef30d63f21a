//! fngate
//!
//! Declares a GCP deployment topology (storage bucket, HTTP Cloud Function,
//! public invoker binding, API Gateway) against a provisioning engine.
//!
//! - [`render`] - OpenAPI template rendering and encoding
//! - [`topology`] - The service topology builder
//! - [`engine`] - Engine boundary and the local plan engine
//! - [`config`] - Compiled-in deployment settings
//! - [`error`] - Validation and provisioning errors

pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod topology;

pub use error::{Error, ProvisioningError, Result, ValidationError};
pub use topology::{build, Service, ServiceArgs};
