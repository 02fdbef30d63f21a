//! OpenAPI document rendering
//!
//! Loads a Handlebars template from disk, fills in the service parameters
//! and base64-encodes the result so it can travel as a plain string field
//! of an API config declaration.

use crate::error::ProvisioningError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;

const TEMPLATE_NAME: &str = "document";

/// Parameters for one render call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Template file; also exposed to the template as `Path`
    pub source_path: PathBuf,
    pub project: String,
    pub region: String,
    pub function_name: String,
}

/// Names seen by the template: `{{Path}}`, `{{Project}}`, `{{Region}}`,
/// `{{FunctionName}}`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateParams<'a> {
    path: &'a str,
    project: &'a str,
    region: &'a str,
    function_name: &'a str,
}

/// Base64 (standard alphabet, unwrapped) encoding of a rendered template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    fn from_rendered(rendered: &str) -> Self {
        Self(STANDARD.encode(rendered.as_bytes()))
    }

    /// The encoded form, as embedded in a declaration
    pub fn into_string(self) -> String {
        self.0
    }

    /// Recover the rendered template bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.0)
    }
}

/// Render the template named by `request.source_path`.
///
/// Unknown placeholders fail in strict mode; substituted values are written
/// verbatim (no HTML escaping).
pub fn render(request: &RenderRequest) -> Result<RenderedDocument, ProvisioningError> {
    let template = std::fs::read_to_string(&request.source_path).map_err(|source| {
        ProvisioningError::TemplateRead {
            path: request.source_path.clone(),
            source,
        }
    })?;

    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string(TEMPLATE_NAME, &template)
        .map_err(|e| ProvisioningError::TemplateParse {
            path: request.source_path.clone(),
            reason: e.to_string(),
        })?;

    let path = request.source_path.to_string_lossy();
    let params = TemplateParams {
        path: &path,
        project: &request.project,
        region: &request.region,
        function_name: &request.function_name,
    };

    let rendered = registry
        .render(TEMPLATE_NAME, &params)
        .map_err(|e| ProvisioningError::TemplateRender {
            path: request.source_path.clone(),
            reason: e.to_string(),
        })?;

    tracing::debug!(
        "Rendered {} ({} bytes)",
        request.source_path.display(),
        rendered.len()
    );

    Ok(RenderedDocument::from_rendered(&rendered))
}
