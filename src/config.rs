//! Deployment Configuration
//!
//! Compiled-in settings for one fngate run. Nothing is read from the
//! environment or persisted between runs.

use crate::topology::{ServiceArgs, DEFAULT_TEMPLATE};

pub const DEFAULT_NAME: &str = "myService";
pub const DEFAULT_PROJECT: &str = "project";
pub const DEFAULT_REGION: &str = "europe-west2";
pub const DEFAULT_SOURCE_PATH: &str = "pkg/helloworld";
pub const DEFAULT_STACK: &str = "dev";

/// Settings for a single topology build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Component name for the service
    pub name: String,
    /// Stack name used in resource URNs
    pub stack: String,
    pub service: ServiceArgs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            stack: DEFAULT_STACK.to_string(),
            service: ServiceArgs::new(DEFAULT_PROJECT, DEFAULT_REGION, DEFAULT_SOURCE_PATH)
                .with_template(DEFAULT_TEMPLATE),
        }
    }
}

impl Config {
    pub fn new(name: &str, stack: &str, service: ServiceArgs) -> Self {
        Self {
            name: name.to_string(),
            stack: stack.to_string(),
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_literals() {
        let config = Config::default();
        assert_eq!(config.name, "myService");
        assert_eq!(config.stack, "dev");
        assert_eq!(config.service.project, "project");
        assert_eq!(config.service.region, "europe-west2");
        assert_eq!(config.service.path, PathBuf::from("pkg/helloworld"));
        assert_eq!(config.service.template, PathBuf::from("openapi.yaml"));
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert_eq!(Config::default().service.validate(), Ok(()));
    }
}
