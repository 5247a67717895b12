//! Service descriptors
//!
//! `ServiceSpec` is what dependency validation needs to know about a root
//! service. `ServiceFile` is the user-supplied definition a service is
//! published from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExchangeError, Result};
use crate::exchange::{service_identity, ServiceDependency, ServiceType, UserInput};

// == Service Spec ==
/// Descriptor of a service whose dependencies can be validated.
pub trait ServiceSpec {
    fn org(&self) -> &str;
    fn url(&self) -> &str;
    fn version(&self) -> &str;
    fn arch(&self) -> &str;
    fn service_type(&self) -> ServiceType;
    fn required_services(&self) -> &[ServiceDependency];
    fn user_inputs(&self) -> &[UserInput];

    /// `org/url_version_arch`
    fn identity(&self) -> String {
        service_identity(self.org(), self.url(), self.version(), self.arch())
    }

    /// True when some named user input has no default value.
    fn needs_user_input(&self) -> bool {
        self.user_inputs()
            .iter()
            .any(|ui| !ui.name.is_empty() && ui.default_value.is_empty())
    }
}

// == Service File ==
/// A service definition as written by its publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceFile {
    pub org: String,
    pub label: String,
    pub description: String,
    pub public: bool,
    pub documentation: String,
    pub url: String,
    pub version: String,
    pub arch: String,
    pub sharable: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub match_hardware: Value,
    pub required_services: Vec<ServiceDependency>,
    pub user_input: Vec<UserInput>,
    pub deployment: Value,
    pub deployment_signature: String,
    pub cluster_deployment: Value,
    pub cluster_deployment_signature: String,
}

impl ServiceFile {
    /// Type of the named user input, if this service declares it.
    pub fn defines_variable(&self, name: &str) -> Option<&str> {
        self.user_input
            .iter()
            .find(|ui| ui.name == name && !ui.input_type.is_empty())
            .map(|ui| ui.input_type.as_str())
    }

    pub fn has_dependencies(&self) -> bool {
        !self.required_services.is_empty()
    }

    /// True when this service is one of `deps`.
    pub fn is_dependent(&self, deps: &[ServiceDependency]) -> bool {
        deps.iter()
            .any(|dep| dep.url == self.url && dep.org == self.org)
    }

    /// Checks that every user input without a default is among `set_names`.
    pub fn required_variables_are_set(&self, set_names: &[&str]) -> Result<()> {
        match self
            .user_input
            .iter()
            .find(|ui| !ui.name.is_empty() && ui.default_value.is_empty() && !set_names.contains(&ui.name.as_str()))
        {
            Some(ui) => Err(ExchangeError::UnsetUserInput(ui.name.clone())),
            None => Ok(()),
        }
    }

    /// Copies the legacy `version` field into an empty `versionRange`.
    pub fn support_version_range(&mut self) {
        for dep in &mut self.required_services {
            if dep.version_range.is_empty() {
                dep.version_range = dep.version.clone();
            }
        }
    }
}

impl ServiceSpec for ServiceFile {
    fn org(&self) -> &str {
        &self.org
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn arch(&self) -> &str {
        &self.arch
    }

    fn service_type(&self) -> ServiceType {
        ServiceType::from_deployments(&self.deployment, &self.cluster_deployment)
    }

    fn required_services(&self) -> &[ServiceDependency] {
        &self.required_services
    }

    fn user_inputs(&self) -> &[UserInput] {
        &self.user_input
    }
}
