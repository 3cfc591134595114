//! Envbind core types: the `Application` custom resource and its policy status.
//!
//! Component and trait properties are opaque JSON (`serde_json::Value`); nothing at this
//! layer knows their schema.

#![forbid(unsafe_code)]

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub mod policy;

/// Desired state of an OAM application.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default)]
    pub components: Vec<ApplicationComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<AppPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationComponent {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<ApplicationTrait>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplicationTrait {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Json>,
}

/// A policy declared in the application spec. `properties` is decoded per policy type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppPolicy {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy: Vec<PolicyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision: Option<Revision>,
}

/// Per-policy status slot. `status` holds a policy-type specific JSON payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    pub name: String,
    #[serde(default)]
    pub revision: i64,
}

impl Application {
    /// Name of the latest application revision, empty when none was recorded yet.
    pub fn latest_revision_name(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.latest_revision.as_ref())
            .map(|r| r.name.as_str())
            .unwrap_or("")
    }

    pub fn policy(&self, name: &str) -> Option<&AppPolicy> {
        self.spec.policies.iter().find(|p| p.name == name)
    }
}

pub mod prelude {
    pub use super::{
        AppPolicy, Application, ApplicationComponent, ApplicationSpec, ApplicationStatus,
        ApplicationTrait, PolicyStatus, Revision,
    };
    pub use super::policy::{
        ClusterConnection, EnvBindingSpec, EnvBindingStatus, EnvComponentPatch, EnvConfig,
        EnvPatch, EnvSelector, EnvStatus, EnvTraitPatch, OverridePolicySpec, PlacementDecision,
    };
}
