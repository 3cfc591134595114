//! Env-binding and override policy payloads, plus the env-binding status stored in
//! `status.policy[].status`.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;

use crate::{ApplicationComponent, ApplicationTrait};

pub const ENV_BINDING_POLICY_TYPE: &str = "env-binding";
pub const OVERRIDE_POLICY_TYPE: &str = "override";
pub const TOPOLOGY_POLICY_TYPE: &str = "topology";

/// Reads JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Properties of an `env-binding` policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvBindingSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub envs: Vec<EnvConfig>,
}

impl EnvBindingSpec {
    pub fn env(&self, name: &str) -> Option<&EnvConfig> {
        self.envs.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvConfig {
    pub name: String,
    #[serde(default)]
    pub placement: EnvPlacement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<EnvSelector>,
    #[serde(default)]
    pub patch: EnvPatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_selector: Option<ClusterSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<NamespaceSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamespaceSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Restricts the patched component set to the named components.
/// A present list selects only those names (an empty one selects nothing); an absent
/// or `null` list does not filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

impl EnvSelector {
    pub fn only(components: Vec<String>) -> Self {
        Self { components: Some(components) }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvPatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<EnvComponentPatch>,
}

/// Patch for one component, keyed by `name`. A `type` that differs from the base
/// component's type replaces the component instead of merging into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvComponentPatch {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Json>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<EnvTraitPatch>,
}

impl EnvComponentPatch {
    /// The patch taken verbatim as a component (used for new and type-changed components).
    /// Disabled traits are dropped.
    pub fn to_component(&self) -> ApplicationComponent {
        ApplicationComponent {
            name: self.name.clone(),
            type_: self.type_.clone().unwrap_or_default(),
            external_revision: self.external_revision.clone(),
            properties: self.properties.clone(),
            depends_on: Vec::new(),
            traits: self.traits.iter().filter(|t| !t.disable).map(EnvTraitPatch::to_trait).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvTraitPatch {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Json>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable: bool,
}

impl EnvTraitPatch {
    pub fn to_trait(&self) -> ApplicationTrait {
        ApplicationTrait { type_: self.type_.clone(), properties: self.properties.clone() }
    }
}

/// Properties of an `override` policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverridePolicySpec {
    #[serde(default)]
    pub components: Vec<EnvComponentPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Vec<String>>,
}

impl OverridePolicySpec {
    pub fn env_selector(&self) -> Option<EnvSelector> {
        self.selector.as_ref().map(|c| EnvSelector::only(c.clone()))
    }
}

/// Where one environment's components were deployed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementDecision {
    pub cluster: String,
    #[serde(default)]
    pub namespace: String,
}

impl PlacementDecision {
    pub fn new(cluster: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { cluster: cluster.into(), namespace: namespace.into() }
    }
}

impl fmt::Display for PlacementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.cluster)
        } else {
            write!(f, "{}/{}", self.cluster, self.namespace)
        }
    }
}

/// Parses `cluster` or `cluster/namespace`.
impl FromStr for PlacementDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cluster, namespace) = match s.split_once('/') {
            Some((c, ns)) => (c, ns),
            None => (s, ""),
        };
        if cluster.is_empty() {
            return Err(format!("invalid placement {:?}: cluster must not be empty", s));
        }
        if namespace.contains('/') {
            return Err(format!("invalid placement {:?}: expect cluster[/namespace]", s));
        }
        Ok(Self::new(cluster, namespace))
    }
}

/// Status payload of an `env-binding` policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvBindingStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub envs: Vec<EnvStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cluster_connections: Vec<ClusterConnection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvStatus {
    pub env: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub placements: Vec<PlacementDecision>,
}

/// Ledger entry: a cluster the policy has ever placed workloads on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConnection {
    pub cluster_name: String,
    #[serde(default)]
    pub last_active_revision: String,
}
