//! Lookups of declared policies and their decoded properties.

use envbind_core::policy::{EnvBindingSpec, OverridePolicySpec, ENV_BINDING_POLICY_TYPE, OVERRIDE_POLICY_TYPE};
use envbind_core::{AppPolicy, Application};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Find a declared policy by name and type. An empty `name` selects the first policy of
/// that type.
pub fn find_policy<'a>(app: &'a Application, name: &str, type_: &str) -> Option<&'a AppPolicy> {
    app.spec
        .policies
        .iter()
        .find(|p| p.type_ == type_ && (name.is_empty() || p.name == name))
}

/// Decode and return the properties of an `env-binding` policy.
/// Absent properties decode to an empty spec.
pub fn get_env_binding_policy(app: &Application, name: &str) -> Result<EnvBindingSpec> {
    let policy = find_policy(app, name, ENV_BINDING_POLICY_TYPE).ok_or_else(|| not_found(name, ENV_BINDING_POLICY_TYPE))?;
    match &policy.properties {
        Some(props) => decode(props, &format!("properties of policy {}", policy.name)),
        None => Ok(EnvBindingSpec::default()),
    }
}

/// Decode the properties of an `override` policy. Unlike env-binding policies, an override
/// policy without properties is rejected.
pub fn get_override_policy(policy: &AppPolicy) -> Result<OverridePolicySpec> {
    let what = format!("properties of override policy {}", policy.name);
    match &policy.properties {
        Some(props) => decode(props, &what),
        None => Err(Error::decode(what, <serde_json::Error as serde::de::Error>::custom("properties must not be empty"))),
    }
}

/// Override policies to apply: the named ones in the given order, or every override
/// policy in declaration order when `names` is empty.
pub fn override_policies<'a>(app: &'a Application, names: &[String]) -> Result<Vec<&'a AppPolicy>> {
    if names.is_empty() {
        return Ok(app.spec.policies.iter().filter(|p| p.type_ == OVERRIDE_POLICY_TYPE).collect());
    }
    names
        .iter()
        .map(|n| find_policy(app, n, OVERRIDE_POLICY_TYPE).ok_or_else(|| not_found(n, OVERRIDE_POLICY_TYPE)))
        .collect()
}

pub(crate) fn decode<T: DeserializeOwned>(v: &Json, what: &str) -> Result<T> {
    T::deserialize(v).map_err(|e| Error::decode(what, e))
}

pub(crate) fn not_found(name: &str, type_: &str) -> Error {
    let policy = if name.is_empty() { format!("of type {}", type_) } else { name.to_string() };
    Error::PolicyNotFound { policy }
}
