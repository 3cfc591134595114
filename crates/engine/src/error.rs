use std::fmt;

/// One failed keyed merge inside an aggregated error (a trait type or a component name).
#[derive(Debug)]
pub struct MergeFailure {
    pub key: String,
    pub error: Error,
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

/// Where a cluster is currently used: one (application, env) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterUsage {
    pub namespace: String,
    pub app: String,
    pub env: String,
}

impl fmt::Display for ClusterUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application {}/{} (env: {})", self.namespace, self.app, self.env)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to merge traits [{}] of component {component}: {}", keys(.failures), details(.failures))]
    TraitMerge { component: String, failures: Vec<MergeFailure> },
    #[error("failed to merge components [{}]: {}", keys(.failures), details(.failures))]
    ComponentMerge { failures: Vec<MergeFailure> },
    #[error("policy {policy} not found")]
    PolicyNotFound { policy: String },
    #[error("env {env} not found in policy {policy}")]
    EnvNotFound { policy: String, env: String },
    #[error("cluster {cluster} is in use now: {}", fmt_usages(.usages))]
    ClusterInUse { cluster: String, usages: Vec<ClusterUsage> },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode { what: what.into(), source }
    }

    pub(crate) fn encode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Encode { what: what.into(), source }
    }
}

fn keys(failures: &[MergeFailure]) -> String {
    failures.iter().map(|f| f.key.as_str()).collect::<Vec<_>>().join(", ")
}

fn details(failures: &[MergeFailure]) -> String {
    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

fn fmt_usages(usages: &[ClusterUsage]) -> String {
    usages.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(", ")
}
