//! Placement decision store: env-binding status kept in `status.policy[].status`.
//!
//! `Envs` and `ClusterConnections` are small ordered lists searched linearly; the first
//! match by key wins.

use envbind_core::policy::{ClusterConnection, EnvBindingStatus, EnvStatus, PlacementDecision, ENV_BINDING_POLICY_TYPE};
use envbind_core::{Application, PolicyStatus};
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::policy::decode;

/// Placement bookkeeping on a decoded env-binding status.
pub trait PlacementLedger {
    /// Replace the placements of `env` (appending a new env entry when absent) and upsert a
    /// cluster connection at `revision` for every distinct cluster in `decisions`.
    /// Connections are never removed.
    fn record_placements(&mut self, env: &str, decisions: &[PlacementDecision], revision: &str);

    /// Connections whose cluster no longer appears in any env's placements.
    fn stale_clusters(&self) -> Vec<&ClusterConnection>;
}

impl PlacementLedger for EnvBindingStatus {
    fn record_placements(&mut self, env: &str, decisions: &[PlacementDecision], revision: &str) {
        match self.envs.iter_mut().find(|e| e.env == env) {
            Some(e) => e.placements = decisions.to_vec(),
            None => self.envs.push(EnvStatus { env: env.to_string(), placements: decisions.to_vec() }),
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for d in decisions {
            if !seen.insert(d.cluster.as_str()) {
                continue;
            }
            match self.cluster_connections.iter_mut().find(|c| c.cluster_name == d.cluster) {
                Some(c) => c.last_active_revision = revision.to_string(),
                None => self.cluster_connections.push(ClusterConnection {
                    cluster_name: d.cluster.clone(),
                    last_active_revision: revision.to_string(),
                }),
            }
        }
    }

    fn stale_clusters(&self) -> Vec<&ClusterConnection> {
        let active: FxHashSet<&str> = self
            .envs
            .iter()
            .flat_map(|e| e.placements.iter().map(|p| p.cluster.as_str()))
            .collect();
        self.cluster_connections
            .iter()
            .filter(|c| !active.contains(c.cluster_name.as_str()))
            .collect()
    }
}

fn policy_status<'a>(app: &'a Application, policy_name: &str) -> Option<&'a PolicyStatus> {
    app.status.as_ref()?.policy.iter().find(|p| {
        p.type_ == ENV_BINDING_POLICY_TYPE && (policy_name.is_empty() || p.name == policy_name)
    })
}

fn decode_status(ps: &PolicyStatus) -> Result<EnvBindingStatus> {
    match &ps.status {
        Some(v) => decode(v, &format!("status of policy {}", ps.name)),
        None => Ok(EnvBindingStatus::default()),
    }
}

/// Decoded env-binding status of `policy_name`, or of the first env-binding policy when
/// the name is empty. `Ok(None)` when no status was recorded yet.
pub fn get_env_binding_policy_status(app: &Application, policy_name: &str) -> Result<Option<EnvBindingStatus>> {
    policy_status(app, policy_name).map(decode_status).transpose()
}

/// Placements recorded for `env_name` under `policy_name`.
///
/// Absence of the policy status or of the env is `Ok((vec![], false))`; only a corrupt
/// status payload is an error.
pub fn read_placement_decisions(app: &Application, policy_name: &str, env_name: &str) -> Result<(Vec<PlacementDecision>, bool)> {
    let status = match get_env_binding_policy_status(app, policy_name)? {
        Some(s) => s,
        None => return Ok((Vec::new(), false)),
    };
    match status.envs.into_iter().find(|e| e.env == env_name) {
        Some(e) => Ok((e.placements, true)),
        None => Ok((Vec::new(), false)),
    }
}

/// Status of `policy_name` with `decisions` recorded for `env_name` at the application's
/// latest revision. `app` is left untouched.
pub fn placement_status(
    app: &Application,
    policy_name: &str,
    env_name: &str,
    decisions: &[PlacementDecision],
) -> Result<EnvBindingStatus> {
    let mut status = match app
        .status
        .as_ref()
        .and_then(|s| s.policy.iter().find(|p| p.type_ == ENV_BINDING_POLICY_TYPE && p.name == policy_name))
    {
        Some(ps) => decode_status(ps)?,
        None => EnvBindingStatus::default(),
    };
    status.record_placements(env_name, decisions, app.latest_revision_name());
    Ok(status)
}

/// Record `decisions` for `env_name` into `app.status`, creating the policy status slot
/// when needed. Nothing is persisted; the caller writes `app` back.
pub fn write_placement_decisions(
    app: &mut Application,
    policy_name: &str,
    env_name: &str,
    decisions: &[PlacementDecision],
) -> Result<()> {
    let status = placement_status(app, policy_name, env_name, decisions)?;
    let payload = serde_json::to_value(&status)
        .map_err(|e| Error::encode(format!("status of policy {}", policy_name), e))?;

    let app_status = app.status.get_or_insert_with(Default::default);
    match app_status
        .policy
        .iter_mut()
        .find(|p| p.type_ == ENV_BINDING_POLICY_TYPE && p.name == policy_name)
    {
        Some(ps) => ps.status = Some(payload),
        None => app_status.policy.push(PolicyStatus {
            name: policy_name.to_string(),
            type_: ENV_BINDING_POLICY_TYPE.to_string(),
            status: Some(payload),
        }),
    }
    Ok(())
}
