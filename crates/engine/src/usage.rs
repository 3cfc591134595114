//! Which applications currently place workloads on a cluster.

use envbind_core::Application;

use crate::error::{ClusterUsage, Error, Result};
use crate::placement::get_env_binding_policy_status;

/// Every (application, env) pair whose first env-binding status places something on
/// `cluster`. An env with several placements on the cluster is reported once.
/// Applications with an unreadable status are skipped.
pub fn cluster_usages<'a, I>(apps: I, cluster: &str) -> Vec<ClusterUsage>
where
    I: IntoIterator<Item = &'a Application>,
{
    let mut out = Vec::new();
    for app in apps {
        let status = match get_env_binding_policy_status(app, "") {
            Ok(Some(s)) => s,
            _ => continue,
        };
        for env in &status.envs {
            if env.placements.iter().any(|p| p.cluster == cluster) {
                out.push(ClusterUsage {
                    namespace: app.metadata.namespace.clone().unwrap_or_default(),
                    app: app.metadata.name.clone().unwrap_or_default(),
                    env: env.env.clone(),
                });
            }
        }
    }
    out
}

/// Fails with [`Error::ClusterInUse`] when any application still uses `cluster`.
pub fn ensure_cluster_unused<'a, I>(apps: I, cluster: &str) -> Result<()>
where
    I: IntoIterator<Item = &'a Application>,
{
    let usages = cluster_usages(apps, cluster);
    if usages.is_empty() {
        Ok(())
    } else {
        Err(Error::ClusterInUse { cluster: cluster.to_string(), usages })
    }
}
