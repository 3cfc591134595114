//! Envbind kubehub: fetch `Application` objects and persist their policy status.

#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use envbind_core::Application;
use kube::{
    api::{Api, ListParams, Patch, PatchParams},
    Client,
};
use metrics::{counter, histogram};
use serde_json::{json, Value as Json};
use tracing::{debug, info, warn};

pub async fn get_kube_client() -> Result<Client> {
    Client::try_default().await.context("building kube client from kubeconfig/in-cluster env")
}

fn api(client: Client, namespace: Option<&str>) -> Api<Application> {
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::default_namespaced(client),
    }
}

/// Fetch one application; `namespace` falls back to the client's default namespace.
pub async fn get_application(client: Client, namespace: Option<&str>, name: &str) -> Result<Application> {
    let app = api(client, namespace)
        .get(name)
        .await
        .with_context(|| format!("getting application {}", name))?;
    debug!(app = %name, ns = ?namespace, "application fetched");
    Ok(app)
}

/// List applications in `namespace`, or across all namespaces when `None`.
pub async fn list_applications(client: Client, namespace: Option<&str>) -> Result<Vec<Application>> {
    let api: Api<Application> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    let list = api.list(&ListParams::default()).await.context("listing applications")?;
    info!(count = list.items.len(), ns = ?namespace, "applications listed");
    Ok(list.items)
}

/// Merge patch carrying only `status.policy`, the part placement writes touch.
pub fn status_patch(app: &Application) -> Result<Json> {
    let policy = app.status.as_ref().map(|s| s.policy.as_slice()).unwrap_or(&[]);
    let policy = serde_json::to_value(policy).context("encoding status.policy")?;
    Ok(json!({ "status": { "policy": policy } }))
}

/// Write `app.status.policy` back through the status subresource.
pub async fn persist_status(client: Client, app: &Application) -> Result<Application> {
    let t0 = std::time::Instant::now();
    counter!("status_patch_total", 1u64);
    let name = app.metadata.name.as_deref().ok_or_else(|| anyhow!("application missing metadata.name"))?;
    let ns = app.metadata.namespace.as_deref();
    let patch = status_patch(app)?;
    match api(client, ns).patch_status(name, &PatchParams::default(), &Patch::Merge(&patch)).await {
        Ok(updated) => {
            histogram!("status_patch_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
            info!(app = %name, ns = ?ns, "application status patched");
            Ok(updated)
        }
        Err(e) => {
            counter!("status_patch_err", 1u64);
            warn!(app = %name, ns = ?ns, error = %e, "status patch failed");
            Err(anyhow!("patching status of application {}: {}", name, e))
        }
    }
}
