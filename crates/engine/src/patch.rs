//! Patch engine: merges env-specific component/trait patches into a base application.
//!
//! Ordering contract: base order first, then entries introduced by the patch in patch
//! order. Keyed maps are used for lookup only; output order always comes from the
//! recorded key order.

use envbind_core::policy::{EnvComponentPatch, EnvPatch, EnvSelector};
use envbind_core::{Application, ApplicationComponent, ApplicationTrait};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, MergeFailure, Result};
use crate::merge::merge_raw_properties;
use crate::policy::{get_env_binding_policy, get_override_policy, override_policies};

/// Merge one component patch into its base component.
///
/// Properties are deep-merged first; a properties failure aborts the call. Traits are then
/// merged by type: disabled types are dropped from the result, existing types keep their
/// position, new types are appended in patch order. Trait failures do not stop the other
/// traits from merging, but every failing type is reported in one [`Error::TraitMerge`].
pub fn merge_component(base: &ApplicationComponent, patch: &EnvComponentPatch) -> Result<ApplicationComponent> {
    let mut merged = base.clone();
    merged.properties = merge_raw_properties(base.properties.as_ref(), patch.properties.as_ref())?;
    if let Some(rev) = &patch.external_revision {
        merged.external_revision = Some(rev.clone());
    }

    let mut order: Vec<String> = Vec::with_capacity(base.traits.len() + patch.traits.len());
    let mut traits: FxHashMap<String, ApplicationTrait> = FxHashMap::default();
    for t in &base.traits {
        if !traits.contains_key(&t.type_) {
            order.push(t.type_.clone());
            traits.insert(t.type_.clone(), t.clone());
        }
    }

    let mut disabled: FxHashSet<&str> = FxHashSet::default();
    let mut failures = Vec::new();
    for pt in &patch.traits {
        if pt.disable {
            disabled.insert(pt.type_.as_str());
            continue;
        }
        match traits.get_mut(&pt.type_) {
            Some(bt) => match merge_raw_properties(bt.properties.as_ref(), pt.properties.as_ref()) {
                Ok(props) => bt.properties = props,
                Err(error) => failures.push(MergeFailure { key: pt.type_.clone(), error }),
            },
            None => {
                order.push(pt.type_.clone());
                traits.insert(pt.type_.clone(), pt.to_trait());
            }
        }
    }
    if !failures.is_empty() {
        return Err(Error::TraitMerge { component: base.name.clone(), failures });
    }

    merged.traits = order
        .iter()
        .filter(|t| !disabled.contains(t.as_str()))
        .filter_map(|t| traits.remove(t))
        .collect();
    Ok(merged)
}

/// Apply component patches to a component list, then filter by `selector`.
///
/// A patch naming an unknown component appends it; a patch whose `type` differs from the
/// base component's replaces it wholesale; otherwise the two are merged. Any component
/// failure fails the whole call. The selector only drops components, never reorders, and
/// only filters when its component list is present.
pub fn patch_components(
    base: &[ApplicationComponent],
    patches: &[EnvComponentPatch],
    selector: Option<&EnvSelector>,
) -> Result<Vec<ApplicationComponent>> {
    let mut order: Vec<String> = Vec::with_capacity(base.len() + patches.len());
    let mut comps: FxHashMap<String, ApplicationComponent> = FxHashMap::default();
    for c in base {
        if !comps.contains_key(&c.name) {
            order.push(c.name.clone());
            comps.insert(c.name.clone(), c.clone());
        }
    }

    let mut failures = Vec::new();
    for p in patches {
        let next = match comps.get(&p.name) {
            None => {
                order.push(p.name.clone());
                p.to_component()
            }
            Some(bc) if p.type_.as_deref().is_some_and(|t| t != bc.type_) => p.to_component(),
            Some(bc) => match merge_component(bc, p) {
                Ok(c) => c,
                Err(error) => {
                    failures.push(MergeFailure { key: p.name.clone(), error });
                    continue;
                }
            },
        };
        comps.insert(p.name.clone(), next);
    }
    if !failures.is_empty() {
        return Err(Error::ComponentMerge { failures });
    }

    if let Some(names) = selector.and_then(|s| s.components.as_ref()) {
        let wanted: FxHashSet<&str> = names.iter().map(String::as_str).collect();
        order.retain(|n| wanted.contains(n.as_str()));
    }
    Ok(order.iter().filter_map(|n| comps.remove(n)).collect())
}

/// Patch a whole application. Everything but the component list is copied from `base`.
pub fn patch_application(base: &Application, patch: &EnvPatch, selector: Option<&EnvSelector>) -> Result<Application> {
    let components = patch_components(&base.spec.components, &patch.components, selector)?;
    let mut app = base.clone();
    app.spec.components = components;
    Ok(app)
}

/// Patch `app` with the patch and selector of env `env_name` in env-binding policy
/// `policy_name`.
pub fn patch_application_by_env_binding_env(app: &Application, policy_name: &str, env_name: &str) -> Result<Application> {
    let spec = get_env_binding_policy(app, policy_name)?;
    let env = spec.env(env_name).ok_or_else(|| Error::EnvNotFound {
        policy: policy_name.to_string(),
        env: env_name.to_string(),
    })?;
    patch_application(app, &env.patch, env.selector.as_ref())
}

/// Apply override policies in order, each one on top of the previous result.
/// An empty `names` applies every override policy the application declares.
pub fn apply_override_policies(app: &Application, names: &[String]) -> Result<Application> {
    let mut components = app.spec.components.clone();
    for policy in override_policies(app, names)? {
        let spec = get_override_policy(policy)?;
        let selector = spec.env_selector();
        components = patch_components(&components, &spec.components, selector.as_ref())?;
    }
    let mut out = app.clone();
    out.spec.components = components;
    Ok(out)
}
