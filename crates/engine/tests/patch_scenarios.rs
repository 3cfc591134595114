#![forbid(unsafe_code)]

use envbind_core::policy::{EnvComponentPatch, EnvPatch, EnvSelector, EnvTraitPatch};
use envbind_core::{Application, ApplicationComponent};
use envbind_engine::{apply_override_policies, patch_application, patch_application_by_env_binding_env, Error};
use serde_json::json;

fn app(v: serde_json::Value) -> Application {
    serde_json::from_value(v).unwrap()
}

fn names(components: &[ApplicationComponent]) -> Vec<&str> {
    components.iter().map(|c| c.name.as_str()).collect()
}

fn base_app() -> Application {
    app(json!({
        "apiVersion": "core.oam.dev/v1beta1",
        "kind": "Application",
        "metadata": {"name": "example-app", "namespace": "default"},
        "spec": {
            "components": [{
                "name": "express-server",
                "type": "webservice",
                "properties": {"image": "crccheck/hello-world", "port": 8000},
                "traits": [{"type": "ingress", "properties": {"domain": "testsvc.example.com"}}]
            }, {
                "name": "worker",
                "type": "worker",
                "properties": {"image": "busybox"},
                "traits": [
                    {"type": "ingress", "properties": {"domain": "worker.example.com"}},
                    {"type": "labels", "properties": {"app": "worker"}}
                ]
            }],
            "policies": [{
                "name": "example-multi-env-policy",
                "type": "env-binding",
                "properties": {"envs": [{
                    "name": "staging",
                    "placement": {"clusterSelector": {"name": "cluster-staging"}},
                    "patch": {"components": [{
                        "name": "express-server",
                        "type": "webservice",
                        "properties": {"image": "busybox"},
                        "traits": [{"type": "ingress", "properties": {"domain": "newTestsvc.example.com"}}]
                    }]}
                }, {
                    "name": "prod",
                    "placement": {"clusterSelector": {"name": "cluster-prod"}},
                    "selector": {"components": ["worker"]}
                }]}
            }, {
                "name": "scale-up",
                "type": "override",
                "properties": {"components": [{"name": "worker", "properties": {"replicas": 3}}]}
            }, {
                "name": "only-server",
                "type": "override",
                "properties": {"components": [], "selector": ["express-server"]}
            }]
        }
    }))
}

#[test]
fn empty_patch_is_identity() {
    let base = base_app();
    let out = patch_application(&base, &EnvPatch::default(), None).unwrap();
    assert_eq!(out, base);
}

#[test]
fn staging_env_overrides_image_and_ingress_domain() {
    let base = base_app();
    let out = patch_application_by_env_binding_env(&base, "example-multi-env-policy", "staging").unwrap();
    assert_eq!(names(&out.spec.components), vec!["express-server", "worker"]);
    let server = &out.spec.components[0];
    assert_eq!(server.properties, Some(json!({"image": "busybox", "port": 8000})));
    assert_eq!(server.traits.len(), 1);
    assert_eq!(server.traits[0].type_, "ingress");
    assert_eq!(server.traits[0].properties, Some(json!({"domain": "newTestsvc.example.com"})));
    // untouched
    assert_eq!(out.spec.components[1], base.spec.components[1]);
    assert_eq!(out.spec.policies, base.spec.policies);
    assert_eq!(out.metadata, base.metadata);
}

#[test]
fn prod_env_selects_worker_only() {
    let out = patch_application_by_env_binding_env(&base_app(), "example-multi-env-policy", "prod").unwrap();
    assert_eq!(names(&out.spec.components), vec!["worker"]);
}

#[test]
fn lookup_errors_are_named() {
    let base = base_app();
    match patch_application_by_env_binding_env(&base, "missing", "staging") {
        Err(Error::PolicyNotFound { policy }) => assert_eq!(policy, "missing"),
        other => panic!("unexpected: {other:?}"),
    }
    // an override policy is not an env-binding policy
    assert!(matches!(
        patch_application_by_env_binding_env(&base, "scale-up", "staging"),
        Err(Error::PolicyNotFound { .. })
    ));
    match patch_application_by_env_binding_env(&base, "example-multi-env-policy", "qa") {
        Err(Error::EnvNotFound { policy, env }) => {
            assert_eq!(policy, "example-multi-env-policy");
            assert_eq!(env, "qa");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn new_component_is_appended_after_base_order() {
    let base = app(json!({
        "apiVersion": "core.oam.dev/v1beta1",
        "kind": "Application",
        "metadata": {"name": "a"},
        "spec": {"components": [{"name": "A", "type": "x"}, {"name": "B", "type": "x"}]}
    }));
    let patch = EnvPatch {
        components: vec![
            EnvComponentPatch { name: "C".into(), type_: Some("x".into()), ..Default::default() },
            EnvComponentPatch { name: "A".into(), properties: Some(json!({"k": "v"})), ..Default::default() },
        ],
    };
    let out = patch_application(&base, &patch, None).unwrap();
    assert_eq!(names(&out.spec.components), vec!["A", "B", "C"]);
    assert_eq!(out.spec.components[0].properties, Some(json!({"k": "v"})));
}

#[test]
fn type_change_replaces_component_verbatim() {
    let base = app(json!({
        "apiVersion": "core.oam.dev/v1beta1",
        "kind": "Application",
        "metadata": {"name": "a"},
        "spec": {"components": [{
            "name": "X", "type": "webservice",
            "properties": {"image": "nginx", "port": 80},
            "traits": [{"type": "ingress", "properties": {"domain": "x.example.com"}}]
        }]}
    }));
    let patch = EnvComponentPatch {
        name: "X".into(),
        type_: Some("worker".into()),
        properties: Some(json!({"image": "busybox"})),
        ..Default::default()
    };
    let out = patch_application(&base, &EnvPatch { components: vec![patch.clone()] }, None).unwrap();
    assert_eq!(out.spec.components, vec![patch.to_component()]);
}

#[test]
fn disabling_a_trait_removes_it() {
    let base = base_app();
    let patch = EnvPatch {
        components: vec![EnvComponentPatch {
            name: "worker".into(),
            traits: vec![EnvTraitPatch { type_: "ingress".into(), properties: None, disable: true }],
            ..Default::default()
        }],
    };
    let out = patch_application(&base, &patch, None).unwrap();
    let traits: Vec<_> = out.spec.components[1].traits.iter().map(|t| t.type_.as_str()).collect();
    assert_eq!(traits, vec!["labels"]);
}

#[test]
fn selectors_restrict_and_empty_selects_nothing() {
    let base = base_app();
    let empty = EnvSelector::only(vec![]);
    assert!(patch_application(&base, &EnvPatch::default(), Some(&empty)).unwrap().spec.components.is_empty());
    let only_worker = EnvSelector::only(vec!["worker".into()]);
    let out = patch_application(&base, &EnvPatch::default(), Some(&only_worker)).unwrap();
    assert_eq!(names(&out.spec.components), vec!["worker"]);
}

#[test]
fn failing_component_yields_no_partial_result() {
    let base = base_app();
    let patch = EnvPatch {
        components: vec![
            EnvComponentPatch { name: "worker".into(), properties: Some(json!("not-an-object")), ..Default::default() },
            EnvComponentPatch { name: "new".into(), type_: Some("x".into()), ..Default::default() },
        ],
    };
    let err = patch_application(&base, &patch, None).unwrap_err();
    assert!(err.to_string().starts_with("failed to merge components [worker]"), "err={}", err);
}

#[test]
fn override_policies_apply_in_order() {
    let base = base_app();
    let all = apply_override_policies(&base, &[]).unwrap();
    assert_eq!(names(&all.spec.components), vec!["express-server"]);

    let scaled = apply_override_policies(&base, &["scale-up".to_string()]).unwrap();
    assert_eq!(scaled.spec.components[1].properties, Some(json!({"image": "busybox", "replicas": 3})));

    assert!(matches!(
        apply_override_policies(&base, &["example-multi-env-policy".to_string()]),
        Err(Error::PolicyNotFound { .. })
    ));
}

fn app_with_env_selector(selector: serde_json::Value) -> Application {
    app(json!({
        "apiVersion": "core.oam.dev/v1beta1",
        "kind": "Application",
        "metadata": {"name": "selector-app", "namespace": "default"},
        "spec": {
            "components": [
                {"name": "api", "type": "webservice", "properties": {"image": "api:1"}},
                {"name": "cron", "type": "worker", "properties": {"image": "cron:1"}}
            ],
            "policies": [{
                "name": "envs",
                "type": "env-binding",
                "properties": {"envs": [{"name": "dev", "selector": selector, "patch": {"components": null}}]}
            }]
        }
    }))
}

#[test]
fn selector_without_component_list_keeps_everything() {
    for selector in [json!({}), json!({"components": null})] {
        let base = app_with_env_selector(selector.clone());
        let out = patch_application_by_env_binding_env(&base, "envs", "dev").unwrap();
        assert_eq!(names(&out.spec.components), vec!["api", "cron"], "selector={}", selector);
    }
    let base = app_with_env_selector(json!({"components": []}));
    let out = patch_application_by_env_binding_env(&base, "envs", "dev").unwrap();
    assert!(out.spec.components.is_empty());
}
