//! Manifest loading for file mode: YAML or JSON, from a path or `-` for stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use envbind_core::Application;

fn max_input_bytes() -> usize {
    std::env::var("ENVBIND_MAX_INPUT_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000) // 1 MiB default
}

pub fn read_source(path: &Path) -> Result<String> {
    let mut buf = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
    } else {
        buf = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    }
    Ok(buf)
}

/// Parse one Application manifest. JSON is a subset of YAML, so both go through serde_yaml.
pub fn parse_application(text: &str) -> Result<Application> {
    if text.len() > max_input_bytes() {
        return Err(anyhow!("manifest too large (>{} bytes)", max_input_bytes()));
    }
    let val: serde_yaml::Value = serde_yaml::from_str(text).context("parsing YAML")?;
    let json = serde_json::to_value(val).context("converting YAML to JSON")?;
    let kind = json.get("kind").and_then(|v| v.as_str()).ok_or_else(|| anyhow!("manifest missing kind"))?;
    if kind != "Application" {
        return Err(anyhow!("expected kind Application, got {}", kind));
    }
    if json.get("metadata").and_then(|m| m.get("name")).and_then(|v| v.as_str()).is_none() {
        return Err(anyhow!("manifest missing metadata.name"));
    }
    serde_json::from_value(json).context("decoding Application")
}

pub fn load_application(path: &Path) -> Result<Application> {
    parse_application(&read_source(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: Application
metadata:
  name: example-app
  namespace: default
spec:
  components:
    - name: express-server
      type: webservice
      properties:
        image: crccheck/hello-world
        port: 8000
      traits:
        - type: ingress
          properties:
            domain: testsvc.example.com
  policies:
    - name: example-multi-env-policy
      type: env-binding
      properties:
        envs:
          - name: staging
            placement:
              clusterSelector:
                name: cluster-staging
"#;

    #[test]
    fn parses_yaml_manifest() {
        let app = parse_application(APP).unwrap();
        assert_eq!(app.metadata.name.as_deref(), Some("example-app"));
        let comp = &app.spec.components[0];
        assert_eq!(comp.properties.as_ref().unwrap()["port"], serde_json::json!(8000));
        assert_eq!(comp.traits[0].type_, "ingress");
        assert_eq!(app.spec.policies[0].type_, "env-binding");
    }

    #[test]
    fn rejects_other_kinds_and_missing_fields() {
        let e1 = parse_application("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n").unwrap_err().to_string();
        assert!(e1.contains("expected kind Application"), "e1={}", e1);
        let e2 = parse_application("apiVersion: v1\nmetadata:\n  name: x\n").unwrap_err().to_string();
        assert!(e2.contains("missing kind"), "e2={}", e2);
        let e3 = parse_application("apiVersion: core.oam.dev/v1beta1\nkind: Application\nmetadata: {}\nspec: {}\n")
            .unwrap_err()
            .to_string();
        assert!(e3.contains("missing metadata.name"), "e3={}", e3);
    }
}
