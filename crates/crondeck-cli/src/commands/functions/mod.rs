pub mod deploy;
pub mod invoke;
pub mod list;
pub mod new;
pub mod rm;

use crondeck_core::FunctionSpec;
use std::path::Path;

pub const DECLARATION_FILE: &str = "function.json";
pub const POLICY_FILE: &str = "iam/policy.json";

/// Execution policy written by `new` and used when no project policy file
/// exists: log delivery only.
pub const DEFAULT_POLICY_DOC: &str = r#"{
  "statement": [
    {
      "effect": "Allow",
      "action": ["logs:CreateStream", "logs:PutEvents"],
      "resource": ["*"]
    }
  ]
}"#;

pub fn load_declaration(path: &Path) -> Result<FunctionSpec, String> {
    FunctionSpec::load(path).map_err(|e| e.to_string())
}

/// The project's inline execution policy, falling back to the default
/// when `iam/policy.json` is absent.
pub fn load_policy() -> Result<String, String> {
    let path = Path::new(POLICY_FILE);
    if path.exists() {
        std::fs::read_to_string(path).map_err(|e| format!("read {POLICY_FILE}: {e}"))
    } else {
        Ok(DEFAULT_POLICY_DOC.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid_json() {
        let doc: serde_json::Value = serde_json::from_str(DEFAULT_POLICY_DOC).unwrap();
        assert!(doc["statement"].is_array());
    }

    #[test]
    fn missing_declaration_reports_declaration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_declaration(&dir.path().join(DECLARATION_FILE)).unwrap_err();
        assert!(err.starts_with("declaration error:"));
    }
}
