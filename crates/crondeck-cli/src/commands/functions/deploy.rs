use super::super::{json_pretty, make_platform, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use super::{load_declaration, load_policy};
use crondeck_core::{DeployAction, Deployer};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Overrides {
    pub timeout: Option<u64>,
    pub memory: Option<u32>,
    pub description: Option<String>,
}

pub fn run(
    endpoint: Option<&str>,
    file: &Path,
    source: Option<&Path>,
    overrides: Overrides,
    json: bool,
) -> Result<u8, String> {
    let mut spec = load_declaration(file)?;
    if let Some(timeout) = overrides.timeout {
        spec.timeout = timeout;
    }
    if let Some(memory) = overrides.memory {
        spec.memory = memory;
    }
    if let Some(description) = overrides.description {
        spec.description = description;
    }

    let source_dir = source.map_or_else(
        || PathBuf::from("functions").join(&spec.name),
        Path::to_path_buf,
    );
    let policy = load_policy()?;
    let platform = make_platform(endpoint)?;
    let deployer = Deployer::new(&platform, &platform, &platform);

    let pb = spinner(&format!("deploying {}...", spec.name));
    let outcome = match deployer.deploy(&spec, &source_dir, &policy) {
        Ok(outcome) => outcome,
        Err(e) => {
            spin_fail(&pb, &format!("deploy {} failed", spec.name));
            return Err(e.to_string());
        }
    };
    let action = match outcome.action {
        DeployAction::Created => "created",
        DeployAction::Updated => "updated",
    };
    spin_ok(&pb, &format!("{action} function {}", spec.name));

    if json {
        let payload = serde_json::json!({
            "status": action,
            "name": spec.name,
            "function_id": outcome.function_id,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}", outcome.function_id);
    }
    Ok(EXIT_SUCCESS)
}
