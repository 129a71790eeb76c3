use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use crondeck_core::{TriggerEntry, TriggerReconciler};
use std::path::Path;

pub fn run(endpoint: Option<&str>, file: &Path, json: bool) -> Result<u8, String> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("declaration error: read '{}': {e}", file.display()))?;
    let entries: Vec<TriggerEntry> = serde_json::from_str(&content)
        .map_err(|e| format!("declaration error: parse '{}': {e}", file.display()))?;

    let platform = make_platform(endpoint)?;
    TriggerReconciler::new(&platform, &platform)
        .load(&entries)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({"status": "loaded", "count": entries.len()});
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("loaded {} triggers from {}", entries.len(), file.display());
    }
    Ok(EXIT_SUCCESS)
}
