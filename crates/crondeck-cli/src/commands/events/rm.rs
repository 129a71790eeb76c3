use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use crondeck_core::TriggerReconciler;

pub fn run(endpoint: Option<&str>, name: &str, json: bool) -> Result<u8, String> {
    let platform = make_platform(endpoint)?;
    TriggerReconciler::new(&platform, &platform)
        .delete(name)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({"status": "removed", "name": name});
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed trigger {name}");
    }
    Ok(EXIT_SUCCESS)
}
