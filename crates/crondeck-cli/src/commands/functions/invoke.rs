use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use super::load_declaration;
use crondeck_core::Deployer;
use std::path::Path;

pub fn run(
    endpoint: Option<&str>,
    name: Option<&str>,
    payload: &str,
    file: &Path,
    json: bool,
) -> Result<u8, String> {
    let name = match name {
        Some(n) => n.to_owned(),
        None => load_declaration(file)?.name,
    };
    // Reject malformed payloads before anything leaves the machine.
    serde_json::from_str::<serde_json::Value>(payload)
        .map_err(|e| format!("invalid --payload JSON: {e}"))?;

    let platform = make_platform(endpoint)?;
    let body = Deployer::new(&platform, &platform, &platform)
        .invoke(&name, payload.as_bytes())
        .map_err(|e| e.to_string())?;
    let body = String::from_utf8_lossy(&body);

    if json {
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => println!("{}", json_pretty(&value)?),
            Err(_) => println!("{body}"),
        }
    } else {
        println!("{body}");
    }
    Ok(EXIT_SUCCESS)
}
