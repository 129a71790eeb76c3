use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use crondeck_core::{TriggerEntry, TriggerReconciler};

#[allow(clippy::fn_params_excessive_bools)]
pub fn run(
    endpoint: Option<&str>,
    name: &str,
    cron: &str,
    function: &str,
    input: &str,
    enabled: bool,
    json: bool,
) -> Result<u8, String> {
    let input_event: serde_json::Value =
        serde_json::from_str(input).map_err(|e| format!("invalid --input JSON: {e}"))?;
    let entry = TriggerEntry {
        name: name.to_owned(),
        cron: cron.to_owned(),
        function_name: function.to_owned(),
        input_event,
        enabled,
    };

    let platform = make_platform(endpoint)?;
    TriggerReconciler::new(&platform, &platform)
        .add(&entry)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&entry)?);
    } else {
        println!("added trigger {name} -> {function} ({cron})");
    }
    Ok(EXIT_SUCCESS)
}
