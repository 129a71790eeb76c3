use super::super::{colorize_enabled, json_pretty, make_platform, EXIT_SUCCESS};
use crondeck_core::TriggerReconciler;

pub fn run(endpoint: Option<&str>, json: bool) -> Result<u8, String> {
    let platform = make_platform(endpoint)?;
    let entries = TriggerReconciler::new(&platform, &platform)
        .list()
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&entries)?);
    } else {
        // Tab-separated: name, schedule, function, enabled.
        for entry in &entries {
            println!(
                "{}\t{}\t{}\t{}",
                entry.name,
                entry.cron,
                entry.function_name,
                colorize_enabled(entry.enabled)
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
