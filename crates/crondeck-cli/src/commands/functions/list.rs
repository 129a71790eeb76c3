use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use crondeck_core::Deployer;

#[allow(clippy::unnecessary_wraps)]
pub fn run(endpoint: Option<&str>, _json: bool) -> Result<u8, String> {
    let platform = make_platform(endpoint)?;
    let functions = Deployer::new(&platform, &platform, &platform)
        .list()
        .map_err(|e| e.to_string())?;

    // Always the platform's native descriptors, pretty-printed.
    println!("{}", json_pretty(&functions)?);
    Ok(EXIT_SUCCESS)
}
