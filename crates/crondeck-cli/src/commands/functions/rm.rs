use super::super::{json_pretty, make_platform, EXIT_SUCCESS};
use super::load_declaration;
use crondeck_core::Deployer;
use std::path::Path;

pub fn run(
    endpoint: Option<&str>,
    name: Option<&str>,
    bucket: Option<&str>,
    file: &Path,
    json: bool,
) -> Result<u8, String> {
    // Anything not given on the command line comes from the declaration.
    let (name, bucket) = match (name, bucket) {
        (Some(n), Some(b)) => (n.to_owned(), b.to_owned()),
        (n, b) => {
            let spec = load_declaration(file)?;
            (
                n.map_or(spec.name, str::to_owned),
                b.map_or(spec.s3_bucket, str::to_owned),
            )
        }
    };

    let platform = make_platform(endpoint)?;
    Deployer::new(&platform, &platform, &platform)
        .delete(&name, &bucket)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({"status": "removed", "name": name});
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed function {name}");
    }
    Ok(EXIT_SUCCESS)
}
