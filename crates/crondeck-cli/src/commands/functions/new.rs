use super::super::{json_pretty, EXIT_SUCCESS};
use super::{DECLARATION_FILE, DEFAULT_POLICY_DOC, POLICY_FILE};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const HANDLER_FILE: &str = "main.py";

const HANDLER_STUB: &str = r#"def handler(event, context):
    return {"status": "ok"}
"#;

fn write_atomic(dest: &Path, content: &str) -> Result<(), String> {
    let dir = dest
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    std::fs::create_dir_all(&dir).map_err(|e| format!("create {}: {e}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| format!("write temp file: {e}"))?;
    use std::io::Write;
    tmp.write_all(content.as_bytes())
        .map_err(|e| format!("write temp file: {e}"))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| format!("fsync temp file: {e}"))?;
    tmp.persist(dest)
        .map_err(|e| format!("persist {}: {}", dest.display(), e.error))?;
    Ok(())
}

fn ensure_can_write(dest: &Path, force: bool) -> Result<(), String> {
    if !dest.exists() || force {
        Ok(())
    } else {
        Err(format!(
            "refusing to overwrite existing {} (pass --force)",
            dest.display()
        ))
    }
}

pub fn run(name: &str, bucket: &str, force: bool, json: bool) -> Result<u8, String> {
    let declaration_path = Path::new(DECLARATION_FILE);
    let handler_path = PathBuf::from("functions").join(name).join(HANDLER_FILE);
    let policy_path = Path::new(POLICY_FILE);

    ensure_can_write(declaration_path, force)?;
    ensure_can_write(&handler_path, force)?;
    ensure_can_write(policy_path, force)?;

    let declaration = serde_json::json!({
        "name": name,
        "s3_bucket": bucket,
    });
    write_atomic(declaration_path, &json_pretty(&declaration)?)?;
    write_atomic(&handler_path, HANDLER_STUB)?;
    write_atomic(policy_path, DEFAULT_POLICY_DOC)?;

    if json {
        let payload = serde_json::json!({
            "status": "written",
            "name": name,
            "declaration": DECLARATION_FILE,
            "source": handler_path,
            "policy": POLICY_FILE,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote ./{DECLARATION_FILE} for '{name}'");
        println!("wrote ./{}", handler_path.display());
        println!("wrote ./{POLICY_FILE}");
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("function.json");
        std::fs::write(&dest, "{}").unwrap();

        assert!(ensure_can_write(&dest, false).is_err());
        assert!(ensure_can_write(&dest, true).is_ok());
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("iam").join("policy.json");
        write_atomic(&dest, DEFAULT_POLICY_DOC).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), DEFAULT_POLICY_DOC);
    }

    #[test]
    fn handler_stub_defines_handler() {
        assert!(HANDLER_STUB.contains("def handler"));
    }
}
