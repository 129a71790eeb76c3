use crate::CoreError;
use std::path::Path;
use tempfile::NamedTempFile;

/// Archive a function's source directory into a temporary tar file.
///
/// Entry paths are relative to `src` (subdirectory structure preserved, no
/// absolute prefix). The returned [`NamedTempFile`] deletes itself on drop,
/// so the local archive is cleaned up on every exit path — including an
/// upload failure in the caller.
pub fn package_dir(src: &Path) -> Result<NamedTempFile, CoreError> {
    if !src.is_dir() {
        return Err(CoreError::Packaging(format!(
            "source directory '{}' does not exist",
            src.display()
        )));
    }

    let tmp = tempfile::Builder::new()
        .prefix("crondeck-")
        .suffix(".tar")
        .tempfile()
        .map_err(|e| CoreError::Packaging(format!("create temp archive: {e}")))?;

    let mut builder = tar::Builder::new(tmp.as_file());
    builder
        .append_dir_all("", src)
        .map_err(|e| CoreError::Packaging(format!("archive '{}': {e}", src.display())))?;
    builder
        .finish()
        .map_err(|e| CoreError::Packaging(format!("finalize archive: {e}")))?;
    drop(builder);

    tracing::debug!("packaged {} into {}", src.display(), tmp.path().display());
    Ok(tmp)
}
