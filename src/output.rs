use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::record::Record;

/// Serialize the whole run's records: YAML at `path`, plus a JSON twin of the
/// identical data alongside it with the extension swapped. Both are written
/// only after the run completes, never streamed.
pub fn write_outputs(records: &[Record], path: &Path) -> Result<PathBuf> {
    let yaml = serde_yaml::to_string(records).context("serializing YAML output")?;
    write_atomic(path, yaml.as_bytes())?;

    let json_path = path.with_extension("json");
    let json = serde_json::to_string_pretty(records).context("serializing JSON output")?;
    write_atomic(&json_path, json.as_bytes())?;

    Ok(json_path)
}

/// Write the temp file in the destination directory, then rename over the
/// target, so readers never observe a half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name: OsString = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} into place", tmp.display()))?;
    Ok(())
}
