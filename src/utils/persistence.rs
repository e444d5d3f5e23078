use crate::core::errors::SessionError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `value` as pretty-printed JSON
///
/// The JSON goes to a sibling temp file first and is renamed over `path`,
/// so readers never observe a half-written artifact. The temp file is removed
/// again if any step after its creation fails.
pub fn write_pretty_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), SessionError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let mut tmp_file = File::create(&tmp)?;
    let written = write_and_sync(&mut tmp_file, json.as_bytes());
    drop(tmp_file);

    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!(path = %path.display(), bytes = json.len(), "output written");
    Ok(())
}

fn write_and_sync(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
