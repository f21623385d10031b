use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Replace `path` with `content` only once the new content is fully on disk.
///
/// Writes to a sibling temp file, syncs it and renames it over the target, so a
/// crash leaves either the old or the new file, never a partial one.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::other(format!("not a file path: {}", path.display())))?;
    let tmp = dir.join(format!(".{}.tmp", file_name));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Serialize `value` as YAML and write it with [`write_atomic`].
pub fn save_yaml<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| io::Error::other(format!("Failed to serialize {}: {}", path.display(), e)))?;
    write_atomic(path, yaml.as_bytes())
}
