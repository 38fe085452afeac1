use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    Ok(())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

pub fn write_string(path: &Path, data: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, data).with_context(|| format!("failed to write file: {}", path.display()))
}

pub fn file_basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| path.to_string())
}

/// Output target directory name for a paper: lowercase stem with spaces
/// replaced by underscores.
pub fn normalized_document_stem(filename: &str) -> String {
    let normalized = filename.trim().to_lowercase().replace(' ', "_");
    Path::new(&normalized)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_document_stem_lowercases_and_strips_extension() {
        assert_eq!(
            normalized_document_stem("High resolution measurement.pdf"),
            "high_resolution_measurement"
        );
        assert_eq!(normalized_document_stem("paper"), "paper");
    }

    #[test]
    fn file_basename_keeps_sentinel() {
        assert_eq!(file_basename("out/generated_domains/io-1-ab.txt"), "io-1-ab.txt");
        assert_eq!(file_basename("NA"), "NA");
    }
}
