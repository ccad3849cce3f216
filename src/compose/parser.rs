use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::model::ComposeFile;

/// Parse a compose YAML file into a ComposeFile struct.
pub fn parse_compose_file(path: &Path) -> Result<ComposeFile> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let compose: ComposeFile = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse YAML in {}", path.display()))?;
    Ok(compose)
}

/// Project name compose would use: top-level `name:`, else the file's directory.
pub fn project_name(compose: &ComposeFile, file_path: &Path) -> String {
    let raw = compose.name.clone().unwrap_or_else(|| {
        file_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    });
    normalize_project_name(&raw)
}

/// Compose lowercases project names and drops characters outside `[a-z0-9_-]`.
pub fn normalize_project_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Parse `KEY=VALUE` lines, skipping blanks and `#` comments.
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
