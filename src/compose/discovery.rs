use anyhow::Result;
use glob::glob;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Name of the per-project directory holding compose file, env and commands.
pub const PROJECT_DIR: &str = ".dip";

/// Walk up from `start` to the first directory containing a `.dip` directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Find compose files directly inside `dir`, in the order compose itself prefers.
/// Filters out filenames containing prod/staging/production.
pub fn find_compose_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let patterns = [
        "compose*.yaml",
        "compose*.yml",
        "docker-compose*.yaml",
        "docker-compose*.yml",
    ];

    let excluded = ["prod", "staging", "production"];

    let mut result = Vec::new();

    for pattern in &patterns {
        let full_pattern = dir.join(pattern).to_string_lossy().to_string();
        let mut found = BTreeSet::new();
        for entry in glob(&full_pattern)? {
            let path = entry?;
            if path.is_file() {
                let filename = path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_lowercase();
                let dominated = excluded.iter().any(|ex| filename.contains(ex));
                if !dominated {
                    found.insert(path);
                }
            }
        }
        result.extend(found);
    }

    Ok(result)
}
