use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::ordering::compare_names;
use crate::gallery::MANIFEST_FILE;

/// Result documents directly inside `dir`, in numeric-key order.
pub fn discover_results(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list result directory {}", dir.display()))?;

    let mut found: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !is_json {
            continue;
        }
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        if name == MANIFEST_FILE {
            continue;
        }
        found.push((name, path));
    }

    found.sort_by(|(a, _), (b, _)| compare_names(a, b));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
