//! Page dump loading.

use std::fs;
use std::path::{Path, PathBuf};

use quizmap_common::{QuizmapError, Result};
use quizmap_core::PageDump;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Many(Vec<PageDump>),
    One(PageDump),
}

/// Expand directories into their `*.json` files, sorted by file name.
pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let entries = fs::read_dir(input).map_err(|e| QuizmapError::Input {
            path: input.clone(),
            reason: e.to_string(),
        })?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        paths.extend(found);
    }
    Ok(paths)
}

/// Read one dump file holding a page object or an array of them. Pages
/// without a URL are named after the file.
pub fn load_file(path: &Path) -> Result<Vec<PageDump>> {
    let text = fs::read_to_string(path).map_err(|e| QuizmapError::Input {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let parsed: DumpFile = serde_json::from_str(&text).map_err(|e| QuizmapError::Input {
        path: path.to_path_buf(),
        reason: format!("not a page dump: {e}"),
    })?;
    let mut pages = match parsed {
        DumpFile::Many(pages) => pages,
        DumpFile::One(page) => vec![page],
    };
    for page in &mut pages {
        if page.url.is_none() {
            page.url = Some(path.display().to_string());
        }
    }
    Ok(pages)
}

/// Load every input, skipping the ones that fail.
pub fn load_all(inputs: &[PathBuf]) -> Result<Vec<PageDump>> {
    let mut pages = Vec::new();
    for path in collect_paths(inputs)? {
        match load_file(&path) {
            Ok(loaded) => {
                tracing::debug!(path = %path.display(), pages = loaded.len(), "dump loaded");
                pages.extend(loaded);
            }
            Err(err) => tracing::warn!(error = %err, "skipping page dump"),
        }
    }
    Ok(pages)
}
