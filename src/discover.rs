//! Document discovery for batch runs.
//!
//! Walks the input directory recursively and keeps files whose extension is
//! in the configured list. Version-control and build directories are skipped,
//! as are reports this tool wrote on a previous run.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/target/**",
    "**/node_modules/**",
    "**/*_general_report.md",
    "**/*_interview_report.md",
    "**/batch_analysis_summary_*.md",
];

/// Sorted paths of every matching file under `root`.
pub fn find_documents(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Input directory does not exist: {}", root.display());
    }

    let include_patterns: Vec<String> = extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| ext.len() > 1)
        .map(|ext| format!("**/*{}", ext))
        .collect();
    if include_patterns.is_empty() {
        bail!("No file extensions given");
    }
    let include_set = build_globset(&include_patterns)?;

    let excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
    let exclude_set = build_globset(&excludes)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();

        if exclude_set.is_match(rel_str.as_ref()) {
            continue;
        }
        if !include_set.is_match(rel_str.as_ref()) {
            continue;
        }
        documents.push(path.to_path_buf());
    }

    documents.sort();
    tracing::debug!(root = %root.display(), found = documents.len(), "Discovery complete");
    Ok(documents)
}

/// `"txt"` and `".txt"` both become `".txt"`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
