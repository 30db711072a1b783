use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::core::LoadError;

pub const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/node_modules/**", "**/target/**"];

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub errors: Vec<LoadError>,
}

/// Expands the given paths into snapshot files.
///
/// Files named explicitly are always taken; directories contribute their
/// `*.json` files in sorted order, minus anything matching an exclude.
pub fn snapshot_files(paths: &[PathBuf], excludes: &[String]) -> Result<Discovery> {
    let exclude_set = build_exclude_set(excludes)?;
    let mut out = Discovery::default();
    let mut seen = BTreeSet::new();

    for path in paths {
        if path.is_file() {
            if seen.insert(path.clone()) {
                out.files.push(path.clone());
            }
            continue;
        }
        if !path.is_dir() {
            out.errors.push(LoadError {
                path: path.display().to_string(),
                error: "no such file or directory".to_string(),
            });
            continue;
        }

        let walker = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded(&exclude_set, path, e.path()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    out.errors.push(LoadError {
                        path: err
                            .path()
                            .unwrap_or(path.as_path())
                            .display()
                            .to_string(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            if entry.file_type().is_file()
                && is_snapshot_file(entry.path())
                && seen.insert(entry.path().to_path_buf())
            {
                out.files.push(entry.into_path());
            }
        }
    }

    Ok(out)
}

/// Excludes apply below the walk root, so a root that itself sits under an
/// excluded directory is still walked.
fn is_excluded(set: &GlobSet, root: &Path, path: &Path) -> bool {
    set.is_match(path.strip_prefix(root).unwrap_or(path))
}

fn is_snapshot_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

pub fn validate_excludes(excludes: &[String]) -> Result<()> {
    let _ = build_exclude_set(excludes)?;
    Ok(())
}

fn build_exclude_set(excludes: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in DEFAULT_EXCLUDES.iter().copied().chain(excludes.iter().map(String::as_str)) {
        builder.add(Glob::new(pat).with_context(|| format!("invalid exclude glob: {pat}"))?);
    }
    Ok(builder.build()?)
}
