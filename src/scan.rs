//! Resolves configured path specifiers into candidate image files
//!
//! A specifier is a directory (all images directly inside it, or below it when
//! scanning recursively), a single file (taken as-is, whatever its extension),
//! or a directory followed by a file name mask such as `~/walls/autumn-*.jpg`.

use crate::error::RotateError;
use crate::history::path_key;
use crate::utils::{expand_tilde, has_wildcards, is_image_file};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Non-fatal problems found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    NoImagesInDirectory(String),
    NoMaskMatches(String),
    MissingPath(String),
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanWarning::NoImagesInDirectory(spec) => {
                write!(f, "no images found at this path: {}", spec)
            }
            ScanWarning::NoMaskMatches(spec) => write!(f, "no images matched by filter: {}", spec),
            ScanWarning::MissingPath(spec) => write!(f, "no such path: {}", spec),
        }
    }
}

/// Result of a scan: deduplicated canonical paths in specifier order
#[derive(Debug, Default)]
pub struct Catalog {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<ScanWarning>,
}

impl Catalog {
    fn push(&mut self, seen: &mut HashSet<String>, path: PathBuf) -> bool {
        // One spelling per physical file, the same one a backend reports back
        let path = fs::canonicalize(&path).unwrap_or(path);
        if seen.insert(path_key(&path)) {
            self.files.push(path);
            true
        } else {
            false
        }
    }
}

/// Scan every specifier in order. Fails on the first specifier that cannot be
/// interpreted at all; empty directories and masks only produce warnings.
pub fn scan_paths(specs: &[String], recursive: bool) -> Result<Catalog, RotateError> {
    let mut catalog = Catalog::default();
    let mut seen = HashSet::new();

    for spec in specs {
        let path = std::path::absolute(expand_tilde(spec))
            .map_err(|_| RotateError::InvalidPath(spec.clone()))?;

        if path.is_dir() {
            let found = list_images(&path, recursive)
                .map_err(|_| RotateError::InvalidPath(spec.clone()))?;
            if found.is_empty() {
                catalog
                    .warnings
                    .push(ScanWarning::NoImagesInDirectory(spec.clone()));
            }
            for file in found {
                catalog.push(&mut seen, file);
            }
            continue;
        }

        if path.is_file() {
            catalog.push(&mut seen, path);
            continue;
        }

        let parent = path.parent().filter(|p| p.is_dir());
        let name = path.file_name().and_then(|n| n.to_str());
        let (parent, name) = match (parent, name) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return Err(RotateError::InvalidPath(spec.clone())),
        };

        if !has_wildcards(name) {
            catalog.warnings.push(ScanWarning::MissingPath(spec.clone()));
            continue;
        }

        let matches =
            match_mask(parent, name).map_err(|_| RotateError::InvalidPath(spec.clone()))?;
        if matches.is_empty() {
            catalog.warnings.push(ScanWarning::NoMaskMatches(spec.clone()));
        }
        for file in matches {
            catalog.push(&mut seen, file);
        }
    }

    tracing::debug!(
        files = catalog.files.len(),
        warnings = catalog.warnings.len(),
        "scan finished"
    );
    Ok(catalog)
}

/// Image files in `dir`, sorted by path
fn list_images(dir: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = if recursive {
        WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.is_file() && is_image_file(p))
            .collect()
    } else {
        fs::read_dir(dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_file(p))
            .collect()
    };
    files.sort();
    Ok(files)
}

/// Files in `dir` whose name matches the glob `mask`, sorted by path
fn match_mask(dir: &Path, mask: &str) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = Pattern::new(mask)?;
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| pattern.matches_with(n, options))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
