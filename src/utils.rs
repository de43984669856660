use std::path::{Path, PathBuf};

/// Extensions picked up when scanning a directory (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Characters that turn the last component of a path specifier into a mask
const WILDCARDS: &[char] = &['*', '?', '['];

/// Check if a path has one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_lowercase();
            IMAGE_EXTENSIONS.iter().any(|&supported| supported == ext)
        })
        .unwrap_or(false)
}

/// Check if a file name contains glob wildcards
pub fn has_wildcards(name: &str) -> bool {
    name.contains(WILDCARDS)
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
