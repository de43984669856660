use crate::backend::WallpaperBackend;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const PICTURE_URI: &str = "/org/gnome/desktop/background/picture-uri";
const PICTURE_URI_DARK: &str = "/org/gnome/desktop/background/picture-uri-dark";
const PICTURE_OPTIONS: &str = "/org/gnome/desktop/background/picture-options";

/// GNOME desktop background through dconf
pub struct Gnome;

/// Turn a `dconf read` value such as `'file:///home/me/a%20b.jpg'` into a path
pub fn parse_picture_uri(value: &str) -> Option<PathBuf> {
    let uri = value.trim().trim_matches('\'');
    let encoded = uri.strip_prefix("file://")?;
    if encoded.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(encoded).ok()?;
    Some(PathBuf::from(decoded.into_owned()))
}

/// dconf value for `path`, written as given so `current` reports the same spelling
pub fn picture_uri(path: &Path) -> String {
    format!("'file://{}'", path.display())
}

fn dconf_write(key: &str, value: &str) -> Result<()> {
    let output = Command::new("dconf")
        .args(["write", key, value])
        .output()
        .with_context(|| format!("Failed to run dconf write {}", key))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("dconf write {} failed: {}", key, stderr);
    }
    Ok(())
}

impl WallpaperBackend for Gnome {
    fn current(&self) -> Result<Option<PathBuf>> {
        let output = match Command::new("dconf").args(["read", PICTURE_URI]).output() {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("could not run dconf read: {}", e);
                return Ok(None);
            }
        };

        if !output.status.success() {
            return Ok(None);
        }

        Ok(parse_picture_uri(&String::from_utf8_lossy(&output.stdout)))
    }

    fn apply(&self, path: &Path) -> Result<()> {
        let uri = picture_uri(path);

        dconf_write(PICTURE_URI, &uri)?;
        dconf_write(PICTURE_URI_DARK, &uri)?;
        dconf_write(PICTURE_OPTIONS, "'zoom'")?;

        Ok(())
    }
}
