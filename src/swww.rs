use crate::backend::WallpaperBackend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Transition {
    pub transition_type: TransitionType,
    pub duration: f32,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum TransitionType {
    Fade,
    Wipe,
    Grow,
    Center,
    Outer,
    None,
}

/// How to resize/fit the wallpaper to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Resize to fill the screen, cropping parts that don't fit (default)
    #[default]
    Crop,
    /// Resize to fit inside the screen, preserving aspect ratio (adds padding)
    Fit,
    /// Don't resize, center the image (adds padding if smaller)
    No,
    /// Stretch to fill (distorts aspect ratio)
    Stretch,
}

impl ResizeMode {
    fn as_str(&self) -> &'static str {
        match self {
            ResizeMode::Crop => "crop",
            ResizeMode::Fit => "fit",
            ResizeMode::No => "no",
            ResizeMode::Stretch => "stretch",
        }
    }
}

impl TransitionType {
    fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Fade => "fade",
            TransitionType::Wipe => "wipe",
            TransitionType::Grow => "grow",
            TransitionType::Center => "center",
            TransitionType::Outer => "outer",
            TransitionType::None => "none",
        }
    }
}

/// Sets the same image on every output through swww
pub struct Swww {
    pub transition: Transition,
    pub resize_mode: ResizeMode,
}

/// Initialize swww daemon if not running
pub fn ensure_daemon() -> Result<()> {
    let status = Command::new("swww").arg("query").output();

    match status {
        Ok(output) if output.status.success() => Ok(()),
        _ => {
            tracing::debug!("swww query failed, starting swww-daemon");
            Command::new("swww-daemon")
                .spawn()
                .context("Failed to start swww-daemon")?;

            // Give it a moment to initialize
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(())
        }
    }
}

/// Image shown on the first output in `swww query` output, if any.
///
/// Lines look like
/// `eDP-1: 1920x1080, scale: 1, currently displaying: image: /path/to/file.jpg`
/// (newer releases prefix the line with `: `). Outputs showing a plain color
/// are skipped.
pub fn parse_query(stdout: &str) -> Option<PathBuf> {
    const MARKER: &str = "currently displaying: image: ";

    stdout
        .lines()
        .filter_map(|line| line.split_once(MARKER).map(|(_, path)| path.trim()))
        .find(|path| !path.is_empty())
        .map(PathBuf::from)
}

impl WallpaperBackend for Swww {
    fn current(&self) -> Result<Option<PathBuf>> {
        let output = match Command::new("swww").arg("query").output() {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("could not run swww query: {}", e);
                return Ok(None);
            }
        };

        if !output.status.success() {
            // daemon not running means nothing is displayed through swww
            return Ok(None);
        }

        Ok(parse_query(&String::from_utf8_lossy(&output.stdout)))
    }

    fn apply(&self, path: &Path) -> Result<()> {
        ensure_daemon()?;

        let mut cmd = Command::new("swww");
        cmd.arg("img")
            .arg(path)
            .arg("--resize")
            .arg(self.resize_mode.as_str())
            .arg("--transition-type")
            .arg(self.transition.transition_type.as_str())
            .arg("--transition-duration")
            .arg(self.transition.duration.to_string())
            .arg("--transition-fps")
            .arg(self.transition.fps.to_string());

        let output = cmd.output().context("Failed to run swww")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("swww failed: {}", stderr);
        }

        Ok(())
    }
}
