//! Desktop integration: reading and setting the current wallpaper

use crate::config::{BackendKind, Config};
use crate::gnome::Gnome;
use crate::swww::Swww;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub trait WallpaperBackend {
    /// File currently shown as the wallpaper, if it can be determined
    fn current(&self) -> Result<Option<PathBuf>>;

    /// Make `path` the wallpaper. Failures are reported, never retried.
    fn apply(&self, path: &Path) -> Result<()>;
}

pub fn from_config(config: &Config) -> Box<dyn WallpaperBackend> {
    match config.backend.kind {
        BackendKind::Swww => Box::new(Swww {
            transition: config.transition(),
            resize_mode: config.backend.resize,
        }),
        BackendKind::Gnome => Box::new(Gnome),
    }
}
