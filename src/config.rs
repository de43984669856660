use crate::error::RotateError;
use crate::selector::SelectionConfig;
use crate::swww::{ResizeMode, Transition, TransitionType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directories, files or `dir/mask*.jpg` specifiers to pick wallpapers from
    #[serde(default)]
    pub paths: Vec<String>,
    /// Percentage of the most recently shown images to skip (0-99)
    #[serde(default = "default_skip_recent")]
    pub skip_recent: u8,
    /// Skews the random selection towards images not shown for a long time
    #[serde(default = "default_old_bias")]
    pub old_bias: f64,
    /// Minutes a wallpaper stays up before a scheduled run may replace it
    #[serde(default = "default_min_time")]
    pub min_time: u64,
    /// Also pick up images in subdirectories of configured directories
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// swww on Wayland compositors
    #[default]
    Swww,
    /// GNOME via dconf
    Gnome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub resize: ResizeMode,
    #[serde(default)]
    pub transition: TransitionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub transition_type: String,
    pub duration: f32,
    pub fps: u32,
}

/// One-shot values from the command line that win over the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionOverrides {
    pub skip_recent: Option<u8>,
    pub old_bias: Option<f64>,
    pub paths: Option<Vec<String>>,
    pub uniform: bool,
}

/// Permanent changes requested through `wallroll config`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigChanges {
    pub skip_recent: Option<u8>,
    pub old_bias: Option<f64>,
    pub min_time: Option<u64>,
    pub paths: Option<Vec<String>>,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn default_skip_recent() -> u8 {
    40
}

fn default_old_bias() -> f64 {
    1.5
}

fn default_min_time() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            skip_recent: default_skip_recent(),
            old_bias: default_old_bias(),
            min_time: default_min_time(),
            recursive: false,
            backend: BackendConfig::default(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            transition_type: "fade".to_string(),
            duration: 1.0,
            fps: 60,
        }
    }
}

pub fn validate_skip_recent(value: u8) -> Result<u8, RotateError> {
    if value > 99 {
        return Err(RotateError::InvalidSetting(format!(
            "skip-recent must be between 0 and 99, got {}",
            value
        )));
    }
    Ok(value)
}

pub fn validate_old_bias(value: f64) -> Result<f64, RotateError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RotateError::InvalidSetting(format!(
            "old-bias must be zero or greater, got {}",
            value
        )));
    }
    Ok(value)
}

impl Config {
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("org", "wallroll", "wallroll")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Load the config, writing out defaults if the file does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Config = toml::from_str(&data).map_err(|e| {
                RotateError::InvalidSetting(format!("{}: {}", path.display(), e.message()))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("creating config directory")?;
        }

        let data = toml::to_string_pretty(self).context("serializing config to toml")?;
        fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), RotateError> {
        validate_skip_recent(self.skip_recent)?;
        validate_old_bias(self.old_bias)?;
        Ok(())
    }

    /// Apply `wallroll config` changes; returns whether anything changed
    pub fn apply(&mut self, changes: ConfigChanges) -> Result<bool, RotateError> {
        let mut updated = self.clone();
        if let Some(skip_recent) = changes.skip_recent {
            updated.skip_recent = validate_skip_recent(skip_recent)?;
        }
        if let Some(old_bias) = changes.old_bias {
            updated.old_bias = validate_old_bias(old_bias)?;
        }
        if let Some(min_time) = changes.min_time {
            updated.min_time = min_time;
        }
        if let Some(paths) = changes.paths {
            updated.paths = paths;
        }

        let changed = updated != *self;
        *self = updated;
        Ok(changed)
    }

    /// Settings for one `next` run: config defaults merged with overrides
    pub fn selection(&self, overrides: &SelectionOverrides) -> Result<SelectionConfig, RotateError> {
        let skip_recent = validate_skip_recent(overrides.skip_recent.unwrap_or(self.skip_recent))?;
        let old_bias = validate_old_bias(overrides.old_bias.unwrap_or(self.old_bias))?;

        Ok(SelectionConfig {
            skip_recent,
            old_bias,
            min_time: self.min_time,
            uniform: overrides.uniform,
            paths: overrides
                .paths
                .clone()
                .unwrap_or_else(|| self.paths.clone()),
        })
    }

    pub fn transition(&self) -> Transition {
        let transition_type = match self.backend.transition.transition_type.as_str() {
            "fade" => TransitionType::Fade,
            "wipe" => TransitionType::Wipe,
            "grow" => TransitionType::Grow,
            "center" => TransitionType::Center,
            "outer" => TransitionType::Outer,
            "none" => TransitionType::None,
            _ => TransitionType::Fade,
        };

        Transition {
            transition_type,
            duration: self.backend.transition.duration,
            fps: self.backend.transition.fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallroll").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.skip_recent, 40);
        assert_eq!(config.old_bias, 1.5);
        assert_eq!(config.min_time, 10);
        assert!(path.exists());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "paths = [\"~/walls\"]\nold_bias = 0.0\n\n[backend]\nkind = \"gnome\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.paths, vec!["~/walls".to_string()]);
        assert_eq!(config.old_bias, 0.0);
        assert_eq!(config.skip_recent, 40);
        assert_eq!(config.backend.kind, BackendKind::Gnome);
        assert_eq!(config.backend.resize, ResizeMode::Crop);
    }

    #[test]
    fn test_out_of_range_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "skip_recent = 100\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RotateError>(),
            Some(RotateError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.paths = vec!["/srv/walls".into(), "/srv/more/*.png".into()];
        config.backend.resize = ResizeMode::Fit;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.paths = vec!["/srv/walls".into()];

        let selection = config.selection(&SelectionOverrides::default()).unwrap();
        assert_eq!(selection.skip_recent, 40);
        assert_eq!(selection.paths, vec!["/srv/walls".to_string()]);
        assert!(!selection.uniform);

        let overrides = SelectionOverrides {
            skip_recent: Some(0),
            old_bias: Some(3.0),
            paths: Some(vec!["/tmp/x".into()]),
            uniform: true,
        };
        let selection = config.selection(&overrides).unwrap();
        assert_eq!(selection.skip_recent, 0);
        assert_eq!(selection.old_bias, 3.0);
        assert_eq!(selection.paths, vec!["/tmp/x".to_string()]);
        assert!(selection.uniform);
    }

    #[test]
    fn test_apply_changes() {
        let mut config = Config::default();
        assert!(!config.apply(ConfigChanges::default()).unwrap());

        let changed = config
            .apply(ConfigChanges {
                min_time: Some(30),
                ..Default::default()
            })
            .unwrap();
        assert!(changed);
        assert_eq!(config.min_time, 30);

        let err = config
            .apply(ConfigChanges {
                old_bias: Some(-1.0),
                min_time: Some(5),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, RotateError::InvalidSetting(_)));
        assert_eq!(config.min_time, 30);
    }

    #[test]
    fn test_unknown_transition_falls_back_to_fade() {
        let mut config = Config::default();
        config.backend.transition.transition_type = "sparkle".into();
        assert!(matches!(config.transition().transition_type, TransitionType::Fade));
    }
}
