//! Persistent per-image selection history
//!
//! Every image that has ever been the active wallpaper gets an [`ImageRecord`]
//! holding its more/less bias and when it was last applied and removed.
//! Records are keyed case-insensitively by path.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Step used by `more`/`less`: each invocation moves 20% of the remaining way
const BIAS_STEP: f64 = 0.8;
/// Biases smaller than this in magnitude snap back to neutral
const BIAS_FLOOR: f64 = 0.1;

/// Selection history of a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    /// 0 = neutral, positive = show more, negative = show less
    #[serde(default)]
    pub bias: f64,
    /// When this image was last set as the wallpaper
    #[serde(default)]
    pub last_applied: Option<DateTime<Utc>>,
    /// When this image last stopped being the wallpaper
    #[serde(default)]
    pub last_removed: Option<DateTime<Utc>>,
}

impl ImageRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bias: 0.0,
            last_applied: None,
            last_removed: None,
        }
    }
}

/// On-disk layout of the history file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryData {
    pub images: Vec<ImageRecord>,
}

/// Image records indexed by normalized path
#[derive(Debug, Clone, Default)]
pub struct History {
    records: BTreeMap<String, ImageRecord>,
}

/// Lookup key for a path: the same file spelled with different case maps to one record
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "wallroll", "wallroll")
            .map(|dirs| dirs.data_dir().join("history.json"))
            .unwrap_or_else(|| PathBuf::from("/tmp/wallroll/history.json"))
    }

    /// Load history, treating a missing file as empty history
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history: {}", path.display()))?;
        let data: HistoryData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history: {}", path.display()))?;

        Ok(Self::from_data(data))
    }

    /// Write through a sibling temp file so an interrupted save never leaves
    /// a truncated history behind
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(&self.to_data())?;
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, content)
            .with_context(|| format!("Failed to write history: {}", staging.display()))?;
        std::fs::rename(&staging, path)
            .with_context(|| format!("Failed to replace history: {}", path.display()))?;

        Ok(())
    }

    fn from_data(data: HistoryData) -> Self {
        let mut history = Self::new();
        for record in data.images {
            // Keep the first spelling if a hand-edited file has case duplicates
            history
                .records
                .entry(path_key(&record.path))
                .or_insert(record);
        }
        history
    }

    fn to_data(&self) -> HistoryData {
        HistoryData {
            images: self.records().cloned().collect(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&ImageRecord> {
        self.records.get(&path_key(path))
    }

    /// Record for `path`, created with neutral history on first use
    pub fn get_or_insert(&mut self, path: &Path) -> &mut ImageRecord {
        self.records
            .entry(path_key(path))
            .or_insert_with(|| ImageRecord::new(path))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.values()
    }
}

/// Move `bias` towards +1 by one step ("show more often")
pub fn more(bias: f64) -> f64 {
    if bias >= 0.0 {
        scale_bias(bias, BIAS_STEP)
    } else {
        -scale_bias(-bias, 1.0 / BIAS_STEP)
    }
}

/// Move `bias` towards -1 by one step ("show less often"). Undoes one `more`.
pub fn less(bias: f64) -> f64 {
    if bias > 0.0 {
        scale_bias(bias, 1.0 / BIAS_STEP)
    } else {
        -scale_bias(-bias, BIAS_STEP)
    }
}

/// 0, 0.20, 0.36, 0.49, 0.59 ... for repeated scaling by 0.8
fn scale_bias(magnitude: f64, scale: f64) -> f64 {
    let scaled = 1.0 - (1.0 - magnitude) * scale;
    if scaled < BIAS_FLOOR {
        0.0
    } else {
        scaled
    }
}

pub fn bias_label(bias: f64) -> String {
    if bias == 0.0 {
        "default".to_string()
    } else if bias > 0.0 {
        format!("more: {:.0}%", bias * 100.0)
    } else {
        format!("less: {:.0}%", -bias * 100.0)
    }
}
