//! One invocation of `next`, `less` or `more` against the desktop
//!
//! History is changed in memory only; the caller saves it once afterwards when
//! the returned outcome says something changed.

use crate::backend::WallpaperBackend;
use crate::config::{Config, SelectionOverrides};
use crate::error::RotateError;
use crate::history::{self, History};
use crate::scan::{scan_paths, ScanWarning};
use crate::selector::{select_next, Selection, SelectionConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct NextOptions {
    /// Invoked by a scheduler: minimum time and "more" may keep the current image
    pub scheduled: bool,
    /// Don't record the current image as removed
    pub not_shown: bool,
    pub overrides: SelectionOverrides,
}

/// What is on screen right now, as far as history knows
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentImage {
    pub path: PathBuf,
    pub last_applied: Option<DateTime<Utc>>,
    pub bias: f64,
}

/// Why a scheduled run left the wallpaper alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unchanged {
    MinimumTime { minutes: u64 },
    ShowMore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    Unchanged(Unchanged),
    Applied {
        selection: Selection,
        warnings: Vec<ScanWarning>,
    },
}

impl NextOutcome {
    /// Whether history must be saved
    pub fn history_changed(&self) -> bool {
        matches!(self, NextOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    More,
    Less,
}

pub struct Rotation<'a> {
    pub config: &'a Config,
    pub history: &'a mut History,
    pub backend: &'a dyn WallpaperBackend,
    pub rng: &'a mut dyn RngCore,
    /// Captured once so every timestamp written by this run is identical
    pub now: DateTime<Utc>,
}

impl<'a> Rotation<'a> {
    /// Ask the backend what is displayed and look it up in history
    pub fn current_image(&self) -> Result<Option<CurrentImage>> {
        let path = self
            .backend
            .current()
            .context("Failed to query the current wallpaper")?;

        Ok(path.map(|path| {
            let record = self.history.get(&path);
            CurrentImage {
                last_applied: record.and_then(|r| r.last_applied),
                bias: record.map(|r| r.bias).unwrap_or(0.0),
                path,
            }
        }))
    }

    /// Pick a new wallpaper and apply it
    pub fn next(&mut self, options: &NextOptions, current: Option<&Path>) -> Result<NextOutcome> {
        let selection = self.config.selection(&options.overrides)?;
        if selection.paths.is_empty() {
            return Err(if options.overrides.paths.is_some() {
                RotateError::EmptyPathList
            } else {
                RotateError::NoPathsConfigured
            }
            .into());
        }

        if let Some(current) = current {
            if options.scheduled {
                if let Some(reason) = self.keep_current(current, &selection) {
                    tracing::debug!(?reason, "leaving current wallpaper");
                    return Ok(NextOutcome::Unchanged(reason));
                }
            }
            if !options.not_shown {
                self.history.get_or_insert(current).last_removed = Some(self.now);
            }
        }

        let catalog = scan_paths(&selection.paths, self.config.recursive)?;
        if catalog.files.is_empty() {
            return Err(RotateError::NoImages.into());
        }

        let chosen = select_next(
            &catalog.files,
            self.history,
            &selection,
            self.now,
            &mut *self.rng,
        )?;

        self.backend
            .apply(&chosen.path)
            .with_context(|| format!("Failed to apply wallpaper {}", chosen.path.display()))?;

        Ok(NextOutcome::Applied {
            selection: chosen,
            warnings: catalog.warnings,
        })
    }

    /// Scheduled-run short-circuit; draws from the rng only for a "more" image
    fn keep_current(&mut self, current: &Path, selection: &SelectionConfig) -> Option<Unchanged> {
        let record = self.history.get(current)?;

        if let Some(applied) = record.last_applied {
            let min_secs = i64::try_from(selection.min_time.saturating_mul(60)).unwrap_or(i64::MAX);
            if (self.now - applied).num_seconds() < min_secs {
                return Some(Unchanged::MinimumTime {
                    minutes: selection.min_time,
                });
            }
        }

        if !selection.uniform && record.bias > 0.0 && self.rng.gen::<f64>() < record.bias {
            return Some(Unchanged::ShowMore);
        }

        None
    }

    /// Apply `more`/`less` to the current image; returns the new bias
    pub fn adjust_bias(&mut self, current: Option<&Path>, adjust: Adjust) -> Result<f64, RotateError> {
        if self.config.paths.is_empty() {
            return Err(RotateError::NoPathsConfigured);
        }
        let current = current.ok_or(RotateError::NoCurrentWallpaper)?;

        let record = self.history.get_or_insert(current);
        record.bias = match adjust {
            Adjust::More => history::more(record.bias),
            Adjust::Less => history::less(record.bias),
        };
        Ok(record.bias)
    }
}
