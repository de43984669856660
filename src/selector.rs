//! Weighted random choice of the next wallpaper
//!
//! Scoring works on "age": seconds since an image was last removed from the
//! screen. Images that were never removed are treated as `1 + old_bias` times
//! older than the oldest real removal, so new files surface quickly without
//! swamping everything else. The most recently removed `skip_recent`% are left
//! out entirely (never-removed images are always kept), and the rest are drawn
//! with weight `0.001 + age * old_bias`.
//!
//! An image with a negative ("less") bias may be rejected after being drawn.
//! It is then recorded as shown-and-removed right away and the draw repeats
//! without it.

use crate::error::RotateError;
use crate::history::{path_key, History};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Floor weight so every eligible image stays selectable
const MIN_WEIGHT: f64 = 0.001;

/// Settings for one invocation: configured defaults merged with one-shot overrides
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Percentage (0-99) of the most recently shown images to leave out
    pub skip_recent: u8,
    /// How strongly to favour images that have not been shown for a long time
    pub old_bias: f64,
    /// Minimum minutes an image stays up before a scheduled run may replace it
    pub min_time: u64,
    /// Ignore more/less tweaks for this run
    pub uniform: bool,
    pub paths: Vec<String>,
}

/// Outcome of a selection round
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub path: PathBuf,
    /// Images drawn first but rejected because of their "less" bias
    pub skipped: Vec<PathBuf>,
}

/// A candidate that survived the recency cutoff
#[derive(Debug, Clone)]
struct Eligible<'a> {
    path: &'a Path,
    never_removed: bool,
    weight: f64,
}

/// Number of images kept, oldest first, before never-removed images are added back
pub fn keep_count(total: usize, skip_recent: u8) -> usize {
    let keep_percent = 100 - usize::from(skip_recent.min(99));
    (total * keep_percent).div_ceil(100)
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Apply the recency cutoff and weight what remains
fn eligible<'a>(
    candidates: &[&'a Path],
    history: &History,
    config: &SelectionConfig,
    now: DateTime<Utc>,
) -> Vec<Eligible<'a>> {
    let removed: Vec<Option<DateTime<Utc>>> = candidates
        .iter()
        .map(|path| history.get(path).and_then(|r| r.last_removed))
        .collect();

    let oldest = removed.iter().flatten().min().copied().unwrap_or(now);
    let never_removed_age = seconds_between(oldest, now) * (1.0 + config.old_bias);

    let mut aged: Vec<(&'a Path, Option<DateTime<Utc>>, f64)> = candidates
        .iter()
        .zip(removed)
        .map(|(path, removed)| {
            let age = removed
                .map(|at| seconds_between(at, now))
                .unwrap_or(never_removed_age);
            (*path, removed, age)
        })
        .collect();

    // Oldest first; the sort is stable so ties keep scan order
    aged.sort_by(|a, b| b.2.total_cmp(&a.2));

    let keep = keep_count(aged.len(), config.skip_recent);
    aged.into_iter()
        .enumerate()
        .filter(|(i, (_, removed, _))| *i < keep || removed.is_none())
        .map(|(_, (path, removed, age))| Eligible {
            path,
            never_removed: removed.is_none(),
            weight: MIN_WEIGHT + age.max(0.0) * config.old_bias,
        })
        .collect()
}

/// Inverse-CDF draw over the weights; `entries` must not be empty
fn pick_weighted<R: Rng + ?Sized>(entries: &[Eligible<'_>], rng: &mut R) -> usize {
    let total: f64 = entries.iter().map(|e| e.weight).sum();
    let roll = rng.gen::<f64>() * total;

    let mut cumulative = 0.0;
    for (i, entry) in entries.iter().enumerate() {
        cumulative += entry.weight;
        if roll <= cumulative {
            return i;
        }
    }
    entries.len() - 1
}

/// Choose the next wallpaper among `candidates`.
///
/// Mutates `history`: the chosen image gets `last_applied = now` (its record is
/// created if needed) and every image rejected for its "less" bias gets both
/// timestamps set to `now`. Marking the previously displayed image as removed
/// is the caller's job.
///
/// Each rejection removes that image from the pool for the rest of the call,
/// so this always terminates; if every candidate gets rejected the result is
/// [`RotateError::NoImages`].
pub fn select_next<R: Rng + ?Sized>(
    candidates: &[PathBuf],
    history: &mut History,
    config: &SelectionConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Selection, RotateError> {
    let mut remaining: Vec<&Path> = candidates.iter().map(PathBuf::as_path).collect();
    let mut skipped = Vec::new();

    loop {
        let pool = eligible(&remaining, history, config, now);
        if pool.is_empty() {
            return Err(RotateError::NoImages);
        }

        let pick = &pool[pick_weighted(&pool, rng)];
        tracing::debug!(
            path = %pick.path.display(),
            weight = pick.weight,
            never_removed = pick.never_removed,
            pool = pool.len(),
            "provisional pick"
        );
        let chosen = pick.path.to_path_buf();

        let record = history.get_or_insert(&chosen);
        if !config.uniform && record.bias < 0.0 && rng.gen::<f64>() < -record.bias {
            record.last_applied = Some(now);
            record.last_removed = Some(now);

            let key = path_key(&chosen);
            remaining.retain(|p| path_key(p) != key);
            skipped.push(chosen);
            continue;
        }

        record.last_applied = Some(now);
        return Ok(Selection {
            path: chosen,
            skipped,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn config(skip_recent: u8, old_bias: f64) -> SelectionConfig {
        SelectionConfig {
            skip_recent,
            old_bias,
            min_time: 10,
            uniform: false,
            paths: Vec::new(),
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/walls/{}", n))).collect()
    }

    fn removed_ago(history: &mut History, path: &Path, minutes: i64) {
        history.get_or_insert(path).last_removed = Some(now() - Duration::minutes(minutes));
    }

    fn eligible_names(
        candidates: &[PathBuf],
        history: &History,
        config: &SelectionConfig,
    ) -> Vec<String> {
        let refs: Vec<&Path> = candidates.iter().map(PathBuf::as_path).collect();
        let mut names: Vec<String> = eligible(&refs, history, config, now())
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_keep_count() {
        assert_eq!(keep_count(10, 0), 10);
        assert_eq!(keep_count(10, 40), 6);
        assert_eq!(keep_count(3, 40), 2);
        assert_eq!(keep_count(1000, 99), 10);
        assert_eq!(keep_count(5, 99), 1);
        assert_eq!(keep_count(1, 99), 1);
        assert_eq!(keep_count(0, 40), 0);
    }

    #[test]
    fn test_skip_zero_keeps_everything() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut history = History::new();
        for (i, f) in files.iter().enumerate() {
            removed_ago(&mut history, f, i as i64 + 1);
        }
        assert_eq!(eligible_names(&files, &history, &config(0, 1.5)).len(), 3);
    }

    #[test]
    fn test_recent_images_are_excluded() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        let mut history = History::new();
        removed_ago(&mut history, &files[0], 1);
        removed_ago(&mut history, &files[1], 400);
        removed_ago(&mut history, &files[2], 5);
        removed_ago(&mut history, &files[3], 90);

        assert_eq!(
            eligible_names(&files, &history, &config(50, 1.5)),
            vec!["b.jpg", "d.jpg"]
        );
    }

    #[test]
    fn test_never_removed_images_survive_cutoff() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg", "f.jpg"]);
        let mut history = History::new();
        removed_ago(&mut history, &files[0], 3);
        removed_ago(&mut history, &files[1], 2);
        removed_ago(&mut history, &files[2], 1);
        // applied but never removed still counts as never removed
        history.get_or_insert(&files[3]).last_applied = Some(now());

        assert_eq!(
            eligible_names(&files, &history, &config(99, 1.5)),
            vec!["d.jpg", "e.jpg", "f.jpg"]
        );
    }

    #[test]
    fn test_weights_follow_age() {
        let files = paths(&["old.jpg", "new.jpg"]);
        let mut history = History::new();
        removed_ago(&mut history, &files[0], 100);
        let refs: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        let pool = eligible(&refs, &history, &config(0, 1.5), now());

        // never removed: (1 + 1.5) times the oldest age of 6000s
        assert_eq!(pool[0].path, files[1].as_path());
        assert!((pool[0].weight - (0.001 + 15_000.0 * 1.5)).abs() < 1e-6);
        assert!((pool[1].weight - (0.001 + 6_000.0 * 1.5)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_old_bias_is_uniform() {
        let files = paths(&["a.jpg", "b.jpg"]);
        let mut history = History::new();
        removed_ago(&mut history, &files[0], 500);
        let refs: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        let pool = eligible(&refs, &history, &config(0, 0.0), now());
        assert!(pool.iter().all(|e| (e.weight - MIN_WEIGHT).abs() < 1e-12));
    }

    #[test]
    fn test_weighted_draw_converges_to_ratio() {
        let a = PathBuf::from("/walls/a.jpg");
        let b = PathBuf::from("/walls/b.jpg");
        let pool = vec![
            Eligible { path: &a, never_removed: false, weight: 1.0 },
            Eligible { path: &b, never_removed: false, weight: 3.0 },
        ];

        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 2];
        for _ in 0..40_000 {
            counts[pick_weighted(&pool, &mut rng)] += 1;
        }
        let ratio = counts[1] as f64 / counts[0] as f64;
        assert!((ratio - 3.0).abs() < 0.15, "ratio was {}", ratio);
    }

    #[test]
    fn test_selection_creates_record_only_for_chosen() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut history = History::new();
        let mut rng = StdRng::seed_from_u64(1);

        let selection = select_next(&files, &mut history, &config(40, 1.5), now(), &mut rng).unwrap();

        assert!(files.contains(&selection.path));
        assert!(selection.skipped.is_empty());
        assert_eq!(history.len(), 1);
        let record = history.get(&selection.path).unwrap();
        assert_eq!(record.last_applied, Some(now()));
        assert_eq!(record.last_removed, None);
    }

    #[test]
    fn test_second_round_respects_new_removal() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg"]);
        let cfg = config(40, 1.5);
        let mut history = History::new();
        let mut rng = StdRng::seed_from_u64(3);

        let first = select_next(&files, &mut history, &cfg, now(), &mut rng).unwrap();
        // what the invocation path does before the next run
        let removed_at = now() + Duration::minutes(30);
        history.get_or_insert(&first.path).last_removed = Some(removed_at);
        let later = removed_at + Duration::minutes(60);

        // 3 images at 40% skip keep 2, and both never-removed ones sort older
        for _ in 0..20 {
            let mut round = history.clone();
            let second = select_next(&files, &mut round, &cfg, later, &mut rng).unwrap();
            assert_ne!(second.path, first.path);
        }
    }

    #[test]
    fn test_full_less_bias_is_always_rejected() {
        let files = paths(&["hated.jpg", "fine.jpg"]);
        let mut base = History::new();
        base.get_or_insert(&files[0]).bias = -1.0;

        let mut saw_skip = false;
        for seed in 0..30 {
            let mut history = base.clone();
            let mut rng = StdRng::seed_from_u64(seed);
            let selection =
                select_next(&files, &mut history, &config(0, 1.5), now(), &mut rng).unwrap();

            assert_eq!(selection.path, files[1]);
            if !selection.skipped.is_empty() {
                saw_skip = true;
                assert_eq!(selection.skipped, vec![files[0].clone()]);
                let hated = history.get(&files[0]).unwrap();
                assert_eq!(hated.last_applied, Some(now()));
                assert_eq!(hated.last_removed, Some(now()));
            }
        }
        assert!(saw_skip);
    }

    #[test]
    fn test_only_rejected_candidate_is_no_images() {
        let files = paths(&["hated.jpg"]);
        let mut history = History::new();
        history.get_or_insert(&files[0]).bias = -1.0;
        let mut rng = StdRng::seed_from_u64(0);

        let err = select_next(&files, &mut history, &config(40, 1.5), now(), &mut rng).unwrap_err();
        assert!(matches!(err, RotateError::NoImages));
    }

    #[test]
    fn test_uniform_ignores_less_bias() {
        let files = paths(&["hated.jpg"]);
        let mut history = History::new();
        history.get_or_insert(&files[0]).bias = -1.0;
        let mut cfg = config(40, 1.5);
        cfg.uniform = true;
        let mut rng = StdRng::seed_from_u64(0);

        let selection = select_next(&files, &mut history, &cfg, now(), &mut rng).unwrap();
        assert_eq!(selection.path, files[0]);
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn test_empty_candidates_is_no_images() {
        let mut history = History::new();
        let mut rng = StdRng::seed_from_u64(0);
        let err = select_next(&[], &mut history, &config(0, 1.5), now(), &mut rng).unwrap_err();
        assert!(matches!(err, RotateError::NoImages));
        assert!(history.is_empty());
    }

    #[test]
    fn test_same_seed_same_choice() {
        let files = paths(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
        let pick = |seed| {
            let mut history = History::new();
            let mut rng = StdRng::seed_from_u64(seed);
            select_next(&files, &mut history, &config(40, 1.5), now(), &mut rng)
                .unwrap()
                .path
        };
        assert_eq!(pick(42), pick(42));
    }
}
