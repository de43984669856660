mod backend;
mod config;
mod error;
mod gnome;
mod history;
mod rotation;
mod scan;
mod selector;
mod swww;
mod utils;

use crate::backend::WallpaperBackend;
use crate::config::{BackendKind, Config, ConfigChanges, SelectionOverrides};
use crate::error::{RotateError, EXIT_ARGS, EXIT_SUCCESS};
use crate::history::History;
use crate::rotation::{Adjust, CurrentImage, NextOptions, NextOutcome, Rotation, Unchanged};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wallroll")]
#[command(author = "MrMattias")]
#[command(version)]
#[command(about = "Wallpaper rotation that favours images you haven't seen in a while")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a different config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use a different history file
    #[arg(long, global = true, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Seed for the random source, for reproducible runs
    #[arg(long, global = true, hide = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick and apply a new wallpaper
    #[command(visible_alias = "n")]
    Next(NextArgs),
    /// Show the current wallpaper less often and switch to a new one
    #[command(visible_alias = "l")]
    Less,
    /// Show the current wallpaper more often
    #[command(visible_alias = "m")]
    More,
    /// Show or change the settings
    #[command(visible_alias = "c")]
    Config {
        /// Percentage of recently shown wallpapers to skip (0-99)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=99))]
        skip_recent: Option<u8>,

        /// Preference for wallpapers not shown for a long time (0 = none)
        #[arg(short, long, value_parser = parse_old_bias)]
        old_bias: Option<f64>,

        /// Minutes before a scheduled run may replace the wallpaper
        #[arg(short, long)]
        min_time: Option<u64>,

        /// Directories, files or masks such as ~/walls/*.jpg
        #[arg(short, long, num_args = 1..)]
        paths: Option<Vec<String>>,
    },
    /// Open the configured wallpaper directories in the file browser
    #[command(visible_alias = "e")]
    Explore,
}

#[derive(Args, Debug, Default)]
struct NextArgs {
    /// Run from a scheduler: honour the minimum time and "more" settings
    #[arg(long)]
    scheduled: bool,

    /// The current wallpaper was not really seen; don't record it as shown
    #[arg(short, long)]
    not_shown: bool,

    /// Ignore more/less settings for this run
    #[arg(short, long)]
    uniform: bool,

    /// Percentage of recently shown wallpapers to skip (0-99)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=99))]
    skip_recent: Option<u8>,

    /// Preference for wallpapers not shown for a long time (0 = none)
    #[arg(short, long, value_parser = parse_old_bias)]
    old_bias: Option<f64>,

    /// Pick from these paths instead of the configured ones
    #[arg(short, long, num_args = 0..)]
    paths: Option<Vec<String>>,
}

impl From<NextArgs> for NextOptions {
    fn from(args: NextArgs) -> Self {
        NextOptions {
            scheduled: args.scheduled,
            not_shown: args.not_shown,
            overrides: SelectionOverrides {
                skip_recent: args.skip_recent,
                old_bias: args.old_bias,
                paths: args.paths,
                uniform: args.uniform,
            },
        }
    }
}

fn parse_old_bias(value: &str) -> Result<f64, String> {
    let bias: f64 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    config::validate_old_bias(bias).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too
            return ExitCode::from(if e.use_stderr() { EXIT_ARGS } else { EXIT_SUCCESS });
        }
    };

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            tracing::debug!("{:?}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(error::exit_code_for(&err))
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("wallroll=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)?;
    tracing::debug!(path = %config_path.display(), "loaded config");

    match cli.command {
        Commands::Config {
            skip_recent,
            old_bias,
            min_time,
            paths,
        } => {
            let changes = ConfigChanges {
                skip_recent,
                old_bias,
                min_time,
                paths,
            };
            cmd_config(&mut config, &config_path, changes)
        }
        Commands::Explore => cmd_explore(&config),
        Commands::Next(args) => {
            let mut session = Session::open(&config, cli.history, cli.seed)?;
            let changed = cmd_next(&mut session.rotation(&config), &args.into())?;
            session.finish(changed)
        }
        Commands::Less => {
            let session = Session::open(&config, cli.history, cli.seed)?;
            run_less(session, &config)
        }
        Commands::More => {
            let mut session = Session::open(&config, cli.history, cli.seed)?;
            let changed = cmd_more(&mut session.rotation(&config))?;
            session.finish(changed)
        }
    }
}

/// Everything a next/less/more run owns; history is written back in `finish`
struct Session {
    history: History,
    history_path: PathBuf,
    backend: Box<dyn WallpaperBackend>,
    rng: StdRng,
    now: DateTime<Utc>,
}

impl Session {
    fn open(config: &Config, history_path: Option<PathBuf>, seed: Option<u64>) -> Result<Self> {
        let history_path = history_path.unwrap_or_else(History::default_path);
        let history = History::load_from(&history_path)?;
        if history.is_empty() {
            tracing::debug!(path = %history_path.display(), "starting with empty history");
        } else {
            tracing::debug!(path = %history_path.display(), images = history.len(), "loaded history");
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            history,
            history_path,
            backend: backend::from_config(config),
            rng,
            now: Utc::now(),
        })
    }

    fn rotation<'a>(&'a mut self, config: &'a Config) -> Rotation<'a> {
        Rotation {
            config,
            history: &mut self.history,
            backend: self.backend.as_ref(),
            rng: &mut self.rng,
            now: self.now,
        }
    }

    fn finish(self, changed: bool) -> Result<()> {
        if changed {
            self.history
                .save_to(&self.history_path)
                .context("could not save history")?;
        }
        Ok(())
    }
}

fn print_current(current: Option<&CurrentImage>) {
    match current {
        Some(current) => {
            println!("Current wallpaper: {}", current.path.display());
            if let Some(applied) = current.last_applied {
                println!(
                    "  applied: {}",
                    applied.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
            println!("  show: {}", history::bias_label(current.bias));
        }
        None => println!("Current wallpaper: unknown"),
    }
}

fn print_outcome(outcome: &NextOutcome) {
    match outcome {
        NextOutcome::Unchanged(Unchanged::MinimumTime { minutes }) => {
            println!(
                "Keeping the current wallpaper: it has been up for less than {} minutes.",
                minutes
            );
        }
        NextOutcome::Unchanged(Unchanged::ShowMore) => {
            println!("Keeping the current wallpaper because it was configured to be shown more frequently.");
        }
        NextOutcome::Applied { selection, warnings } => {
            for warning in warnings {
                eprintln!("Warning: {}", warning);
            }
            for skipped in &selection.skipped {
                println!(
                    "Skipping {} because it was configured to be shown less frequently.",
                    skipped.display()
                );
            }
            println!("Applied next wallpaper: {}.", selection.path.display());
        }
    }
}

fn cmd_next(rotation: &mut Rotation<'_>, options: &NextOptions) -> Result<bool> {
    let current = rotation.current_image()?;
    print_current(current.as_ref());

    let outcome = rotation.next(options, current.as_ref().map(|c| c.path.as_path()))?;
    print_outcome(&outcome);

    Ok(outcome.history_changed())
}

/// Returns whether history changed alongside the result. A failing `next`
/// still leaves the bias change in history, without its partial updates.
fn cmd_less(rotation: &mut Rotation<'_>) -> (bool, Result<()>) {
    let current = match rotation.current_image() {
        Ok(current) => current,
        Err(e) => return (false, Err(e)),
    };
    print_current(current.as_ref());
    let current = current.map(|c| c.path);

    let bias = match rotation.adjust_bias(current.as_deref(), Adjust::Less) {
        Ok(bias) => bias,
        Err(e) => return (false, Err(e.into())),
    };
    println!("This wallpaper will now be shown {}.", describe_bias(bias));

    let adjusted = rotation.history.clone();
    match rotation.next(&NextOptions::default(), current.as_deref()) {
        Ok(outcome) => {
            print_outcome(&outcome);
            (true, Ok(()))
        }
        Err(e) => {
            *rotation.history = adjusted;
            (true, Err(e))
        }
    }
}

fn run_less(mut session: Session, config: &Config) -> Result<()> {
    let (changed, result) = cmd_less(&mut session.rotation(config));
    session.finish(changed)?;
    result
}

fn cmd_more(rotation: &mut Rotation<'_>) -> Result<bool> {
    let current = rotation.current_image()?;
    print_current(current.as_ref());
    let current = current.map(|c| c.path);

    let bias = rotation.adjust_bias(current.as_deref(), Adjust::More)?;
    println!("This wallpaper will now be shown {}.", describe_bias(bias));

    Ok(true)
}

fn describe_bias(bias: f64) -> String {
    match history::bias_label(bias).split_once(": ") {
        Some((direction, amount)) => format!("{} often ({})", direction, amount),
        None => "as often as any other".to_string(),
    }
}

fn backend_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Swww => "swww",
        BackendKind::Gnome => "gnome",
    }
}

fn print_settings(config: &Config, path: &Path) {
    println!("Configuration ({})", path.display());
    println!("==================");
    if config.paths.is_empty() {
        println!("  Paths: none, add some with `wallroll config --paths`");
    } else {
        println!("  Paths:");
        for spec in &config.paths {
            println!("    {}", spec);
        }
    }
    println!("  Skip recent: {}%", config.skip_recent);
    println!("  Old bias: {}", config.old_bias);
    println!("  Minimum time: {} minutes", config.min_time);
    println!("  Recursive: {}", if config.recursive { "yes" } else { "no" });
    println!("  Backend: {}", backend_name(config.backend.kind));
}

fn cmd_config(config: &mut Config, path: &Path, changes: ConfigChanges) -> Result<()> {
    if changes.is_empty() {
        print_settings(config, path);
        return Ok(());
    }

    if let Some(paths) = &changes.paths {
        // reject specifiers that can't be interpreted before they are stored
        let catalog = scan::scan_paths(paths, config.recursive)?;
        for warning in &catalog.warnings {
            eprintln!("Warning: {}", warning);
        }
        println!("Found {} wallpapers.", catalog.files.len());
    }

    if config.apply(changes)? {
        config.save_to(path)?;
        println!("✓ Configuration saved");
    } else {
        println!("Nothing changed");
    }
    print_settings(config, path);

    Ok(())
}

fn cmd_explore(config: &Config) -> Result<()> {
    if config.paths.is_empty() {
        return Err(RotateError::NoPathsConfigured.into());
    }

    for spec in &config.paths {
        let dir = utils::expand_tilde(spec);
        if !dir.is_dir() {
            println!("Skipping {} because it is not a directory.", spec);
            continue;
        }

        Command::new("xdg-open")
            .arg(&dir)
            .spawn()
            .with_context(|| format!("Failed to open {}", dir.display()))?;
        println!("Opened {}", dir.display());
    }

    Ok(())
}
