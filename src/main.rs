use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use hypermodel::analysis::{
    DEFAULT_MAX_AUTO_FREQUENCY, FrequencyChoice, ProgramRequest, ProgramRow, analyze_program,
    generate_program, parse_muscles,
};
use hypermodel::recovery::scaled_recovery_hours;
use hypermodel::server::{self, AppState};
use hypermodel::watcher::{WatcherConfig, watch_calibration};
use hypermodel::wns::wns_breakdown;
use hypermodel::{
    BoutSpec, Calibration, DamageClass, LengthProfile, MuscleProfile, progress, solve_best_volume,
    stimulus,
};

/// Muscle recovery, weekly net stimulus and training volume planner.
#[derive(Parser, Debug)]
#[command(name = "hypermodel")]
#[command(about = "Hypertrophy recovery and stimulus model with a training volume solver")]
#[command(version)]
struct Cli {
    /// Calibration JSON file; the reference calibration is used when omitted.
    #[arg(long, global = true, value_name = "FILE", env = "HYPERMODEL_CALIBRATION")]
    calibration: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Muscle characteristics: a named muscle, explicit classes, or both.
#[derive(clap::Args, Debug)]
struct MuscleArgs {
    /// Muscle name from the reference table (unknown names are neutral).
    #[arg(long)]
    muscle: Option<String>,

    /// Damage class: easy, middle or hard.
    #[arg(long)]
    damage: Option<DamageClass>,

    /// Length profile: lengthened, even or shortened.
    #[arg(long)]
    length: Option<LengthProfile>,
}

impl MuscleArgs {
    fn profile(&self) -> MuscleProfile {
        let base = self
            .muscle
            .as_deref()
            .map(MuscleProfile::for_name)
            .unwrap_or_default();
        MuscleProfile::new(
            self.damage.unwrap_or(base.damage),
            self.length.unwrap_or(base.length),
        )
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hours needed to recover from one bout.
    Recovery {
        sets: u32,
        reps: u32,
        rir: f64,
        #[command(flatten)]
        muscle: MuscleArgs,
        #[arg(long, default_value_t = 1.0)]
        capacity: f64,
    },
    /// Effective sets and gross stimulus of one bout.
    Stimulus { sets: u32, reps: u32, rir: f64 },
    /// Weekly net stimulus for a frequency, gross stimulus and recovery time.
    Wns {
        frequency: u32,
        gross_stimulus: f64,
        recovery_hours: f64,
    },
    /// Next load from the last session's weight and reps.
    Progress {
        weight: f64,
        reps: u32,
        #[arg(long, default_value_t = 6)]
        min: u32,
        #[arg(long, default_value_t = 10)]
        max: u32,
    },
    /// Best sets/reps/RIR for one muscle.
    Solve {
        #[command(flatten)]
        muscle: MuscleArgs,
        #[arg(long, default_value_t = 2)]
        frequency: u32,
        #[arg(long, default_value_t = 60)]
        minutes: u32,
        #[arg(long)]
        priority: bool,
        #[arg(long, default_value_t = 1.0)]
        capacity: f64,
    },
    /// Plan a program for several muscles.
    Generate {
        /// Comma-separated muscles (default: all).
        #[arg(long, value_delimiter = ',')]
        muscles: Vec<String>,
        /// Comma-separated priority muscles.
        #[arg(long, value_delimiter = ',')]
        priority: Vec<String>,
        #[arg(long, default_value_t = 60)]
        minutes: u32,
        #[arg(long, default_value_t = 1.0)]
        capacity: f64,
        /// Fixed sessions per week; chosen per muscle when omitted.
        #[arg(long)]
        frequency: Option<u32>,
        #[arg(long, default_value_t = DEFAULT_MAX_AUTO_FREQUENCY)]
        max_frequency: u32,
    },
    /// Audit a program given as a JSON array of rows.
    Analyze {
        #[arg(long, value_name = "FILE.json")]
        program: PathBuf,
    },
    /// Print the active calibration as JSON.
    Calibration,
    /// Run the web server.
    Serve {
        #[arg(long, env = "HYPERMODEL_PORT", default_value = "8080")]
        port: u16,
        /// Directory with frontend files (default: ./static or next to the executable).
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let calibration = load_calibration(cli.calibration.as_deref())?;

    match cli.command {
        Command::Recovery {
            sets,
            reps,
            rir,
            muscle,
            capacity,
        } => {
            let profile = muscle.profile();
            let bout = BoutSpec::new(sets, reps, rir, profile)?;
            let hours = scaled_recovery_hours(&calibration, &bout, capacity)?;
            println!(
                "{} x {} @ {} RIR ({}, {}): {:.1} hours to recover",
                sets, reps, rir, profile.damage, profile.length, hours
            );
        }
        Command::Stimulus { sets, reps, rir } => {
            let bout = BoutSpec::new(sets, reps, rir, MuscleProfile::NEUTRAL)?;
            let score = stimulus(&calibration, &bout);
            println!("Effective sets: {:.2}", score.effective_sets);
            println!("Gross stimulus: {:.3}", score.gross_stimulus);
        }
        Command::Wns {
            frequency,
            gross_stimulus,
            recovery_hours,
        } => {
            let b = wns_breakdown(&calibration, frequency, gross_stimulus, recovery_hours)?;
            println!("Cycle:          {:.1} hours", b.cycle_hours);
            println!("Penalty factor: {:.3}", b.penalty_factor);
            println!("Atrophy loss:   {:.3}", b.atrophy_loss);
            println!("Net per bout:   {:.3}", b.net_per_bout);
            println!("Weekly WNS:     {:.3}", b.weekly);
        }
        Command::Progress {
            weight,
            reps,
            min,
            max,
        } => {
            let result = progress(weight, reps, min, max)?;
            println!("{}: {:.1} kg", result.action, result.new_weight);
            println!("{}", result.explanation);
        }
        Command::Solve {
            muscle,
            frequency,
            minutes,
            priority,
            capacity,
        } => {
            let best = solve_best_volume(
                &calibration,
                muscle.profile(),
                frequency,
                minutes,
                priority,
                capacity,
            )?;
            println!(
                "{} sets x {} reps @ {} RIR, {}x/week",
                best.sets, best.reps, best.rir, frequency
            );
            println!("Recovery: {:.1} hours", best.recovery_hours);
            println!("WNS:      {:.3}", best.wns);
        }
        Command::Generate {
            muscles,
            priority,
            minutes,
            capacity,
            frequency,
            max_frequency,
        } => {
            let request = ProgramRequest {
                muscles: resolve_muscles(&muscles, true),
                session_minutes: minutes,
                priority: resolve_muscles(&priority, false),
                recovery_capacity: capacity,
                frequency: match frequency {
                    Some(frequency) => FrequencyChoice::Fixed { frequency },
                    None => FrequencyChoice::Auto { max_frequency },
                },
            };
            print_program(&generate_program(&calibration, &request)?);
        }
        Command::Analyze { program } => {
            let rows = load_program(&program)?;
            let report = analyze_program(&calibration, &rows)?;

            println!(
                "{:12} {:20} {:>9} {:>7} {:>8} {:>7}",
                "Muscle", "Exercise", "Recovery", "Cycle", "Stimulus", "WNS"
            );
            for score in &report.scores {
                println!(
                    "{:12} {:20} {:>8.1}h {:>6.1}h {:>8.3} {:>7.3}",
                    score.muscle,
                    score.exercise,
                    score.recovery_hours,
                    score.cycle_hours,
                    score.gross_stimulus,
                    score.wns
                );
            }

            println!();
            if report.is_clean() {
                println!("No issues found.");
            }
            for finding in &report.findings {
                println!("- {}", finding);
            }
        }
        Command::Calibration => {
            println!("{}", serde_json::to_string_pretty(&calibration)?);
        }
        Command::Serve { port, static_dir } => {
            serve(calibration, cli.calibration, port, static_dir).await?;
        }
    }

    Ok(())
}

fn load_calibration(path: Option<&Path>) -> Result<Calibration> {
    match path {
        Some(path) => {
            let calibration = Calibration::load(path)
                .with_context(|| format!("Failed to load calibration from {}", path.display()))?;
            log::info!("Loaded calibration from {}", path.display());
            Ok(calibration)
        }
        None => Ok(Calibration::default()),
    }
}

fn load_program(path: &Path) -> Result<Vec<ProgramRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    let rows: Vec<ProgramRow> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid program format in {}", path.display()))?;
    if rows.is_empty() {
        bail!("Program {} has no rows", path.display());
    }
    Ok(rows)
}

/// Parses muscle names, warning about unknown ones.
///
/// An empty list means every muscle when `all_if_empty` is set.
fn resolve_muscles(names: &[String], all_if_empty: bool) -> Vec<hypermodel::Muscle> {
    if names.is_empty() && all_if_empty {
        return hypermodel::Muscle::all().to_vec();
    }
    let (muscles, unknown) = parse_muscles(names);
    for name in unknown {
        log::warn!("Skipping unknown muscle: {}", name);
    }
    muscles
}

fn print_program(entries: &[hypermodel::analysis::ProgramEntry]) {
    println!(
        "{:12} {:>5} {:>5} {:>4} {:>5} {:>9} {:>7} {:>7}  Status",
        "Muscle", "Freq", "Sets", "Reps", "RIR", "Recovery", "Cycle", "WNS"
    );
    for e in entries {
        println!(
            "{:12} {:>5} {:>5} {:>4} {:>5} {:>8.1}h {:>6.1}h {:>7.3}  {}",
            e.muscle.display_name(),
            e.frequency,
            e.sets,
            e.reps,
            e.rir,
            e.recovery_hours,
            e.cycle_hours,
            e.wns,
            e.status
        );
        println!("{:12} {}", "", e.exercises.join(", "));
    }
}

async fn serve(
    calibration: Calibration,
    calibration_path: Option<PathBuf>,
    port: u16,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let calibration_path = calibration_path
        .map(|p| {
            p.canonicalize()
                .with_context(|| format!("Failed to resolve path: {}", p.display()))
        })
        .transpose()?;

    let state = Arc::new(AppState::new(calibration, calibration_path.clone()));

    let static_dir = static_dir.or_else(find_static_dir);
    match &static_dir {
        Some(dir) => println!("Static files: {}", dir.display()),
        None => println!("No static directory found, serving API only"),
    }

    if let Some(path) = calibration_path {
        let watcher_state = state.clone();
        tokio::spawn(async move {
            let config = WatcherConfig::default();
            let retry_config = config.clone();

            if let Err(e) = watch_calibration(&path, config, move || {
                let state = watcher_state.clone();
                let config = retry_config.clone();
                tokio::spawn(async move {
                    server::reload_calibration(&state, &config).await;
                });
            })
            .await
            {
                log::error!("Calibration watcher error: {}", e);
            }
        });
        println!("Live reload enabled - watching calibration file");
    }

    server::run_server(state, port, static_dir).await
}

/// Finds the static directory for serving frontend files.
fn find_static_dir() -> Option<PathBuf> {
    let cwd_static = PathBuf::from("static");
    if cwd_static.is_dir() {
        return Some(cwd_static);
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let exe_static = exe_dir.join("static");
        if exe_static.is_dir() {
            return Some(exe_static);
        }
    }

    None
}
