//! Program-level analysis built on the recovery, stimulus and WNS models.
//!
//! Two entry points:
//! - [`analyze_program`] audits a user-written program row by row;
//! - [`generate_program`] plans sets, reps and RIR for a list of muscles.
//!
//! Rows and muscles are independent, so both fan out with rayon and collect
//! results back in input order.

use std::collections::HashSet;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::domain::{BoutSpec, Muscle, MuscleProfile};
use crate::error::ModelError;
use crate::recovery::recovery_hours;
use crate::solver::{evaluate_bout, solve_best_volume, trim_sets_to_cycle};
use crate::stimulus::stimulus;
use crate::wns::wns_breakdown;

/// The last set may add at most this fraction of recovery time before it is
/// flagged as junk volume.
const HIGH_VOLUME_MARGINAL_FATIGUE: f64 = 0.15;

/// Sets per bout above which marginal fatigue is checked.
const HIGH_VOLUME_MIN_SETS: u32 = 4;

/// Reps above which near-failure sets cause disproportionate metabolic fatigue.
const METABOLIC_REPS: u32 = 15;
const METABOLIC_MAX_RIR: f64 = 2.0;

/// Weekly stimulus below which a muscle likely loses ground to atrophy.
const LOW_STIMULUS_WNS: f64 = 1.0;

/// Highest frequency tried when the generator picks one automatically.
pub const DEFAULT_MAX_AUTO_FREQUENCY: u32 = 4;

// === Program analyzer ===

/// One row of a user program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRow {
    pub muscle: String,
    #[serde(default)]
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    pub rir: f64,
    pub frequency: u32,
}

/// Computed metrics for one program row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowScore {
    pub muscle: String,
    pub exercise: String,
    pub recovery_hours: f64,
    pub cycle_hours: f64,
    pub effective_sets: f64,
    pub gross_stimulus: f64,
    pub wns: f64,
}

/// A problem detected in a program row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The muscle is trained again before it has recovered.
    RecoveryDebt {
        muscle: String,
        gap_hours: u32,
        suggested_sets: u32,
    },
    /// The last set adds a large share of recovery cost for little stimulus.
    HighVolume { muscle: String, sets: u32 },
    /// High reps close to failure.
    MetabolicFatigue { muscle: String, reps: u32 },
    /// Weekly stimulus too low to outpace atrophy.
    LowStimulus { muscle: String, wns: f64 },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::RecoveryDebt {
                muscle,
                gap_hours,
                suggested_sets,
            } => write!(
                f,
                "{}: recovery debt of {} hours. You are training before fully recovered. \
                 Reduce sets to {} or train further from failure.",
                muscle, gap_hours, suggested_sets
            ),
            Finding::HighVolume { muscle, sets } => write!(
                f,
                "{}: high volume risk ({} sets). Sets past 4-5 add little stimulus \
                 but spike recovery cost.",
                muscle, sets
            ),
            Finding::MetabolicFatigue { muscle, reps } => write!(
                f,
                "{}: high reps ({}) near failure cause extreme metabolic fatigue. \
                 Increase the load and aim for 8-12 reps.",
                muscle, reps
            ),
            Finding::LowStimulus { muscle, wns } => write!(
                f,
                "{}: low weekly stimulus ({:.2}). Frequency or volume is likely too low \
                 to beat atrophy.",
                muscle, wns
            ),
        }
    }
}

/// Audit of a complete program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub scores: Vec<RowScore>,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// Returns true if no row raised a finding.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Scores one program row and collects its findings.
///
/// Muscles missing from the reference table use the neutral profile.
pub fn analyze_row(
    calibration: &Calibration,
    row: &ProgramRow,
) -> Result<(RowScore, Vec<Finding>), ModelError> {
    let profile = MuscleProfile::for_name(&row.muscle);
    let bout = BoutSpec::new(row.sets, row.reps, row.rir, profile)?;

    let hours = recovery_hours(calibration, &bout);
    let score = stimulus(calibration, &bout);
    let weekly = wns_breakdown(calibration, row.frequency, score.gross_stimulus, hours)?;

    let mut findings = Vec::new();

    if hours > weekly.cycle_hours {
        findings.push(Finding::RecoveryDebt {
            muscle: row.muscle.clone(),
            gap_hours: (hours - weekly.cycle_hours) as u32,
            suggested_sets: row.sets.saturating_sub(1).max(1),
        });
    }

    if row.sets > HIGH_VOLUME_MIN_SETS {
        let previous = recovery_hours(calibration, &bout.with_sets(row.sets - 1));
        let marginal = if previous > 0.0 {
            (hours - previous) / previous
        } else {
            0.0
        };
        if marginal > HIGH_VOLUME_MARGINAL_FATIGUE {
            findings.push(Finding::HighVolume {
                muscle: row.muscle.clone(),
                sets: row.sets,
            });
        }
    }

    if row.reps > METABOLIC_REPS && row.rir < METABOLIC_MAX_RIR {
        findings.push(Finding::MetabolicFatigue {
            muscle: row.muscle.clone(),
            reps: row.reps,
        });
    }

    if weekly.weekly < LOW_STIMULUS_WNS {
        findings.push(Finding::LowStimulus {
            muscle: row.muscle.clone(),
            wns: weekly.weekly,
        });
    }

    let row_score = RowScore {
        muscle: row.muscle.clone(),
        exercise: row.exercise.clone(),
        recovery_hours: hours,
        cycle_hours: weekly.cycle_hours,
        effective_sets: score.effective_sets,
        gross_stimulus: score.gross_stimulus,
        wns: weekly.weekly,
    };

    Ok((row_score, findings))
}

/// Audits every row of a program. Fails on the first invalid row.
pub fn analyze_program(
    calibration: &Calibration,
    rows: &[ProgramRow],
) -> Result<AuditReport, ModelError> {
    let analyzed = rows
        .par_iter()
        .map(|row| analyze_row(calibration, row))
        .collect::<Result<Vec<_>, _>>()?;

    let mut scores = Vec::with_capacity(analyzed.len());
    let mut findings = Vec::new();
    for (score, row_findings) in analyzed {
        scores.push(score);
        findings.extend(row_findings);
    }

    Ok(AuditReport { scores, findings })
}

// === Program generator ===

/// How the generator chooses weekly frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FrequencyChoice {
    /// Train every muscle this many times per week.
    Fixed { frequency: u32 },
    /// Try 1..=max_frequency per muscle and keep the best WNS.
    Auto { max_frequency: u32 },
}

impl Default for FrequencyChoice {
    fn default() -> Self {
        FrequencyChoice::Auto {
            max_frequency: DEFAULT_MAX_AUTO_FREQUENCY,
        }
    }
}

/// Input to the program generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRequest {
    pub muscles: Vec<Muscle>,
    pub session_minutes: u32,
    #[serde(default)]
    pub priority: Vec<Muscle>,
    #[serde(default = "default_capacity")]
    pub recovery_capacity: f64,
    #[serde(default)]
    pub frequency: FrequencyChoice,
}

fn default_capacity() -> f64 {
    1.0
}

/// Whether the planned bout recovers within its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Optimal,
    HighFatigue,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Optimal => write!(f, "Optimal"),
            PlanStatus::HighFatigue => write!(f, "High Fatigue"),
        }
    }
}

/// Planned training for one muscle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramEntry {
    pub muscle: Muscle,
    pub exercises: Vec<String>,
    pub sets: u32,
    pub reps: u32,
    pub rir: f64,
    pub frequency: u32,
    pub recovery_hours: f64,
    pub cycle_hours: f64,
    pub wns: f64,
    pub status: PlanStatus,
}

/// Plans one muscle at a fixed frequency: solve, then trim to the cycle.
pub fn plan_muscle(
    calibration: &Calibration,
    muscle: Muscle,
    frequency: u32,
    session_minutes: u32,
    is_priority: bool,
    recovery_capacity: f64,
) -> Result<ProgramEntry, ModelError> {
    let profile = muscle.profile();
    let best = solve_best_volume(
        calibration,
        profile,
        frequency,
        session_minutes,
        is_priority,
        recovery_capacity,
    )?;

    let bout = BoutSpec::new(best.sets, best.reps, best.rir, profile)?;
    let trimmed = trim_sets_to_cycle(calibration, &bout, frequency, recovery_capacity)?;
    let scored = evaluate_bout(calibration, &trimmed.bout, frequency, recovery_capacity)?;

    let status = if trimmed.fits_cycle {
        PlanStatus::Optimal
    } else {
        PlanStatus::HighFatigue
    };

    Ok(ProgramEntry {
        muscle,
        exercises: muscle.exercises().iter().map(|e| e.to_string()).collect(),
        sets: scored.sets,
        reps: scored.reps,
        rir: scored.rir,
        frequency,
        recovery_hours: scored.recovery_hours,
        cycle_hours: trimmed.cycle_hours,
        wns: scored.wns,
        status,
    })
}

/// Plans every requested muscle.
///
/// With [`FrequencyChoice::Auto`] each muscle gets the frequency with the
/// strictly highest WNS; the lowest frequency wins ties.
pub fn generate_program(
    calibration: &Calibration,
    request: &ProgramRequest,
) -> Result<Vec<ProgramEntry>, ModelError> {
    if request.muscles.is_empty() {
        return Err(ModelError::EmptyProgram);
    }

    let frequencies: Vec<u32> = match request.frequency {
        FrequencyChoice::Fixed { frequency } => vec![frequency],
        FrequencyChoice::Auto { max_frequency } => (1..=max_frequency).collect(),
    };
    if frequencies.is_empty() {
        return Err(ModelError::BadFrequency(0));
    }

    let priority: HashSet<Muscle> = request.priority.iter().copied().collect();

    request
        .muscles
        .par_iter()
        .map(|&muscle| -> Result<ProgramEntry, ModelError> {
            let is_priority = priority.contains(&muscle);
            let mut best: Option<ProgramEntry> = None;
            for &frequency in &frequencies {
                let entry = plan_muscle(
                    calibration,
                    muscle,
                    frequency,
                    request.session_minutes,
                    is_priority,
                    request.recovery_capacity,
                )?;
                if best.as_ref().is_none_or(|b| entry.wns > b.wns) {
                    best = Some(entry);
                }
            }
            best.ok_or(ModelError::EmptyProgram)
        })
        .collect()
}

/// Resolves muscle names, skipping and reporting unknown ones.
pub fn parse_muscles(names: &[String]) -> (Vec<Muscle>, Vec<String>) {
    let mut muscles = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match Muscle::from_str(name) {
            Ok(m) => muscles.push(m),
            Err(_) => unknown.push(name.clone()),
        }
    }
    (muscles, unknown)
}
