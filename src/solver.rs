//! Volume solver: picks sets, reps and RIR for one muscle.
//!
//! The search space is the Cartesian product of the calibration's search grid
//! (sets, then reps, then RIR, in that order). Every candidate is evaluated
//! independently, so evaluation runs in parallel; the reduction keeps the
//! candidate with the strictly greatest WNS and breaks ties by grid position,
//! so the first candidate in grid order always wins a tie. When every candidate
//! scores 0 the first grid point is returned.

use rayon::prelude::*;
use serde::Serialize;

use crate::calibration::Calibration;
use crate::domain::{BoutSpec, MuscleProfile};
use crate::error::ModelError;
use crate::recovery::{scaled_recovery_hours, validate_capacity};
use crate::stimulus::stimulus;
use crate::wns::{cycle_hours, wns};

/// Best configuration found for one muscle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolverResult {
    pub sets: u32,
    pub reps: u32,
    pub rir: f64,
    pub recovery_hours: f64,
    pub wns: f64,
}

/// Outcome of trimming sets until recovery fits the training cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimResult {
    pub bout: BoutSpec,
    pub recovery_hours: f64,
    pub cycle_hours: f64,
    pub sets_removed: u32,
    /// False when even a single set needs more than one cycle to recover.
    pub fits_cycle: bool,
}

/// A grid cell tagged with its position in enumeration order.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    result: SolverResult,
}

/// Enumerates the (sets, reps, rir) grid in deterministic order.
fn grid(
    calibration: &Calibration,
    session_minutes: u32,
    is_priority: bool,
) -> Vec<(u32, u32, f64)> {
    let search = &calibration.search;
    let max_sets = search.max_sets(session_minutes);
    let rir_options = search.rir_options(is_priority);

    (1..=max_sets)
        .flat_map(move |sets| {
            search.reps.iter().flat_map(move |&reps| {
                rir_options.iter().map(move |&rir| (sets, reps, rir))
            })
        })
        .collect()
}

/// Scores a single bout: recovery hours (scaled by capacity) and WNS.
pub fn evaluate_bout(
    calibration: &Calibration,
    bout: &BoutSpec,
    frequency: u32,
    recovery_capacity: f64,
) -> Result<SolverResult, ModelError> {
    let recovery_hours = scaled_recovery_hours(calibration, bout, recovery_capacity)?;
    let gross = stimulus(calibration, bout).gross_stimulus;
    let score = wns(calibration, frequency, gross, recovery_hours)?;

    Ok(SolverResult {
        sets: bout.sets(),
        reps: bout.reps(),
        rir: bout.rir(),
        recovery_hours,
        wns: score,
    })
}

/// Keeps `a` unless `b` is strictly better, or equal and earlier in the grid.
fn better(a: Candidate, b: Candidate) -> Candidate {
    if b.result.wns > a.result.wns || (b.result.wns == a.result.wns && b.index < a.index) {
        b
    } else {
        a
    }
}

/// Finds the sets/reps/RIR combination with the highest weekly net stimulus.
///
/// # Arguments
/// * `muscle` - Recovery characteristics of the target muscle
/// * `frequency` - Sessions per week for this muscle
/// * `session_minutes` - Session length, which caps the number of sets
/// * `is_priority` - Priority muscles may train closer to failure
/// * `recovery_capacity` - Multiplier on recovery speed (1.0 = baseline)
pub fn solve_best_volume(
    calibration: &Calibration,
    muscle: MuscleProfile,
    frequency: u32,
    session_minutes: u32,
    is_priority: bool,
    recovery_capacity: f64,
) -> Result<SolverResult, ModelError> {
    cycle_hours(calibration, frequency)?;
    validate_capacity(recovery_capacity)?;

    let best = grid(calibration, session_minutes, is_priority)
        .into_par_iter()
        .enumerate()
        .map(|(index, (sets, reps, rir))| -> Result<Candidate, ModelError> {
            let bout = BoutSpec::new(sets, reps, rir, muscle)?;
            let result = evaluate_bout(calibration, &bout, frequency, recovery_capacity)?;
            Ok(Candidate { index, result })
        })
        .try_reduce_with(|a, b| Ok(better(a, b)))
        .ok_or(ModelError::EmptySearchGrid)??;

    log::debug!(
        "best volume at {}x/week: {} x {} @ {} RIR, {:.1}h recovery, WNS {:.3}",
        frequency,
        best.result.sets,
        best.result.reps,
        best.result.rir,
        best.result.recovery_hours,
        best.result.wns
    );

    Ok(best.result)
}

/// Removes sets until recovery fits inside one training cycle.
///
/// Stops at a single set even if that set still needs longer than the cycle.
/// Applying it to its own output removes nothing.
pub fn trim_sets_to_cycle(
    calibration: &Calibration,
    bout: &BoutSpec,
    frequency: u32,
    recovery_capacity: f64,
) -> Result<TrimResult, ModelError> {
    let cycle_hours = cycle_hours(calibration, frequency)?;

    let mut current = *bout;
    let mut hours = scaled_recovery_hours(calibration, &current, recovery_capacity)?;

    while hours > cycle_hours && current.sets() > 1 {
        current = current.with_sets(current.sets() - 1);
        hours = scaled_recovery_hours(calibration, &current, recovery_capacity)?;
        log::debug!(
            "trimmed to {} sets: {:.1}h recovery vs {:.1}h cycle",
            current.sets(),
            hours,
            cycle_hours
        );
    }

    Ok(TrimResult {
        bout: current,
        recovery_hours: hours,
        cycle_hours,
        sets_removed: bout.sets() - current.sets(),
        fits_cycle: hours <= cycle_hours,
    })
}
