//! Weekly net stimulus (WNS).
//!
//! Combines gross stimulus, recovery time and training frequency into one weekly
//! score. Two penalties pull in opposite directions:
//!
//! - training again before recovery is complete scales the bout's stimulus by
//!   `cycle_hours / recovery_hours`;
//! - every hour between the end of a bout's active stimulus window and the next
//!   bout costs `atrophy_per_hour` AU.
//!
//! ```text
//! net_per_bout = max(0, gross × penalty − atrophy)
//! weekly       = net_per_bout × frequency
//! ```

use serde::Serialize;

use crate::calibration::Calibration;
use crate::error::ModelError;

/// Intermediate terms of a weekly score, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WnsBreakdown {
    pub cycle_hours: f64,
    pub penalty_factor: f64,
    pub atrophy_loss: f64,
    pub net_per_bout: f64,
    pub weekly: f64,
}

/// Hours between consecutive bouts at `frequency` sessions per week.
pub fn cycle_hours(calibration: &Calibration, frequency: u32) -> Result<f64, ModelError> {
    if frequency == 0 {
        return Err(ModelError::BadFrequency(frequency));
    }
    Ok(calibration.weekly.hours_per_week / frequency as f64)
}

/// Computes the weekly net stimulus with every intermediate term.
pub fn wns_breakdown(
    calibration: &Calibration,
    frequency: u32,
    gross_stimulus: f64,
    recovery_hours: f64,
) -> Result<WnsBreakdown, ModelError> {
    let cycle_hours = cycle_hours(calibration, frequency)?;
    if !gross_stimulus.is_finite() || gross_stimulus < 0.0 {
        return Err(ModelError::BadStimulus(gross_stimulus));
    }
    if !recovery_hours.is_finite() || recovery_hours < 0.0 {
        return Err(ModelError::BadRecoveryHours(recovery_hours));
    }

    let weekly_constants = &calibration.weekly;

    let penalty_factor = if cycle_hours < recovery_hours {
        cycle_hours / recovery_hours
    } else {
        1.0
    };

    let time_in_atrophy = (cycle_hours - weekly_constants.stimulus_duration_hours).max(0.0);
    let atrophy_loss = time_in_atrophy * weekly_constants.atrophy_per_hour;

    let net_per_bout = (gross_stimulus * penalty_factor - atrophy_loss).max(0.0);
    let weekly = (net_per_bout * frequency as f64).max(0.0);

    Ok(WnsBreakdown {
        cycle_hours,
        penalty_factor,
        atrophy_loss,
        net_per_bout,
        weekly,
    })
}

/// Weekly net stimulus for one muscle. Always non-negative.
pub fn wns(
    calibration: &Calibration,
    frequency: u32,
    gross_stimulus: f64,
    recovery_hours: f64,
) -> Result<f64, ModelError> {
    wns_breakdown(calibration, frequency, gross_stimulus, recovery_hours).map(|b| b.weekly)
}
