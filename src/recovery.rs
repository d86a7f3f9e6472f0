//! Recovery time required after a training bout.
//!
//! ```text
//! hours = sets × base_hours_per_set × rep_mult(reps) × rir_mult(rir)
//!         × damage_mult(class) × length_mult(profile)
//! ```
//!
//! Anchor: 1 set × 10 reps at 0 RIR on a Middle/Even muscle takes 22.5 hours.

use crate::calibration::Calibration;
use crate::domain::BoutSpec;
use crate::error::ModelError;

/// Smallest accepted recovery capacity: recovering at 1% of baseline speed.
pub const MIN_RECOVERY_CAPACITY: f64 = 0.01;

/// Recovery ratio for the number of reps performed.
pub fn rep_multiplier(calibration: &Calibration, reps: u32) -> f64 {
    calibration.rep_curve.interpolate(reps as f64)
}

/// Recovery ratio for proximity to failure.
pub fn rir_multiplier(calibration: &Calibration, rir: f64) -> f64 {
    calibration.rir_curve.interpolate(rir)
}

/// Hours a muscle needs to recover from `bout`. Zero sets cost zero hours.
pub fn recovery_hours(calibration: &Calibration, bout: &BoutSpec) -> f64 {
    if bout.sets() == 0 {
        return 0.0;
    }

    let muscle = bout.muscle();
    bout.sets() as f64
        * calibration.base_hours_per_set
        * rep_multiplier(calibration, bout.reps())
        * rir_multiplier(calibration, bout.rir())
        * calibration.damage.for_class(muscle.damage)
        * calibration.length.for_profile(muscle.length)
}

/// Recovery hours for a lifter whose recovery capacity differs from baseline.
///
/// A capacity below 1.0 inflates the required hours, above 1.0 shrinks them.
pub fn scaled_recovery_hours(
    calibration: &Calibration,
    bout: &BoutSpec,
    recovery_capacity: f64,
) -> Result<f64, ModelError> {
    validate_capacity(recovery_capacity)?;
    Ok(recovery_hours(calibration, bout) / recovery_capacity)
}

pub(crate) fn validate_capacity(recovery_capacity: f64) -> Result<(), ModelError> {
    if !recovery_capacity.is_finite() || recovery_capacity < MIN_RECOVERY_CAPACITY {
        return Err(ModelError::BadRecoveryCapacity(recovery_capacity));
    }
    Ok(())
}
