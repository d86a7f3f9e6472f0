//! Hypertrophic stimulus of a training bout.
//!
//! Only the last few reps before failure are stimulating, so a set counts as
//! `stimulating_reps / 5` of an effective set. Gross stimulus follows a
//! logarithmic fit of the volume dose-response: 1 effective set ≈ 1.0 AU,
//! 3 ≈ 1.6 AU, 9 ≈ 2.2 AU.

use serde::Serialize;

use crate::calibration::Calibration;
use crate::domain::BoutSpec;

/// Effective volume and gross stimulus of one bout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StimulusScore {
    pub effective_sets: f64,
    /// Gross stimulus in arbitrary units (AU).
    pub gross_stimulus: f64,
}

/// Stimulating reps in one set: `min(reps, max(0, 5 - rir))`.
pub fn stimulating_reps(calibration: &Calibration, reps: u32, rir: f64) -> f64 {
    let ceiling = (calibration.stimulus.max_stimulating_reps - rir).max(0.0);
    (reps as f64).min(ceiling)
}

/// Effective sets of a bout, normalized to full stimulating sets.
pub fn effective_sets(calibration: &Calibration, bout: &BoutSpec) -> f64 {
    let per_set = stimulating_reps(calibration, bout.reps(), bout.rir());
    bout.sets() as f64 * per_set / calibration.stimulus.max_stimulating_reps
}

/// Gross stimulus for a number of effective sets. Zero or less yields 0.
pub fn gross_stimulus(calibration: &Calibration, effective_sets: f64) -> f64 {
    if effective_sets <= 0.0 {
        return 0.0;
    }

    let constants = &calibration.stimulus;
    let eff = effective_sets.max(constants.effective_set_floor);
    (constants.log_coefficient * eff.ln() + constants.log_intercept).max(0.0)
}

/// Computes effective sets and gross stimulus for `bout`.
pub fn stimulus(calibration: &Calibration, bout: &BoutSpec) -> StimulusScore {
    let effective_sets = effective_sets(calibration, bout);
    StimulusScore {
        effective_sets,
        gross_stimulus: gross_stimulus(calibration, effective_sets),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MuscleProfile;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn bout(sets: u32, reps: u32, rir: f64) -> BoutSpec {
        BoutSpec::new(sets, reps, rir, MuscleProfile::NEUTRAL).unwrap()
    }

    #[test]
    fn test_single_set_to_failure_anchor() {
        let cal = Calibration::default();
        let score = stimulus(&cal, &bout(1, 10, 0.0));
        assert_eq!(score.effective_sets, 1.0);
        assert_eq!(score.gross_stimulus, 1.0);
    }

    #[test]
    fn test_stimulating_reps_saturate_at_five() {
        let cal = Calibration::default();
        for sets in 0..=8 {
            for reps in [5, 6, 10, 15, 30] {
                let score = stimulus(&cal, &bout(sets, reps, 0.0));
                assert_eq!(score.effective_sets, sets as f64);
            }
        }
    }

    #[test]
    fn test_short_sets_limit_stimulating_reps() {
        let cal = Calibration::default();
        assert_eq!(stimulating_reps(&cal, 3, 0.0), 3.0);
        assert_eq!(stimulating_reps(&cal, 3, 1.0), 3.0);
        assert_eq!(stimulating_reps(&cal, 10, 2.0), 3.0);
        assert_eq!(stimulating_reps(&cal, 10, 1.5), 3.5);
    }

    #[test]
    fn test_far_from_failure_has_no_stimulus() {
        let cal = Calibration::default();
        let score = stimulus(&cal, &bout(4, 10, 5.0));
        assert_eq!(score.effective_sets, 0.0);
        assert_eq!(score.gross_stimulus, 0.0);

        let score = stimulus(&cal, &bout(4, 10, 8.0));
        assert_eq!(score.gross_stimulus, 0.0);
    }

    #[test]
    fn test_log_curve_reference_points() {
        let cal = Calibration::default();
        assert!(approx_eq(gross_stimulus(&cal, 3.0), 1.604, 0.001));
        assert!(approx_eq(gross_stimulus(&cal, 9.0), 2.208, 0.001));
    }

    #[test]
    fn test_small_positive_volume_is_floored() {
        let cal = Calibration::default();
        // 1 set × 1 rep at 4 RIR = 0.2 effective sets, above the floor
        let tiny = gross_stimulus(&cal, 0.2);
        assert!(approx_eq(tiny, 0.55 * 0.2_f64.ln() + 1.0, 1e-12));
        // Below the floor every value maps to the floor's stimulus
        assert_eq!(gross_stimulus(&cal, 0.05), gross_stimulus(&cal, 0.1));
        assert!(gross_stimulus(&cal, 0.01) >= 0.0);
    }

    #[test]
    fn test_gross_increases_with_volume() {
        let cal = Calibration::default();
        let mut previous = 0.0;
        for sets in 1..=10 {
            let gross = stimulus(&cal, &bout(sets, 10, 1.0)).gross_stimulus;
            assert!(gross > previous);
            previous = gross;
        }
    }
}
