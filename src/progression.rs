//! Progressive overload: when and how much to increase the load.
//!
//! The goal is to keep working sets inside a target rep range. Once the lifter
//! beats the top of the range, the next load is chosen so the same effort lands
//! back at the bottom of the range, using the Epley estimate in both directions.

use serde::Serialize;

use crate::error::ModelError;

/// Loads are rounded to this increment (kg or lb plates).
pub const LOAD_INCREMENT: f64 = 2.5;

/// What to do with the load next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionAction {
    Hold,
    IncreaseWeight,
}

impl std::fmt::Display for ProgressionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hold => write!(f, "Hold Weight"),
            Self::IncreaseWeight => write!(f, "Increase Weight"),
        }
    }
}

/// Recommendation for the next session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionResult {
    pub action: ProgressionAction,
    pub new_weight: f64,
    /// `new_weight - last_weight`.
    pub delta: f64,
    pub explanation: String,
}

/// Estimated one-rep max using Epley: `w × (1 + reps / 30)`.
pub fn epley_e1rm(weight: f64, reps: u32) -> f64 {
    weight * (1.0 + reps as f64 / 30.0)
}

/// Load that `e1rm` allows for `reps` repetitions (inverse Epley).
pub fn load_for_reps(e1rm: f64, reps: u32) -> f64 {
    e1rm / (1.0 + reps as f64 / 30.0)
}

/// Rounds a load to the nearest [`LOAD_INCREMENT`], halves to even.
pub fn round_to_increment(weight: f64) -> f64 {
    (weight / LOAD_INCREMENT).round_ties_even() * LOAD_INCREMENT
}

/// Decides the next load from the last session's top set.
///
/// # Arguments
/// * `last_weight` - Load used last session
/// * `reps_performed` - Reps achieved with that load
/// * `target_min` - Bottom of the target rep range
/// * `target_max` - Top of the target rep range
pub fn progress(
    last_weight: f64,
    reps_performed: u32,
    target_min: u32,
    target_max: u32,
) -> Result<ProgressionResult, ModelError> {
    if !last_weight.is_finite() || last_weight < 0.0 {
        return Err(ModelError::BadWeight(last_weight));
    }
    if target_min > target_max {
        return Err(ModelError::BadRepRange {
            min: target_min,
            max: target_max,
        });
    }

    if reps_performed < target_min {
        return Ok(ProgressionResult {
            action: ProgressionAction::Hold,
            new_weight: last_weight,
            delta: 0.0,
            explanation: format!(
                "Missed target range ({}-{}). Focus on form or reduce load.",
                target_min, target_max
            ),
        });
    }

    if reps_performed <= target_max {
        return Ok(ProgressionResult {
            action: ProgressionAction::Hold,
            new_weight: last_weight,
            delta: 0.0,
            explanation: "Perfect zone. Continue until you hit the top of the rep range."
                .to_string(),
        });
    }

    let e1rm = epley_e1rm(last_weight, reps_performed);
    let new_weight = round_to_increment(load_for_reps(e1rm, target_min));
    let delta = new_weight - last_weight;

    log::debug!(
        "progression: {} x {} -> e1RM {:.1}, next load {} for {} reps",
        last_weight,
        reps_performed,
        e1rm,
        new_weight,
        target_min
    );

    Ok(ProgressionResult {
        action: ProgressionAction::IncreaseWeight,
        new_weight,
        delta,
        explanation: format!(
            "Exceeded range! Increase by {} to drop back to ~{} reps.",
            delta, target_min
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_epley() {
        // 100 × (1 + 10/30)
        assert!(approx_eq(epley_e1rm(100.0, 10), 133.333, 0.001));
        assert_eq!(epley_e1rm(100.0, 0), 100.0);
    }

    #[test]
    fn test_inverse_epley() {
        let e1rm = epley_e1rm(80.0, 8);
        assert!(approx_eq(load_for_reps(e1rm, 8), 80.0, 1e-9));
    }

    #[test]
    fn test_round_to_increment() {
        assert_eq!(round_to_increment(116.67), 117.5);
        assert_eq!(round_to_increment(101.0), 100.0);
        assert_eq!(round_to_increment(0.0), 0.0);
        // 103.75 is exactly between 102.5 and 105: ties go to the even multiple
        assert_eq!(round_to_increment(103.75), 105.0);
        assert_eq!(round_to_increment(101.25), 100.0);
    }

    #[test]
    fn test_in_range_holds_exactly() {
        for reps in 6..=10 {
            let result = progress(100.0, reps, 6, 10).unwrap();
            assert_eq!(result.action, ProgressionAction::Hold);
            assert_eq!(result.new_weight, 100.0);
            assert_eq!(result.delta, 0.0);
        }
    }

    #[test]
    fn test_below_range_holds() {
        let result = progress(100.0, 4, 6, 10).unwrap();
        assert_eq!(result.action, ProgressionAction::Hold);
        assert_eq!(result.new_weight, 100.0);
        assert!(result.explanation.contains("Missed target range (6-10)"));
    }

    #[test]
    fn test_zero_reps_holds() {
        let result = progress(100.0, 0, 6, 10).unwrap();
        assert_eq!(result.action, ProgressionAction::Hold);
        assert_eq!(result.new_weight, 100.0);
    }

    #[test]
    fn test_above_range_increases() {
        // e1RM = 100 × 1.4 = 140; 140 / 1.2 = 116.67 → 117.5
        let result = progress(100.0, 12, 6, 10).unwrap();
        assert_eq!(result.action, ProgressionAction::IncreaseWeight);
        assert_eq!(result.new_weight, 117.5);
        assert_eq!(result.delta, 17.5);
        assert!(result.explanation.contains("~6 reps"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            progress(100.0, 8, 10, 6),
            Err(ModelError::BadRepRange { min: 10, max: 6 })
        );
        assert!(matches!(progress(-5.0, 8, 6, 10), Err(ModelError::BadWeight(_))));
        assert!(matches!(
            progress(f64::INFINITY, 8, 6, 10),
            Err(ModelError::BadWeight(_))
        ));
    }
}
