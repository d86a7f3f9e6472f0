//! Calibration constants for the recovery, stimulus and weekly models.
//!
//! Every number the models use lives here rather than in the formulas, so an
//! alternate calibration profile is just a different JSON file. Each section
//! has serde defaults, so a file only needs to list what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::curve::CalibrationCurve;
use crate::domain::{DamageClass, LengthProfile};
use crate::error::CalibrationError;

/// Complete set of model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Recovery hours of one set of 10 reps at 0 RIR for a neutral muscle.
    pub base_hours_per_set: f64,
    /// Reps performed → recovery ratio, normalized to 10 reps = 1.0.
    pub rep_curve: CalibrationCurve,
    /// Reps in reserve → recovery ratio, normalized to 0 RIR = 1.0.
    pub rir_curve: CalibrationCurve,
    pub damage: DamageMultipliers,
    pub length: LengthMultipliers,
    pub stimulus: StimulusConstants,
    pub weekly: WeeklyConstants,
    pub search: SearchGrid,
}

/// Recovery multipliers per damage class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageMultipliers {
    pub easily_damaged: f64,
    pub middle: f64,
    pub hardly_damaged: f64,
}

/// Recovery multipliers per length profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthMultipliers {
    pub lengthened: f64,
    pub shortened: f64,
    pub even: f64,
}

/// Constants of the effective-set and log-stimulus curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConstants {
    /// Stimulating reps available per set close to failure.
    pub max_stimulating_reps: f64,
    pub log_coefficient: f64,
    pub log_intercept: f64,
    /// Lower bound applied to effective sets before taking the logarithm.
    pub effective_set_floor: f64,
}

/// Constants of the weekly net stimulus model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyConstants {
    pub hours_per_week: f64,
    /// Hours a bout's stimulus stays active before atrophy starts.
    pub stimulus_duration_hours: f64,
    /// Stimulus lost per hour of atrophy (AU/h).
    pub atrophy_per_hour: f64,
}

/// Candidate grid enumerated by the volume solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchGrid {
    /// Sessions at least this long may use `long_session_max_sets`.
    pub long_session_minutes: u32,
    pub long_session_max_sets: u32,
    pub short_session_max_sets: u32,
    pub reps: Vec<u32>,
    pub priority_rir: Vec<f64>,
    pub standard_rir: Vec<f64>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            base_hours_per_set: 22.5,
            rep_curve: reference_rep_curve(),
            rir_curve: reference_rir_curve(),
            damage: DamageMultipliers::default(),
            length: LengthMultipliers::default(),
            stimulus: StimulusConstants::default(),
            weekly: WeeklyConstants::default(),
            search: SearchGrid::default(),
        }
    }
}

impl Default for DamageMultipliers {
    fn default() -> Self {
        Self {
            easily_damaged: 1.5,
            middle: 1.0,
            hardly_damaged: 0.81,
        }
    }
}

impl Default for LengthMultipliers {
    fn default() -> Self {
        Self {
            lengthened: 1.125,
            shortened: 0.83,
            even: 1.0,
        }
    }
}

impl Default for StimulusConstants {
    fn default() -> Self {
        Self {
            max_stimulating_reps: 5.0,
            log_coefficient: 0.55,
            log_intercept: 1.0,
            effective_set_floor: 0.1,
        }
    }
}

impl Default for WeeklyConstants {
    fn default() -> Self {
        Self {
            hours_per_week: 168.0,
            stimulus_duration_hours: 48.0,
            // 0.322 AU per day; ~1.61 AU (3 effective sets) decays over 120 h
            atrophy_per_hour: 0.0134,
        }
    }
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self {
            long_session_minutes: 60,
            long_session_max_sets: 5,
            short_session_max_sets: 3,
            reps: vec![6, 8, 10, 12, 15],
            priority_rir: vec![0.0, 1.0, 2.0],
            standard_rir: vec![1.0, 2.0, 3.0],
        }
    }
}

impl DamageMultipliers {
    pub fn for_class(&self, class: DamageClass) -> f64 {
        match class {
            DamageClass::EasilyDamaged => self.easily_damaged,
            DamageClass::Middle => self.middle,
            DamageClass::HardlyDamaged => self.hardly_damaged,
        }
    }
}

impl LengthMultipliers {
    pub fn for_profile(&self, profile: LengthProfile) -> f64 {
        match profile {
            LengthProfile::Lengthened => self.lengthened,
            LengthProfile::Shortened => self.shortened,
            LengthProfile::Even => self.even,
        }
    }
}

impl SearchGrid {
    /// Maximum sets per bout for a session of the given length.
    pub fn max_sets(&self, session_minutes: u32) -> u32 {
        if session_minutes >= self.long_session_minutes {
            self.long_session_max_sets
        } else {
            self.short_session_max_sets
        }
    }

    /// RIR options; priority muscles may train closer to failure.
    pub fn rir_options(&self, is_priority: bool) -> &[f64] {
        if is_priority {
            &self.priority_rir
        } else {
            &self.standard_rir
        }
    }
}

impl Calibration {
    /// Loads a calibration from a JSON file and validates it.
    ///
    /// Missing fields take their reference values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CalibrationError::FileNotFound(path.display().to_string()));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| CalibrationError::CannotRead(format!("{}: {}", path.display(), e)))?;

        Self::from_json(&text)
    }

    /// Parses and validates a calibration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CalibrationError> {
        let calibration: Calibration = serde_json::from_str(text)
            .map_err(|e| CalibrationError::InvalidFormat(e.to_string()))?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Checks that every scalar constant is usable by the models.
    ///
    /// Curve shape is validated on construction; here the recovery curves
    /// must also stay non-negative.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let positive = [
            ("base_hours_per_set", self.base_hours_per_set),
            ("damage.easily_damaged", self.damage.easily_damaged),
            ("damage.middle", self.damage.middle),
            ("damage.hardly_damaged", self.damage.hardly_damaged),
            ("length.lengthened", self.length.lengthened),
            ("length.shortened", self.length.shortened),
            ("length.even", self.length.even),
            ("stimulus.max_stimulating_reps", self.stimulus.max_stimulating_reps),
            ("stimulus.effective_set_floor", self.stimulus.effective_set_floor),
            ("weekly.hours_per_week", self.weekly.hours_per_week),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalibrationError::InvalidValue { name, value });
            }
        }

        let non_negative = [
            ("stimulus.log_coefficient", self.stimulus.log_coefficient),
            ("weekly.stimulus_duration_hours", self.weekly.stimulus_duration_hours),
            ("weekly.atrophy_per_hour", self.weekly.atrophy_per_hour),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::InvalidValue { name, value });
            }
        }

        for (name, curve) in [("rep_curve", &self.rep_curve), ("rir_curve", &self.rir_curve)] {
            let negative = curve
                .points()
                .iter()
                .map(|&(_, y)| y)
                .chain(curve.beyond_last())
                .find(|y| *y < 0.0);
            if let Some(value) = negative {
                return Err(CalibrationError::InvalidValue { name, value });
            }
        }

        if !self.stimulus.log_intercept.is_finite() {
            return Err(CalibrationError::InvalidValue {
                name: "stimulus.log_intercept",
                value: self.stimulus.log_intercept,
            });
        }

        self.search.validate()
    }
}

impl SearchGrid {
    fn validate(&self) -> Result<(), CalibrationError> {
        let max_sets = [
            ("search.long_session_max_sets", self.long_session_max_sets),
            ("search.short_session_max_sets", self.short_session_max_sets),
        ];
        for (name, value) in max_sets {
            if value == 0 {
                return Err(CalibrationError::InvalidValue {
                    name,
                    value: value as f64,
                });
            }
        }

        if self.reps.is_empty() || self.reps.contains(&0) {
            return Err(CalibrationError::InvalidFormat(
                "search.reps must be a non-empty list of positive rep counts".to_string(),
            ));
        }

        for (name, options) in [
            ("search.priority_rir", &self.priority_rir),
            ("search.standard_rir", &self.standard_rir),
        ] {
            if options.is_empty() {
                return Err(CalibrationError::InvalidFormat(format!(
                    "{} must not be empty",
                    name
                )));
            }
            if let Some(&value) = options.iter().find(|r| !r.is_finite() || **r < 0.0) {
                return Err(CalibrationError::InvalidValue { name, value });
            }
        }

        Ok(())
    }
}

fn reference_rep_curve() -> CalibrationCurve {
    // 1r:3h, 3r:10h, 5r:16h, 10r:22h, 15r:34h, 20r:47h
    CalibrationCurve::new(vec![
        (1.0, 3.0 / 22.0),
        (3.0, 10.0 / 22.0),
        (5.0, 16.0 / 22.0),
        (10.0, 1.0),
        (15.0, 34.0 / 22.0),
        (20.0, 47.0 / 22.0),
    ])
    .unwrap_or_else(|e| unreachable!("reference rep curve is valid: {}", e))
}

fn reference_rir_curve() -> CalibrationCurve {
    // 0:100%, 1:77%, 2:59%, 3:45%, 4:27%, beyond: 20%
    CalibrationCurve::with_tail(
        vec![
            (0.0, 1.0),
            (1.0, 17.0 / 22.0),
            (2.0, 13.0 / 22.0),
            (3.0, 10.0 / 22.0),
            (4.0, 6.0 / 22.0),
        ],
        0.2,
    )
    .unwrap_or_else(|e| unreachable!("reference RIR curve is valid: {}", e))
}
