//! Piecewise-linear calibration curves.
//!
//! A curve is an ordered table of `(x, y)` breakpoints with strictly increasing
//! `x`. Queries between two breakpoints are linearly interpolated, queries on a
//! breakpoint return its `y` exactly, and queries outside the table return the
//! nearest endpoint's `y`. A curve may additionally carry a fixed value used for
//! every query beyond its last breakpoint.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Serialized form of a curve, validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCurve {
    points: Vec<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    beyond_last: Option<f64>,
}

/// A validated piecewise-linear calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve", into = "RawCurve")]
pub struct CalibrationCurve {
    points: Vec<(f64, f64)>,
    beyond_last: Option<f64>,
}

impl CalibrationCurve {
    /// Builds a curve with flat extrapolation at both ends.
    ///
    /// Fails if there are fewer than 2 points, any coordinate is not finite,
    /// or `x` is not strictly increasing.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, CalibrationError> {
        validate_points(&points)?;
        Ok(Self {
            points,
            beyond_last: None,
        })
    }

    /// Builds a curve that returns `beyond_last` for every `x` past the last point.
    pub fn with_tail(points: Vec<(f64, f64)>, beyond_last: f64) -> Result<Self, CalibrationError> {
        validate_points(&points)?;
        if !beyond_last.is_finite() {
            return Err(CalibrationError::InvalidCurve(format!(
                "tail value must be finite, got {}",
                beyond_last
            )));
        }
        Ok(Self {
            points,
            beyond_last: Some(beyond_last),
        })
    }

    /// Returns the breakpoints of the curve.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Returns the fixed value used past the last breakpoint, if any.
    pub fn beyond_last(&self) -> Option<f64> {
        self.beyond_last
    }

    /// Evaluates the curve at `x`.
    pub fn interpolate(&self, x: f64) -> f64 {
        let points = &self.points;
        match points.binary_search_by(|(px, _)| px.total_cmp(&x)) {
            Ok(idx) => points[idx].1,
            Err(0) => points[0].1,
            Err(idx) if idx == points.len() => {
                let (_, last_y) = points[idx - 1];
                self.beyond_last.unwrap_or(last_y)
            }
            Err(idx) => {
                let (x0, y0) = points[idx - 1];
                let (x1, y1) = points[idx];
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        }
    }
}

impl TryFrom<RawCurve> for CalibrationCurve {
    type Error = CalibrationError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        match raw.beyond_last {
            Some(tail) => Self::with_tail(raw.points, tail),
            None => Self::new(raw.points),
        }
    }
}

impl From<CalibrationCurve> for RawCurve {
    fn from(curve: CalibrationCurve) -> Self {
        Self {
            points: curve.points,
            beyond_last: curve.beyond_last,
        }
    }
}

fn validate_points(points: &[(f64, f64)]) -> Result<(), CalibrationError> {
    if points.len() < 2 {
        return Err(CalibrationError::InvalidCurve(format!(
            "need at least 2 points, got {}",
            points.len()
        )));
    }

    if let Some((x, y)) = points
        .iter()
        .find(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(CalibrationError::InvalidCurve(format!(
            "non-finite point ({}, {})",
            x, y
        )));
    }

    if let Some(pair) = points.windows(2).find(|pair| pair[1].0 <= pair[0].0) {
        return Err(CalibrationError::InvalidCurve(format!(
            "x must be strictly increasing: {} is followed by {}",
            pair[0].0, pair[1].0
        )));
    }

    Ok(())
}
