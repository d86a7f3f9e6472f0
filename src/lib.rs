//! Muscle recovery and weekly net stimulus model with a training volume solver.
//!
//! The model functions are pure: every call takes a [`Calibration`] and plain
//! values and returns plain values. Nothing is cached between calls.
//!
//! ```
//! use hypermodel::{BoutSpec, Calibration, MuscleProfile, recovery_hours, stimulus};
//!
//! let cal = Calibration::default();
//! let bout = BoutSpec::new(1, 10, 0.0, MuscleProfile::NEUTRAL).unwrap();
//! assert_eq!(recovery_hours(&cal, &bout), 22.5);
//! assert_eq!(stimulus(&cal, &bout).effective_sets, 1.0);
//! ```

pub mod analysis;
pub mod calibration;
pub mod curve;
pub mod domain;
pub mod error;
pub mod progression;
pub mod recovery;
pub mod server;
pub mod solver;
pub mod stimulus;
pub mod watcher;
pub mod wns;

pub use calibration::Calibration;
pub use curve::CalibrationCurve;
pub use domain::{BoutSpec, DamageClass, LengthProfile, Muscle, MuscleProfile};
pub use error::{CalibrationError, ModelError};
pub use progression::{ProgressionAction, ProgressionResult, progress};
pub use recovery::recovery_hours;
pub use solver::{SolverResult, TrimResult, solve_best_volume, trim_sets_to_cycle};
pub use stimulus::{StimulusScore, stimulus};
pub use wns::wns;
