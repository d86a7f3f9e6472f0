//! Domain types for training bouts and muscle reference data.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ModelError;

/// How easily a muscle is damaged by a bout, which scales its recovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageClass {
    EasilyDamaged,
    Middle,
    HardlyDamaged,
}

impl DamageClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            DamageClass::EasilyDamaged => "Easily Damaged",
            DamageClass::Middle => "Middle",
            DamageClass::HardlyDamaged => "Hardly Damaged",
        }
    }
}

impl FromStr for DamageClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "easilydamaged" | "easy" => Ok(DamageClass::EasilyDamaged),
            "middle" | "mid" => Ok(DamageClass::Middle),
            "hardlydamaged" | "hard" => Ok(DamageClass::HardlyDamaged),
            _ => Err(format!("unknown damage class: {}", s)),
        }
    }
}

impl std::fmt::Display for DamageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where along its length a muscle is loaded hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthProfile {
    /// Hardest at long muscle lengths (descending resistance curve).
    Lengthened,
    /// Hardest at short muscle lengths (ascending resistance curve).
    Shortened,
    Even,
}

impl LengthProfile {
    pub fn display_name(&self) -> &'static str {
        match self {
            LengthProfile::Lengthened => "Lengthened (Descending)",
            LengthProfile::Shortened => "Shortened (Ascending)",
            LengthProfile::Even => "Even",
        }
    }
}

impl FromStr for LengthProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        // Accept the long labels, e.g. "Lengthened (Descending)"
        let key = key.split('(').next().unwrap_or_default();
        match key {
            "lengthened" | "descending" => Ok(LengthProfile::Lengthened),
            "shortened" | "ascending" => Ok(LengthProfile::Shortened),
            "even" | "mid" | "middle" => Ok(LengthProfile::Even),
            _ => Err(format!("unknown length profile: {}", s)),
        }
    }
}

impl std::fmt::Display for LengthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static recovery characteristics of a muscle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MuscleProfile {
    pub damage: DamageClass,
    pub length: LengthProfile,
}

impl MuscleProfile {
    /// Profile used for any muscle missing from the reference table.
    pub const NEUTRAL: MuscleProfile = MuscleProfile {
        damage: DamageClass::Middle,
        length: LengthProfile::Even,
    };

    pub const fn new(damage: DamageClass, length: LengthProfile) -> Self {
        Self { damage, length }
    }

    /// Looks up a muscle by name, falling back to [`MuscleProfile::NEUTRAL`].
    pub fn for_name(name: &str) -> Self {
        Muscle::from_str(name)
            .map(|m| m.profile())
            .unwrap_or(Self::NEUTRAL)
    }
}

impl Default for MuscleProfile {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Muscles covered by the reference table.
///
/// Serializes as a snake_case id and deserializes from any name [`FromStr`]
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Muscle {
    Chest,
    Back,
    Quads,
    Hamstrings,
    Shoulders,
    Triceps,
    Biceps,
    Calves,
}

impl Muscle {
    /// Returns all muscle variants.
    pub fn all() -> &'static [Muscle] {
        &[
            Muscle::Chest,
            Muscle::Back,
            Muscle::Quads,
            Muscle::Hamstrings,
            Muscle::Shoulders,
            Muscle::Triceps,
            Muscle::Biceps,
            Muscle::Calves,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Muscle::Chest => "Chest",
            Muscle::Back => "Back",
            Muscle::Quads => "Quads",
            Muscle::Hamstrings => "Hamstrings",
            Muscle::Shoulders => "Shoulders",
            Muscle::Triceps => "Triceps",
            Muscle::Biceps => "Biceps",
            Muscle::Calves => "Calves",
        }
    }

    /// Returns the reference damage class and length profile.
    pub fn profile(&self) -> MuscleProfile {
        use DamageClass::*;
        use LengthProfile::*;

        match self {
            Muscle::Chest => MuscleProfile::new(Middle, Lengthened),
            Muscle::Back => MuscleProfile::new(Middle, Shortened),
            Muscle::Quads => MuscleProfile::new(EasilyDamaged, Lengthened),
            Muscle::Hamstrings => MuscleProfile::new(EasilyDamaged, Lengthened),
            Muscle::Shoulders => MuscleProfile::new(HardlyDamaged, Shortened),
            Muscle::Triceps => MuscleProfile::new(Middle, Even),
            Muscle::Biceps => MuscleProfile::new(Middle, Lengthened),
            Muscle::Calves => MuscleProfile::new(HardlyDamaged, Shortened),
        }
    }

    /// Candidate exercises, for display only.
    pub fn exercises(&self) -> &'static [&'static str] {
        match self {
            Muscle::Chest => &["Bench Press", "Incline DB Press", "Cable Fly"],
            Muscle::Back => &["Pull Up", "Barbell Row", "Lat Pulldown"],
            Muscle::Quads => &["Squat", "Leg Press", "Leg Extension"],
            Muscle::Hamstrings => &["RDL", "Seated Leg Curl", "Lying Leg Curl"],
            Muscle::Shoulders => &["Overhead Press", "Lateral Raise", "Rear Delt Fly"],
            Muscle::Triceps => &["Skull Crusher", "Pushdown", "Dip"],
            Muscle::Biceps => &["Barbell Curl", "Incline Curl", "Hammer Curl"],
            Muscle::Calves => &["Standing Calf Raise", "Seated Calf Raise"],
        }
    }
}

impl FromStr for Muscle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "chest" | "pecs" => Ok(Muscle::Chest),
            "back" | "lats" => Ok(Muscle::Back),
            "quads" | "quadriceps" => Ok(Muscle::Quads),
            "hamstrings" | "hams" => Ok(Muscle::Hamstrings),
            "shoulders" | "delts" => Ok(Muscle::Shoulders),
            "triceps" => Ok(Muscle::Triceps),
            "biceps" => Ok(Muscle::Biceps),
            "calves" => Ok(Muscle::Calves),
            _ => Err(format!("unknown muscle: {}", s)),
        }
    }
}

impl TryFrom<String> for Muscle {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for Muscle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Intensity and volume of one training bout for one muscle.
///
/// Construct through [`BoutSpec::new`]; adjustments return a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoutSpec {
    sets: u32,
    reps: u32,
    rir: f64,
    muscle: MuscleProfile,
}

impl BoutSpec {
    /// Creates a bout, rejecting `reps == 0` and negative or non-finite RIR.
    ///
    /// Zero sets is allowed: it describes an empty bout with no recovery cost.
    pub fn new(sets: u32, reps: u32, rir: f64, muscle: MuscleProfile) -> Result<Self, ModelError> {
        if reps == 0 {
            return Err(ModelError::BadReps(reps));
        }
        if !rir.is_finite() || rir < 0.0 {
            return Err(ModelError::BadRir(rir));
        }
        Ok(Self {
            sets,
            reps,
            rir,
            muscle,
        })
    }

    pub fn sets(&self) -> u32 {
        self.sets
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn rir(&self) -> f64 {
        self.rir
    }

    pub fn muscle(&self) -> MuscleProfile {
        self.muscle
    }

    /// Returns a copy of this bout with a different set count.
    pub fn with_sets(&self, sets: u32) -> Self {
        Self { sets, ..*self }
    }
}

/// Lowercases and strips whitespace, underscores and hyphens.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muscle_from_str_case_insensitive() {
        assert_eq!(Muscle::from_str("chest").unwrap(), Muscle::Chest);
        assert_eq!(Muscle::from_str("QUADS").unwrap(), Muscle::Quads);
        assert_eq!(Muscle::from_str("  Hamstrings ").unwrap(), Muscle::Hamstrings);
    }

    #[test]
    fn test_muscle_from_str_invalid() {
        assert!(Muscle::from_str("forearms").is_err());
        assert!(Muscle::from_str("").is_err());
    }

    #[test]
    fn test_reference_profiles() {
        assert_eq!(
            Muscle::Quads.profile(),
            MuscleProfile::new(DamageClass::EasilyDamaged, LengthProfile::Lengthened)
        );
        assert_eq!(
            Muscle::Calves.profile(),
            MuscleProfile::new(DamageClass::HardlyDamaged, LengthProfile::Shortened)
        );
        assert_eq!(Muscle::Triceps.profile(), MuscleProfile::NEUTRAL);
    }

    #[test]
    fn test_unknown_muscle_is_neutral() {
        assert_eq!(MuscleProfile::for_name("Forearms"), MuscleProfile::NEUTRAL);
        assert_eq!(MuscleProfile::for_name("Chest").length, LengthProfile::Lengthened);
    }

    #[test]
    fn test_every_muscle_has_exercises() {
        for muscle in Muscle::all() {
            assert!(!muscle.exercises().is_empty(), "{} has no exercises", muscle);
        }
    }

    #[test]
    fn test_profile_labels_parse() {
        assert_eq!(
            LengthProfile::from_str("Lengthened (Descending)").unwrap(),
            LengthProfile::Lengthened
        );
        assert_eq!(
            LengthProfile::from_str("Shortened (Ascending)").unwrap(),
            LengthProfile::Shortened
        );
        assert_eq!(
            DamageClass::from_str("Easily Damaged").unwrap(),
            DamageClass::EasilyDamaged
        );
        assert_eq!(
            DamageClass::from_str("hardly_damaged").unwrap(),
            DamageClass::HardlyDamaged
        );
    }

    #[test]
    fn test_bout_rejects_bad_input() {
        let m = MuscleProfile::NEUTRAL;
        assert_eq!(BoutSpec::new(3, 0, 1.0, m), Err(ModelError::BadReps(0)));
        assert!(matches!(BoutSpec::new(3, 10, -1.0, m), Err(ModelError::BadRir(_))));
        assert!(BoutSpec::new(3, 10, f64::NAN, m).is_err());
        assert!(BoutSpec::new(0, 10, 0.0, m).is_ok());
    }

    #[test]
    fn test_with_sets_leaves_original() {
        let bout = BoutSpec::new(4, 8, 1.0, MuscleProfile::NEUTRAL).unwrap();
        let trimmed = bout.with_sets(2);
        assert_eq!(bout.sets(), 4);
        assert_eq!(trimmed.sets(), 2);
        assert_eq!(trimmed.reps(), 8);
    }
}
