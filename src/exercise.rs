// src/exercise.rs
use crate::calendar::DayToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Surrogate key assigned by the store when a record is first added.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ExerciseId(pub u64);

impl ExerciseId {
    /// Id carried by a freshly validated draft that has not been stored yet.
    pub const UNASSIGNED: Self = Self(0);

    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either one value used for every set, or one value per set (pyramid / dropset).
#[derive(Debug, Clone, PartialEq)]
pub enum SetScheme<T> {
    Fixed(T),
    PerSet(Vec<T>),
}

impl<T: Default> Default for SetScheme<T> {
    fn default() -> Self {
        Self::Fixed(T::default())
    }
}

impl<T: Copy + Default> SetScheme<T> {
    #[must_use]
    pub const fn is_per_set(&self) -> bool {
        matches!(self, Self::PerSet(_))
    }

    /// The scalar value, or the first per-set value.
    #[must_use]
    pub fn first(&self) -> T {
        match self {
            Self::Fixed(value) => *value,
            Self::PerSet(values) => values.first().copied().unwrap_or_default(),
        }
    }

    /// Value for a zero-based set index; `None` past the end of a per-set list.
    #[must_use]
    pub fn for_set(&self, set_index: usize) -> Option<T> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::PerSet(values) => values.get(set_index).copied(),
        }
    }

    /// One value per set, `series` long for a fixed scheme.
    #[must_use]
    pub fn per_set_values(&self, series: u32) -> Vec<T> {
        match self {
            Self::Fixed(value) => vec![*value; series as usize],
            Self::PerSet(values) => values.clone(),
        }
    }

    /// Turns a fixed scheme into `series` copies of its value.
    #[must_use]
    pub fn expanded(&self, series: u32) -> Self {
        match self {
            Self::Fixed(value) => Self::PerSet(vec![*value; series as usize]),
            Self::PerSet(_) => self.clone(),
        }
    }

    /// Keeps only the first per-set value. Later values are dropped.
    #[must_use]
    pub fn collapsed(&self) -> Self {
        Self::Fixed(self.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord", into = "WireRecord")]
pub struct ExerciseRecord {
    pub id: ExerciseId,
    pub name: String,
    pub selected_days: BTreeSet<DayToken>,
    pub series: u32,
    pub reps: SetScheme<u32>,
    pub weight: SetScheme<f64>,
    /// Rest between sets, in seconds.
    pub recovery: u32,
}

impl ExerciseRecord {
    #[must_use]
    pub fn is_scheduled_on(&self, day: DayToken) -> bool {
        self.selected_days.contains(&day)
    }

    /// Scheduled days in canonical week order.
    #[must_use]
    pub fn days_for_display(&self) -> Vec<DayToken> {
        self.selected_days.iter().copied().collect()
    }

    #[must_use]
    pub fn days_label(&self) -> String {
        if self.selected_days.is_empty() {
            return "Nessun giorno selezionato".to_string();
        }
        self.days_for_display()
            .iter()
            .map(|day| day.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn reps_label(&self) -> String {
        match &self.reps {
            SetScheme::Fixed(reps) => reps.to_string(),
            SetScheme::PerSet(reps) => reps
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("-"),
        }
    }

    #[must_use]
    pub fn weight_label(&self) -> String {
        match &self.weight {
            SetScheme::Fixed(weight) => format_weight(*weight),
            SetScheme::PerSet(weights) => weights
                .iter()
                .map(|w| format_weight(*w))
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        format!("{weight:.1}")
    }
}

/// Raw, unchecked form input. Signed fields so that bad counter values can be
/// reported instead of wrapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DraftExercise {
    pub name: String,
    pub selected_days: Vec<DayToken>,
    pub series: i64,
    pub reps: SetScheme<i64>,
    pub weight: SetScheme<f64>,
    pub recovery: i64,
}

impl From<&ExerciseRecord> for DraftExercise {
    fn from(record: &ExerciseRecord) -> Self {
        let reps = match &record.reps {
            SetScheme::Fixed(reps) => SetScheme::Fixed(i64::from(*reps)),
            SetScheme::PerSet(reps) => {
                SetScheme::PerSet(reps.iter().map(|r| i64::from(*r)).collect())
            }
        };
        Self {
            name: record.name.clone(),
            selected_days: record.days_for_display(),
            series: i64::from(record.series),
            reps,
            weight: record.weight.clone(),
            recovery: i64::from(record.recovery),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Exercise name cannot be empty.")]
    MissingName,
    #[error("Select at least one day for the exercise.")]
    NoDaySelected,
    #[error("Number of sets must be greater than zero.")]
    NonPositiveSeries,
    #[error("Too many sets: {series} (limit is {max}).")]
    TooManySeries { series: u32, max: u32 },
    #[error("Invalid recovery time: {0}")]
    InvalidRecovery(String),
    #[error("Invalid reps or weight: {0}")]
    InvalidRepsOrWeight(String),
}

/// Ceiling on stored set counts, whatever the configured limit says.
pub const MAX_STORED_SERIES: u32 = 100;

/// Upper bounds on the form counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseLimits {
    pub max_series: u32,
    pub max_reps: u32,
    pub max_weight: f64,
    /// Seconds.
    pub max_recovery: u32,
}

impl Default for ExerciseLimits {
    fn default() -> Self {
        Self {
            max_series: 20,
            max_reps: 50,
            max_weight: 200.0,
            max_recovery: 300,
        }
    }
}

/// Knobs that differ between the screens that create exercises.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationPolicy {
    /// `true`: recovery must be > 0. `false`: 0 seconds is accepted.
    pub require_positive_recovery: bool,
    pub limits: ExerciseLimits,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_positive_recovery: true,
            limits: ExerciseLimits::default(),
        }
    }
}

impl ValidationPolicy {
    /// Configured series limit, clamped to [`MAX_STORED_SERIES`].
    #[must_use]
    pub fn max_series(&self) -> u32 {
        self.limits.max_series.min(MAX_STORED_SERIES)
    }
}

/// Checks a draft and turns it into a record with an unassigned id.
/// Checks run in a fixed order and the first failure is reported.
/// # Errors
/// Returns the first `ValidationError` encountered.
pub fn validate(
    draft: &DraftExercise,
    policy: ValidationPolicy,
) -> Result<ExerciseRecord, ValidationError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if draft.selected_days.is_empty() {
        return Err(ValidationError::NoDaySelected);
    }
    let series = u32::try_from(draft.series)
        .ok()
        .filter(|s| *s > 0)
        .ok_or(ValidationError::NonPositiveSeries)?;
    let max_series = policy.max_series();
    if series > max_series {
        return Err(ValidationError::TooManySeries {
            series,
            max: max_series,
        });
    }

    let limits = policy.limits;
    let recovery = u32::try_from(draft.recovery).map_err(|_| {
        ValidationError::InvalidRecovery(format!("{} seconds is out of range", draft.recovery))
    })?;
    if policy.require_positive_recovery && recovery == 0 {
        return Err(ValidationError::InvalidRecovery(
            "recovery must be greater than zero".to_string(),
        ));
    }
    if recovery > limits.max_recovery {
        return Err(ValidationError::InvalidRecovery(format!(
            "{recovery} seconds is above the limit of {}",
            limits.max_recovery
        )));
    }

    let reps = checked_reps(&draft.reps, series, limits.max_reps)?;
    let weight = checked_weights(&draft.weight, series, limits.max_weight)?;

    Ok(ExerciseRecord {
        id: ExerciseId::UNASSIGNED,
        name: name.to_string(),
        selected_days: draft.selected_days.iter().copied().collect(),
        series,
        reps,
        weight,
        recovery,
    })
}

fn check_per_set_len(len: usize, series: u32, what: &str) -> Result<(), ValidationError> {
    if len != series as usize {
        return Err(ValidationError::InvalidRepsOrWeight(format!(
            "expected {series} per-set {what}, got {len}"
        )));
    }
    Ok(())
}

fn set_label(set: Option<usize>, what: &str) -> String {
    match set {
        Some(i) => format!("{what} for set {}", i + 1),
        None => what.to_string(),
    }
}

fn checked_rep(value: i64, set: Option<usize>, max: u32) -> Result<u32, ValidationError> {
    let rep = u32::try_from(value)
        .ok()
        .filter(|r| *r > 0)
        .ok_or_else(|| {
            ValidationError::InvalidRepsOrWeight(format!(
                "{} must be greater than zero",
                set_label(set, "reps")
            ))
        })?;
    if rep > max {
        return Err(ValidationError::InvalidRepsOrWeight(format!(
            "{} must be at most {max}, got {rep}",
            set_label(set, "reps")
        )));
    }
    Ok(rep)
}

fn checked_reps(
    reps: &SetScheme<i64>,
    series: u32,
    max: u32,
) -> Result<SetScheme<u32>, ValidationError> {
    match reps {
        SetScheme::Fixed(value) => checked_rep(*value, None, max).map(SetScheme::Fixed),
        SetScheme::PerSet(values) => {
            check_per_set_len(values.len(), series, "reps")?;
            values
                .iter()
                .enumerate()
                .map(|(i, value)| checked_rep(*value, Some(i), max))
                .collect::<Result<Vec<_>, _>>()
                .map(SetScheme::PerSet)
        }
    }
}

fn checked_weight(value: f64, set: Option<usize>, max: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidRepsOrWeight(format!(
            "{} must be zero or more, got {value}",
            set_label(set, "weight")
        )));
    }
    if value > max {
        return Err(ValidationError::InvalidRepsOrWeight(format!(
            "{} must be at most {max}, got {value}",
            set_label(set, "weight")
        )));
    }
    Ok(value)
}

fn checked_weights(
    weight: &SetScheme<f64>,
    series: u32,
    max: f64,
) -> Result<SetScheme<f64>, ValidationError> {
    match weight {
        SetScheme::Fixed(value) => checked_weight(*value, None, max).map(SetScheme::Fixed),
        SetScheme::PerSet(values) => {
            check_per_set_len(values.len(), series, "weights")?;
            values
                .iter()
                .enumerate()
                .map(|(i, value)| checked_weight(*value, Some(i), max))
                .collect::<Result<Vec<_>, _>>()
                .map(SetScheme::PerSet)
        }
    }
}

/// Switches reps between one value and one value per set.
///
/// Turning per-set on repeats the current value `series` times; turning it off
/// keeps only the first set's value, so per-set edits beyond the first set are lost.
#[must_use]
pub fn normalize_reps(record: &ExerciseRecord, to_multiple: bool) -> ExerciseRecord {
    let reps = if to_multiple {
        record.reps.expanded(record.series)
    } else {
        record.reps.collapsed()
    };
    ExerciseRecord {
        reps,
        ..record.clone()
    }
}

/// Weight counterpart of [`normalize_reps`].
#[must_use]
pub fn normalize_weights(record: &ExerciseRecord, to_multiple: bool) -> ExerciseRecord {
    let weight = if to_multiple {
        record.weight.expanded(record.series)
    } else {
        record.weight.collapsed()
    };
    ExerciseRecord {
        weight,
        ..record.clone()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Set index {index} is out of bounds (only {len} sets). Append a slot first.")]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub len: usize,
}

/// Replaces a single per-set value, leaving the others untouched.
/// # Errors
/// `IndexOutOfBounds` when `index` is not an existing slot.
pub fn set_field_at_index<T: Clone>(
    seq: &[T],
    index: usize,
    value: T,
) -> Result<Vec<T>, IndexOutOfBounds> {
    if index >= seq.len() {
        return Err(IndexOutOfBounds {
            index,
            len: seq.len(),
        });
    }
    let mut updated = seq.to_vec();
    updated[index] = value;
    Ok(updated)
}

/// Grows a per-set sequence by one default slot at the end.
#[must_use]
pub fn append_slot<T: Clone + Default>(seq: &[T]) -> Vec<T> {
    let mut grown = seq.to_vec();
    grown.push(T::default());
    grown
}

// --- Storage shape ---
// reps/weight are a number or an array depending on the useMultiple* flags.
// Older saves have no flags, store a single rep count as a one-element array,
// and the earliest ones lack reps and recovery entirely.

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumberOrList<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    selected_days: Vec<String>,
    #[serde(default)]
    series: u32,
    #[serde(default)]
    reps: Option<NumberOrList<u32>>,
    #[serde(default)]
    weight: Option<NumberOrList<f64>>,
    #[serde(default, skip_serializing)]
    weights: Option<Vec<f64>>,
    #[serde(default)]
    recovery: u32,
    #[serde(default)]
    use_multiple_reps: Option<bool>,
    #[serde(default)]
    use_multiple_weights: Option<bool>,
}

fn scheme_from_wire<T: Copy + Default>(
    value: Option<NumberOrList<T>>,
    flag: Option<bool>,
    series: u32,
) -> SetScheme<T> {
    match (value, flag) {
        (None, _) => SetScheme::default(),
        (Some(NumberOrList::One(v)), Some(true)) => SetScheme::Fixed(v).expanded(series.max(1)),
        (Some(NumberOrList::One(v)), _) => SetScheme::Fixed(v),
        (Some(NumberOrList::Many(values)), Some(true)) => SetScheme::PerSet(values),
        (Some(NumberOrList::Many(values)), Some(false)) => SetScheme::PerSet(values).collapsed(),
        // Missing flag with several values: keep them per set rather than
        // dropping all but the first.
        (Some(NumberOrList::Many(values)), None) => {
            if values.len() > 1 {
                SetScheme::PerSet(values)
            } else {
                SetScheme::PerSet(values).collapsed()
            }
        }
    }
}

fn scheme_to_wire<T: Copy>(scheme: SetScheme<T>) -> (NumberOrList<T>, bool) {
    match scheme {
        SetScheme::Fixed(v) => (NumberOrList::One(v), false),
        SetScheme::PerSet(values) => (NumberOrList::Many(values), true),
    }
}

impl TryFrom<WireRecord> for ExerciseRecord {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        if wire.series > MAX_STORED_SERIES {
            return Err(format!(
                "exercise '{}' has {} sets, more than the {MAX_STORED_SERIES} allowed",
                wire.name, wire.series
            ));
        }

        let mut selected_days = BTreeSet::new();
        for raw in &wire.selected_days {
            match raw.parse::<DayToken>() {
                Ok(day) => {
                    selected_days.insert(day);
                }
                Err(e) => warn!(exercise = %wire.name, "Ignoring stored day: {e}"),
            }
        }

        let weight_value = match (wire.weights, wire.use_multiple_weights) {
            (Some(weights), Some(true) | None) if !weights.is_empty() => {
                Some(NumberOrList::Many(weights))
            }
            _ => wire.weight,
        };

        Ok(Self {
            id: ExerciseId(wire.id.unwrap_or_default()),
            reps: scheme_from_wire(wire.reps, wire.use_multiple_reps, wire.series),
            weight: scheme_from_wire(weight_value, wire.use_multiple_weights, wire.series),
            name: wire.name,
            selected_days,
            series: wire.series,
            recovery: wire.recovery,
        })
    }
}

impl From<ExerciseRecord> for WireRecord {
    fn from(record: ExerciseRecord) -> Self {
        let (reps, use_multiple_reps) = scheme_to_wire(record.reps);
        let (weight, use_multiple_weights) = scheme_to_wire(record.weight);
        Self {
            id: record.id.is_assigned().then_some(record.id.0),
            name: record.name,
            selected_days: record
                .selected_days
                .iter()
                .map(|day| day.as_str().to_string())
                .collect(),
            series: record.series,
            reps: Some(reps),
            weight: Some(weight),
            weights: None,
            recovery: record.recovery,
            use_multiple_reps: Some(use_multiple_reps),
            use_multiple_weights: Some(use_multiple_weights),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squat_draft() -> DraftExercise {
        DraftExercise {
            name: "Squat".to_string(),
            selected_days: vec![DayToken::Lun, DayToken::Gio],
            series: 3,
            reps: SetScheme::Fixed(10),
            weight: SetScheme::Fixed(60.0),
            recovery: 90,
        }
    }

    #[test]
    fn validate_accepts_complete_draft() {
        let record = validate(&squat_draft(), ValidationPolicy::default()).unwrap();
        assert_eq!(record.id, ExerciseId::UNASSIGNED);
        assert_eq!(record.name, "Squat");
        assert_eq!(record.series, 3);
        assert_eq!(record.reps, SetScheme::Fixed(10));
        assert_eq!(record.days_label(), "Lun, Gio");
    }

    #[test]
    fn validate_reports_first_failure_in_order() {
        let policy = ValidationPolicy::default();
        let mut draft = DraftExercise {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(validate(&draft, policy), Err(ValidationError::MissingName));

        draft.name = "Row".to_string();
        assert_eq!(validate(&draft, policy), Err(ValidationError::NoDaySelected));

        draft.selected_days = vec![DayToken::Mar];
        assert_eq!(validate(&draft, policy), Err(ValidationError::NonPositiveSeries));

        draft.series = 4;
        assert!(matches!(
            validate(&draft, policy),
            Err(ValidationError::InvalidRecovery(_))
        ));

        draft.recovery = 60;
        assert!(matches!(
            validate(&draft, policy),
            Err(ValidationError::InvalidRepsOrWeight(_))
        ));
    }

    #[test]
    fn lenient_policy_accepts_zero_recovery() {
        let draft = DraftExercise {
            recovery: 0,
            ..squat_draft()
        };
        let lenient = ValidationPolicy {
            require_positive_recovery: false,
            ..Default::default()
        };
        assert!(validate(&draft, ValidationPolicy::default()).is_err());
        assert_eq!(validate(&draft, lenient).unwrap().recovery, 0);

        let negative = DraftExercise {
            recovery: -5,
            ..squat_draft()
        };
        assert!(matches!(
            validate(&negative, lenient),
            Err(ValidationError::InvalidRecovery(_))
        ));
    }

    #[test]
    fn per_set_values_must_match_series() {
        let short = DraftExercise {
            reps: SetScheme::PerSet(vec![12, 10]),
            ..squat_draft()
        };
        assert!(matches!(
            validate(&short, ValidationPolicy::default()),
            Err(ValidationError::InvalidRepsOrWeight(_))
        ));

        let zero_set = DraftExercise {
            reps: SetScheme::PerSet(vec![12, 0, 8]),
            ..squat_draft()
        };
        assert_eq!(
            validate(&zero_set, ValidationPolicy::default()),
            Err(ValidationError::InvalidRepsOrWeight(
                "reps for set 2 must be greater than zero".to_string()
            ))
        );

        let pyramid = DraftExercise {
            reps: SetScheme::PerSet(vec![12, 10, 8]),
            weight: SetScheme::PerSet(vec![50.0, 55.0, 60.0]),
            ..squat_draft()
        };
        let record = validate(&pyramid, ValidationPolicy::default()).unwrap();
        assert_eq!(record.reps_label(), "12-10-8");
        assert_eq!(record.weight_label(), "50-55-60");
    }

    #[test]
    fn negative_weight_is_rejected_zero_is_fine() {
        let bodyweight = DraftExercise {
            weight: SetScheme::Fixed(0.0),
            ..squat_draft()
        };
        assert!(validate(&bodyweight, ValidationPolicy::default()).is_ok());
        let negative = DraftExercise {
            weight: SetScheme::Fixed(-2.5),
            ..squat_draft()
        };
        assert!(validate(&negative, ValidationPolicy::default()).is_err());
    }

    #[test]
    fn counters_are_capped() {
        let policy = ValidationPolicy::default();
        let cases = [
            DraftExercise {
                series: 21,
                ..squat_draft()
            },
            DraftExercise {
                reps: SetScheme::Fixed(51),
                ..squat_draft()
            },
            DraftExercise {
                reps: SetScheme::PerSet(vec![10, 60, 10]),
                ..squat_draft()
            },
            DraftExercise {
                weight: SetScheme::Fixed(200.5),
                ..squat_draft()
            },
            DraftExercise {
                recovery: 301,
                ..squat_draft()
            },
        ];
        for draft in &cases {
            assert!(validate(draft, policy).is_err(), "accepted {draft:?}");
        }
        assert_eq!(
            validate(&cases[0], policy),
            Err(ValidationError::TooManySeries { series: 21, max: 20 })
        );

        let at_limits = DraftExercise {
            series: 20,
            reps: SetScheme::Fixed(50),
            weight: SetScheme::Fixed(200.0),
            recovery: 300,
            ..squat_draft()
        };
        assert!(validate(&at_limits, policy).is_ok());
    }

    #[test]
    fn limits_are_configurable_up_to_the_hard_ceiling() {
        let relaxed = ValidationPolicy {
            limits: ExerciseLimits {
                max_series: 1_000_000,
                max_recovery: 900,
                ..Default::default()
            },
            ..Default::default()
        };
        let long_rest = DraftExercise {
            recovery: 900,
            ..squat_draft()
        };
        assert!(validate(&long_rest, relaxed).is_ok());

        let huge = DraftExercise {
            series: 1_000_000,
            ..squat_draft()
        };
        assert_eq!(
            validate(&huge, relaxed),
            Err(ValidationError::TooManySeries {
                series: 1_000_000,
                max: MAX_STORED_SERIES
            })
        );
    }

    #[test]
    fn stored_series_above_ceiling_is_rejected() {
        let json = r#"{"name":"Bad","selectedDays":["Lun"],"series":4294967295,"reps":10,"useMultipleReps":true,"weight":0,"recovery":60}"#;
        let result: Result<ExerciseRecord, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn toggling_reps_is_lossy_past_first_set() {
        let record = validate(&squat_draft(), ValidationPolicy::default()).unwrap();
        let expanded = normalize_reps(&record, true);
        assert_eq!(expanded.reps, SetScheme::PerSet(vec![10, 10, 10]));

        let SetScheme::PerSet(values) = &expanded.reps else {
            panic!("expected per-set reps");
        };
        let edited = ExerciseRecord {
            reps: SetScheme::PerSet(set_field_at_index(values, 2, 6).unwrap()),
            ..expanded.clone()
        };
        let collapsed = normalize_reps(&edited, false);
        assert_eq!(collapsed.reps, SetScheme::Fixed(10));
        // Already in the requested shape
        assert_eq!(normalize_reps(&expanded, true), expanded);
    }

    #[test]
    fn toggling_weights() {
        let record = validate(&squat_draft(), ValidationPolicy::default()).unwrap();
        let expanded = normalize_weights(&record, true);
        assert_eq!(expanded.weight, SetScheme::PerSet(vec![60.0; 3]));
        assert_eq!(normalize_weights(&expanded, false), record);
    }

    #[test]
    fn sequence_editing() {
        let reps = vec![12_u32, 10];
        assert_eq!(
            set_field_at_index(&reps, 2, 8),
            Err(IndexOutOfBounds { index: 2, len: 2 })
        );
        let grown = append_slot(&reps);
        assert_eq!(grown, vec![12, 10, 0]);
        assert_eq!(set_field_at_index(&grown, 2, 8).unwrap(), vec![12, 10, 8]);
        assert_eq!(reps, vec![12, 10]);
    }

    #[test]
    fn reads_legacy_shapes() {
        let json = r#"{"name":"Panca","selectedDays":["Mer","Lun","Xyz"],"series":4,"reps":[8],"weight":40,"recovery":120}"#;
        let record: ExerciseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, ExerciseId::UNASSIGNED);
        assert_eq!(record.days_for_display(), vec![DayToken::Lun, DayToken::Mer]);
        assert_eq!(record.reps, SetScheme::Fixed(8));
        assert_eq!(record.weight, SetScheme::Fixed(40.0));

        let first_run = r#"{"name":"Trazioni","selectedDays":["Ven"],"series":3,"weight":0}"#;
        let record: ExerciseRecord = serde_json::from_str(first_run).unwrap();
        assert_eq!(record.reps, SetScheme::Fixed(0));
        assert_eq!(record.recovery, 0);

        let with_weights = r#"{"name":"Stacco","selectedDays":["Sab"],"series":2,"reps":[5,3],"useMultipleReps":true,"weight":100,"weights":[100,110],"useMultipleWeights":true,"recovery":180}"#;
        let record: ExerciseRecord = serde_json::from_str(with_weights).unwrap();
        assert_eq!(record.reps, SetScheme::PerSet(vec![5, 3]));
        assert_eq!(record.weight, SetScheme::PerSet(vec![100.0, 110.0]));

        let unflagged = r#"{"name":"Rematore","selectedDays":["Gio"],"series":2,"reps":[8,6],"weight":30,"recovery":90}"#;
        let record: ExerciseRecord = serde_json::from_str(unflagged).unwrap();
        assert_eq!(record.reps, SetScheme::PerSet(vec![8, 6]));
    }

    #[test]
    fn writes_flags_matching_value_shape() {
        let mut record = validate(&squat_draft(), ValidationPolicy::default()).unwrap();
        record.id = ExerciseId(7);
        let record = normalize_reps(&record, true);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["useMultipleReps"], true);
        assert_eq!(value["useMultipleWeights"], false);
        assert_eq!(value["reps"], serde_json::json!([10, 10, 10]));
        assert_eq!(value["weight"], serde_json::json!(60.0));
        assert_eq!(value["selectedDays"], serde_json::json!(["Lun", "Gio"]));
    }
}
