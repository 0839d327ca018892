use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

use crate::error::InputError;

/// Laterality of a body part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    /// Unilateral body part, or both sides reported together
    Combined = 0,
    Left = 1,
    Right = 2,
}

impl Side {
    /// The two sides a combined report of a bilateral body part expands to
    pub const BILATERAL: [Side; 2] = [Side::Left, Side::Right];
}

impl TryFrom<u8> for Side {
    type Error = InputError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Side::Combined),
            1 => Ok(Side::Left),
            2 => Ok(Side::Right),
            other => Err(InputError::InvalidSide(other)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side as u8
    }
}

/// Anatomical location identifier (muscle, muscle group, joint or ligament)
///
/// Identifiers are opaque: what a location *is* comes from an
/// [`AnatomyRegistry`](crate::anatomy::AnatomyRegistry). Unknown identifiers
/// are valid values and are treated as leaf locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyPartLocation(pub u16);

macro_rules! body_part_locations {
    ($($name:ident = $id:expr => $label:expr),* $(,)?) => {
        impl BodyPartLocation {
            $(pub const $name: BodyPartLocation = BodyPartLocation($id);)*

            /// Every named location with its display label
            pub const NAMED: &'static [(BodyPartLocation, &'static str)] =
                &[$((BodyPartLocation($id), $label)),*];
        }
    };
}

body_part_locations! {
    HEAD = 0 => "head",
    SHOULDER = 1 => "shoulder",
    CHEST = 2 => "chest",
    ABDOMINALS = 3 => "abdominals",
    HIP = 4 => "hip",
    GROIN = 5 => "groin",
    QUADS = 6 => "quads",
    KNEE = 7 => "knee",
    SHIN = 8 => "shin",
    ANKLE = 9 => "ankle",
    FOOT = 10 => "foot",
    IT_BAND = 11 => "it band",
    LOWER_BACK = 12 => "lower back",
    GLUTES = 14 => "glutes",
    HAMSTRINGS = 15 => "hamstrings",
    CALVES = 16 => "calves",
    ACHILLES = 17 => "achilles",
    UPPER_BACK_NECK = 18 => "upper back and neck",
    ELBOW = 19 => "elbow",
    WRIST = 20 => "wrist",
    LATS = 21 => "lats",
    BICEPS = 22 => "biceps",
    TRICEPS = 23 => "triceps",
    FOREARM = 24 => "forearm",
    CORE_STABILIZERS = 25 => "core stabilizers",
    ERECTOR_SPINAE = 26 => "erector spinae",
    IT_BAND_LATERAL_KNEE = 27 => "it band lateral knee",
    HIP_FLEXOR = 28 => "hip flexor",
    DELTOID = 29 => "deltoid",
    DEEP_ROTATORS_HIP = 30 => "deep rotators of the hip",
    OBLIQUES = 31 => "obliques",
    FOREARM_INTRINSIC = 32 => "forearm intrinsic muscles",
    FOREARM_EXTRINSIC = 33 => "forearm extrinsic muscles",
    INTRINSIC_MUSCLES_OF_SPINE = 34 => "intrinsic muscles of spine",
    DIAPHRAGM = 35 => "diaphragm",
    PELVIC_FLOOR = 36 => "pelvic floor",
    LATISSIMUS_DORSI = 37 => "latissimus dorsi",
    ANTERIOR_TIBIALIS = 40 => "anterior tibialis",
    PERONEALS_LONGUS = 41 => "peroneals longus",
    POSTERIOR_TIBIALIS = 42 => "posterior tibialis",
    SOLEUS = 43 => "soleus",
    GASTROCNEMIUS_MEDIAL = 44 => "gastrocnemius medial",
    BICEP_FEMORIS_LONG_HEAD = 45 => "bicep femoris long head",
    BICEP_FEMORIS_SHORT_HEAD = 46 => "bicep femoris short head",
    SEMIMEMBRANOSUS = 47 => "semimembranosus",
    SEMITENDINOSUS = 48 => "semitendinosus",
    ADDUCTOR_LONGUS = 49 => "adductor longus",
    ADDUCTOR_MAGNUS_ANTERIOR = 50 => "adductor magnus anterior fibers",
    ADDUCTOR_MAGNUS_POSTERIOR = 51 => "adductor magnus posterior fibers",
    ADDUCTOR_BREVIS = 52 => "adductor brevis",
    GRACILIS = 53 => "gracilis",
    PECTINEUS = 54 => "pectineus",
    VASTUS_LATERALIS = 55 => "vastus lateralis",
    VASTUS_MEDIALIS = 56 => "vastus medialis",
    VASTUS_INTERMEDIUS = 57 => "vastus intermedius",
    RECTUS_FEMORIS = 58 => "rectus femoris",
    TENSOR_FASCIA_LATAE = 59 => "tensor fascia latae",
    PIRIFORMIS = 60 => "piriformis",
    GASTROCNEMIUS_LATERAL = 61 => "gastrocnemius lateral",
    SARTORIUS = 62 => "sartorius",
    GLUTEUS_MEDIUS_ANTERIOR = 63 => "gluteus medius anterior fibers",
    GLUTEUS_MEDIUS_POSTERIOR = 64 => "gluteus medius posterior fibers",
    GLUTEUS_MINIMUS = 65 => "gluteus minimus",
    GLUTEUS_MAXIMUS = 66 => "gluteus maximus",
    QUADRATUS_FEMORIS = 67 => "quadratus femoris",
    POPLITEUS = 68 => "popliteus",
    EXTERNAL_OBLIQUES = 69 => "external obliques",
    QUADRATUS_LUMBORUM = 70 => "quadratus lumborum",
    PSOAS = 71 => "psoas",
    ILIACUS = 72 => "iliacus",
    TRANSVERSE_ABDOMINIS = 73 => "transverse abdominis",
    INTERNAL_OBLIQUES = 74 => "internal obliques",
    RECTUS_ABDOMINIS = 75 => "rectus abdominis",
    UPPER_TRAPEZIUS = 76 => "upper trapezius",
    LEVATOR_SCAPULAE = 77 => "levator scapulae",
    MIDDLE_TRAPEZIUS = 78 => "middle trapezius",
    LOWER_TRAPEZIUS = 79 => "lower trapezius",
    RHOMBOIDS = 80 => "rhomboids",
    PECTORALIS_MINOR = 81 => "pectoralis minor",
    PECTORALIS_MAJOR = 82 => "pectoralis major",
    ANTERIOR_DELTOID = 83 => "anterior deltoid",
    MEDIAL_DELTOID = 84 => "medial deltoid",
    POSTERIOR_DELTOID = 85 => "posterior deltoid",
    SEMIMEMBRANOSUS_SEMITENDINOSUS = 100 => "semimembranosus and semitendinosus",
    ANTERIOR_ADDUCTORS = 101 => "anterior adductors",
    RECTUS_FEMORIS_VASTUS_INTERMEDIUS = 102 => "rectus femoris and vastus intermedius",
    GLUTE_MED = 103 => "glute med",
    UPPER_TRAPS_LEVATOR_SCAPULAE = 105 => "upper traps and levator scapulae",
    MIDDLE_TRAPS_RHOMBOIDS = 106 => "middle traps and rhomboids",
    PEC_MAJOR_MINOR = 107 => "pec major and minor",
    HIP_FLEXOR_MERGE = 108 => "psoas and iliacus",
    ROTATOR_CUFF = 119 => "rotator cuff",
    TERES_MAJOR = 120 => "teres major",
    SUPRASPINATUS = 121 => "supraspinatus",
    SUBSCAPULARIS = 122 => "subscapularis",
    INFRASPINATUS = 123 => "infraspinatus",
    TERES_MINOR = 124 => "teres minor",
    SERRATUS_ANTERIOR = 125 => "serratus anterior",
    BRACHIALIS = 126 => "brachialis",
    BICEPS_BRACHII = 127 => "biceps brachii",
    BRACHIORADIALIS = 128 => "brachioradialis",
    CORACOBRACHIALIS = 129 => "coracobrachialis",
    TRICEP_MEDIAL_HEAD = 130 => "tricep brachii medial head",
    TRICEP_LATERAL_HEAD = 131 => "tricep brachii lateral head",
    TRICEP_LONG_HEAD = 132 => "tricep brachii long head",
}

impl BodyPartLocation {
    /// Human-readable label, if the identifier is a named location
    pub fn label(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(location, _)| location == self)
            .map(|(_, label)| *label)
    }
}

impl fmt::Display for BodyPartLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "location {}", self.0),
        }
    }
}

/// Identity key of a tracked body part: location plus laterality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyPartSide {
    pub body_part_location: BodyPartLocation,
    pub side: Side,
}

impl BodyPartSide {
    pub fn new(body_part_location: BodyPartLocation, side: Side) -> Self {
        BodyPartSide {
            body_part_location,
            side,
        }
    }
}

impl fmt::Display for BodyPartSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.body_part_location.0, self.side as u8)
    }
}

/// Numeric range with uncertainty
///
/// Load figures come from an external mapper as an observed value bracketed by
/// lower and upper bounds. Ranges add bound-wise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRange {
    pub lower_bound: Decimal,
    pub observed_value: Decimal,
    pub upper_bound: Decimal,
}

impl LoadRange {
    pub const ZERO: LoadRange = LoadRange {
        lower_bound: Decimal::ZERO,
        observed_value: Decimal::ZERO,
        upper_bound: Decimal::ZERO,
    };

    pub fn new(lower_bound: Decimal, observed_value: Decimal, upper_bound: Decimal) -> Self {
        LoadRange {
            lower_bound,
            observed_value,
            upper_bound,
        }
    }

    /// A range with no uncertainty
    pub fn exact(value: Decimal) -> Self {
        Self::new(value, value, value)
    }

    pub fn lowest_value(&self) -> Decimal {
        self.lower_bound.min(self.observed_value).min(self.upper_bound)
    }

    pub fn highest_value(&self) -> Decimal {
        self.lower_bound.max(self.observed_value).max(self.upper_bound)
    }

    pub fn is_positive(&self) -> bool {
        self.highest_value() > Decimal::ZERO
    }
}

impl Add for LoadRange {
    type Output = LoadRange;

    fn add(self, other: LoadRange) -> LoadRange {
        LoadRange {
            lower_bound: self.lower_bound + other.lower_bound,
            observed_value: self.observed_value + other.observed_value,
            upper_bound: self.upper_bound + other.upper_bound,
        }
    }
}

impl AddAssign for LoadRange {
    fn add_assign(&mut self, other: LoadRange) {
        *self = *self + other;
    }
}

/// Self-reported symptom descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomDescriptor {
    Sharp,
    Ache,
    Tight,
    Knots,
}

impl SymptomDescriptor {
    pub const ALL: [SymptomDescriptor; 4] = [
        SymptomDescriptor::Sharp,
        SymptomDescriptor::Ache,
        SymptomDescriptor::Tight,
        SymptomDescriptor::Knots,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SymptomDescriptor::Sharp => "sharp",
            SymptomDescriptor::Ache => "ache",
            SymptomDescriptor::Tight => "tight",
            SymptomDescriptor::Knots => "knots",
        }
    }

    /// Sharp and ache are also tracked over the short window
    pub fn has_short_window(&self) -> bool {
        matches!(self, SymptomDescriptor::Sharp | SymptomDescriptor::Ache)
    }
}

/// Maximum severity on the self-report scale
pub const MAX_SEVERITY: u8 = 10;

/// A self-reported symptom for one body part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEvent {
    pub body_part: BodyPartLocation,
    pub side: Side,
    pub reported_date_time: DateTime<Utc>,
    #[serde(default)]
    pub sharp: Option<u8>,
    #[serde(default)]
    pub ache: Option<u8>,
    #[serde(default)]
    pub tight: Option<u8>,
    #[serde(default)]
    pub knots: Option<u8>,
}

impl SymptomEvent {
    pub fn new(body_part: BodyPartLocation, side: Side, reported_date_time: DateTime<Utc>) -> Self {
        SymptomEvent {
            body_part,
            side,
            reported_date_time,
            sharp: None,
            ache: None,
            tight: None,
            knots: None,
        }
    }

    pub fn with(mut self, descriptor: SymptomDescriptor, severity: u8) -> Self {
        match descriptor {
            SymptomDescriptor::Sharp => self.sharp = Some(severity),
            SymptomDescriptor::Ache => self.ache = Some(severity),
            SymptomDescriptor::Tight => self.tight = Some(severity),
            SymptomDescriptor::Knots => self.knots = Some(severity),
        }
        self
    }

    pub fn event_date(&self) -> NaiveDate {
        self.reported_date_time.date_naive()
    }

    pub fn body_part_side(&self) -> BodyPartSide {
        BodyPartSide::new(self.body_part, self.side)
    }

    /// Reported magnitude for a descriptor, 0 when absent
    pub fn severity(&self, descriptor: SymptomDescriptor) -> u8 {
        let value = match descriptor {
            SymptomDescriptor::Sharp => self.sharp,
            SymptomDescriptor::Ache => self.ache,
            SymptomDescriptor::Tight => self.tight,
            SymptomDescriptor::Knots => self.knots,
        };
        value.unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        for descriptor in SymptomDescriptor::ALL {
            let value = self.severity(descriptor);
            if value > MAX_SEVERITY {
                return Err(InputError::SeverityOutOfRange {
                    descriptor: descriptor.name().to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Session categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Practice,
    StrengthAndConditioning,
    Game,
    Tournament,
    BumpUp,
    Corrective,
    SportTraining,
    MixedActivity,
}

/// Intensity of a block inside a mixed or planned session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityBlock {
    pub intensity: IntensityLevel,
    #[serde(default)]
    pub duration_minutes: Option<Decimal>,
}

/// Where a compensation figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationSource {
    InternalProcessing,
    MovementPatterns,
}

/// One session's load contribution to one body-part-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPartLoad {
    pub body_part: BodyPartSide,
    #[serde(default)]
    pub concentric_volume: LoadRange,
    #[serde(default)]
    pub eccentric_volume: LoadRange,
    #[serde(default)]
    pub isometric_volume: LoadRange,
    #[serde(default)]
    pub concentric_intensity: LoadRange,
    #[serde(default)]
    pub eccentric_intensity: LoadRange,
    #[serde(default)]
    pub isometric_intensity: LoadRange,
    #[serde(default)]
    pub compensating_concentric_volume: LoadRange,
    #[serde(default)]
    pub compensating_eccentric_volume: LoadRange,
    #[serde(default)]
    pub compensating_causes: Vec<BodyPartSide>,
    #[serde(default)]
    pub compensation_source: Option<CompensationSource>,
}

impl BodyPartLoad {
    pub fn new(body_part: BodyPartSide) -> Self {
        BodyPartLoad {
            body_part,
            concentric_volume: LoadRange::ZERO,
            eccentric_volume: LoadRange::ZERO,
            isometric_volume: LoadRange::ZERO,
            concentric_intensity: LoadRange::ZERO,
            eccentric_intensity: LoadRange::ZERO,
            isometric_intensity: LoadRange::ZERO,
            compensating_concentric_volume: LoadRange::ZERO,
            compensating_eccentric_volume: LoadRange::ZERO,
            compensating_causes: Vec::new(),
            compensation_source: None,
        }
    }
}

/// Named kinematic patterns reported by movement analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicPattern {
    AptAnklePitch,
    HipDropApt,
    HipDropPva,
    KneeValgusHipDrop,
    KneeValgusPva,
    KneeValgusApt,
    HipRotationAnklePitch,
    HipRotationApt,
}

/// Precomputed elasticity and drift (ADF statistic) for one side of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Elasticity {
    pub elasticity: f64,
    pub y_adf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternElasticity {
    pub pattern: KinematicPattern,
    #[serde(default)]
    pub left: Option<Elasticity>,
    #[serde(default)]
    pub right: Option<Elasticity>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementPatterns {
    pub patterns: Vec<PatternElasticity>,
}

/// Daily training session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSessionSummary {
    pub id: String,
    pub event_date_time: DateTime<Utc>,
    pub session_type: SessionType,
    #[serde(default)]
    pub session_rpe: Option<Decimal>,
    #[serde(default)]
    pub duration_minutes: Option<Decimal>,
    #[serde(default)]
    pub percent_of_max: Option<Decimal>,
    #[serde(default)]
    pub ultra_high_intensity: bool,
    #[serde(default)]
    pub planned: bool,
    #[serde(default)]
    pub intensity_blocks: Vec<IntensityBlock>,
    #[serde(default)]
    pub movement_patterns: Option<MovementPatterns>,
    #[serde(default)]
    pub body_part_loads: Vec<BodyPartLoad>,
}

impl TrainingSessionSummary {
    pub fn new(id: impl Into<String>, event_date_time: DateTime<Utc>, session_type: SessionType) -> Self {
        TrainingSessionSummary {
            id: id.into(),
            event_date_time,
            session_type,
            session_rpe: None,
            duration_minutes: None,
            percent_of_max: None,
            ultra_high_intensity: false,
            planned: false,
            intensity_blocks: Vec::new(),
            movement_patterns: None,
            body_part_loads: Vec::new(),
        }
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_date_time.date_naive()
    }
}

/// A recent session flagged as high relative load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighLoadSession {
    pub event_date: NaiveDate,
    #[serde(default)]
    pub percent_of_max: Option<Decimal>,
}

/// Athlete load history relevant to the ambient load level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadHistoryStats {
    #[serde(default)]
    pub high_relative_load_sessions: Vec<HighLoadSession>,
    #[serde(default = "default_high_relative_load_score")]
    pub high_relative_load_score: Decimal,
}

fn default_high_relative_load_score() -> Decimal {
    Decimal::from(50)
}

impl Default for LoadHistoryStats {
    fn default() -> Self {
        LoadHistoryStats {
            high_relative_load_sessions: Vec::new(),
            high_relative_load_score: default_high_relative_load_score(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_serializes_as_integer() {
        let key = BodyPartSide::new(BodyPartLocation::QUADS, Side::Right);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"body_part_location":6,"side":2}"#);

        let parsed: BodyPartSide = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);

        assert!(serde_json::from_str::<Side>("3").is_err());
    }

    #[test]
    fn test_load_range_addition() {
        let a = LoadRange::new(dec!(8), dec!(10), dec!(12));
        let mut b = LoadRange::exact(dec!(5));
        b += a;

        assert_eq!(b, LoadRange::new(dec!(13), dec!(15), dec!(17)));
        assert_eq!(b.lowest_value(), dec!(13));
        assert_eq!(b.highest_value(), dec!(17));
        assert!(b.is_positive());
        assert!(!LoadRange::ZERO.is_positive());
    }

    #[test]
    fn test_symptom_severity_validation() {
        let reported = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let event = SymptomEvent::new(BodyPartLocation::KNEE, Side::Left, reported)
            .with(SymptomDescriptor::Ache, 4);
        assert_eq!(event.severity(SymptomDescriptor::Ache), 4);
        assert_eq!(event.severity(SymptomDescriptor::Sharp), 0);
        assert!(event.validate().is_ok());

        let bad = event.with(SymptomDescriptor::Knots, 11);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_location_labels() {
        assert_eq!(BodyPartLocation::ACHILLES.label(), Some("achilles"));
        assert_eq!(BodyPartLocation(999).label(), None);
        assert_eq!(BodyPartLocation(999).to_string(), "location 999");
    }
}
