//! Closed code domains used by the collision, vehicle and casualty files.
//!
//! Every coded column in the source data is modelled as an enum whose
//! discriminant is the numeric code from the published data guide. The
//! [`CodedLabel`] trait provides the bidirectional code/label mapping used
//! by the loader (code → enum), the dashboards (enum → label) and the
//! filter engine (label → enum).

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Error returned when a numeric code is not part of its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown {domain} code {code}")]
pub struct UnknownCodeError {
    /// Name of the code domain (e.g. `"weather"`).
    pub domain: &'static str,
    /// The rejected code.
    pub code: i32,
}

/// Error returned when a human-readable label is not part of its domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {domain} label '{label}'")]
pub struct UnknownLabelError {
    /// Name of the code domain (e.g. `"weather"`).
    pub domain: &'static str,
    /// The rejected label.
    pub label: String,
}

/// A closed enum with a numeric code and a human-readable label per
/// variant.
pub trait CodedLabel:
    Sized + Copy + PartialEq + IntoEnumIterator + Into<&'static str> + 'static
{
    /// Name of the domain, used in error messages.
    const DOMAIN: &'static str;

    /// Returns the numeric code for this variant.
    fn code(self) -> i32;

    /// Returns the human-readable label for this variant.
    fn label(self) -> &'static str {
        self.into()
    }

    /// Resolves a numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCodeError`] if no variant carries `code`.
    fn from_code(code: i32) -> Result<Self, UnknownCodeError> {
        Self::iter()
            .find(|v| v.code() == code)
            .ok_or(UnknownCodeError {
                domain: Self::DOMAIN,
                code,
            })
    }

    /// Resolves a human-readable label (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`UnknownLabelError`] if no variant carries `label`.
    fn from_label(label: &str) -> Result<Self, UnknownLabelError> {
        Self::iter()
            .find(|v| v.label() == label)
            .ok_or_else(|| UnknownLabelError {
                domain: Self::DOMAIN,
                label: label.to_string(),
            })
    }

    /// Returns every label in code order, as offered by filter widgets.
    #[must_use]
    fn labels() -> Vec<&'static str> {
        Self::iter().map(Self::label).collect()
    }
}

/// Collision severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Severity {
    #[strum(serialize = "Fatal")]
    Fatal = 1,
    #[strum(serialize = "Serious")]
    Serious = 2,
    #[strum(serialize = "Slight")]
    Slight = 3,
}

impl CodedLabel for Severity {
    const DOMAIN: &'static str = "severity";

    fn code(self) -> i32 {
        self as i32
    }
}

impl Severity {
    /// Fatal and serious collisions count towards the hazard score.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::Fatal | Self::Serious)
    }
}

/// Weather conditions at the time of the collision.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Weather {
    #[strum(serialize = "Fine (no high winds)")]
    Fine = 1,
    #[strum(serialize = "Raining (no high winds)")]
    Raining = 2,
    #[strum(serialize = "Snowing (no high winds)")]
    Snowing = 3,
    #[strum(serialize = "Fine (high winds)")]
    FineHighWinds = 4,
    #[strum(serialize = "Raining (high winds)")]
    RainingHighWinds = 5,
    #[strum(serialize = "Snowing (high winds)")]
    SnowingHighWinds = 6,
    #[strum(serialize = "Fog or Mist")]
    FogOrMist = 7,
    #[strum(serialize = "Other")]
    Other = 8,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
}

impl CodedLabel for Weather {
    const DOMAIN: &'static str = "weather";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Classification of the first road involved.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RoadClass {
    #[strum(serialize = "Motorway")]
    Motorway = 1,
    #[strum(serialize = "A/(M)")]
    AM = 2,
    #[strum(serialize = "A")]
    A = 3,
    #[strum(serialize = "B")]
    B = 4,
    #[strum(serialize = "C")]
    C = 5,
    #[strum(serialize = "Unclassified")]
    Unclassified = 6,
}

impl CodedLabel for RoadClass {
    const DOMAIN: &'static str = "road class";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Physical layout of the road.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RoadType {
    #[strum(serialize = "Roundabout")]
    Roundabout = 1,
    #[strum(serialize = "One way")]
    OneWay = 2,
    #[strum(serialize = "Dual carriageway")]
    DualCarriageway = 3,
    #[strum(serialize = "Single carriageway")]
    SingleCarriageway = 6,
    #[strum(serialize = "Slip")]
    Slip = 7,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
    #[strum(serialize = "One way(alt)")]
    OneWayAlt = 12,
    #[strum(serialize = "Other")]
    Other = 15,
}

impl CodedLabel for RoadType {
    const DOMAIN: &'static str = "road type";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Light conditions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum LightCondition {
    #[strum(serialize = "Daylight")]
    Daylight = 1,
    #[strum(serialize = "Darkness (street lights lit)")]
    DarknessLit = 4,
    #[strum(serialize = "Darkness (no street lights)")]
    DarknessNoLighting = 5,
    #[strum(serialize = "Darkness (street lights unlit)")]
    DarknessUnlit = 6,
    #[strum(serialize = "Darkness (unknown lighting)")]
    DarknessUnknown = 7,
    #[strum(serialize = "Twilight")]
    Twilight = 8,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
}

impl CodedLabel for LightCondition {
    const DOMAIN: &'static str = "light";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Road surface conditions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RoadSurface {
    #[strum(serialize = "Dry")]
    Dry = 1,
    #[strum(serialize = "Wet / Damp")]
    WetOrDamp = 2,
    #[strum(serialize = "Snow")]
    Snow = 3,
    #[strum(serialize = "Frost / Ice")]
    FrostOrIce = 4,
    #[strum(serialize = "Flood")]
    Flood = 5,
    #[strum(serialize = "Oil")]
    Oil = 6,
    #[strum(serialize = "Mud")]
    Mud = 7,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
}

impl CodedLabel for RoadSurface {
    const DOMAIN: &'static str = "surface";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Special conditions at the collision site.
///
/// Both `-1` (data missing) and `0` are published as "no special
/// conditions"; the canonical code is `0`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SpecialConditions {
    #[strum(serialize = "No special conditions")]
    NoSpecial = 0,
    #[strum(serialize = "Auto traffic signal out")]
    SignalOut = 1,
    #[strum(serialize = "Auto signal partially defective")]
    SignalPartiallyDefective = 2,
    #[strum(serialize = "Permanent road signing defective")]
    SigningDefective = 3,
    #[strum(serialize = "Roadworks")]
    Roadworks = 4,
    #[strum(serialize = "Road surface defective")]
    SurfaceDefective = 5,
    #[strum(serialize = "Oil or diesel")]
    OilOrDiesel = 6,
    #[strum(serialize = "Mud")]
    Mud = 7,
    #[strum(serialize = "Road layout altered (temporary)")]
    LayoutAltered = 8,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
}

impl CodedLabel for SpecialConditions {
    const DOMAIN: &'static str = "special conditions";

    fn code(self) -> i32 {
        self as i32
    }

    fn from_code(code: i32) -> Result<Self, UnknownCodeError> {
        match code {
            -1 | 0 => Ok(Self::NoSpecial),
            _ => Self::iter()
                .find(|v| v.code() == code)
                .ok_or(UnknownCodeError {
                    domain: Self::DOMAIN,
                    code,
                }),
        }
    }
}

/// Urban or rural area.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum UrbanRural {
    #[strum(serialize = "Urban")]
    Urban = 1,
    #[strum(serialize = "Rural")]
    Rural = 2,
}

impl CodedLabel for UrbanRural {
    const DOMAIN: &'static str = "urban/rural";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Sex of a driver or casualty.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Sex {
    #[strum(serialize = "Male")]
    Male = 1,
    #[strum(serialize = "Female")]
    Female = 2,
    #[strum(serialize = "Unknown")]
    Unknown = 9,
}

impl CodedLabel for Sex {
    const DOMAIN: &'static str = "gender";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Age band of a driver or casualty.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AgeBand {
    #[strum(serialize = "0-5")]
    UpTo5 = 1,
    #[strum(serialize = "6-10")]
    From6To10 = 2,
    #[strum(serialize = "11-15")]
    From11To15 = 3,
    #[strum(serialize = "16-20")]
    From16To20 = 4,
    #[strum(serialize = "21-25")]
    From21To25 = 5,
    #[strum(serialize = "26-35")]
    From26To35 = 6,
    #[strum(serialize = "36-45")]
    From36To45 = 7,
    #[strum(serialize = "46-55")]
    From46To55 = 8,
    #[strum(serialize = "56-65")]
    From56To65 = 9,
    #[strum(serialize = "66-75")]
    From66To75 = 10,
    #[strum(serialize = "Over 75")]
    Over75 = 11,
}

impl CodedLabel for AgeBand {
    const DOMAIN: &'static str = "age band";

    fn code(self) -> i32 {
        self as i32
    }
}

/// Role of a casualty in the collision.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum CasualtyClass {
    #[strum(serialize = "Driver/Rider")]
    DriverOrRider = 1,
    #[strum(serialize = "Passenger")]
    Passenger = 2,
    #[strum(serialize = "Pedestrian")]
    Pedestrian = 3,
}

impl CodedLabel for CasualtyClass {
    const DOMAIN: &'static str = "casualty class";

    fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_roundtrip<T: CodedLabel + std::fmt::Debug>() {
        for variant in T::iter() {
            assert_eq!(T::from_code(variant.code()).unwrap(), variant);
            assert_eq!(T::from_label(variant.label()).unwrap(), variant);
        }
    }

    #[test]
    fn every_domain_roundtrips() {
        assert_roundtrip::<Severity>();
        assert_roundtrip::<Weather>();
        assert_roundtrip::<RoadClass>();
        assert_roundtrip::<RoadType>();
        assert_roundtrip::<LightCondition>();
        assert_roundtrip::<RoadSurface>();
        assert_roundtrip::<SpecialConditions>();
        assert_roundtrip::<UrbanRural>();
        assert_roundtrip::<Sex>();
        assert_roundtrip::<AgeBand>();
        assert_roundtrip::<CasualtyClass>();
    }

    #[test]
    fn road_type_labels_match_data_guide() {
        assert_eq!(RoadType::from_code(3).unwrap().label(), "Dual carriageway");
        assert_eq!(RoadType::from_code(12).unwrap().label(), "One way(alt)");
        assert_eq!(RoadType::DualCarriageway.to_string(), "Dual carriageway");
    }

    #[test]
    fn rejects_unknown_codes() {
        let err = RoadType::from_code(4).unwrap_err();
        assert_eq!(err.domain, "road type");
        assert_eq!(err.code, 4);
        assert!(Severity::from_code(0).is_err());
        assert!(Sex::from_code(-1).is_err());
        assert!(LightCondition::from_code(2).is_err());
    }

    #[test]
    fn rejects_unknown_labels() {
        let err = Weather::from_label("Sunny").unwrap_err();
        assert_eq!(err.to_string(), "unknown weather label 'Sunny'");
        // Labels are matched exactly.
        assert!(Severity::from_label("fatal").is_err());
    }

    #[test]
    fn special_conditions_missing_and_zero_are_the_same() {
        assert_eq!(
            SpecialConditions::from_code(-1).unwrap(),
            SpecialConditions::NoSpecial
        );
        assert_eq!(
            SpecialConditions::from_code(0).unwrap(),
            SpecialConditions::NoSpecial
        );
        assert_eq!(SpecialConditions::NoSpecial.label(), "No special conditions");
        assert!(SpecialConditions::from_code(10).is_err());
    }

    #[test]
    fn labels_are_in_code_order() {
        assert_eq!(Severity::labels(), vec!["Fatal", "Serious", "Slight"]);
        assert_eq!(AgeBand::labels().first(), Some(&"0-5"));
        assert_eq!(AgeBand::labels().last(), Some(&"Over 75"));
    }

    #[test]
    fn high_severity() {
        assert!(Severity::Fatal.is_high());
        assert!(Severity::Serious.is_high());
        assert!(!Severity::Slight.is_high());
    }
}
