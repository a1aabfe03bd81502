//! ONS local authority district codes covered by the dashboard.
//!
//! The collision file identifies the local authority by its ONS code
//! (e.g. `"E08000035"`). Only the districts listed here have a
//! human-readable name; the loader's geographic scope is configured as a
//! list of these codes.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Error returned when an ONS district code is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown district code '{code}'")]
pub struct UnknownDistrictError {
    /// The rejected ONS code.
    pub code: String,
}

/// A West Yorkshire metropolitan district.
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
pub enum District {
    #[strum(serialize = "Leeds")]
    Leeds,
    #[strum(serialize = "Bradford")]
    Bradford,
    #[strum(serialize = "Wakefield")]
    Wakefield,
    #[strum(serialize = "Calderdale")]
    Calderdale,
    #[strum(serialize = "Kirklees")]
    Kirklees,
}

impl District {
    /// Returns the ONS code for this district.
    #[must_use]
    pub const fn ons_code(self) -> &'static str {
        match self {
            Self::Leeds => "E08000035",
            Self::Bradford => "E08000032",
            Self::Wakefield => "E08000036",
            Self::Calderdale => "E08000034",
            Self::Kirklees => "E08000033",
        }
    }

    /// Returns the district name.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Resolves an ONS code (surrounding whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDistrictError`] if the code is not a known district.
    pub fn from_ons_code(code: &str) -> Result<Self, UnknownDistrictError> {
        let code = code.trim();
        Self::iter()
            .find(|d| d.ons_code() == code)
            .ok_or_else(|| UnknownDistrictError {
                code: code.to_string(),
            })
    }

    /// Returns the ONS codes of every known district.
    #[must_use]
    pub fn all_ons_codes() -> Vec<String> {
        Self::iter().map(|d| d.ons_code().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ons_codes() {
        assert_eq!(District::from_ons_code("E08000035").unwrap(), District::Leeds);
        assert_eq!(
            District::from_ons_code(" E08000033 ").unwrap(),
            District::Kirklees
        );
        assert_eq!(District::Calderdale.label(), "Calderdale");
    }

    #[test]
    fn rejects_districts_outside_scope() {
        let err = District::from_ons_code("E08000019").unwrap_err();
        assert_eq!(err.code, "E08000019");
    }

    #[test]
    fn all_codes_are_unique() {
        let mut codes = District::all_ons_codes();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 5);
    }
}
