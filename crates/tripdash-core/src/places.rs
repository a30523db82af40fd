//! Place records produced by response extraction.
//!
//! A [`PlaceCandidate`] is what a single text block parses into. Only a
//! [`LocationEntry`] (a candidate with two finite coordinates) is handed to
//! map and selection consumers.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A place parsed from one response block, before coordinate validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A validated place with finite coordinates.
///
/// Fields are private so the finite-coordinate invariant cannot be bypassed;
/// deserialization goes through the same check via [`PlaceCandidate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlaceCandidate", into = "PlaceCandidate")]
pub struct LocationEntry {
    name: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl LocationEntry {
    /// Build an entry from raw parts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NonFiniteCoordinate`] if either coordinate is NaN
    /// or infinite.
    pub fn new(name: Option<String>, latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoreError::NonFiniteCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            name,
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Display label for selection lists.
    ///
    /// Unnamed entries fall back to `Location {n}` where `n` is the 1-based
    /// position of the entry within its turn.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("Location {}", index + 1),
        }
    }
}

impl TryFrom<PlaceCandidate> for LocationEntry {
    type Error = CoreError;

    fn try_from(candidate: PlaceCandidate) -> Result<Self, Self::Error> {
        LocationEntry::new(candidate.name, candidate.latitude, candidate.longitude)
    }
}

impl From<LocationEntry> for PlaceCandidate {
    fn from(entry: LocationEntry) -> Self {
        PlaceCandidate {
            name: entry.name,
            latitude: entry.latitude,
            longitude: entry.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_finite_coordinates() {
        let entry = LocationEntry::new(Some("Colosseum".to_string()), 41.8902, 12.4922).unwrap();
        assert_eq!(entry.name(), Some("Colosseum"));
        assert!((entry.latitude() - 41.8902).abs() < f64::EPSILON);
        assert!((entry.longitude() - 12.4922).abs() < f64::EPSILON);
    }

    #[test]
    fn new_rejects_nan() {
        let err = LocationEntry::new(None, f64::NAN, 12.0).unwrap_err();
        assert!(matches!(err, CoreError::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn new_rejects_infinity() {
        assert!(LocationEntry::new(None, 41.0, f64::INFINITY).is_err());
        assert!(LocationEntry::new(None, f64::NEG_INFINITY, 12.0).is_err());
    }

    #[test]
    fn label_uses_name_when_present() {
        let entry = LocationEntry::new(Some("Trevi Fountain".to_string()), 41.9, 12.48).unwrap();
        assert_eq!(entry.label(3), "Trevi Fountain");
    }

    #[test]
    fn label_falls_back_to_ordinal() {
        let entry = LocationEntry::new(None, 41.9, 12.48).unwrap();
        assert_eq!(entry.label(0), "Location 1");
        assert_eq!(entry.label(4), "Location 5");
    }

    #[test]
    fn serializes_with_flat_field_names() {
        let entry = LocationEntry::new(Some("Pantheon".to_string()), 41.8986, 12.4769).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "Pantheon");
        assert_eq!(json["latitude"], 41.8986);
        assert_eq!(json["longitude"], 12.4769);
    }

    #[test]
    fn deserialize_validates_coordinates() {
        let ok: LocationEntry =
            serde_json::from_str(r#"{"name":null,"latitude":1.5,"longitude":2.5}"#).unwrap();
        assert!(ok.name().is_none());

        // JSON cannot carry NaN; an overflowing literal must not slip through.
        let bad = serde_json::from_str::<LocationEntry>(
            r#"{"name":"x","latitude":1e400,"longitude":2.5}"#,
        );
        assert!(bad.is_err());
    }
}
