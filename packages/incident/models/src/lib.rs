#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Traffic incident types shared by the ingestor, the store, and the read
//! API.
//!
//! [`Incident`] is the transient value fetched from the LTA `DataMall`
//! feed. It carries no source identifier, so the tuple
//! `(kind, latitude, longitude, message)` is its natural key.
//! [`IncidentRow`] is the persisted form with the store-assigned id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A traffic incident as reported by the upstream feed.
///
/// Field names on the wire follow the `DataMall` payload
/// (`Type`, `Latitude`, `Longitude`, `Message`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Category label (e.g. "Accident", "Roadwork").
    #[serde(rename = "Type")]
    pub kind: String,
    /// Latitude (WGS84).
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Longitude (WGS84).
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Free-text description, usually prefixed with a `(d/m)HH:MM` stamp.
    #[serde(rename = "Message")]
    pub message: String,
}

impl Incident {
    /// Creates a new incident from its four natural-key fields.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        latitude: f64,
        longitude: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            latitude,
            longitude,
            message: message.into(),
        }
    }

    /// Returns the taxonomy category for this incident's raw label.
    #[must_use]
    pub fn category(&self) -> IncidentCategory {
        IncidentCategory::from_label(&self.kind)
    }
}

/// A persisted incident row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRow {
    /// Store-assigned primary key.
    pub id: i64,
    /// Raw category label, stored verbatim.
    pub kind: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Free-text description.
    pub message: String,
    /// Impact score (1-10) written back by the analysis service.
    pub impact_score: Option<i64>,
    /// Summary written back by the analysis service.
    pub ai_analysis: Option<String>,
    /// When the row was inserted. `None` if the stored value could not be
    /// parsed.
    pub created_at: Option<DateTime<Utc>>,
}

impl IncidentRow {
    /// Returns the taxonomy category for this row's raw label.
    #[must_use]
    pub fn category(&self) -> IncidentCategory {
        IncidentCategory::from_label(&self.kind)
    }
}

/// Incident categories published by the LTA `TrafficIncidents` feed.
///
/// Parsing is case-insensitive. Labels the feed adds later map to
/// [`IncidentCategory::Unknown`] through [`IncidentCategory::from_label`].
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
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum IncidentCategory {
    /// Collision between vehicles
    #[strum(serialize = "Accident")]
    Accident,
    /// Planned or emergency road works
    #[strum(to_string = "Roadwork", serialize = "Roadworks")]
    Roadwork,
    /// Stalled vehicle on the carriageway
    #[strum(serialize = "Vehicle breakdown")]
    VehicleBreakdown,
    /// Weather-related hazard (flooding, fallen trees)
    #[strum(serialize = "Weather")]
    Weather,
    /// Debris or object on the road
    #[strum(serialize = "Obstacle")]
    Obstacle,
    /// Road closed to traffic
    #[strum(serialize = "Road Block")]
    RoadBlock,
    /// Congestion without a more specific cause
    #[strum(serialize = "Heavy Traffic")]
    HeavyTraffic,
    /// Traffic diverted away from the usual route
    #[strum(serialize = "Diversion")]
    Diversion,
    /// Vehicle left on the road without a driver
    #[strum(serialize = "Unattended Vehicle")]
    UnattendedVehicle,
    /// Vehicle or roadside fire
    #[strum(serialize = "Fire")]
    Fire,
    /// Traffic light or equipment failure
    #[strum(serialize = "Plant Failure")]
    PlantFailure,
    /// Vehicle travelling against traffic
    #[strum(serialize = "Reverse Flow")]
    ReverseFlow,
    /// Catch-all label used by the feed
    #[strum(to_string = "Misc.", serialize = "Misc")]
    Miscellaneous,
    /// Label not recognised by this taxonomy
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl IncidentCategory {
    /// Maps a raw feed label to a category, falling back to
    /// [`Self::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Self::Unknown)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Accident,
            Self::Roadwork,
            Self::VehicleBreakdown,
            Self::Weather,
            Self::Obstacle,
            Self::RoadBlock,
            Self::HeavyTraffic,
            Self::Diversion,
            Self::UnattendedVehicle,
            Self::Fire,
            Self::PlantFailure,
            Self::ReverseFlow,
            Self::Miscellaneous,
            Self::Unknown,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_labels() {
        assert_eq!(
            IncidentCategory::from_label("Accident"),
            IncidentCategory::Accident
        );
        assert_eq!(
            IncidentCategory::from_label("Vehicle Breakdown"),
            IncidentCategory::VehicleBreakdown
        );
        assert_eq!(
            IncidentCategory::from_label("Roadworks"),
            IncidentCategory::Roadwork
        );
        assert_eq!(
            IncidentCategory::from_label(" Misc. "),
            IncidentCategory::Miscellaneous
        );
        assert_eq!(
            IncidentCategory::from_label("Alien Landing"),
            IncidentCategory::Unknown
        );
    }

    #[test]
    fn display_roundtrips_through_from_label() {
        for category in IncidentCategory::all() {
            assert_eq!(
                IncidentCategory::from_label(&category.to_string()),
                *category,
                "{category:?} does not survive a display/parse roundtrip"
            );
        }
    }

    #[test]
    fn deserializes_datamall_payload_fields() {
        let incident: Incident = serde_json::from_value(serde_json::json!({
            "Type": "Accident",
            "Latitude": 1.3521,
            "Longitude": 103.8198,
            "Message": "(19/1)10:30 Accident on PIE (towards Changi Airport) after Adam Rd Exit."
        }))
        .unwrap();

        assert_eq!(incident.kind, "Accident");
        assert!((incident.latitude - 1.3521).abs() < 1e-9);
        assert!((incident.longitude - 103.8198).abs() < 1e-9);
        assert_eq!(incident.category(), IncidentCategory::Accident);
    }
}
