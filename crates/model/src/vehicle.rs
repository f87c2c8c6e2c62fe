use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{
    geo,
    id::{HasId, Id},
};

use crate::ExampleData;

pub type VehicleId = Id<VehiclePosition>;

/// The last reported state of one taxi.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    pub unit_label: String,
    pub contact: String,
    /// `None` if the feed sent no usable latitude/longitude. Such vehicles are
    /// listed but never placed on the map.
    pub coordinates: Option<Coordinates>,
    pub active: bool,
    pub observed_at: ObservedAt,
}

impl HasId for VehiclePosition {
    type IdType = String;
}

impl VehiclePosition {
    pub fn is_placeable(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn status_text(&self) -> &'static str {
        if self.active {
            "Activo"
        } else {
            "Inactivo"
        }
    }

    /// Text shown in the info popup / list row of this vehicle.
    pub fn display_content(&self) -> DisplayContent {
        let mut lines = vec![
            format!("Contacto: {}", self.contact),
            format!("Estado: {}", self.status_text()),
        ];
        if let Some(reported) = self.observed_at.reported() {
            lines.push(format!("Reportado: {reported}"));
        }
        if let Some(received_at) = self.observed_at.received_at {
            lines.push(format!(
                "Recibido: {}",
                received_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        DisplayContent {
            title: self.unit_label.clone(),
            lines,
            icon: Some(if self.active { "taxi-active" } else { "taxi-inactive" }.to_owned()),
        }
    }
}

impl ExampleData for VehiclePosition {
    fn example_data() -> Self {
        Self {
            unit_label: "Unidad 14".to_owned(),
            contact: "conductor14@example.com".to_owned(),
            coordinates: Coordinates::new(-0.2295, -78.5249),
            active: true,
            observed_at: ObservedAt {
                date: Some("2024-05-03".to_owned()),
                time: Some("09:07:09".to_owned()),
                received_at: None,
            },
        }
    }
}

/// A validated WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and within range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        (geo::is_valid_latitude(latitude) && geo::is_valid_longitude(longitude))
            .then_some(Self {
                latitude,
                longitude,
            })
    }

    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?)
    }

    /// True if either axis moved by at least `epsilon` degrees. Differences are
    /// compared at nano-degree resolution, so a step written as `0.0001` in the
    /// feed counts as `0.0001` even though its binary difference is slightly
    /// smaller.
    pub fn differs_from(&self, other: &Coordinates, epsilon: f64) -> bool {
        reaches(self.latitude - other.latitude, epsilon)
            || reaches(self.longitude - other.longitude, epsilon)
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        geo::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

fn reaches(delta: f64, epsilon: f64) -> bool {
    let delta = (delta.abs() * 1e9).round();
    delta > 0.0 && delta >= (epsilon.abs() * 1e9).round()
}

/// Source reported date and time, kept verbatim, plus when the feed says it
/// received the position.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservedAt {
    pub date: Option<String>,
    pub time: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
}

impl ObservedAt {
    pub fn reported(&self) -> Option<String> {
        match (&self.date, &self.time) {
            (Some(date), Some(time)) => Some(format!("{date} {time}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

/// Title and body lines of a marker popup or list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayContent {
    pub title: String,
    pub lines: Vec<String>,
    pub icon: Option<String>,
}

impl DisplayContent {
    pub fn text(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.lines.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range_values() {
        assert!(Coordinates::new(-0.2295, -78.5249).is_some());
        assert!(Coordinates::new(95.0, -78.5249).is_none());
        assert!(Coordinates::new(-0.2295, f64::INFINITY).is_none());
        assert!(Coordinates::from_parts(Some(-0.2295), None).is_none());
    }

    #[test]
    fn differs_only_beyond_epsilon() {
        let a = Coordinates::new(-0.2295, -78.5249).unwrap();
        let jitter = Coordinates::new(-0.22951, -78.5249).unwrap();
        let step = Coordinates::new(-0.2296, -78.5249).unwrap();
        let moved = Coordinates::new(-0.2297, -78.5249).unwrap();
        let sideways = Coordinates::new(-0.2295, -78.52495).unwrap();
        assert!(!a.differs_from(&jitter, 0.0001));
        assert!(!a.differs_from(&sideways, 0.0001));
        assert!(a.differs_from(&step, 0.0001));
        assert!(a.differs_from(&moved, 0.0001));
        assert!(!a.differs_from(&a, 0.0));
        assert!(a.differs_from(&jitter, 0.0));
    }

    #[test]
    fn display_content_lists_contact_and_status() {
        let vehicle = VehiclePosition::example_data();
        let content = vehicle.display_content();
        assert_eq!(content.title, "Unidad 14");
        assert_eq!(content.icon.as_deref(), Some("taxi-active"));
        assert_eq!(
            content.text(),
            "Unidad 14\nContacto: conductor14@example.com\nEstado: Activo\nReportado: 2024-05-03 09:07:09"
        );
    }
}
