//! Fixtures shared by the unit tests of this crate.

use chrono::{TimeZone, Utc};
use model::{
    snapshot::Snapshot,
    vehicle::{Coordinates, ObservedAt, VehicleId, VehiclePosition},
    WithId,
};

pub fn vehicle(id: &str, position: Option<(f64, f64)>) -> WithId<VehiclePosition> {
    WithId::new(
        VehicleId::from(id),
        VehiclePosition {
            unit_label: format!("Unidad {id}"),
            contact: format!("{id}@example.com"),
            coordinates: position.and_then(|(lat, lng)| Coordinates::new(lat, lng)),
            active: true,
            observed_at: ObservedAt {
                date: Some("2024-05-03".to_owned()),
                time: Some("09:07:09".to_owned()),
                received_at: Utc.with_ymd_and_hms(2024, 5, 3, 14, 7, 9).single(),
            },
        },
    )
}

pub fn snapshot(vehicles: Vec<WithId<VehiclePosition>>) -> Snapshot {
    Snapshot::new(vehicles, Utc::now(), "primary")
}

pub fn at(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).unwrap()
}
