use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    vehicle::{Coordinates, VehicleId, VehiclePosition},
    WithId,
};

/// All vehicle records returned by one successful fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub vehicles: Vec<WithId<VehiclePosition>>,
    pub fetched_at: DateTime<Utc>,
    /// Name of the transport that delivered the data.
    pub source: String,
}

impl Snapshot {
    pub fn new<S: Into<String>>(
        vehicles: Vec<WithId<VehiclePosition>>,
        fetched_at: DateTime<Utc>,
        source: S,
    ) -> Self {
        Self {
            vehicles,
            fetched_at,
            source: source.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// One record per vehicle. A repeated id keeps its last record, even when
    /// that record has no coordinates.
    pub fn latest(&self) -> impl Iterator<Item = &WithId<VehiclePosition>> {
        let last = self
            .vehicles
            .iter()
            .enumerate()
            .map(|(index, vehicle)| (&vehicle.id, index))
            .collect::<HashMap<_, _>>();
        self.vehicles
            .iter()
            .enumerate()
            .filter(move |(index, vehicle)| last.get(&vehicle.id) == Some(index))
            .map(|(_, vehicle)| vehicle)
    }

    /// Vehicles that can be placed on a map, with their coordinates.
    pub fn placeable(
        &self,
    ) -> impl Iterator<Item = (&VehicleId, Coordinates, &VehiclePosition)> {
        self.latest().filter_map(|vehicle| {
            vehicle
                .content
                .coordinates
                .map(|coordinates| (&vehicle.id, coordinates, &vehicle.content))
        })
    }

    pub fn unplaceable_count(&self) -> usize {
        self.latest()
            .filter(|vehicle| !vehicle.content.is_placeable())
            .count()
    }
}
