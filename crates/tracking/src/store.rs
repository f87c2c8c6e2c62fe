use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use model::{
    snapshot::Snapshot,
    vehicle::{Coordinates, VehicleId, VehiclePosition},
    WithId,
};

/// A vehicle as last applied to the map.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPosition {
    /// Position the marker was last placed at. Only moves when a reconciliation
    /// reports the vehicle as updated, so sub-threshold jitter can not add up.
    pub coordinates: Coordinates,
    pub vehicle: VehiclePosition,
}

/// Last applied position of every placed vehicle, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<VehicleId, StoredPosition>,
}

impl PositionStore {
    pub fn get(&self, id: &VehicleId) -> Option<&StoredPosition> {
        self.positions.get(id)
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &VehicleId> {
        self.positions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VehicleId, &StoredPosition)> {
        self.positions.iter()
    }

    pub fn coordinates(&self) -> Vec<Coordinates> {
        self.positions
            .values()
            .map(|stored| stored.coordinates)
            .collect()
    }

    /// Replaces the store with the placeable vehicles of `snapshot`. Vehicles
    /// not in `moved` keep their previously applied coordinates.
    pub fn replace<'a, I>(&mut self, snapshot: &Snapshot, moved: I)
    where
        I: IntoIterator<Item = &'a VehicleId>,
    {
        let moved = moved.into_iter().collect::<HashSet<_>>();
        let mut next = HashMap::with_capacity(snapshot.len());
        for (id, coordinates, vehicle) in snapshot.placeable() {
            let coordinates = match self.positions.get(id) {
                Some(previous) if !moved.contains(id) => previous.coordinates,
                _ => coordinates,
            };
            next.insert(
                id.clone(),
                StoredPosition {
                    coordinates,
                    vehicle: vehicle.clone(),
                },
            );
        }
        self.positions = next;
    }
}

/// Every vehicle of the latest snapshot in feed order, including those that
/// can not be placed on a map.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    vehicles: IndexMap<VehicleId, VehiclePosition>,
}

impl Roster {
    pub fn replace(&mut self, snapshot: &Snapshot) {
        self.vehicles = snapshot
            .vehicles
            .iter()
            .map(|vehicle| (vehicle.id.clone(), vehicle.content.clone()))
            .collect();
    }

    pub fn get(&self, id: &VehicleId) -> Option<&VehiclePosition> {
        self.vehicles.get(id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn without_coordinates(&self) -> usize {
        self.vehicles
            .values()
            .filter(|vehicle| !vehicle.is_placeable())
            .count()
    }

    pub fn entries(&self) -> Vec<WithId<VehiclePosition>> {
        self.vehicles
            .iter()
            .map(|(id, vehicle)| WithId::new(id.clone(), vehicle.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{snapshot, vehicle};

    #[test]
    fn store_keeps_only_placeable_vehicles() {
        let snapshot = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("2", None),
            vehicle("3", Some((-0.18, -78.49))),
        ]);
        let mut store = PositionStore::default();
        let mut roster = Roster::default();
        store.replace(&snapshot, std::iter::empty());
        roster.replace(&snapshot);

        let mut ids = store.ids().map(|id| id.raw()).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.without_coordinates(), 1);
        let order = roster
            .entries()
            .into_iter()
            .map(|v| v.id.raw())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[test]
    fn unmoved_vehicles_keep_their_applied_position() {
        let first = snapshot(vec![vehicle("1", Some((-0.2295, -78.5249)))]);
        let jitter = snapshot(vec![vehicle("1", Some((-0.22951, -78.5249)))]);
        let mut store = PositionStore::default();
        store.replace(&first, std::iter::empty());
        store.replace(&jitter, std::iter::empty());
        let id = VehicleId::from("1");
        assert_eq!(
            store.get(&id).unwrap().coordinates,
            Coordinates::new(-0.2295, -78.5249).unwrap()
        );

        store.replace(&jitter, [&id]);
        assert_eq!(
            store.get(&id).unwrap().coordinates,
            Coordinates::new(-0.22951, -78.5249).unwrap()
        );
    }
}
