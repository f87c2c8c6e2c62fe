use indexmap::IndexMap;
use model::{
    snapshot::Snapshot,
    vehicle::{Coordinates, VehicleId, VehiclePosition},
};

use crate::store::PositionStore;

/// A vehicle that has to be (re)drawn at `coordinates`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: VehicleId,
    pub coordinates: Coordinates,
    pub vehicle: VehiclePosition,
}

/// What changed between the applied state and a new snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    /// In feed order.
    pub added: Vec<Placement>,
    /// In feed order.
    pub updated: Vec<Placement>,
    /// Sorted by id.
    pub removed: Vec<VehicleId>,
    pub movement_detected: bool,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// The new placement of `id` if it was added or moved.
    pub fn placement_of(&self, id: &VehicleId) -> Option<&Placement> {
        self.added
            .iter()
            .chain(self.updated.iter())
            .find(|placement| &placement.id == id)
    }

    pub fn was_removed(&self, id: &VehicleId) -> bool {
        self.removed.contains(id)
    }

    pub fn moved_ids(&self) -> impl Iterator<Item = &VehicleId> {
        self.updated.iter().map(|placement| &placement.id)
    }
}

/// Diffs the applied positions against the placeable vehicles of `next`.
///
/// A vehicle counts as updated only if one axis moved by at least `epsilon`
/// degrees, smaller changes are treated as GPS jitter and produce nothing.
/// Vehicles that lost their coordinates are removed. If an id occurs more than
/// once in `next`, the last record wins, even when it has no coordinates.
pub fn reconcile(previous: &PositionStore, next: &Snapshot, epsilon: f64) -> Delta {
    let incoming = next
        .placeable()
        .map(|(id, coordinates, vehicle)| (id, (coordinates, vehicle)))
        .collect::<IndexMap<_, _>>();

    let mut delta = Delta::default();
    for (id, (coordinates, vehicle)) in &incoming {
        let placement = || Placement {
            id: (*id).clone(),
            coordinates: *coordinates,
            vehicle: (*vehicle).clone(),
        };
        match previous.get(id) {
            None => delta.added.push(placement()),
            Some(stored) if coordinates.differs_from(&stored.coordinates, epsilon) => {
                delta.updated.push(placement())
            }
            Some(_) => {}
        }
    }

    delta.removed = previous
        .ids()
        .filter(|id| !incoming.contains_key(id))
        .cloned()
        .collect();
    delta.removed.sort();

    delta.movement_detected = !delta.updated.is_empty();
    delta
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        store::Roster,
        testing::{at, snapshot, vehicle},
    };

    fn applied(snapshot: &Snapshot) -> PositionStore {
        let mut store = PositionStore::default();
        store.replace(snapshot, std::iter::empty());
        store
    }

    fn ids(placements: &[Placement]) -> Vec<String> {
        placements.iter().map(|p| p.id.raw()).collect()
    }

    #[test]
    fn first_snapshot_adds_every_placeable_vehicle() {
        let next = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("2", None),
            vehicle("3", Some((-0.18, -78.49))),
        ]);
        let delta = reconcile(&PositionStore::default(), &next, 0.0001);

        assert_eq!(ids(&delta.added), vec!["1", "3"]);
        assert!(delta.updated.is_empty());
        assert!(delta.removed.is_empty());
        assert!(!delta.movement_detected);
    }

    #[test]
    fn jitter_below_threshold_is_ignored() {
        let store = applied(&snapshot(vec![vehicle("1", Some((-0.2295, -78.5249)))]));
        let next = snapshot(vec![vehicle("1", Some((-0.22951, -78.5249)))]);

        let delta = reconcile(&store, &next, 0.0001);

        assert!(delta.is_empty());
        assert!(!delta.movement_detected);
    }

    #[test]
    fn a_full_step_counts_as_movement() {
        let store = applied(&snapshot(vec![vehicle("1", Some((-0.2295, -78.5249)))]));
        let next = snapshot(vec![vehicle("1", Some((-0.2296, -78.5249)))]);

        let delta = reconcile(&store, &next, 0.0001);

        assert_eq!(ids(&delta.updated), vec!["1"]);
        assert_eq!(delta.updated[0].coordinates, at(-0.2296, -78.5249));
        assert!(delta.movement_detected);
    }

    #[test]
    fn vanished_and_unplaceable_vehicles_are_removed() {
        let store = applied(&snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("2", Some((-0.18, -78.49))),
            vehicle("3", Some((-0.19, -78.48))),
        ]));
        let next = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("3", None),
        ]);

        let delta = reconcile(&store, &next, 0.0001);

        let removed = delta.removed.iter().map(|id| id.raw()).collect::<Vec<_>>();
        assert_eq!(removed, vec!["2", "3"]);
        assert!(delta.was_removed(&VehicleId::from("2")));
        assert!(delta.added.is_empty());
    }

    #[test]
    fn duplicate_ids_keep_the_last_record() {
        let next = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("1", Some((-0.3, -78.6))),
        ]);
        let delta = reconcile(&PositionStore::default(), &next, 0.0001);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].coordinates, at(-0.3, -78.6));

        let next = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("1", None),
        ]);
        let delta = reconcile(&PositionStore::default(), &next, 0.0001);
        assert!(delta.added.is_empty());

        let mut store = PositionStore::default();
        let mut roster = Roster::default();
        store.replace(&next, delta.moved_ids());
        roster.replace(&next);
        let id = VehicleId::from("1");
        assert!(!store.contains(&id));
        assert_eq!(roster.get(&id).unwrap().coordinates, None);
        assert_eq!(roster.without_coordinates(), 1);

        // a placed vehicle whose last duplicate lost its coordinates is removed
        let placed = applied(&snapshot(vec![vehicle("1", Some((-0.2295, -78.5249)))]));
        let delta = reconcile(&placed, &next, 0.0001);
        assert_eq!(delta.removed, vec![id]);
    }

    #[test]
    fn a_change_of_exactly_epsilon_counts_as_movement() {
        let store = applied(&snapshot(vec![vehicle("1", Some((0.0, 0.0)))]));
        let next = snapshot(vec![vehicle("1", Some((0.0001, 0.0)))]);

        let delta = reconcile(&store, &next, 0.0001);

        assert_eq!(ids(&delta.updated), vec!["1"]);
        assert!(delta.movement_detected);
    }

    #[test]
    fn drift_is_measured_against_the_applied_position() {
        let mut store = applied(&snapshot(vec![vehicle("1", Some((-0.2295, -78.5249)))]));
        for lat in [-0.22955, -0.22959] {
            let next = snapshot(vec![vehicle("1", Some((lat, -78.5249)))]);
            let delta = reconcile(&store, &next, 0.0001);
            assert!(delta.is_empty());
            store.replace(&next, delta.moved_ids());
        }
        let next = snapshot(vec![vehicle("1", Some((-0.22961, -78.5249)))]);
        let delta = reconcile(&store, &next, 0.0001);
        assert_eq!(ids(&delta.updated), vec!["1"]);
    }

    fn fleet() -> impl Strategy<Value = Vec<(u8, Option<(f64, f64)>)>> {
        prop::collection::vec(
            (0u8..40, prop::option::of((-80.0f64..80.0, -170.0f64..170.0))),
            0..30,
        )
    }

    fn to_snapshot(fleet: &[(u8, Option<(f64, f64)>)]) -> Snapshot {
        snapshot(
            fleet
                .iter()
                .map(|(id, position)| vehicle(&id.to_string(), *position))
                .collect(),
        )
    }

    proptest! {
        #[test]
        fn reconciling_twice_yields_nothing(previous in fleet(), next in fleet()) {
            let mut store = applied(&to_snapshot(&previous));
            let next = to_snapshot(&next);

            let delta = reconcile(&store, &next, 0.0001);
            store.replace(&next, delta.moved_ids());

            prop_assert!(reconcile(&store, &next, 0.0001).is_empty());
        }

        #[test]
        fn store_keys_match_placeable_ids(previous in fleet(), next in fleet()) {
            let mut store = applied(&to_snapshot(&previous));
            let next = to_snapshot(&next);

            let delta = reconcile(&store, &next, 0.0001);
            store.replace(&next, delta.moved_ids());

            let mut stored = store.ids().cloned().collect::<Vec<_>>();
            stored.sort();
            let mut expected = next.placeable().map(|(id, _, _)| id.clone()).collect::<Vec<_>>();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(stored, expected);
        }

        #[test]
        fn sub_threshold_jitter_never_moves(
            base in prop::collection::vec((-80.0f64..80.0, -170.0f64..170.0), 1..20),
            jitter in prop::collection::vec((-0.00009f64..0.00009, -0.00009f64..0.00009), 20),
        ) {
            let first = snapshot(
                base.iter()
                    .enumerate()
                    .map(|(i, (lat, lng))| vehicle(&i.to_string(), Some((*lat, *lng))))
                    .collect(),
            );
            let shaken = snapshot(
                base.iter()
                    .zip(jitter.iter())
                    .enumerate()
                    .map(|(i, ((lat, lng), (dlat, dlng)))| {
                        vehicle(&i.to_string(), Some((lat + dlat, lng + dlng)))
                    })
                    .collect(),
            );

            let delta = reconcile(&applied(&first), &shaken, 0.0001);

            prop_assert!(delta.updated.is_empty());
            prop_assert!(!delta.movement_detected);
        }
    }
}
