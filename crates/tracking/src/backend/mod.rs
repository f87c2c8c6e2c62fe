//! Rendering of the reconciled fleet. The engine only ever talks to a
//! [`MapBackend`] and passes vehicle ids, never map objects.

use model::{
    status::BackendStatus,
    vehicle::{Coordinates, DisplayContent, VehicleId},
    view::RenderedView,
};
use tokio::sync::mpsc;

use crate::{reconciler::Delta, store::PositionStore, InitError};

pub mod interactive;
pub mod list;
pub mod surface;

pub use interactive::InteractiveBackend;
pub use list::ListBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Interactive,
    List,
}

/// Raised by a backend on behalf of the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    MarkerSelected(VehicleId),
}

pub type MapEventSender = mpsc::UnboundedSender<MapEvent>;
pub type MapEventReceiver = mpsc::UnboundedReceiver<MapEvent>;

pub trait MapBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Brings the backend up. Selection events are delivered through `events`.
    fn init(&mut self, events: MapEventSender) -> Result<(), InitError>;

    /// Places a new marker or moves an existing one.
    fn upsert(&mut self, id: &VehicleId, position: Coordinates, content: &DisplayContent);

    fn remove(&mut self, id: &VehicleId);

    fn focus(&mut self, position: Coordinates, zoom: u8);

    fn fit_all(&mut self, positions: &[Coordinates]);

    fn open_detail(&mut self, id: &VehicleId);

    fn close_all_details(&mut self);

    /// Forwards a user selection of `id`. Returns false if nothing is shown
    /// for `id`.
    fn select(&mut self, id: &VehicleId) -> bool;

    /// Ends transient decoration (bounce, highlight) of the previous apply.
    fn settle(&mut self) {}

    fn view(&self) -> RenderedView;
}

/// Owns the active backend. Starts with the interactive one and falls back
/// to the list for the rest of the session if it can not be initialised.
pub struct BackendSelector {
    active: Box<dyn MapBackend>,
    /// The interactive backend while it is not active, kept for
    /// [`BackendSelector::retry_interactive`].
    standby: Option<Box<dyn MapBackend>>,
    status: BackendStatus,
    events: MapEventSender,
}

impl BackendSelector {
    pub fn select(
        mut interactive: Box<dyn MapBackend>,
        events: MapEventSender,
    ) -> Self {
        match interactive.init(events.clone()) {
            Ok(()) => {
                log::info!("Using the interactive map.");
                Self {
                    active: interactive,
                    standby: None,
                    status: BackendStatus::Interactive,
                    events,
                }
            }
            Err(why) => {
                log::warn!("Interactive map failed, falling back to the list: {}", why);
                let mut list = ListBackend::default();
                // the list backend has no failure mode
                let _ = list.init(events.clone());
                Self {
                    active: Box::new(list),
                    standby: Some(interactive),
                    status: BackendStatus::List {
                        notice: Some(why.to_string()),
                    },
                    events,
                }
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.active.kind()
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn backend(&mut self) -> &mut dyn MapBackend {
        self.active.as_mut()
    }

    pub fn view(&self) -> RenderedView {
        self.active.view()
    }

    /// Added and updated vehicles are upserted, removed ones removed, the same
    /// way for every backend.
    pub fn apply(&mut self, delta: &Delta) {
        self.active.settle();
        for placement in delta.added.iter().chain(delta.updated.iter()) {
            self.active.upsert(
                &placement.id,
                placement.coordinates,
                &placement.vehicle.display_content(),
            );
        }
        for id in &delta.removed {
            self.active.remove(id);
        }
    }

    /// Tries the interactive backend once more. On success every stored
    /// vehicle is placed on it and it stays active; on failure the list stays
    /// and the notice is updated.
    pub fn retry_interactive(&mut self, store: &PositionStore) -> Result<(), InitError> {
        let Some(mut interactive) = self.standby.take() else {
            return Ok(());
        };
        if let Err(why) = interactive.init(self.events.clone()) {
            log::warn!("Interactive map retry failed: {}", why);
            self.status = BackendStatus::List {
                notice: Some(why.to_string()),
            };
            self.standby = Some(interactive);
            return Err(why);
        }

        log::info!("Interactive map is available, leaving the list.");
        for (id, stored) in store.iter() {
            interactive.upsert(id, stored.coordinates, &stored.vehicle.display_content());
        }
        interactive.fit_all(&store.coordinates());
        self.active = interactive;
        self.status = BackendStatus::Interactive;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        backend::surface::{MapSurface, SceneSurface},
        config::InteractiveConfig,
        reconciler::reconcile,
        testing::{snapshot, vehicle},
    };

    /// An interactive backend whose surface can only be built while `healthy`
    /// is set. Counts construction attempts in `attempts`.
    fn flaky(healthy: Arc<AtomicBool>, attempts: Arc<AtomicUsize>) -> Box<dyn MapBackend> {
        Box::new(InteractiveBackend::new(
            InteractiveConfig::default(),
            Box::new(move |tile_url: &str| {
                attempts.fetch_add(1, Ordering::SeqCst);
                if healthy.load(Ordering::SeqCst) {
                    Ok(Box::new(SceneSurface::new(tile_url)) as Box<dyn MapSurface>)
                } else {
                    Err(InitError::Construction("no rendering context".to_owned()))
                }
            }),
        ))
    }

    #[test]
    fn working_map_is_selected() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let selector = BackendSelector::select(
            Box::new(InteractiveBackend::in_memory(InteractiveConfig::default())),
            events,
        );
        assert_eq!(selector.kind(), BackendKind::Interactive);
        assert_eq!(selector.status(), &BackendStatus::Interactive);
    }

    #[test]
    fn failed_map_degrades_to_the_list_for_good() {
        let healthy = Arc::new(AtomicBool::new(false));
        let attempts = Arc::new(AtomicUsize::new(0));
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut selector =
            BackendSelector::select(flaky(healthy.clone(), attempts.clone()), events);

        assert_eq!(selector.kind(), BackendKind::List);
        assert!(matches!(
            selector.status(),
            BackendStatus::List { notice: Some(_) }
        ));

        // the map would work now, but nobody asked for a retry
        healthy.store(true, Ordering::SeqCst);
        let mut store = PositionStore::default();
        for lat in [-0.2295, -0.2296, -0.2297] {
            let next = snapshot(vec![
                vehicle("1", Some((lat, -78.5249))),
                vehicle("2", Some((-0.18, -78.49))),
            ]);
            let delta = reconcile(&store, &next, 0.0001);
            selector.apply(&delta);
            store.replace(&next, delta.moved_ids());
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(selector.kind(), BackendKind::List);
        match selector.view() {
            RenderedView::List { rows } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].position.latitude, -0.2297);
            }
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[test]
    fn retry_replays_the_store_onto_the_map() {
        let healthy = Arc::new(AtomicBool::new(false));
        let attempts = Arc::new(AtomicUsize::new(0));
        let (events, _receiver) = mpsc::unbounded_channel();
        let mut selector =
            BackendSelector::select(flaky(healthy.clone(), attempts.clone()), events);

        let next = snapshot(vec![
            vehicle("1", Some((-0.2295, -78.5249))),
            vehicle("2", Some((-0.18, -78.49))),
        ]);
        let mut store = PositionStore::default();
        let delta = reconcile(&store, &next, 0.0001);
        selector.apply(&delta);
        store.replace(&next, delta.moved_ids());

        assert!(selector.retry_interactive(&store).is_err());
        assert_eq!(selector.kind(), BackendKind::List);

        healthy.store(true, Ordering::SeqCst);
        selector.retry_interactive(&store).unwrap();
        assert_eq!(selector.kind(), BackendKind::Interactive);
        assert_eq!(selector.status(), &BackendStatus::Interactive);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match selector.view() {
            RenderedView::Map(scene) => {
                assert_eq!(scene.markers.len(), 2);
                assert!(scene.viewport.is_some());
            }
            other => panic!("expected a map, got {:?}", other),
        }

        // already interactive, nothing to do
        selector.retry_interactive(&store).unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
