//! The single owner of all tracking state. Everything in here is synchronous,
//! the [`crate::scheduler`] decides when it runs.

use std::time::Duration;

use chrono::Utc;
use model::{
    snapshot::Snapshot,
    status::{FetchStatus, TrackerStatus},
    vehicle::VehicleId,
    view::DashboardView,
};
use tokio::{sync::watch, time::Instant};

use crate::{
    backend::{BackendSelector, MapBackend, MapEvent, MapEventSender},
    config::{TrackerConfig, PRIMARY_ENDPOINT_NAME},
    follow::FollowController,
    movement::MovementFlag,
    reconciler::{reconcile, Delta},
    store::{PositionStore, Roster},
    FetchError, FollowError, InitError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub movement_epsilon: f64,
    pub movement_flag: Duration,
    pub close_zoom: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        (&TrackerConfig::default()).into()
    }
}

impl From<&TrackerConfig> for EngineSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            movement_epsilon: config.movement_epsilon_degrees,
            movement_flag: config.movement_flag_duration(),
            close_zoom: config.close_zoom,
        }
    }
}

pub struct Tracker {
    settings: EngineSettings,
    store: PositionStore,
    roster: Roster,
    selector: BackendSelector,
    follow: FollowController,
    movement: MovementFlag,
    fetch: FetchStatus,
    last_cycle_at: Option<chrono::DateTime<Utc>>,
    published: watch::Sender<DashboardView>,
}

impl Tracker {
    /// Selects the backend (falling back to the list if `interactive` fails)
    /// and publishes the initial, empty dashboard.
    pub fn new(
        settings: EngineSettings,
        interactive: Box<dyn MapBackend>,
        events: MapEventSender,
    ) -> (Self, watch::Receiver<DashboardView>) {
        let (published, receiver) = watch::channel(DashboardView::default());
        let tracker = Self {
            follow: FollowController::new(settings.close_zoom),
            movement: MovementFlag::new(settings.movement_flag),
            selector: BackendSelector::select(interactive, events),
            settings,
            store: PositionStore::default(),
            roster: Roster::default(),
            fetch: FetchStatus::Pending,
            last_cycle_at: None,
            published,
        };
        tracker.publish(Instant::now());
        (tracker, receiver)
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    /// Reconciles `snapshot` against the applied state, renders the delta and
    /// makes `snapshot` the new applied state.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, now: Instant) -> Delta {
        let delta = reconcile(&self.store, &snapshot, self.settings.movement_epsilon);
        log::debug!(
            "Snapshot from '{}': {} added, {} moved, {} removed, {} without coordinates.",
            snapshot.source,
            delta.added.len(),
            delta.updated.len(),
            delta.removed.len(),
            snapshot.unplaceable_count()
        );
        for placement in &delta.updated {
            if let Some(previous) = self.store.get(&placement.id) {
                log::debug!(
                    "Vehicle {} moved {:.3} km.",
                    placement.id,
                    previous.coordinates.distance_km(&placement.coordinates)
                );
            }
        }

        let was_empty = self.store.is_empty();
        self.selector.apply(&delta);
        self.follow.on_delta(&delta, self.selector.backend());
        self.store.replace(&snapshot, delta.moved_ids());
        self.roster.replace(&snapshot);

        if delta.movement_detected {
            self.movement.arm(now);
        }
        if was_empty && !self.store.is_empty() && self.follow.state().target().is_none() {
            self.selector.backend().fit_all(&self.store.coordinates());
        }

        self.fetch = FetchStatus::Ok {
            at: snapshot.fetched_at,
            via_fallback: snapshot.source != PRIMARY_ENDPOINT_NAME,
            via: snapshot.source,
        };
        self.last_cycle_at = Some(Utc::now());
        self.publish(now);
        delta
    }

    /// Surfaces a failed cycle. Positions and rendering stay as they are.
    pub fn record_failure(&mut self, error: &FetchError, now: Instant) {
        let reasons = error.reasons();
        self.fetch = match std::mem::take(&mut self.fetch) {
            FetchStatus::Failing {
                since,
                consecutive_failures,
                last_success,
                ..
            } => FetchStatus::Failing {
                since,
                consecutive_failures: consecutive_failures + 1,
                reasons,
                last_success,
            },
            FetchStatus::Ok { at, .. } => FetchStatus::Failing {
                since: Utc::now(),
                consecutive_failures: 1,
                reasons,
                last_success: Some(at),
            },
            FetchStatus::Pending => FetchStatus::Failing {
                since: Utc::now(),
                consecutive_failures: 1,
                reasons,
                last_success: None,
            },
        };
        self.last_cycle_at = Some(Utc::now());
        self.publish(now);
    }

    pub fn follow(&mut self, id: &VehicleId, now: Instant) -> Result<(), FollowError> {
        self.follow
            .select(id, &self.store, &self.roster, self.selector.backend())?;
        self.publish(now);
        Ok(())
    }

    pub fn stop_following(&mut self, now: Instant) -> bool {
        let stopped = self.follow.stop();
        if stopped {
            self.publish(now);
        }
        stopped
    }

    /// Forwards a user click to the backend, which answers with a
    /// [`MapEvent`].
    pub fn select_marker(&mut self, id: &VehicleId) -> bool {
        self.selector.backend().select(id)
    }

    pub fn handle_event(&mut self, event: MapEvent, now: Instant) {
        match event {
            MapEvent::MarkerSelected(id) => {
                if let Err(why) = self.follow(&id, now) {
                    log::warn!("Ignoring selection of vehicle {}: {}", id, why);
                }
            }
        }
    }

    pub fn fit_all(&mut self, now: Instant) {
        self.selector.backend().fit_all(&self.store.coordinates());
        self.publish(now);
    }

    pub fn close_details(&mut self, now: Instant) {
        self.selector.backend().close_all_details();
        self.publish(now);
    }

    pub fn retry_interactive(&mut self, now: Instant) -> Result<(), InitError> {
        let result = self.selector.retry_interactive(&self.store);
        if result.is_ok() {
            self.follow.refocus(&self.store, self.selector.backend());
        }
        self.publish(now);
        result
    }

    pub fn movement_deadline(&self) -> Option<Instant> {
        self.movement.deadline()
    }

    /// Lowers the movement flag once its time is up.
    pub fn expire_movement(&mut self, now: Instant) {
        if self.movement.expire(now) {
            self.publish(now);
        }
    }

    pub fn status(&self, now: Instant) -> TrackerStatus {
        TrackerStatus {
            fetch: self.fetch.clone(),
            backend: self.selector.status().clone(),
            movement: self.movement.is_set(now),
            follow: self.follow.state().clone(),
            last_cycle_at: self.last_cycle_at,
            tracked: self.store.len(),
            without_coordinates: self.roster.without_coordinates(),
        }
    }

    pub fn dashboard(&self, now: Instant) -> DashboardView {
        DashboardView {
            status: self.status(now),
            vehicles: self.roster.entries(),
            view: self.selector.view(),
        }
    }

    fn publish(&self, now: Instant) {
        self.published.send_replace(self.dashboard(now));
    }
}
