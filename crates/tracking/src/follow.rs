use model::{follow::FollowState, vehicle::VehicleId};

use crate::{
    backend::MapBackend,
    reconciler::Delta,
    store::{PositionStore, Roster},
    FollowError,
};

/// Keeps the camera locked onto at most one vehicle.
#[derive(Debug, Clone)]
pub struct FollowController {
    state: FollowState,
    close_zoom: u8,
}

impl FollowController {
    pub fn new(close_zoom: u8) -> Self {
        Self {
            state: FollowState::Idle,
            close_zoom,
        }
    }

    pub fn state(&self) -> &FollowState {
        &self.state
    }

    /// Locks onto `id`, re-targeting if another vehicle is followed. Only
    /// vehicles currently placed on the map can be followed.
    pub fn select(
        &mut self,
        id: &VehicleId,
        store: &PositionStore,
        roster: &Roster,
        backend: &mut dyn MapBackend,
    ) -> Result<(), FollowError> {
        let Some(stored) = store.get(id) else {
            return Err(match roster.get(id) {
                Some(_) => FollowError::MissingCoordinates(id.clone()),
                None => FollowError::UnknownVehicle(id.clone()),
            });
        };
        if !self.state.is_following(id) {
            log::info!("Following vehicle {}.", id);
        }
        self.state = FollowState::Following { id: id.clone() };
        backend.focus(stored.coordinates, self.close_zoom);
        backend.open_detail(id);
        Ok(())
    }

    /// Returns true if a vehicle was followed.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            FollowState::Following { id } => {
                log::info!("Stopped following vehicle {}.", id);
                true
            }
            FollowState::Idle => false,
        }
    }

    /// Must run after the delta was applied to the backend.
    pub fn on_delta(&mut self, delta: &Delta, backend: &mut dyn MapBackend) {
        let Some(id) = self.state.target().cloned() else {
            return;
        };
        if delta.was_removed(&id) {
            log::info!("Followed vehicle {} is gone, no longer following.", id);
            self.state = FollowState::Idle;
        } else if let Some(placement) = delta.placement_of(&id) {
            backend.focus(placement.coordinates, self.close_zoom);
            backend.open_detail(&id);
        }
    }

    /// Points the camera at the followed vehicle again, e.g. after the backend
    /// was replaced.
    pub fn refocus(&self, store: &PositionStore, backend: &mut dyn MapBackend) {
        if let Some(stored) = self.state.target().and_then(|id| store.get(id)) {
            backend.focus(stored.coordinates, self.close_zoom);
            if let Some(id) = self.state.target() {
                backend.open_detail(id);
            }
        }
    }
}
