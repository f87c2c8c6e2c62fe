use std::collections::{HashMap, HashSet};

use model::{
    vehicle::{Coordinates, DisplayContent, VehicleId},
    view::RenderedView,
};
use utility::geo::Bounds;

use crate::{
    backend::{
        surface::{MapSurface, SceneSurface},
        BackendKind, MapBackend, MapEvent, MapEventSender,
    },
    config::InteractiveConfig,
    InitError,
};

/// Extra room around the fleet when fitting the viewport.
const FIT_PADDING: f64 = 0.1;

pub type SurfaceFactory =
    Box<dyn Fn(&str) -> Result<Box<dyn MapSurface>, InitError> + Send>;

/// Marker bookkeeping of the interactive backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedMarker {
    pub position: Coordinates,
    pub content: DisplayContent,
    pub popup_open: bool,
}

/// Draws the fleet as markers on a tiled map.
pub struct InteractiveBackend {
    config: InteractiveConfig,
    factory: SurfaceFactory,
    surface: Option<Box<dyn MapSurface>>,
    markers: HashMap<VehicleId, TrackedMarker>,
    bouncing: HashSet<VehicleId>,
}

impl InteractiveBackend {
    pub fn new(config: InteractiveConfig, factory: SurfaceFactory) -> Self {
        Self {
            config,
            factory,
            surface: None,
            markers: HashMap::new(),
            bouncing: HashSet::new(),
        }
    }

    /// Backend drawing onto a [`SceneSurface`].
    pub fn in_memory(config: InteractiveConfig) -> Self {
        Self::new(
            config,
            Box::new(|tile_url: &str| {
                Ok(Box::new(SceneSurface::new(tile_url)) as Box<dyn MapSurface>)
            }),
        )
    }

    pub fn marker(&self, id: &VehicleId) -> Option<&TrackedMarker> {
        self.markers.get(id)
    }
}

fn check_tile_url(tile_url: Option<&str>) -> Result<&str, InitError> {
    let tile_url = tile_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| InitError::Unavailable("no tile server configured".to_owned()))?;
    if ["{z}", "{x}", "{y}"]
        .iter()
        .any(|placeholder| !tile_url.contains(placeholder))
    {
        return Err(InitError::Construction(format!(
            "tile URL '{}' lacks {{z}}/{{x}}/{{y}} placeholders",
            tile_url
        )));
    }
    Ok(tile_url)
}

impl MapBackend for InteractiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Interactive
    }

    fn init(&mut self, events: MapEventSender) -> Result<(), InitError> {
        if !self.config.enabled {
            return Err(InitError::Unavailable(
                "the interactive map is disabled".to_owned(),
            ));
        }
        let tile_url = check_tile_url(self.config.tile_url.as_deref())?;
        let mut surface = (self.factory)(tile_url)?;
        surface.on_marker_selected(Box::new(move |id| {
            if events.send(MapEvent::MarkerSelected(id)).is_err() {
                log::debug!("Marker selected after the engine stopped.");
            }
        }));

        self.surface = Some(surface);
        self.markers.clear();
        self.bouncing.clear();
        Ok(())
    }

    fn upsert(&mut self, id: &VehicleId, position: Coordinates, content: &DisplayContent) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match self.markers.get_mut(id) {
            Some(marker) => {
                if marker.position != position {
                    surface.move_marker(id, position);
                    self.bouncing.insert(id.clone());
                    marker.position = position;
                }
                marker.content = content.clone();
                if marker.popup_open {
                    surface.open_popup(id, &content.text());
                }
            }
            None => {
                surface.add_marker(id, position, &content.title, content.icon.as_deref());
                self.markers.insert(
                    id.clone(),
                    TrackedMarker {
                        position,
                        content: content.clone(),
                        popup_open: false,
                    },
                );
            }
        }
    }

    fn remove(&mut self, id: &VehicleId) {
        if let Some(surface) = self.surface.as_mut() {
            surface.remove_marker(id);
        }
        self.markers.remove(id);
        self.bouncing.remove(id);
    }

    fn focus(&mut self, position: Coordinates, zoom: u8) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_view(position, zoom);
        }
    }

    fn fit_all(&mut self, positions: &[Coordinates]) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Some(bounds) = Bounds::of(positions.iter().map(Coordinates::as_pair)) {
            surface.fit_bounds(bounds.padded(FIT_PADDING));
        }
    }

    /// Only one popup is open at a time.
    fn open_detail(&mut self, id: &VehicleId) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(text) = self.markers.get(id).map(|marker| marker.content.text()) else {
            return;
        };
        surface.close_popups();
        surface.open_popup(id, &text);
        for (marker_id, marker) in self.markers.iter_mut() {
            marker.popup_open = marker_id == id;
        }
    }

    fn close_all_details(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.close_popups();
        }
        for marker in self.markers.values_mut() {
            marker.popup_open = false;
        }
    }

    fn select(&mut self, id: &VehicleId) -> bool {
        self.surface
            .as_ref()
            .is_some_and(|surface| surface.click(id))
    }

    fn settle(&mut self) {
        self.bouncing.clear();
    }

    fn view(&self) -> RenderedView {
        let mut scene = self
            .surface
            .as_ref()
            .map(|surface| surface.scene())
            .unwrap_or_default();
        for marker in scene.markers.iter_mut() {
            marker.bouncing = self.bouncing.contains(&marker.id);
        }
        RenderedView::Map(scene)
    }
}
