use indexmap::IndexMap;
use model::{
    vehicle::{Coordinates, VehicleId},
    view::{MapScene, SceneMarker, Viewport},
};
use utility::geo::{self, Bounds};

pub type SelectionHandler = Box<dyn Fn(VehicleId) + Send + Sync>;

/// The drawing primitives of a slippy map host.
pub trait MapSurface: Send {
    fn add_marker(
        &mut self,
        id: &VehicleId,
        position: Coordinates,
        title: &str,
        icon: Option<&str>,
    );

    fn move_marker(&mut self, id: &VehicleId, position: Coordinates);

    fn remove_marker(&mut self, id: &VehicleId);

    /// Opens the popup bound to the marker of `id`, replacing its text if it
    /// is already open.
    fn open_popup(&mut self, id: &VehicleId, text: &str);

    fn close_popups(&mut self);

    fn fit_bounds(&mut self, bounds: Bounds);

    fn set_view(&mut self, center: Coordinates, zoom: u8);

    fn on_marker_selected(&mut self, handler: SelectionHandler);

    /// Delivers a click on the marker of `id` to the selection handler.
    fn click(&self, id: &VehicleId) -> bool;

    fn scene(&self) -> MapScene;
}

/// A map surface kept entirely in memory. Clients draw the published
/// [`MapScene`] with the tile layer of their choice.
pub struct SceneSurface {
    tile_url: String,
    center: Option<Coordinates>,
    zoom: u8,
    viewport: Option<Viewport>,
    markers: IndexMap<VehicleId, SceneMarker>,
    handler: Option<SelectionHandler>,
}

impl SceneSurface {
    pub fn new<S: Into<String>>(tile_url: S) -> Self {
        Self {
            tile_url: tile_url.into(),
            center: None,
            zoom: geo::MIN_ZOOM,
            viewport: None,
            markers: IndexMap::new(),
            handler: None,
        }
    }
}

impl MapSurface for SceneSurface {
    fn add_marker(
        &mut self,
        id: &VehicleId,
        position: Coordinates,
        title: &str,
        icon: Option<&str>,
    ) {
        self.markers.insert(
            id.clone(),
            SceneMarker {
                id: id.clone(),
                position,
                title: title.to_owned(),
                icon: icon.map(str::to_owned),
                popup: None,
                bouncing: false,
            },
        );
    }

    fn move_marker(&mut self, id: &VehicleId, position: Coordinates) {
        if let Some(marker) = self.markers.get_mut(id) {
            marker.position = position;
        }
    }

    fn remove_marker(&mut self, id: &VehicleId) {
        self.markers.shift_remove(id);
    }

    fn open_popup(&mut self, id: &VehicleId, text: &str) {
        if let Some(marker) = self.markers.get_mut(id) {
            marker.popup = Some(text.to_owned());
        }
    }

    fn close_popups(&mut self) {
        for marker in self.markers.values_mut() {
            marker.popup = None;
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        let (latitude, longitude) = bounds.center();
        self.center = Coordinates::new(latitude, longitude);
        self.zoom = bounds.fitting_zoom();
        self.viewport = Some(Viewport {
            south: bounds.south,
            west: bounds.west,
            north: bounds.north,
            east: bounds.east,
        });
    }

    fn set_view(&mut self, center: Coordinates, zoom: u8) {
        self.center = Some(center);
        self.zoom = zoom.clamp(geo::MIN_ZOOM, geo::MAX_ZOOM);
        self.viewport = None;
    }

    fn on_marker_selected(&mut self, handler: SelectionHandler) {
        self.handler = Some(handler);
    }

    fn click(&self, id: &VehicleId) -> bool {
        match (&self.handler, self.markers.contains_key(id)) {
            (Some(handler), true) => {
                handler(id.clone());
                true
            }
            _ => false,
        }
    }

    fn scene(&self) -> MapScene {
        MapScene {
            tile_url: self.tile_url.clone(),
            center: self.center,
            zoom: self.zoom,
            viewport: self.viewport.clone(),
            markers: self.markers.values().cloned().collect(),
        }
    }
}
