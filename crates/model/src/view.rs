use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    status::TrackerStatus,
    vehicle::{Coordinates, VehicleId, VehiclePosition},
    WithId,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneMarker {
    pub id: VehicleId,
    pub position: Coordinates,
    pub title: String,
    pub icon: Option<String>,
    /// Popup text, present while the popup is open.
    pub popup: Option<String>,
    /// Set for one render after the marker moved.
    pub bouncing: bool,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// State of an interactive map, as a client needs it to draw the same picture.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapScene {
    pub tile_url: String,
    pub center: Option<Coordinates>,
    pub zoom: u8,
    pub viewport: Option<Viewport>,
    pub markers: Vec<SceneMarker>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: VehicleId,
    pub title: String,
    pub lines: Vec<String>,
    pub position: Coordinates,
    /// The row's detail section is expanded.
    pub expanded: bool,
    /// The row is the current focus.
    pub focused: bool,
    pub recently_moved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedView {
    Map(MapScene),
    List { rows: Vec<ListRow> },
}

impl Default for RenderedView {
    fn default() -> Self {
        Self::List { rows: Vec::new() }
    }
}

/// One consistent picture of the dashboard, published after every change.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub status: TrackerStatus,
    /// Every vehicle of the latest snapshot, including those without
    /// coordinates, in feed order.
    pub vehicles: Vec<WithId<VehiclePosition>>,
    pub view: RenderedView,
}
