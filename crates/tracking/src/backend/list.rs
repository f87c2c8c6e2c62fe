use std::collections::HashSet;

use indexmap::IndexMap;
use model::{
    vehicle::{Coordinates, DisplayContent, VehicleId},
    view::{ListRow, RenderedView},
};

use crate::{
    backend::{BackendKind, MapBackend, MapEvent, MapEventSender},
    InitError,
};

#[derive(Debug, Clone)]
struct Row {
    position: Coordinates,
    content: DisplayContent,
    expanded: bool,
}

/// Plain list of vehicles, used whenever no interactive map is available.
#[derive(Default)]
pub struct ListBackend {
    rows: IndexMap<VehicleId, Row>,
    focused: Option<VehicleId>,
    recently_moved: HashSet<VehicleId>,
    events: Option<MapEventSender>,
}

impl ListBackend {
    fn nearest_row(&self, position: &Coordinates) -> Option<&VehicleId> {
        self.rows
            .iter()
            .map(|(id, row)| (id, row.position.distance_km(position)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }
}

impl MapBackend for ListBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::List
    }

    fn init(&mut self, events: MapEventSender) -> Result<(), InitError> {
        self.events = Some(events);
        Ok(())
    }

    fn upsert(&mut self, id: &VehicleId, position: Coordinates, content: &DisplayContent) {
        match self.rows.get_mut(id) {
            Some(row) => {
                if row.position != position {
                    self.recently_moved.insert(id.clone());
                }
                row.position = position;
                row.content = content.clone();
            }
            None => {
                self.rows.insert(
                    id.clone(),
                    Row {
                        position,
                        content: content.clone(),
                        expanded: false,
                    },
                );
            }
        }
    }

    fn remove(&mut self, id: &VehicleId) {
        self.rows.shift_remove(id);
        self.recently_moved.remove(id);
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
        }
    }

    /// Highlights the row closest to `position`. A list has no zoom.
    fn focus(&mut self, position: Coordinates, _zoom: u8) {
        self.focused = self.nearest_row(&position).cloned();
    }

    fn fit_all(&mut self, _positions: &[Coordinates]) {
        self.focused = None;
    }

    fn open_detail(&mut self, id: &VehicleId) {
        for (row_id, row) in self.rows.iter_mut() {
            row.expanded = row_id == id;
        }
    }

    fn close_all_details(&mut self) {
        for row in self.rows.values_mut() {
            row.expanded = false;
        }
    }

    fn select(&mut self, id: &VehicleId) -> bool {
        if !self.rows.contains_key(id) {
            return false;
        }
        match &self.events {
            Some(events) => events.send(MapEvent::MarkerSelected(id.clone())).is_ok(),
            None => false,
        }
    }

    fn settle(&mut self) {
        self.recently_moved.clear();
    }

    fn view(&self) -> RenderedView {
        let rows = self
            .rows
            .iter()
            .map(|(id, row)| ListRow {
                id: id.clone(),
                title: row.content.title.clone(),
                lines: row.content.lines.clone(),
                position: row.position,
                expanded: row.expanded,
                focused: self.focused.as_ref() == Some(id),
                recently_moved: self.recently_moved.contains(id),
            })
            .collect();
        RenderedView::List { rows }
    }
}
