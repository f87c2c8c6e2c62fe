//! The JSON document served by the location endpoint.

use chrono::{DateTime, Utc};
use model::{
    vehicle::{Coordinates, ObservedAt, VehicleId, VehiclePosition},
    WithId,
};
use serde::Deserialize;
use serde_json::Value;
use utility::serde::{date_time, lenient};

use crate::EnvelopeError;

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub unidad: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub latitud: Option<f64>,
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub longitud: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub estado: bool,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub fecha: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub hora: Option<String>,
    #[serde(default, deserialize_with = "date_time::deserialize_iso_like_option")]
    pub received_at: Option<DateTime<Utc>>,
}

impl From<LocationRecord> for WithId<VehiclePosition> {
    fn from(record: LocationRecord) -> Self {
        let unit_label = record
            .unidad
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| format!("Unidad {}", record.id));
        WithId::new(
            VehicleId::new(record.id),
            VehiclePosition {
                unit_label,
                contact: record.email.unwrap_or_default(),
                coordinates: Coordinates::from_parts(record.latitud, record.longitud),
                active: record.estado,
                observed_at: ObservedAt {
                    date: record.fecha,
                    time: record.hora,
                    received_at: record.received_at,
                },
            },
        )
    }
}

/// Checks the `{ "success": true, "data": [...] }` shape and decodes every
/// record. Records without usable coordinates are kept; records that are not
/// objects or carry no id invalidate the whole document.
pub fn decode_envelope(body: &str) -> Result<Vec<WithId<VehiclePosition>>, EnvelopeError> {
    let document: Value = serde_json::from_str(body)?;
    let object = document.as_object().ok_or(EnvelopeError::NotAnObject)?;

    match object.get("success").and_then(Value::as_bool) {
        Some(true) => {}
        Some(false) => return Err(EnvelopeError::Unsuccessful),
        None => return Err(EnvelopeError::MissingSuccessFlag),
    }

    let data = object
        .get("data")
        .and_then(Value::as_array)
        .ok_or(EnvelopeError::MissingData)?;

    data.iter()
        .enumerate()
        .map(|(index, value)| {
            LocationRecord::deserialize(value)
                .map(Into::into)
                .map_err(|why| EnvelopeError::InvalidRecord {
                    index,
                    reason: why.to_string(),
                })
        })
        .collect()
}
