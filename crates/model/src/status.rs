use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::follow::FollowState;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FetchStatus {
    /// No cycle has settled yet.
    #[default]
    Pending,
    #[serde(rename_all = "camelCase")]
    Ok {
        at: DateTime<Utc>,
        /// Transport that delivered the snapshot.
        via: String,
        /// True if the primary endpoint failed and a relay answered.
        via_fallback: bool,
    },
    #[serde(rename_all = "camelCase")]
    Failing {
        since: DateTime<Utc>,
        consecutive_failures: u32,
        reasons: Vec<String>,
        last_success: Option<DateTime<Utc>>,
    },
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackendStatus {
    Interactive,
    List {
        /// Why the interactive map is not used, if it failed.
        notice: Option<String>,
    },
}

impl Default for BackendStatus {
    fn default() -> Self {
        Self::List { notice: None }
    }
}

/// Everything the status banner of the dashboard needs.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStatus {
    pub fetch: FetchStatus,
    pub backend: BackendStatus,
    pub movement: bool,
    pub follow: FollowState,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub tracked: usize,
    pub without_coordinates: usize,
}

impl TrackerStatus {
    /// Human readable description of the current degraded state, `None` if
    /// everything works as intended.
    pub fn banner(&self) -> Option<String> {
        let mut parts = Vec::new();
        match &self.fetch {
            FetchStatus::Failing {
                consecutive_failures,
                last_success,
                ..
            } => parts.push(match last_success {
                Some(at) => format!(
                    "Positions could not be updated ({} failed attempts), showing data from {}.",
                    consecutive_failures,
                    at.format("%H:%M:%S UTC")
                ),
                None => format!(
                    "Positions could not be loaded ({} failed attempts).",
                    consecutive_failures
                ),
            }),
            FetchStatus::Ok {
                via,
                via_fallback: true,
                ..
            } => parts.push(format!("Positions are served through fallback '{via}'.")),
            _ => {}
        }
        if let BackendStatus::List {
            notice: Some(notice),
        } = &self.backend
        {
            parts.push(format!("Map unavailable, showing list: {notice}"));
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn healthy_status_has_no_banner() {
        let status = TrackerStatus {
            fetch: FetchStatus::Ok {
                at: Utc::now(),
                via: "primary".to_owned(),
                via_fallback: false,
            },
            backend: BackendStatus::Interactive,
            ..Default::default()
        };
        assert_eq!(status.banner(), None);
    }

    #[test]
    fn banner_mentions_failures_and_list_fallback() {
        let last = Utc.with_ymd_and_hms(2024, 5, 3, 14, 7, 9).unwrap();
        let status = TrackerStatus {
            fetch: FetchStatus::Failing {
                since: last,
                consecutive_failures: 3,
                reasons: vec!["timeout".to_owned()],
                last_success: Some(last),
            },
            backend: BackendStatus::List {
                notice: Some("tile server not configured".to_owned()),
            },
            ..Default::default()
        };
        let banner = status.banner().unwrap();
        assert!(banner.contains("3 failed attempts"));
        assert!(banner.contains("14:07:09"));
        assert!(banner.contains("tile server not configured"));
    }
}
