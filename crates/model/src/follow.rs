use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleId;

/// Which vehicle, if any, the camera is locked onto.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FollowState {
    #[default]
    Idle,
    Following {
        id: VehicleId,
    },
}

impl FollowState {
    pub fn target(&self) -> Option<&VehicleId> {
        match self {
            Self::Idle => None,
            Self::Following { id } => Some(id),
        }
    }

    pub fn is_following(&self, id: &VehicleId) -> bool {
        self.target() == Some(id)
    }
}
