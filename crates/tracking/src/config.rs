use std::{collections::BTreeMap, env, error, fmt, fs, io, path::PathBuf, sync::Arc, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::transport::Endpoint;

pub const CONFIG_PATH_VAR: &str = "FLEET_TRACKER_CONFIG";
pub const ENDPOINT_VAR: &str = "FLEET_TRACKER_ENDPOINT";
pub const LISTEN_ADDRESS_VAR: &str = "FLEET_TRACKER_LISTEN";

pub const PRIMARY_ENDPOINT_NAME: &str = "primary";

#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(Arc<io::Error>),
    Json(Arc<serde_json::Error>),
    InvalidUrl { name: String, url: String },
    Invalid(String),
}

impl error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Could not read configuration: {}", e),
            ConfigError::Json(e) => write!(f, "Could not parse configuration: {}", e),
            ConfigError::InvalidUrl { name, url } => {
                write!(f, "Endpoint '{}' has an invalid URL: {}", name, url)
            }
            ConfigError::Invalid(why) => write!(f, "Invalid configuration: {}", why),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(Arc::new(e))
    }
}

/// A relay (CORS proxy or similar) that forwards requests to the primary
/// endpoint. The target URL is either appended to `base_url` verbatim, or
/// passed percent-encoded in the query parameter `query_param`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub query_param: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RelayConfig {
    pub fn wrap(&self, target: &str) -> Result<Endpoint, ConfigError> {
        let invalid = || ConfigError::InvalidUrl {
            name: self.name.clone(),
            url: self.base_url.clone(),
        };
        let url = match &self.query_param {
            Some(param) => {
                Url::parse_with_params(&self.base_url, &[(param.as_str(), target)])
                    .map_err(|_| invalid())?
                    .to_string()
            }
            None => {
                let url = format!("{}{}", self.base_url, target);
                Url::parse(&url).map_err(|_| invalid())?;
                url
            }
        };
        Ok(Endpoint {
            name: self.name.clone(),
            url,
            headers: self.headers.clone().into_iter().collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractiveConfig {
    pub enabled: bool,
    /// Tile URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: Option<String>,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tile_url: Some("https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// The location endpoint (`GET`, returns the position envelope).
    pub endpoint: String,
    /// Tried in this order after the primary endpoint failed.
    pub relays: Vec<RelayConfig>,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Smaller position changes are treated as GPS jitter.
    pub movement_epsilon_degrees: f64,
    pub movement_flag_secs: u64,
    /// Zoom level used while following a vehicle.
    pub close_zoom: u8,
    pub interactive: InteractiveConfig,
    pub listen_address: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/api/ubicaciones".to_owned(),
            relays: default_relays(),
            request_timeout_secs: 8,
            poll_interval_secs: 10,
            movement_epsilon_degrees: 0.0001,
            movement_flag_secs: 3,
            close_zoom: 16,
            interactive: InteractiveConfig::default(),
            listen_address: "0.0.0.0:8080".to_owned(),
        }
    }
}

fn default_relays() -> Vec<RelayConfig> {
    vec![
        RelayConfig {
            name: "allorigins".to_owned(),
            base_url: "https://api.allorigins.win/raw".to_owned(),
            query_param: Some("url".to_owned()),
            headers: BTreeMap::new(),
        },
        RelayConfig {
            name: "corsproxy".to_owned(),
            base_url: "https://corsproxy.io/".to_owned(),
            query_param: Some("url".to_owned()),
            headers: BTreeMap::new(),
        },
        RelayConfig {
            name: "cors-anywhere".to_owned(),
            base_url: "https://cors-anywhere.herokuapp.com/".to_owned(),
            query_param: None,
            headers: BTreeMap::from([(
                "X-Requested-With".to_owned(),
                "XMLHttpRequest".to_owned(),
            )]),
        },
    ]
}

impl TrackerConfig {
    /// Reads the JSON file named by `FLEET_TRACKER_CONFIG` (defaults if unset)
    /// and applies the endpoint / listen address overrides from the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        if let Ok(endpoint) = env::var(ENDPOINT_VAR) {
            config.endpoint = endpoint;
        }
        if let Ok(address) = env::var(LISTEN_ADDRESS_VAR) {
            config.listen_address = address;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "pollIntervalSecs must be at least 1".to_owned(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "requestTimeoutSecs must be at least 1".to_owned(),
            ));
        }
        if !self.movement_epsilon_degrees.is_finite() || self.movement_epsilon_degrees < 0.0 {
            return Err(ConfigError::Invalid(
                "movementEpsilonDegrees must be a non-negative number".to_owned(),
            ));
        }
        self.fallback_chain().map(|_| ())
    }

    /// The primary endpoint followed by every relay wrapping it, in the order
    /// they are to be tried.
    pub fn fallback_chain(&self) -> Result<Vec<Endpoint>, ConfigError> {
        Url::parse(&self.endpoint).map_err(|_| ConfigError::InvalidUrl {
            name: PRIMARY_ENDPOINT_NAME.to_owned(),
            url: self.endpoint.clone(),
        })?;
        let primary = Endpoint {
            name: PRIMARY_ENDPOINT_NAME.to_owned(),
            url: self.endpoint.clone(),
            headers: Vec::new(),
        };
        std::iter::once(Ok(primary))
            .chain(self.relays.iter().map(|relay| relay.wrap(&self.endpoint)))
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn movement_flag_duration(&self) -> Duration {
        Duration::from_secs(self.movement_flag_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_starts_with_primary_and_keeps_relay_order() {
        let config = TrackerConfig {
            endpoint: "https://fleet.example.com/api/ubicaciones".to_owned(),
            ..Default::default()
        };
        let chain = config.fallback_chain().unwrap();
        let names = chain.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["primary", "allorigins", "corsproxy", "cors-anywhere"]
        );
        assert_eq!(chain[0].url, "https://fleet.example.com/api/ubicaciones");
        assert_eq!(
            chain[1].url,
            "https://api.allorigins.win/raw?url=https%3A%2F%2Ffleet.example.com%2Fapi%2Fubicaciones"
        );
        assert_eq!(
            chain[3].url,
            "https://cors-anywhere.herokuapp.com/https://fleet.example.com/api/ubicaciones"
        );
        assert_eq!(
            chain[3].headers,
            vec![("X-Requested-With".to_owned(), "XMLHttpRequest".to_owned())]
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{
                "endpoint": "https://fleet.example.com/locations",
                "relays": [{ "name": "own", "baseUrl": "https://relay.example.com/?", "headers": { "X-Key": "secret" } }],
                "pollIntervalSecs": 5
            }"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.movement_epsilon_degrees, 0.0001);
        assert_eq!(config.movement_flag_duration(), Duration::from_secs(3));
        assert_eq!(config.relays.len(), 1);
        assert!(config.interactive.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = TrackerConfig {
            endpoint: "not a url".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let config = TrackerConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
