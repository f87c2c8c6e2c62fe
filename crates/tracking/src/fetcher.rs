use chrono::Utc;
use model::snapshot::Snapshot;

use crate::{
    config::{ConfigError, TrackerConfig},
    transport::{Endpoint, Transport},
    wire::decode_envelope,
    AttemptError, FailedAttempt, FetchError,
};

/// Walks the fallback chain (primary first, then every relay in declared
/// order) until one endpoint delivers a valid envelope.
pub struct FallbackFetcher<T: Transport> {
    transport: T,
    chain: Vec<Endpoint>,
}

impl<T: Transport> FallbackFetcher<T> {
    pub fn new(transport: T, chain: Vec<Endpoint>) -> Self {
        Self { transport, chain }
    }

    pub fn from_config(transport: T, config: &TrackerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(transport, config.fallback_chain()?))
    }

    pub fn chain(&self) -> &[Endpoint] {
        &self.chain
    }

    /// Attempts run strictly one after another. Data of a failed attempt is
    /// never returned.
    pub async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let mut failed = Vec::new();
        for endpoint in &self.chain {
            match self.attempt(endpoint).await {
                Ok(snapshot) => {
                    if failed.is_empty() {
                        log::debug!(
                            "Fetched {} vehicles from '{}'.",
                            snapshot.len(),
                            endpoint.name
                        );
                    } else {
                        log::info!(
                            "Fetched {} vehicles from fallback '{}' after {} failed attempts.",
                            snapshot.len(),
                            endpoint.name,
                            failed.len()
                        );
                    }
                    return Ok(snapshot);
                }
                Err(error) => {
                    log::warn!("Endpoint '{}' failed: {}", endpoint.name, error);
                    failed.push(FailedAttempt {
                        endpoint: endpoint.name.clone(),
                        error,
                    });
                }
            }
        }
        Err(FetchError { attempts: failed })
    }

    async fn attempt(&self, endpoint: &Endpoint) -> Result<Snapshot, AttemptError> {
        let body = self.transport.get(endpoint).await?;
        let vehicles = decode_envelope(&body)?;
        Ok(Snapshot::new(vehicles, Utc::now(), endpoint.name.clone()))
    }
}
