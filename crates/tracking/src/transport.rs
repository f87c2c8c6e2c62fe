use std::time::Duration;

use async_trait::async_trait;

use crate::TransportError;

/// One address of the fallback chain, together with the headers it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Performs exactly one fetch attempt and returns the raw body. Status and
/// network failures are reported, the body itself is not inspected.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &Endpoint) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Every request made through this transport is cancelled after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &Endpoint) -> Result<String, TransportError> {
        log::debug!("Requesting endpoint '{}' ({}).", endpoint.name, endpoint.url);

        let mut request = self
            .client
            .get(&endpoint.url)
            .header("accept", "application/json");
        for (name, value) in &endpoint.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            status_code => Err(TransportError::InvalidResponse {
                status_code,
                url: endpoint.url.clone(),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::*;

    /// What a scripted endpoint answers.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Body(String),
        Status(u16),
        Timeout,
        /// Answers with `body` after sleeping for `delay`.
        Delayed(Duration, String),
    }

    /// Transport answering from a per-URL script, recording every request.
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        replies: Arc<Mutex<HashMap<String, Vec<Reply>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedTransport {
        /// Queues replies for `url`. The last queued reply repeats forever.
        pub fn script(&self, url: &str, replies: Vec<Reply>) {
            self.replies
                .lock()
                .unwrap()
                .insert(url.to_owned(), replies);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, endpoint: &Endpoint) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(endpoint.url.clone());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                match replies.get_mut(&endpoint.url) {
                    Some(queue) if queue.len() > 1 => Some(queue.remove(0)),
                    Some(queue) => queue.first().cloned(),
                    None => None,
                }
            };
            match reply {
                Some(Reply::Body(body)) => Ok(body),
                Some(Reply::Status(code)) => Err(TransportError::InvalidResponse {
                    status_code: reqwest::StatusCode::from_u16(code)
                        .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                    url: endpoint.url.clone(),
                }),
                Some(Reply::Timeout) => Err(TransportError::Timeout {
                    url: endpoint.url.clone(),
                }),
                Some(Reply::Delayed(delay, body)) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                None => Err(TransportError::InvalidResponse {
                    status_code: reqwest::StatusCode::NOT_FOUND,
                    url: endpoint.url.clone(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn scripted_replies_are_consumed_in_order() {
        let transport = ScriptedTransport::default();
        transport.script(
            "http://a",
            vec![Reply::Status(502), Reply::Body("{}".to_owned())],
        );
        let endpoint = Endpoint {
            name: "a".to_owned(),
            url: "http://a".to_owned(),
            headers: Vec::new(),
        };

        assert!(transport.get(&endpoint).await.is_err());
        assert_eq!(transport.get(&endpoint).await.unwrap(), "{}");
        assert_eq!(transport.get(&endpoint).await.unwrap(), "{}");
        assert_eq!(transport.calls().len(), 3);
    }

    #[test]
    fn http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(1)).is_ok());
    }
}
