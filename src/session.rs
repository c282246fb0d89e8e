// src/session.rs
use crate::types::{PassiveConfig, SubscoutError};
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct Session {
    pub client: Client,
}

impl Session {
    pub fn new(config: &PassiveConfig) -> Result<Self, SubscoutError> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| SubscoutError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| SubscoutError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session { client })
    }

    /// GET `url` with `query` and return the body, failing on any
    /// non-success status.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SubscoutError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubscoutError::NetworkError(format!("Request to {} timed out", url))
                } else {
                    SubscoutError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(SubscoutError::NetworkError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SubscoutError::NetworkError(e.to_string()))
    }
}
