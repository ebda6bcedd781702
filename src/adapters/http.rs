use crate::domain::ports::HealthProbe;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Health probe backed by a `reqwest` client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
}

impl HttpHealthProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, url: &str) -> std::result::Result<(), String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("request timed out: {}", e)
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            }
        })?;

        let status = response.status();
        tracing::debug!("Health response from {}: {}", url, status);

        if status.is_success() {
            Ok(())
        } else {
            Err(format!("unexpected status {}", status))
        }
    }
}
