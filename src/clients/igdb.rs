use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use std::time::Duration;

use crate::config::IgdbConfig;

/// Textual-RPC client for the upstream catalog API. Callers pass
/// endpoint-specific query bodies (`fields *; limit 500; offset 0;`) or form
/// parameters; responses come back as raw bytes, parsed by the caller.
#[derive(Clone)]
pub struct IgdbClient {
    http: Client,
    base_url: String,
    client_id: String,
    auth_token: String,
}

impl IgdbClient {
    #[must_use]
    pub fn new(config: &IgdbConfig) -> Self {
        let http = Client::builder()
            .user_agent(concat!("ludarr/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// POSTs a query-language body to `{base}/{endpoint}` and returns the raw
    /// response body.
    pub async fn send_string_request(&self, endpoint: &str, body: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(self.endpoint_url(endpoint))
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "text/plain")
            .body(body.to_string())
            .send()
            .await
            .with_context(|| format!("Request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{endpoint} returned {status}: {text}"));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// POSTs form-encoded parameters (webhook registration, `/count`).
    pub async fn send_form_request(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(self.endpoint_url(endpoint))
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .form(form)
            .send()
            .await
            .with_context(|| format!("Form request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{endpoint} returned {status}: {text}"));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// GETs `{base}/{endpoint}` (the upstream webhook listing).
    pub async fn send_get_request(&self, endpoint: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.endpoint_url(endpoint))
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .send()
            .await
            .with_context(|| format!("Request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{endpoint} returned {status}: {text}"));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
