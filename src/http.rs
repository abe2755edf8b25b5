use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::session::{Credentials, Session};

/// Result of decoding a service body that was expected to be JSON.
///
/// The browsing service answers some endpoints with HTML error pages, so a
/// body that fails to decode is handed back untouched instead of failing the
/// call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Parsed(T),
    Raw(String),
}

/// Status and body of a completed request. The body is never interpreted.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Everything the client needs from the network.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get_text(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<ServiceResponse>;

    async fn post_file(&self, endpoint: &str, field: &str, path: &Path)
        -> Result<ServiceResponse>;
}

/// Decodes `body`, logging it and handing it back untouched when it does not fit `T`.
pub fn parse_json<T: DeserializeOwned>(body: String) -> Payload<T> {
    match serde_json::from_str(&body) {
        Ok(value) => Payload::Parsed(value),
        Err(err) => {
            warn!(error = %err, body = %body, "service response did not decode");
            Payload::Raw(body)
        }
    }
}

pub struct HttpTransport {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(session: &Session) -> Result<Self> {
        if session.insecure {
            warn!(url = %session.service_url, "TLS certificate verification is disabled");
        }
        let http = Client::builder()
            .danger_accept_invalid_certs(session.insecure)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: session.service_url.trim_end_matches('/').to_string(),
            credentials: session.credentials.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<ServiceResponse> {
        let url = self.url(endpoint);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .basic_auth(self.credentials.user(), Some(self.credentials.password()))
            .query(params)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, %url, "service returned a non-success status");
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {url}"))?;
        Ok(ServiceResponse { status, body })
    }

    async fn post_file(
        &self,
        endpoint: &str,
        field: &str,
        path: &Path,
    ) -> Result<ServiceResponse> {
        let url = self.url(endpoint);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let form = Form::new().part(field.to_string(), Part::bytes(bytes).file_name(file_name));

        debug!(%url, file = %path.display(), "POST multipart");
        let response = self
            .http
            .post(&url)
            .basic_auth(self.credentials.user(), Some(self.credentials.password()))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("upload to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, %url, "upload returned a non-success status");
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {url}"))?;
        Ok(ServiceResponse { status, body })
    }
}
