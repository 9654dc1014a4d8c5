use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::types::{
    CategoryId, CategoryPayload, CategoryRecord, Envelope, ErrorBody, PayloadPart, TransportError,
};
use super::CategoryRepository;
use crate::util::{validate_base_url, UrlValidationError};

/// Default per-request budget.
const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Default cap on response bodies (5MB).
const DEFAULT_MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;

/// Knobs for [`HttpCategoryRepository`].
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub max_response_bytes: usize,
    /// Bearer token sent with every request.
    pub api_token: Option<SecretString>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            api_token: None,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("timeout_secs", &self.timeout_secs)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// REST implementation of [`CategoryRepository`].
#[derive(Debug)]
pub struct HttpCategoryRepository {
    client: reqwest::Client,
    base: Url,
    options: ClientOptions,
}

impl HttpCategoryRepository {
    /// Build a client for `base_url` (e.g. `https://api.example.com/v1`).
    ///
    /// SEC-002: plain HTTP is refused except for loopback hosts, because the
    /// bearer token rides on every request.
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, TransportError> {
        let base = validate_base_url(base_url).map_err(|e| match e {
            UrlValidationError::InsecureScheme => {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS API base URL");
                TransportError::InsecureBaseUrl
            }
            other => TransportError::InvalidBaseUrl(other.to_string()),
        })?;

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(options.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base,
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, id: Option<&CategoryId>) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidBaseUrl(self.base.to_string()))?;
            segments.pop_if_empty().push("categories");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    /// Attach auth, enforce the timeout and turn non-success statuses into
    /// [`TransportError::Rejected`] carrying the server's message.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let request = match &self.options.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let secs = self.options.timeout_secs;
        let response = tokio::time::timeout(Duration::from_secs(secs), request.send())
            .await
            .map_err(|_| TransportError::Timeout(secs))??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match read_limited_bytes(response, self.options.max_response_bytes).await {
            Ok(body) => serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read error body");
                None
            }
        };
        tracing::warn!(status = status.as_u16(), message = ?message, "Category API rejected request");
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, TransportError> {
        let body = read_limited_bytes(response, self.options.max_response_bytes).await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.into_inner())
    }

    fn form(payload: &CategoryPayload) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for part in payload.parts() {
            form = match part {
                PayloadPart::Text { name, value } => form.text(name, value),
                PayloadPart::File { name, upload } => {
                    let file = Part::bytes(upload.bytes.to_vec())
                        .file_name(upload.file_name.clone())
                        .mime_str(upload.mime)?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl CategoryRepository for HttpCategoryRepository {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, TransportError> {
        let url = self.endpoint(None)?;
        tracing::debug!(url = %url, "Listing categories");
        let response = self.send(self.client.get(url)).await?;
        let records: Vec<CategoryRecord> = self.decode(response).await?;
        tracing::debug!(count = records.len(), "Categories listed");
        Ok(records)
    }

    async fn get(&self, id: &CategoryId) -> Result<CategoryRecord, TransportError> {
        let url = self.endpoint(Some(id))?;
        let response = self.send(self.client.get(url)).await?;
        self.decode(response).await
    }

    async fn create(&self, payload: &CategoryPayload) -> Result<CategoryRecord, TransportError> {
        let url = self.endpoint(None)?;
        tracing::info!(slug = %payload.slug, "Creating category");
        let request = self.client.post(url).multipart(Self::form(payload)?);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn update(
        &self,
        id: &CategoryId,
        payload: &CategoryPayload,
    ) -> Result<CategoryRecord, TransportError> {
        let url = self.endpoint(Some(id))?;
        tracing::info!(category_id = %id, slug = %payload.slug, "Updating category");
        let request = self.client.put(url).multipart(Self::form(payload)?);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn delete(&self, id: &CategoryId) -> Result<(), TransportError> {
        let url = self.endpoint(Some(id))?;
        tracing::info!(category_id = %id, "Deleting category");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

/// Read a response body, failing once it exceeds `limit` bytes.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        // SEC-003: saturating_add keeps the size check overflow-free
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
