use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::config::BackendSettings;
use crate::context::SessionContext;
use crate::error::DispatchError;

use super::{Dispatch, DispatchResult, Endpoint, Method, error_field};

/// `Dispatch` over HTTP with `reqwest`.
///
/// The per-request timeout comes from the backend settings; a request that
/// exceeds it resolves as `DispatchError::Network`.
pub struct HttpDispatcher {
    client: Client,
    base_url: String,
    context: Arc<SessionContext>,
}

impl HttpDispatcher {
    pub fn new(settings: &BackendSettings, context: Arc<SessionContext>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            context,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path.trim_start_matches('/'))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.context.token() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("API token contains invalid header characters, sending without it"),
            }
        }
        headers
    }

    fn request(&self, endpoint: &Endpoint) -> RequestBuilder {
        let url = self.url(endpoint);
        let builder = match endpoint.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        builder.headers(self.headers())
    }

    async fn send(&self, endpoint: &Endpoint, builder: RequestBuilder) -> DispatchResult {
        debug!("Dispatching {endpoint}");
        let response = builder.send().await.map_err(|err| {
            let error = network_error(endpoint, &err);
            warn!("{error}");
            error
        })?;
        self.classify(endpoint, response).await
    }

    /// Splits a received response into payload or `Api` failure. 401 also
    /// ends the login session before being reported.
    async fn classify(&self, endpoint: &Endpoint, response: Response) -> DispatchResult {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| network_error(endpoint, &err))?;
        let body = parse_body(&text);

        if status == StatusCode::UNAUTHORIZED {
            warn!("{endpoint} rejected credentials, logging out");
            self.context.logout();
        }

        let failure = if !status.is_success() {
            Some(error_field(&body).unwrap_or_else(|| text.trim().to_string()))
        } else {
            error_field(&body)
        };

        match failure {
            Some(detail) => {
                warn!("{endpoint} failed with {status}: {detail}");
                Err(DispatchError::Api {
                    status: status.as_u16(),
                    body: detail,
                })
            }
            None => Ok(body),
        }
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, endpoint: Endpoint, payload: Option<Value>) -> DispatchResult {
        let mut builder = self.request(&endpoint);
        if let Some(body) = payload.as_ref() {
            builder = builder.json(body);
        }
        self.send(&endpoint, builder).await
    }

    async fn upload(&self, file_name: String, bytes: Vec<u8>) -> DispatchResult {
        let endpoint = Endpoint::upload();
        let part = Part::bytes(bytes).file_name(file_name);
        let builder = self
            .request(&endpoint)
            .multipart(Form::new().part("file", part));
        self.send(&endpoint, builder).await
    }
}

/// Empty bodies become `null`; anything that is not JSON is kept as a
/// string so callers still see what the backend said.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn network_error(endpoint: &Endpoint, err: &reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Network(format!("{endpoint} timed out"))
    } else {
        DispatchError::Network(format!("{endpoint}: {err}"))
    }
}
