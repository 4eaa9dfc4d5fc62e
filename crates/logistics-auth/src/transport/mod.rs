//! Outbound HTTP requests and responses
//!
//! [`Transport`] is the last hop of the request pipeline. [`ReqwestTransport`]
//! performs real requests; [`ApiClient`] builds requests for the platform API.

mod api;
mod http;

use async_trait::async_trait;
pub use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

pub use api::{ApiClient, PaginatedResponse, PaginationParams, RequestOptions, SortDirection};
pub use http::ReqwestTransport;

/// File part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    pub file_field: String,
    pub file_name: String,
    pub file: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// Outbound API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Set a header, returning false if the name or value is not valid HTTP
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                true
            }
            _ => {
                tracing::warn!(header = %name, "Dropping invalid request header");
                false
            }
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Successful response
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        let result = if self.body.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&self.body)
        };
        result.map_err(|e| crate::Error::Decode(e.to_string()))
    }
}

/// Non-success outcome of a request as seen on the wire.
///
/// Status 0 means the server could not be reached.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP {status} from {url}: {reason}")]
pub struct HttpFailure {
    pub status: u16,
    pub url: String,
    pub reason: String,
    pub body: Option<serde_json::Value>,
}

impl HttpFailure {
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            reason: String::new(),
            body: None,
        }
    }

    pub fn connectivity(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: 0,
            url: url.into(),
            reason: reason.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Final hop that puts a request on the wire
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure>;
}
