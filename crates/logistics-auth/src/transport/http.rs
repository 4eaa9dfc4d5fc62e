//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{ApiRequest, ApiResponse, HttpFailure, MultipartForm, RequestBody, Transport};
use crate::{Error, Result};

/// Transport performing real HTTP requests
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn multipart_form(form: MultipartForm) -> Form {
    let file = Part::bytes(form.file).file_name(form.file_name);
    form.fields
        .into_iter()
        .fold(Form::new().part(form.file_field, file), |acc, (name, value)| {
            acc.text(name, value)
        })
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, HttpFailure> {
        let url = request.url.to_string();
        let builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(multipart_form(form)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| HttpFailure::connectivity(url.clone(), e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpFailure::connectivity(url.clone(), e.to_string()))?
            .to_vec();

        if status.is_success() {
            return Ok(ApiResponse {
                status: status.as_u16(),
                headers,
                body,
            });
        }

        Err(HttpFailure {
            status: status.as_u16(),
            url,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: serde_json::from_slice(&body).ok(),
        })
    }
}
