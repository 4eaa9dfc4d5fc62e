//! Typed client for the platform API

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, ApiResponse, Method, MultipartForm, RequestBody};
use crate::constants::DEFAULT_UPLOAD_FIELD;
use crate::pipeline::RequestPipeline;
use crate::{Error, Result};

/// Query parameters and extra headers for a single call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a query parameter, replacing earlier values for `key`
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        self.params.retain(|(k, _)| *k != key);
        self.params.push((key, value.to_string()));
        self
    }

    /// Append one query parameter per value
    #[must_use]
    pub fn param_list<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let key = key.into();
        for value in values {
            self.params.push((key.clone(), value.to_string()));
        }
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
}

/// Page of results as returned by the platform API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

/// Client for the platform API.
///
/// Every call goes through the request pipeline, so credentials, tenant
/// scoping and error normalization are applied uniformly.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    pipeline: Arc<RequestPipeline>,
}

impl ApiClient {
    pub fn new(base_url: &Url, pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            pipeline,
        }
    }

    /// Absolute URL for `endpoint` with exactly one slash after the base
    pub fn build_url(&self, endpoint: &str, options: &RequestOptions) -> Result<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{endpoint}", self.base_url))
            .map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;

        if !options.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.params);
        }
        Ok(url)
    }

    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<ApiRequest> {
        let mut request =
            ApiRequest::new(method, self.build_url(endpoint, options)?).with_body(body);
        for (name, value) in &options.headers {
            request.set_header(name, value);
        }
        Ok(request)
    }

    /// Send a request through the pipeline and return the raw response
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let request = self.build_request(method, endpoint, body, options)?;
        Ok(self.pipeline.send(request).await?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute(Method::GET, endpoint, RequestBody::Empty, options)
            .await?
            .json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute(Method::POST, endpoint, json_body(body)?, options)
            .await?
            .json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute(Method::PUT, endpoint, json_body(body)?, options)
            .await?
            .json()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute(Method::PATCH, endpoint, json_body(body)?, options)
            .await?
            .json()
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.execute(Method::DELETE, endpoint, RequestBody::Empty, options)
            .await?
            .json()
    }

    /// GET a page of results. Sorting defaults to ascending.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        pagination: &PaginationParams,
        options: &RequestOptions,
    ) -> Result<PaginatedResponse<T>> {
        let mut options = options.clone();
        if let Some(page) = pagination.page {
            options = options.param("page", page);
        }
        if let Some(size) = pagination.size {
            options = options.param("size", size);
        }
        if let Some(sort) = &pagination.sort {
            let direction = pagination.direction.unwrap_or_default();
            options = options.param("sort", format!("{sort},{direction}"));
        }
        self.get(endpoint, &options).await
    }

    /// GET raw bytes
    pub async fn download_file(&self, endpoint: &str, options: &RequestOptions) -> Result<Vec<u8>> {
        let response = self
            .execute(Method::GET, endpoint, RequestBody::Empty, options)
            .await?;
        Ok(response.body)
    }

    /// POST a file as multipart form data
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file_name: &str,
        file: Vec<u8>,
        field_name: Option<&str>,
        additional: &[(String, String)],
    ) -> Result<T> {
        let form = MultipartForm {
            file_field: field_name.unwrap_or(DEFAULT_UPLOAD_FIELD).to_string(),
            file_name: file_name.to_string(),
            file,
            fields: additional.to_vec(),
        };
        self.execute(
            Method::POST,
            endpoint,
            RequestBody::Multipart(form),
            &RequestOptions::default(),
        )
        .await?
        .json()
    }
}

fn json_body<B: Serialize>(body: &B) -> Result<RequestBody> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| Error::Decode(format!("Failed to encode request body: {e}")))
}
