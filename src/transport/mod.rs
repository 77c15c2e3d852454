pub mod http;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::core::model::ApiErrorBody;
use crate::error::{ClientError, ClientResult};

/// Body of a streamed response: finite, single pass, not restartable.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Joined onto the configured base URL; an absolute URL is used as-is.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: vec![], body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_json<T: serde::Serialize>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn url(&self, base: &Url) -> ClientResult<Url> {
        let mut url = base.join(&self.path)?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// A response whose body has not been read yet.
pub struct StreamedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` when the response carries no body at all (204/205).
    pub body: Option<ByteStream>,
}

impl StreamedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH).and_then(|s| s.trim().parse().ok())
    }
}

impl std::fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends the request and buffers the whole JSON body. Non-2xx statuses
    /// become `ClientError::Server`.
    async fn execute_json(&self, req: ApiRequest) -> ClientResult<serde_json::Value>;

    /// Sends the request and hands back the raw body stream. The status is
    /// not interpreted here.
    async fn execute_stream(&self, req: ApiRequest) -> ClientResult<StreamedResponse>;
}

/// Message carried by a server error payload, if the body is one.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

pub(crate) fn server_error(status: StatusCode, body: &[u8]) -> ClientError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(|r| format!("{} {}", status.as_u16(), r))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    });
    ClientError::Server { status: status.as_u16(), message }
}
