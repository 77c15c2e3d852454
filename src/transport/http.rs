use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{server_error, ApiRequest, ByteStream, StreamedResponse, Transport};

/// reqwest-backed transport. Built once and shared; the inner client pools
/// connections across repositories.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(Self::build_headers(config)?)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url()?,
            timeout: config.timeout,
        })
    }

    fn build_headers(config: &ClientConfig) -> ClientResult<HeaderMap> {
        let mut h = HeaderMap::new();
        let ua = HeaderValue::from_str(config.user_agent())
            .map_err(|e| ClientError::network(format!("invalid user agent: {e}")))?;
        h.insert(USER_AGENT, ua);
        h.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));
        Ok(h)
    }

    fn request(&self, req: &ApiRequest) -> ClientResult<reqwest::RequestBuilder> {
        let url = req.url(&self.base_url)?;
        tracing::debug!(method = %req.method, %url, "sending request");
        let mut builder = self.client.request(req.method.clone(), url);
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn execute_json(&self, req: ApiRequest) -> ClientResult<serde_json::Value> {
        let resp = self.request(&req)?.timeout(self.timeout).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            tracing::debug!(%status, path = %req.path, "server rejected request");
            return Err(server_error(status, &body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn execute_stream(&self, req: ApiRequest) -> ClientResult<StreamedResponse> {
        // No whole-request timeout: the body may take far longer than a JSON call.
        let resp = self.request(&req)?.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();

        let body = if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            None
        } else {
            let stream: ByteStream = Box::pin(resp.bytes_stream().map_err(std::io::Error::other));
            Some(stream)
        };

        Ok(StreamedResponse { status, headers, body })
    }
}
