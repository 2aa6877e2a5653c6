use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::transport::{build_url, ApiRequest, ApiResponse, Transport};

/// Blocking HTTP transport bound to one Keystone base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, insecure_skip_verify: bool) -> Result<Self> {
        if insecure_skip_verify {
            warn!("TLS certificate verification is disabled");
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()
            .map_err(|e| Error::RequestBuild(format!("building http client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url.clone(), config.insecure_skip_verify)
    }
}

fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::RequestBuild(format!("header name `{key}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::RequestBuild(format!("header `{key}` value: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

impl Transport for HttpTransport {
    fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.effective_method();
        let url = build_url(&self.base_url, &request.endpoint, request.query.as_deref())?;
        let headers = request.effective_headers();
        let header_names: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();

        debug!(
            method = %method,
            url = %url,
            headers = ?header_names,
            body_len = request.body.as_ref().map(Vec::len).unwrap_or(0),
            "sending keystone request"
        );

        let http_method = Method::from_bytes(method.as_bytes())
            .map_err(|e| Error::RequestBuild(format!("method `{method}`: {e}")))?;

        let mut builder = self
            .client
            .request(http_method, url.as_str())
            .headers(header_map(&headers)?);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let built = builder
            .build()
            .map_err(|e| Error::RequestBuild(e.to_string()))?;

        let resp = self.client.execute(built).map_err(|e| Error::Transport {
            status: 0,
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| Error::Transport {
                status,
                message: format!("read response body: {e}"),
            })?
            .to_vec();

        debug!(status = %status, url = %url, body_len = body.len(), "received keystone response");
        trace!(response_body = %String::from_utf8_lossy(&body), "keystone response body");

        Ok(ApiResponse { status, body })
    }
}
