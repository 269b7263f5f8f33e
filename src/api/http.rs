//! Remote backed by a real REST endpoint.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::remote::{Method, Remote, RemoteRequest};
use crate::error::{Error, Result};

/// REST API client wrapper
#[derive(Clone)]
pub struct HttpRemote {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpRemote {
  pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
    // Url::join drops the last path segment unless the base ends with '/'
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url = Url::parse(&normalized)
      .map_err(|e| Error::Validation(format!("invalid remote url '{}': {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| Error::Remote(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url,
      token,
    })
  }

  /// Full URL for a request, query parameters included.
  pub fn endpoint_url(&self, request: &RemoteRequest) -> Result<Url> {
    let mut url = self
      .base_url
      .join(request.path.trim_start_matches('/'))
      .map_err(|e| Error::Validation(format!("invalid path '{}': {}", request.path, e)))?;
    if !request.params.is_empty() {
      url.query_pairs_mut().extend_pairs(request.params.iter());
    }
    Ok(url)
  }
}

impl Remote for HttpRemote {
  async fn send(&self, request: RemoteRequest) -> Result<Value> {
    let url = self.endpoint_url(&request)?;
    debug!(method = request.method.as_str(), %url, "remote request");

    let mut builder = match request.method {
      Method::Get => self.client.get(url),
      Method::Post => self.client.post(url),
      Method::Patch => self.client.patch(url),
    };
    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| Error::Remote(format!("Failed to reach {}: {}", request.path, e)))?;
    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| Error::Remote(format!("Failed to read response: {}", e)))?;

    response_value(status, &bytes, &request)
  }
}

/// Map a finished response to the payload or a typed error.
///
/// 404 becomes `NotFound` with the kind taken from the first path segment,
/// any other non-success status becomes `Remote`, and an unparsable body
/// becomes `Decode`.
fn response_value(status: StatusCode, body: &[u8], request: &RemoteRequest) -> Result<Value> {
  if status == StatusCode::NOT_FOUND {
    let segments = request.segments();
    let kind = segments.first().copied().unwrap_or("resource");
    let id = segments.get(1).copied().unwrap_or(request.path.as_str());
    return Err(Error::not_found(kind.trim_end_matches('s'), id));
  }
  if !status.is_success() {
    return Err(Error::Remote(format!(
      "{} {} returned {}: {}",
      request.method.as_str(),
      request.path,
      status,
      String::from_utf8_lossy(body)
    )));
  }

  Ok(serde_json::from_slice(body)?)
}
