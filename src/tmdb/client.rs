//! HTTP transport for the TMDB REST API.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::config::Config;

/// Failure classes surfaced by the transport.
///
/// Only `Http` and `Network` are worth retrying; the query layer reads that
/// off [`TransportError::is_retryable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
  #[error("TMDB rejected the access token (HTTP {status})")]
  Auth { status: u16 },
  #[error("TMDB returned HTTP {status}: {body}")]
  Http { status: u16, body: String },
  #[error("network error: {0}")]
  Network(String),
  #[error("failed to decode TMDB response: {0}")]
  Decode(String),
}

impl TransportError {
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Http { .. } | Self::Network(_))
  }

  pub fn is_auth(&self) -> bool {
    matches!(self, Self::Auth { .. })
  }
}

impl From<serde_json::Error> for TransportError {
  fn from(e: serde_json::Error) -> Self {
    Self::Decode(e.to_string())
  }
}

/// Ordered query parameters. `None` values are never recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Params(Vec<(String, String)>);

impl Params {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: &str, value: impl ToString) -> Self {
    self.set(key, value.to_string());
    self
  }

  pub fn with_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
    match value {
      Some(v) => self.with(key, v),
      None => self,
    }
  }

  /// Insert or replace a parameter, keeping the original position on replace.
  pub fn set(&mut self, key: &str, value: String) {
    match self.0.iter_mut().find(|(k, _)| k == key) {
      Some(slot) => slot.1 = value,
      None => self.0.push((key.to_string(), value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .0
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// A GET request against the API, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
  pub path: String,
  pub params: Params,
}

impl ApiRequest {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      params: Params::new(),
    }
  }

  pub fn params(mut self, params: Params) -> Self {
    self.params = params;
    self
  }
}

impl fmt::Display for ApiRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "GET {}", self.path)?;
    for (i, (k, v)) in self.params.iter().enumerate() {
      let sep = if i == 0 { '?' } else { '&' };
      write!(f, "{}{}={}", sep, k, v)?;
    }
    Ok(())
  }
}

/// Anything that can execute an [`ApiRequest`] and hand back raw JSON.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}

/// Execute `request` and decode the payload into `T`.
pub async fn get_json<T: DeserializeOwned>(transport: &dyn Transport, request: &ApiRequest) -> Result<T, TransportError> {
  let value = transport.get(request).await?;
  Ok(serde_json::from_value(value)?)
}

/// reqwest-backed transport with bearer auth and a forced language.
#[derive(Clone)]
pub struct TmdbClient {
  http: reqwest::Client,
  base_url: String,
  language: String,
}

impl TmdbClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_access_token()?;

    let mut headers = reqwest::header::HeaderMap::new();
    let bearer = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| eyre!("Invalid TMDB access token: {}", e))?;
    headers.insert(reqwest::header::AUTHORIZATION, bearer);
    headers.insert(
      reqwest::header::CONTENT_TYPE,
      reqwest::header::HeaderValue::from_static("application/json"),
    );

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(config.tmdb.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    // Validate once up front so per-request URL errors mean a bad path.
    Url::parse(&config.tmdb.base_url)
      .map_err(|e| eyre!("Invalid TMDB base url {}: {}", config.tmdb.base_url, e))?;

    Ok(Self {
      http,
      base_url: config.tmdb.base_url.clone(),
      language: config.tmdb.language.clone(),
    })
  }
}

#[async_trait]
impl Transport for TmdbClient {
  async fn get(&self, request: &ApiRequest) -> Result<Value, TransportError> {
    let url = build_url(&self.base_url, request, &self.language)?;
    debug!(%request, "tmdb request");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
      .bytes()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;

    if let Some(err) = classify_status(status, &body) {
      if err.is_auth() {
        error!(
          status = status.as_u16(),
          "TMDB authentication error - check your access token"
        );
      }
      return Err(err);
    }

    Ok(serde_json::from_slice(&body)?)
  }
}

/// Join base URL and request path, append params and force the language.
///
/// `Url::query_pairs_mut` percent-encodes every value exactly once, so
/// callers pass raw (trimmed) search text.
pub fn build_url(base: &str, request: &ApiRequest, language: &str) -> Result<Url, TransportError> {
  let joined = format!(
    "{}/{}",
    base.trim_end_matches('/'),
    request.path.trim_start_matches('/')
  );
  let mut url = Url::parse(&joined)
    .map_err(|e| TransportError::Network(format!("invalid url {}: {}", joined, e)))?;

  {
    let mut pairs = url.query_pairs_mut();
    for (k, v) in request.params.iter().filter(|(k, _)| *k != "language") {
      pairs.append_pair(k, v);
    }
    pairs.append_pair("language", language);
  }

  Ok(url)
}

/// Map a non-success status onto the error taxonomy. `None` for 2xx.
pub fn classify_status(status: StatusCode, body: &[u8]) -> Option<TransportError> {
  if status.is_success() {
    return None;
  }

  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(TransportError::Auth {
      status: status.as_u16(),
    }),
    _ => Some(TransportError::Http {
      status: status.as_u16(),
      body: String::from_utf8_lossy(body).into_owned(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "https://api.themoviedb.org/3";

  #[test]
  fn test_build_url_keeps_base_path_and_forces_language() {
    let request = ApiRequest::new("/movie/popular").params(Params::new().with("page", 2));
    let url = build_url(BASE, &request, "en-US").unwrap();

    assert_eq!(
      url.as_str(),
      "https://api.themoviedb.org/3/movie/popular?page=2&language=en-US"
    );
  }

  #[test]
  fn test_build_url_overrides_caller_language() {
    let request = ApiRequest::new("/genre/movie/list").params(Params::new().with("language", "fr-FR"));
    let url = build_url(BASE, &request, "en-US").unwrap();

    let languages: Vec<_> = url
      .query_pairs()
      .filter(|(k, _)| k == "language")
      .map(|(_, v)| v.into_owned())
      .collect();
    assert_eq!(languages, vec!["en-US"]);
  }

  #[test]
  fn test_build_url_encodes_query_once() {
    let request = ApiRequest::new("/search/movie").params(Params::new().with("query", "fast & furious"));
    let url = build_url(&format!("{}/", BASE), &request, "en-US").unwrap();

    assert!(url.as_str().contains("query=fast+%26+furious"));
    let decoded: Vec<_> = url.query_pairs().map(|(_, v)| v.into_owned()).collect();
    assert_eq!(decoded[0], "fast & furious");
  }

  #[test]
  fn test_classify_status() {
    assert_eq!(classify_status(StatusCode::OK, b"{}"), None);
    assert_eq!(
      classify_status(StatusCode::UNAUTHORIZED, b""),
      Some(TransportError::Auth { status: 401 })
    );
    assert_eq!(
      classify_status(StatusCode::FORBIDDEN, b""),
      Some(TransportError::Auth { status: 403 })
    );
    assert_eq!(
      classify_status(StatusCode::SERVICE_UNAVAILABLE, b"busy"),
      Some(TransportError::Http {
        status: 503,
        body: "busy".to_string()
      })
    );
  }

  #[test]
  fn test_retryable_classes() {
    assert!(!TransportError::Auth { status: 401 }.is_retryable());
    assert!(!TransportError::Decode("bad".into()).is_retryable());
    assert!(TransportError::Network("timeout".into()).is_retryable());
    assert!(TransportError::Http {
      status: 500,
      body: String::new()
    }
    .is_retryable());
  }

  #[test]
  fn test_params_skip_none_and_replace() {
    let params = Params::new()
      .with("page", 1)
      .with_opt::<String>("region", None)
      .with("page", 3);

    assert_eq!(params.get("page"), Some("3"));
    assert_eq!(params.get("region"), None);
    assert_eq!(params.iter().count(), 1);
  }

  #[test]
  fn test_request_display() {
    let request = ApiRequest::new("/movie/now_playing")
      .params(Params::new().with("page", 1).with("region", "US"));
    assert_eq!(request.to_string(), "GET /movie/now_playing?page=1&region=US");
  }
}
