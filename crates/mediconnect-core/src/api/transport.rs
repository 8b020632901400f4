//! HTTP transport seam.
//!
//! `ApiRequest` is a plain description of a call (method, path, query, JSON
//! body, optional bearer token) so that a paused request can be replayed
//! with a different token. `HttpTransport` sends it with reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
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

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Backend services wrap payloads as `{success, message, data}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Envelope { data: T },
    Bare(T),
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body, unwrapping the service envelope when present.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        match serde_json::from_str::<Payload<T>>(&self.body) {
            Ok(Payload::Envelope { data }) | Ok(Payload::Bare(data)) => Ok(data),
            Err(e) => Err(ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request exactly as described. Non-2xx statuses are not errors here.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Transport backed by a pooled reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_decode_bare_and_enveloped() {
        let bare = ApiResponse::new(StatusCode::OK, r#"{"name":"a"}"#);
        assert_eq!(bare.json::<Item>().unwrap(), Item { name: "a".into() });

        let wrapped = ApiResponse::new(
            StatusCode::OK,
            r#"{"success":true,"message":"ok","data":{"name":"b"}}"#,
        );
        assert_eq!(wrapped.json::<Item>().unwrap(), Item { name: "b".into() });

        let list = ApiResponse::new(StatusCode::OK, r#"{"data":[{"name":"c"}]}"#);
        assert_eq!(list.json::<Vec<Item>>().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_invalid() {
        let resp = ApiResponse::new(StatusCode::OK, "not json");
        assert!(matches!(resp.json::<Item>(), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url("/auth/login"), "http://localhost:8080/auth/login");
        assert_eq!(transport.url("api/doctors"), "http://localhost:8080/api/doctors");
    }

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::get("/api/doctors")
            .query("specialization", "Cardiology")
            .with_bearer(Some("T1".into()));
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query, vec![("specialization".to_string(), "Cardiology".to_string())]);
        assert_eq!(req.bearer.as_deref(), Some("T1"));
    }
}
