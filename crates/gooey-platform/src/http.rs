//! HTTP client abstraction and native implementation.
//!
//! Provides the [`HttpClient`] trait the relay sink posts through, and a
//! native implementation backed by [`reqwest`] with an explicit per-request
//! timeout so a slow webhook cannot stall the IRC event loop indefinitely.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

/// Boxed error returned by [`HttpClient`] implementations.
pub type HttpError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP response from a request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,
    /// Response headers as key-value pairs.
    pub headers: HashMap<String, String>,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Check if status is success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Platform-agnostic HTTP client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send an HTTP request with the given method, URL, headers, and optional body.
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, HttpError>;

    /// POST a JSON document.
    async fn post_json(&self, url: &str, body: &[u8]) -> Result<HttpResponse, HttpError> {
        let mut headers = HashMap::new();
        headers.insert(
            "Content-Type".to_owned(),
            "application/json; charset=utf-8".to_owned(),
        );
        self.request("POST", url, &headers, Some(body)).await
    }
}

/// Native HTTP client using [`reqwest`].
pub struct NativeHttpClient {
    client: reqwest::Client,
}

impl NativeHttpClient {
    /// Create a client that aborts any request taking longer than `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for NativeHttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, HttpError> {
        let reqwest_method = method.parse::<reqwest::Method>()?;
        let mut builder = self.client.request(reqwest_method, url);

        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if let Some(body_bytes) = body {
            builder = builder.body(body_bytes.to_vec());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let mut resp_headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(key.as_str().to_owned(), v.to_owned());
            }
        }
        let resp_body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers: resp_headers,
            body: resp_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn text_lossy_replaces_invalid_utf8() {
        assert_eq!(response(200, b"ok").text_lossy(), "ok");
        assert_eq!(response(200, &[0x6f, 0xff]).text_lossy(), "o\u{fffd}");
    }

    #[test]
    fn success_range() {
        for status in [200, 201, 204, 299] {
            assert!(response(status, b"").is_success(), "{status}");
        }
        for status in [100, 301, 400, 404, 500] {
            assert!(!response(status, b"").is_success(), "{status}");
        }
    }

    #[test]
    fn native_client_builds_with_timeout() {
        assert!(NativeHttpClient::new(Duration::from_secs(3)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let client = NativeHttpClient::new(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let result = client.post_json("http://127.0.0.1:9/hook", b"{}").await;
        assert!(result.is_err());
    }
}
