//! Platform abstraction layer for gooey.
//!
//! Provides traits for the platform-dependent operations the bridge needs
//! (HTTP, filesystem, environment) so the relay and the startup path can be
//! exercised with in-memory doubles.
//!
//! # Architecture
//!
//! Each capability has its own trait ([`http::HttpClient`],
//! [`fs::FileSystem`], [`env::Environment`]) with a native implementation.
//! Config resolution takes the filesystem and environment directly, since it
//! runs before the webhook timeout is known. The [`Platform`] trait bundles
//! what the running bridge keeps: the HTTP client.
//!
//! # Example
//!
//! ```rust,no_run
//! use gooey_platform::{Platform, NativePlatform};
//! use gooey_platform::http::HttpClient;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let platform = NativePlatform::new(Duration::from_secs(30)).unwrap();
//! let response = platform.http()
//!     .post_json("https://example.com/hook", br#"{"text":"hi"}"#)
//!     .await
//!     .unwrap();
//! assert!(response.is_success());
//! # }
//! ```

pub mod config_loader;
pub mod env;
pub mod fs;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

/// Bundle of all platform capabilities.
pub trait Platform: Send + Sync {
    /// HTTP client for webhook delivery. Shared, since the relay sink
    /// keeps its own handle.
    fn http(&self) -> Arc<dyn http::HttpClient>;
}

/// Native platform implementation using std, tokio, and reqwest.
pub struct NativePlatform {
    http: Arc<http::NativeHttpClient>,
}

impl NativePlatform {
    /// Create a native platform whose HTTP client enforces `http_timeout`
    /// on every request.
    pub fn new(http_timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Arc::new(http::NativeHttpClient::new(http_timeout)?),
        })
    }
}

impl Platform for NativePlatform {
    fn http(&self) -> Arc<dyn http::HttpClient> {
        self.http.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_platform_builds() {
        let platform = NativePlatform::new(Duration::from_secs(5)).unwrap();
        let a = platform.http();
        let b = platform.http();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn native_platform_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NativePlatform>();
    }
}
