//! HTTP seam between the portal client and the outside world.
//!
//! Everything above this module talks to the portal through [`Transport`], so
//! the session and scraping logic can run against an in-memory portal in tests.

pub mod http;

use serde::de::DeserializeOwned;

use crate::error::{Result, WilmaError};

/// What came back from one round trip, after redirects were followed.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

impl PortalResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx answer into a [`WilmaError::Network`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WilmaError::Network(format!("HTTP {} from {}", self.status, self.url)))
        }
    }

    /// Decode the body as JSON. A non-JSON body means the endpoint changed shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| WilmaError::Parse(format!("expected JSON from {}: {e}", self.url)))
    }
}

pub trait Transport: Send + Sync {
    /// GET a site-absolute path such as `/index_json`.
    fn get(&self, path: &str) -> Result<PortalResponse>;

    /// POST an `application/x-www-form-urlencoded` body.
    fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<PortalResponse>;

    /// Current value of a cookie held for the portal host.
    fn cookie(&self, name: &str) -> Option<String>;
}
