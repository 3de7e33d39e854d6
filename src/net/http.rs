use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;

use crate::error::{Result, WilmaError};
use crate::net::{PortalResponse, Transport};

const USER_AGENT: &str = concat!("wilma_client/", env!("CARGO_PKG_VERSION"));

/// Blocking reqwest client with its own cookie jar, one per portal instance.
pub struct HttpTransport {
    base: String,
    base_url: Url,
    client: Client,
    jar: Arc<Jar>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base)
            .map_err(|e| WilmaError::InvalidArgument(format!("base url '{base_url}': {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/html"));

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base,
            base_url: parsed,
            client,
            jar,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let full = format!("{}{}", self.base, path);
        Url::parse(&full).map_err(|e| WilmaError::InvalidArgument(format!("bad path '{path}': {e}")))
    }

    fn read(resp: reqwest::blocking::Response) -> Result<PortalResponse> {
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp.text()?;
        debug!("<- {status} {url} ({} bytes)", body.len());
        Ok(PortalResponse { status, url, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> Result<PortalResponse> {
        let url = self.url(path)?;
        debug!("-> GET {url}");
        Self::read(self.client.get(url).send()?)
    }

    fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<PortalResponse> {
        let url = self.url(path)?;
        debug!("-> POST {url} ({} fields)", form.len());
        Self::read(self.client.post(url).form(form).send()?)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    }
}
