use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::auth::{Credentials, Session};
use crate::error::{Result, WilmaError};
use crate::net::{PortalResponse, Transport};

pub const SESSION_COOKIE: &str = "Wilma2SID";

static PREFIX_IN_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(/!\d+)").expect("valid regex"));
static PREFIX_IN_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(/!\d+)"#).expect("valid regex"));

#[derive(Debug, Deserialize)]
struct IndexJson {
    #[serde(rename = "SessionID")]
    session_id: Option<String>,
}

/// Run the portal's two-step login: fetch a login token, then post credentials with it.
pub fn perform_login(transport: &dyn Transport, credentials: &Credentials) -> Result<Session> {
    let index = transport.get("/index_json")?;
    let token = index
        .json::<IndexJson>()
        .map_err(|e| WilmaError::Authentication(format!("could not read login token: {e}")))?
        .session_id
        .filter(|t| !t.is_empty())
        .ok_or_else(|| WilmaError::Authentication("no SessionID received from index_json".into()))?;

    let form = vec![
        ("Login".to_string(), credentials.username.clone()),
        ("Password".to_string(), credentials.password.clone()),
        ("SESSIONID".to_string(), token),
    ];
    let resp = transport.post_form("/login", &form)?;

    if resp.url.to_lowercase().contains("loginfailed") || resp.status == 401 {
        return Err(WilmaError::Authentication("username or password rejected".into()));
    }

    let sid = transport
        .cookie(SESSION_COOKIE)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WilmaError::Authentication("login failed - no session cookie received".into()))?;

    let user_prefix = user_prefix(&resp).ok_or_else(|| {
        WilmaError::Authentication("could not determine user prefix after login".into())
    })?;

    Ok(Session {
        sid,
        user_prefix,
        established_at: Instant::now(),
    })
}

/// The `/!0123456` path segment that scopes every page to the logged-in role.
fn user_prefix(resp: &PortalResponse) -> Option<String> {
    PREFIX_IN_URL
        .captures(&resp.url)
        .or_else(|| PREFIX_IN_BODY.captures(&resp.body))
        .map(|c| c[1].to_string())
}
