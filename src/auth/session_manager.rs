use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{info, warn};

use crate::auth::Credentials;
use crate::auth::login::perform_login;
use crate::error::{Result, WilmaError};
use crate::net::{PortalResponse, Transport};

/// A logged-in portal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub sid: String,
    pub user_prefix: String,
    pub established_at: Instant,
}

impl Session {
    /// Scope a path to this session's user unless it is already scoped.
    pub fn scoped(&self, path: &str) -> String {
        if path.starts_with("/!") {
            path.to_string()
        } else {
            format!("{}{}", self.user_prefix, path)
        }
    }
}

enum Call<'a> {
    Get,
    PostForm(&'a [(String, String)]),
}

/// Owns the one session of this client and renews it when the portal drops it.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            current: Mutex::new(None),
        }
    }

    /// Returns the live session, logging in first if there is none.
    ///
    /// The lock is held across the login so concurrent callers share one renewal.
    pub fn ensure_session(&self) -> Result<Session> {
        let mut current = self.lock();
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }

        info!("logging in to portal as {}", self.credentials.username);
        let session = perform_login(self.transport.as_ref(), &self.credentials)?;
        info!("portal session established under {}", session.user_prefix);
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop `stale` if it is still the current session.
    pub fn invalidate(&self, stale: &Session) {
        let mut current = self.lock();
        if current.as_ref() == Some(stale) {
            *current = None;
        }
    }

    pub fn get(&self, path: &str) -> Result<PortalResponse> {
        self.request(path, Call::Get)
    }

    pub fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<PortalResponse> {
        self.request(path, Call::PostForm(form))
    }

    fn request(&self, path: &str, call: Call<'_>) -> Result<PortalResponse> {
        let session = self.ensure_session()?;
        let resp = self.dispatch(&session, path, &call)?;
        if !is_auth_failure(&resp) {
            return Ok(resp);
        }

        warn!("portal session rejected on {path}, logging in again");
        self.invalidate(&session);
        let renewed = self.ensure_session()?;
        let resp = self.dispatch(&renewed, path, &call)?;
        if is_auth_failure(&resp) {
            self.invalidate(&renewed);
            return Err(WilmaError::Authentication(format!(
                "session rejected again after renewal ({path})"
            )));
        }
        Ok(resp)
    }

    fn dispatch(&self, session: &Session, path: &str, call: &Call<'_>) -> Result<PortalResponse> {
        let path = session.scoped(path);
        match call {
            Call::Get => self.transport.get(&path),
            Call::PostForm(form) => self.transport.post_form(&path, form),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The portal signals an expired session by bouncing to its login page.
fn is_auth_failure(resp: &PortalResponse) -> bool {
    resp.status == 401 || resp.url.to_lowercase().contains("/login")
}
