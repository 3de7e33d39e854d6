//! Client for the Wilma school portal: daily and weekly schedules, the
//! message folders, the recipient directory and sending messages, plus a
//! tool server that exposes these to an assistant over stdio.

pub mod auth;
pub mod config;
pub mod dates;
pub mod domain;
pub mod error;
pub mod format;
pub mod html;
pub mod mail;
pub mod net;
pub mod recipients;
pub mod schedule;
pub mod tools;

use std::sync::Arc;

use crate::auth::{Credentials, SessionManager};
use crate::config::Config;
use crate::mail::MessageClient;
use crate::net::Transport;
use crate::net::http::HttpTransport;
use crate::recipients::RecipientDirectory;
use crate::schedule::ScheduleExtractor;

pub use crate::error::{Result, WilmaError};

/// One logged-in user of one portal. Cheap to share behind an `Arc`.
pub struct WilmaClient {
    session: SessionManager,
}

impl WilmaClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&cfg.base_url, cfg.timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            Credentials::new(&cfg.username, &cfg.password),
        ))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            session: SessionManager::new(transport, credentials),
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn schedule(&self) -> ScheduleExtractor<'_> {
        ScheduleExtractor::new(&self.session)
    }

    pub fn messages(&self) -> MessageClient<'_> {
        MessageClient::new(&self.session)
    }

    pub fn recipients(&self) -> RecipientDirectory<'_> {
        RecipientDirectory::new(&self.session)
    }
}
