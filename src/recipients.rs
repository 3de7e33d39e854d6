//! Who the user may write to, read from the compose page.
//!
//! The portal has rendered the list in three ways over time: plain `<option>`
//! elements, a JS select widget fed with `data: [...]`, and a bare variable
//! assignment. They are tried in that order and the first one that yields
//! anybody wins.

use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::auth::SessionManager;
use crate::domain::{Recipient, RecipientRole};
use crate::error::Result;
use crate::html;
use crate::mail::compose::COMPOSE_PATH;

static WIDGET_DATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdata\s*:\s*\[").expect("valid regex"));
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:recipients|vastaanottajat|rcptList|recipientData)\s*=\s*\[").expect("valid regex")
});
// "Virtanen Liisa (Opettaja)"
static TRAILING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\(([^()]+)\)\s*$").expect("valid regex"));

pub struct RecipientDirectory<'a> {
    session: &'a SessionManager,
}

impl<'a> RecipientDirectory<'a> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// The live directory. Not cached: the portal may change it between calls.
    pub fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let page = self.session.get(COMPOSE_PATH)?.error_for_status()?;
        let recipients = parse_recipients(&page.body);
        debug!("compose page offers {} recipients", recipients.len());
        Ok(recipients)
    }
}

/// Recipients found on a compose page, unique by id, first occurrence kept.
pub fn parse_recipients(page: &str) -> Vec<Recipient> {
    let strategies: [fn(&str) -> Vec<(String, String)>; 3] =
        [from_options, from_widget_data, from_assignment];
    let raw = strategies
        .iter()
        .map(|strategy| strategy(page))
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|(id, _)| seen.insert(id.clone()))
        .map(|(id, name)| recipient(id, &name))
        .collect()
}

/// Finds a directory entry for a display name, ignoring case and spacing.
pub fn find_by_name<'r>(recipients: &'r [Recipient], name: &str) -> Option<&'r Recipient> {
    let wanted = comparable(name);
    if wanted.is_empty() {
        return None;
    }
    recipients
        .iter()
        .find(|r| comparable(&r.display_name) == wanted)
        .or_else(|| {
            // "Liisa Virtanen" against the directory's "Virtanen Liisa"
            let mut wanted_words: Vec<&str> = wanted.split(' ').collect();
            wanted_words.sort_unstable();
            recipients.iter().find(|r| {
                let name = comparable(&r.display_name);
                let mut words: Vec<&str> = name.split(' ').collect();
                words.sort_unstable();
                words == wanted_words
            })
        })
}

fn comparable(name: &str) -> String {
    html::normalize_ws(name).to_lowercase()
}

fn recipient(id: String, raw_name: &str) -> Recipient {
    let raw_name = html::normalize_ws(raw_name);
    let (display_name, role_label) = match TRAILING_LABEL.captures(&raw_name) {
        Some(caps) if !caps[1].trim().is_empty() => {
            (caps[1].trim().to_string(), Some(caps[2].trim().to_string()))
        }
        _ => (raw_name.clone(), None),
    };
    Recipient {
        role: RecipientRole::classify(role_label.as_deref(), &id),
        id,
        display_name,
        role_label,
    }
}

fn from_options(page: &str) -> Vec<(String, String)> {
    // prefer selects that are clearly about recipients, the page has other dropdowns
    let selects: Vec<&str> = html::elements(page, "select")
        .into_iter()
        .filter(|(open, _)| {
            let key = format!(
                "{} {}",
                html::attr(open, "name").unwrap_or_default(),
                html::attr(open, "id").unwrap_or_default()
            )
            .to_lowercase();
            ["rcpt", "recipient", "vastaanottaja", "r_"].iter().any(|k| key.contains(k))
        })
        .map(|(_, inner)| inner)
        .collect();
    let scopes = if selects.is_empty() { vec![page] } else { selects };

    scopes
        .into_iter()
        .flat_map(|scope| html::elements(scope, "option"))
        .filter_map(|(open, inner)| {
            let id = html::attr(open, "value")?.trim().to_string();
            let name = html::strip_tags(inner);
            (!id.is_empty() && id != "0" && !name.is_empty()).then_some((id, name))
        })
        .collect()
}

fn from_widget_data(page: &str) -> Vec<(String, String)> {
    json_entries(page, &WIDGET_DATA)
}

fn from_assignment(page: &str) -> Vec<(String, String)> {
    json_entries(page, &ASSIGNMENT)
}

fn json_entries(page: &str, marker: &Regex) -> Vec<(String, String)> {
    marker
        .find_iter(page)
        .filter_map(|m| html::json_array_at(page, m.end() - 1))
        .filter_map(|json| serde_json::from_str::<Vec<Value>>(json).ok())
        .flatten()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let id = field(obj, &["id", "Id", "ID", "value"])?;
            let name = field(obj, &["text", "name", "Name", "label"])?;
            (!id.is_empty() && id != "0" && !name.is_empty()).then_some((id, name))
        })
        .collect()
}

fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
