// The portal's compose form: reading it and judging what came back after posting it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::MessageId;
use crate::error::{Result, WilmaError};
use crate::html;
use crate::net::PortalResponse;

pub const COMPOSE_PATH: &str = "/messages/compose";

pub const FORMKEY_FIELD: &str = "formkey";
pub const RECIPIENT_FIELD: &str = "rcpt";
pub const SUBJECT_FIELD: &str = "subject";
pub const BODY_FIELD: &str = "body";
pub const ANSWER_FIELD: &str = "answer";

static MESSAGE_ID_IN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/messages/(\d+)").expect("valid regex"));

/// What a compose page offers for submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeForm {
    pub action: Option<String>,
    /// Every hidden input in page order, `formkey` included.
    pub hidden: Vec<(String, String)>,
    pub formkey: Option<String>,
    /// Name of the textarea carrying the message text.
    pub body_field: String,
    pub subject_field: String,
    pub prefilled_subject: Option<String>,
}

impl ComposeForm {
    pub fn parse(page: &str) -> Self {
        let form = form_region(page);
        let action = html::open_tags(form, "form")
            .first()
            .and_then(|t| html::attr(t, "action"))
            .filter(|a| !a.trim().is_empty());

        let mut hidden = Vec::new();
        let mut subject_field = None;
        let mut prefilled_subject = None;
        for input in html::open_tags(form, "input") {
            let Some(name) = html::attr(input, "name").filter(|n| !n.is_empty()) else {
                continue;
            };
            let kind = html::attr(input, "type").unwrap_or_default().to_lowercase();
            let value = html::attr(input, "value").unwrap_or_default();
            if kind == "hidden" {
                hidden.push((name, value));
            } else if is_subject_field(&name) && subject_field.is_none() {
                prefilled_subject = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                subject_field = Some(name);
            }
        }

        // a formkey outside the chosen form still counts
        let formkey = hidden
            .iter()
            .find(|(n, _)| n == FORMKEY_FIELD)
            .map(|(_, v)| v.clone())
            .or_else(|| {
                html::open_tags(page, "input")
                    .into_iter()
                    .find(|t| html::attr(t, "name").as_deref() == Some(FORMKEY_FIELD))
                    .and_then(|t| html::attr(t, "value"))
            })
            .filter(|v| !v.is_empty());

        let body_field = html::open_tags(form, "textarea")
            .first()
            .and_then(|t| html::attr(t, "name"))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| BODY_FIELD.to_string());

        Self {
            action,
            hidden,
            formkey,
            body_field,
            subject_field: subject_field.unwrap_or_else(|| SUBJECT_FIELD.to_string()),
            prefilled_subject,
        }
    }

    /// Recipient the form already addresses, as a reply form does.
    pub fn prefilled_recipient(&self) -> Option<&str> {
        self.hidden
            .iter()
            .find(|(name, value)| is_recipient_field(name) && !value.trim().is_empty() && value != "0")
            .map(|(_, value)| value.trim())
    }

    /// Name of the field that addresses the message: the one the form
    /// prefills, else `rcpt`.
    pub fn recipient_field(&self) -> &str {
        self.hidden
            .iter()
            .find(|(name, value)| is_recipient_field(name) && !value.trim().is_empty() && value != "0")
            .map_or(RECIPIENT_FIELD, |(name, _)| name.as_str())
    }

    /// Point `fields` at `recipient` alone, dropping any other addressee the
    /// form carried.
    pub fn address_to(&self, fields: &mut Vec<(String, String)>, recipient: &str) {
        let target = self.recipient_field().to_string();
        fields.retain(|(name, _)| *name == target || !is_recipient_field(name));
        set_field(fields, &target, recipient);
    }

    /// Where to post: the form's own site-absolute action, else the compose path.
    pub fn submit_path(&self) -> &str {
        match self.action.as_deref() {
            Some(a) if a.starts_with('/') && !a.starts_with("//") => a,
            _ => COMPOSE_PATH,
        }
    }
}

/// Set `name` to `value`, replacing an existing field of that name.
pub fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(n, _)| n == name) {
        Some(field) => field.1 = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

/// Judge the page the portal answered a submission with.
///
/// Returns the new message's id when the final URL reveals it.
pub fn confirm_submission(resp: &PortalResponse) -> Result<Option<MessageId>> {
    if !resp.is_success() {
        return Err(WilmaError::Network(format!(
            "HTTP {} while sending message",
            resp.status
        )));
    }
    if let Some(reason) = error_marker(&resp.body) {
        return Err(WilmaError::Parse(format!("portal rejected the message: {reason}")));
    }
    if !resp.url.to_lowercase().contains("messages") {
        return Err(WilmaError::Parse(format!(
            "portal did not confirm the message (ended at {})",
            resp.url
        )));
    }
    Ok(MESSAGE_ID_IN_URL
        .captures(&resp.url)
        .and_then(|c| c[1].parse().ok()))
}

/// Text of an alert box that reports an error.
fn error_marker(page: &str) -> Option<String> {
    html::divs_where(page, |tag| {
        html::attr(tag, "class").is_some_and(|c| c.to_lowercase().contains("alert"))
    })
    .into_iter()
    .chain(html::divs_where(page, |tag| {
        html::attr(tag, "class").is_some_and(|c| c.to_lowercase().contains("error"))
    }))
    .map(html::strip_tags)
    .find(|text| {
        let lc = text.to_lowercase();
        lc.contains("virhe") || lc.contains("error")
    })
}

/// The first `<form>` holding a textarea, else the first form, else the page.
fn form_region(page: &str) -> &str {
    let lc = html::to_lowercase_fast(page);
    let mut regions = Vec::new();
    let mut from = 0;
    while let Some(rel) = lc[from..].find("<form") {
        let start = from + rel;
        let end = lc[start..]
            .find("</form")
            .map(|i| start + i)
            .unwrap_or(page.len());
        regions.push((start, end));
        from = end.max(start + 5);
    }
    regions
        .iter()
        .find(|(s, e)| lc[*s..*e].contains("<textarea"))
        .or(regions.first())
        .map(|(s, e)| &page[*s..*e])
        .unwrap_or(page)
}

fn is_subject_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n == SUBJECT_FIELD || n == "aihe"
}

fn is_recipient_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n == RECIPIENT_FIELD || n.starts_with("r_") || n.starts_with("rcpt") || n == "recipient"
}
