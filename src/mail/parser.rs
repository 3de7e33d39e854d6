// Message listings (JSON) and single message pages (HTML).

use std::cmp::Ordering;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Folder, Message, MessageId, ReadState};
use crate::error::{Result, WilmaError};
use crate::html;
use crate::mail::decoders::{decode_id, decode_list_timestamp, decode_page_timestamp, find_page_timestamp};

// Page chrome that html2text renders into the body panel.
static BODY_CHROME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"×\s*Varmistus\s*Jatka\s*Peruuta|Vastaa viestin lähettäjälle").expect("valid regex")
});
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

const TITLE_SUFFIX: &str = " - Wilma";

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(rename = "Messages", default)]
    messages: Vec<ListedMessage>,
}

#[derive(Debug, Deserialize)]
struct ListedMessage {
    #[serde(rename = "Id", default)]
    id: Value,
    #[serde(rename = "Subject", default)]
    subject: Option<String>,
    #[serde(rename = "Sender", default)]
    sender: Option<String>,
    #[serde(rename = "Recipients", default)]
    recipients: Option<String>,
    #[serde(rename = "TimeStamp", default)]
    timestamp: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<i64>,
}

/// Messages of one folder listing, in portal order.
pub fn parse_listing(json: &str, folder: Folder) -> Result<Vec<Message>> {
    let listing: Listing = serde_json::from_str(json)
        .map_err(|e| WilmaError::Parse(format!("{folder} listing is not valid JSON: {e}")))?;

    let mut out = Vec::with_capacity(listing.messages.len());
    for raw in listing.messages {
        let Some(id) = decode_id(&raw.id) else {
            debug!("skipping {folder} entry without usable id: {:?}", raw.id);
            continue;
        };
        // Status 0 is unread; sent messages are always read
        let read_state = match (folder, raw.status.unwrap_or(0)) {
            (Folder::Sent, _) => ReadState::Read,
            (_, 0) => ReadState::Unread,
            _ => ReadState::Read,
        };
        let mut msg = Message::new(id, Some(folder), read_state);
        msg.subject = html::decode_entities(raw.subject.as_deref().unwrap_or_default().trim());
        msg.sender = html::decode_entities(raw.sender.as_deref().unwrap_or_default().trim());
        msg.recipients = split_names(raw.recipients.as_deref().unwrap_or_default());
        msg.timestamp = raw.timestamp.as_deref().and_then(decode_list_timestamp);
        out.push(msg);
    }
    Ok(out)
}

/// Newest first; undated messages last; equal timestamps by id, highest first.
pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x).then(b.id.cmp(&a.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.id.cmp(&a.id),
    });
}

/// A single message page. `None` when the page carries no message body panel,
/// which is how the portal answers for ids the user cannot see.
pub fn parse_message_page(page: &str, id: MessageId) -> Option<Message> {
    let panel = html::div_with_class(page, "panel-body")?;

    let mut msg = Message::new(id, None, ReadState::Read);
    msg.subject = title(page)
        .or_else(|| html::value_after_label(page, "Aihe"))
        .unwrap_or_default();
    msg.sender = html::value_after_label(page, "Lähettäjä").unwrap_or_default();
    msg.recipients = html::value_after_label(page, "Vastaanottajat")
        .map(|v| split_names(&v))
        .unwrap_or_default();
    msg.timestamp = html::value_after_label(page, "Lähetetty")
        .as_deref()
        .and_then(decode_page_timestamp);
    msg.body = Some(body_text(panel, msg.timestamp.is_some()));
    msg.attachments = attachments(page);
    Some(msg)
}

fn title(page: &str) -> Option<String> {
    let (_, inner) = html::elements(page, "title").into_iter().next()?;
    let text = html::strip_tags(inner);
    let text = match text.rfind(TITLE_SUFFIX) {
        Some(at) => text[..at].trim().to_string(),
        None => text,
    };
    (!text.is_empty()).then_some(text)
}

fn body_text(panel: &str, has_send_time: bool) -> String {
    let text = html::to_text(panel);
    // the metadata rows end with the send time; the message starts after it
    let text = match find_page_timestamp(&text).filter(|_| has_send_time) {
        Some((_, end)) => &text[end..],
        None => text.as_str(),
    };
    let text = BODY_CHROME.replace_all(text, "");
    BLANK_RUNS.replace_all(text.trim(), "\n\n").into_owned()
}

fn attachments(page: &str) -> Vec<String> {
    html::elements(page, "a")
        .into_iter()
        .filter(|(open, _)| {
            html::attr(open, "href")
                .map(|h| {
                    let h = h.to_lowercase();
                    h.contains("attachment") || h.contains("liite")
                })
                .unwrap_or(false)
        })
        .map(|(_, inner)| html::strip_tags(inner))
        .filter(|name| !name.is_empty())
        .collect()
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|n| html::decode_entities(n.trim()))
        .filter(|n| !n.is_empty())
        .collect()
}
