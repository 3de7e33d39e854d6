use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::WilmaError;

pub type MessageId = u64;

/// Opening a message on the portal moves it from unread to read; nothing moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadState {
    Unread,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Inbox,
    Sent,
    Archive,
}

impl Folder {
    pub const ALL: [Folder; 3] = [Folder::Inbox, Folder::Sent, Folder::Archive];

    pub fn as_str(self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Sent => "sent",
            Folder::Archive => "archive",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Folder {
    type Err = WilmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbox" => Ok(Folder::Inbox),
            "sent" => Ok(Folder::Sent),
            "archive" => Ok(Folder::Archive),
            other => Err(WilmaError::InvalidArgument(format!(
                "unknown folder '{other}', use inbox, sent or archive"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    pub timestamp: Option<NaiveDateTime>,
    read_state: ReadState,
    /// Only filled in when the message itself was opened.
    pub body: Option<String>,
    /// Folder the message was listed from; unknown when opened directly by id.
    pub folder: Option<Folder>,
    pub recipients: Vec<String>,
    pub attachments: Vec<String>,
}

impl Message {
    pub(crate) fn new(id: MessageId, folder: Option<Folder>, read_state: ReadState) -> Self {
        Self {
            id,
            subject: String::new(),
            sender: String::new(),
            timestamp: None,
            read_state,
            body: None,
            folder,
            recipients: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    pub fn is_read(&self) -> bool {
        self.read_state == ReadState::Read
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkReadOutcome {
    MarkedRead,
    AlreadyRead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentConfirmation {
    /// Id of the new message, when the portal reveals it.
    pub message_id: Option<MessageId>,
    pub recipient: Option<String>,
    pub subject: String,
    pub reply_to: Option<MessageId>,
}
