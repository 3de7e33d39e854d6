use log::{debug, info};

use crate::auth::SessionManager;
use crate::domain::{Folder, MarkReadOutcome, Message, MessageId, SentConfirmation};
use crate::error::{Result, WilmaError};
use crate::mail::compose::{
    self, ANSWER_FIELD, BODY_FIELD, COMPOSE_PATH, ComposeForm, FORMKEY_FIELD, RECIPIENT_FIELD,
    SUBJECT_FIELD,
};
use crate::mail::parser;
use crate::recipients::{self, RecipientDirectory};

/// Listing, reading and sending portal messages.
pub struct MessageClient<'a> {
    session: &'a SessionManager,
}

fn listing_path(folder: Folder) -> &'static str {
    match folder {
        Folder::Inbox => "/messages/list/index_json",
        Folder::Sent => "/messages/list/outbox/index_json",
        Folder::Archive => "/messages/list/archive/index_json",
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl<'a> MessageClient<'a> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Up to `limit` messages of `folder`, newest first.
    pub fn list_messages(&self, folder: Folder, limit: usize) -> Result<Vec<Message>> {
        if limit == 0 {
            return Err(WilmaError::InvalidArgument("limit must be at least 1".into()));
        }
        let resp = self.session.get(listing_path(folder))?.error_for_status()?;
        let mut messages = parser::parse_listing(&resp.body, folder)?;
        parser::sort_newest_first(&mut messages);
        messages.truncate(limit);
        debug!("{folder}: {} messages", messages.len());
        Ok(messages)
    }

    /// Opens a message. The portal marks it read as a side effect.
    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        let resp = self.session.get(&format!("/messages/{id}"))?;
        if matches!(resp.status, 403 | 404) {
            return Err(WilmaError::NotFound(format!("message {id}")));
        }
        let resp = resp.error_for_status()?;
        parser::parse_message_page(&resp.body, id)
            .ok_or_else(|| WilmaError::NotFound(format!("message {id}")))
    }

    pub fn mark_read(&self, id: MessageId) -> Result<MarkReadOutcome> {
        let inbox = self.list_messages(Folder::Inbox, usize::MAX)?;
        if inbox.iter().any(|m| m.id == id && m.is_read()) {
            return Ok(MarkReadOutcome::AlreadyRead);
        }
        self.get_message(id)?;
        info!("marked message {id} read");
        Ok(MarkReadOutcome::MarkedRead)
    }

    /// Sends a new message, or a reply when `reply_to` is given.
    pub fn send_message(
        &self,
        recipient_id: Option<&str>,
        subject: Option<&str>,
        body: &str,
        reply_to: Option<MessageId>,
    ) -> Result<SentConfirmation> {
        if body.trim().is_empty() {
            return Err(WilmaError::InvalidArgument("message body is empty".into()));
        }
        match reply_to {
            Some(original) => self.send_reply(original, non_blank(recipient_id), non_blank(subject), body),
            None => self.send_new(recipient_id, subject, body),
        }
    }

    pub fn reply_to_message(&self, id: MessageId, body: &str) -> Result<SentConfirmation> {
        self.send_message(None, None, body, Some(id))
    }

    fn send_new(
        &self,
        recipient_id: Option<&str>,
        subject: Option<&str>,
        body: &str,
    ) -> Result<SentConfirmation> {
        let recipient = non_blank(recipient_id).ok_or_else(|| {
            WilmaError::InvalidArgument("recipient_id is required for a new message".into())
        })?;
        let subject = non_blank(subject)
            .ok_or_else(|| WilmaError::InvalidArgument("subject is required for a new message".into()))?;

        let page = self.session.get(COMPOSE_PATH)?.error_for_status()?;
        if !recipients::parse_recipients(&page.body)
            .iter()
            .any(|r| r.id == recipient)
        {
            return Err(WilmaError::InvalidArgument(format!(
                "unknown recipient '{recipient}'"
            )));
        }
        let form = ComposeForm::parse(&page.body);
        let formkey = form
            .formkey
            .ok_or_else(|| WilmaError::Parse("compose page has no formkey".into()))?;

        let fields = vec![
            (FORMKEY_FIELD.to_string(), formkey),
            (RECIPIENT_FIELD.to_string(), recipient.to_string()),
            (SUBJECT_FIELD.to_string(), subject.to_string()),
            (BODY_FIELD.to_string(), body.to_string()),
        ];
        let resp = self.session.post_form(COMPOSE_PATH, &fields)?;
        let message_id = compose::confirm_submission(&resp)?;
        info!("sent message to {recipient}");
        Ok(SentConfirmation {
            message_id,
            recipient: Some(recipient.to_string()),
            subject: subject.to_string(),
            reply_to: None,
        })
    }

    fn send_reply(
        &self,
        original_id: MessageId,
        recipient_id: Option<&str>,
        subject: Option<&str>,
        body: &str,
    ) -> Result<SentConfirmation> {
        let original = self.get_message(original_id)?;

        let page = self
            .session
            .get(&format!("{COMPOSE_PATH}?{ANSWER_FIELD}={original_id}"))?
            .error_for_status()?;
        let form = ComposeForm::parse(&page.body);
        let formkey = form
            .formkey
            .clone()
            .ok_or_else(|| WilmaError::Parse("reply form has no formkey".into()))?;

        let mut fields = form.hidden.clone();
        compose::set_field(&mut fields, FORMKEY_FIELD, &formkey);

        let recipient = match (recipient_id, form.prefilled_recipient()) {
            (Some(explicit), _) => {
                form.address_to(&mut fields, explicit);
                explicit.to_string()
            }
            (None, Some(prefilled)) => prefilled.to_string(),
            (None, None) => {
                let id = self.recipient_for_sender(&page.body, &original.sender)?;
                form.address_to(&mut fields, &id);
                id
            }
        };

        let subject = subject
            .map(str::to_string)
            .or_else(|| form.prefilled_subject.clone())
            .unwrap_or_else(|| reply_subject(&original.subject));
        compose::set_field(&mut fields, &form.subject_field, &subject);
        compose::set_field(&mut fields, &form.body_field, body);
        if !fields.iter().any(|(name, _)| name == ANSWER_FIELD) {
            fields.push((ANSWER_FIELD.to_string(), original_id.to_string()));
        }

        let resp = self.session.post_form(form.submit_path(), &fields)?;
        let message_id = compose::confirm_submission(&resp)?;
        info!("sent reply to message {original_id}");
        Ok(SentConfirmation {
            message_id,
            recipient: Some(recipient),
            subject,
            reply_to: Some(original_id),
        })
    }

    /// Directory id for the original sender, from the reply form's own
    /// recipient list or else the compose page's.
    fn recipient_for_sender(&self, reply_page: &str, sender: &str) -> Result<String> {
        let unresolved = || {
            WilmaError::InvalidArgument(format!(
                "cannot resolve a recipient for sender '{sender}', pass recipient_id"
            ))
        };
        if let Some(r) = recipients::find_by_name(&recipients::parse_recipients(reply_page), sender) {
            return Ok(r.id.clone());
        }
        let directory = RecipientDirectory::new(self.session).list_recipients()?;
        recipients::find_by_name(&directory, sender)
            .map(|r| r.id.clone())
            .ok_or_else(unresolved)
    }
}

fn reply_subject(original: &str) -> String {
    let original = original.trim();
    if original.to_lowercase().starts_with("re:") {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}
