mod test_support;

use pretty_assertions::assert_eq;

use wilma_client::WilmaError;
use wilma_client::domain::{Folder, MarkReadOutcome, RecipientRole};

use test_support::{FakePortal, client};

fn is_sorted_newest_first(messages: &[wilma_client::domain::Message]) -> bool {
    messages.windows(2).all(|w| match (w[0].timestamp, w[1].timestamp) {
        (Some(a), Some(b)) => a > b || (a == b && w[0].id > w[1].id),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => w[0].id > w[1].id,
    })
}

#[test]
fn every_folder_lists_newest_first() {
    let portal = FakePortal::new();
    let client = client(&portal);
    for folder in Folder::ALL {
        let messages = client.messages().list_messages(folder, 50).unwrap();
        assert!(!messages.is_empty(), "{folder}");
        assert!(is_sorted_newest_first(&messages), "{folder}: {messages:?}");
        assert!(messages.iter().all(|m| m.folder == Some(folder)));
    }
}

#[test]
fn inbox_order_and_read_flags() {
    let portal = FakePortal::new();
    let client = client(&portal);
    let inbox = client.messages().list_messages(Folder::Inbox, 20).unwrap();
    let ids: Vec<_> = inbox.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![12, 11, 10, 9]);
    let unread: Vec<_> = inbox.iter().filter(|m| !m.is_read()).map(|m| m.id).collect();
    assert_eq!(unread, vec![11, 10]);
    assert_eq!(inbox[1].subject, "Retkipäivä");
    assert_eq!(inbox[1].sender, "Virtanen Liisa");
}

#[test]
fn limit_truncates_and_zero_is_rejected() {
    let portal = FakePortal::new();
    let client = client(&portal);
    assert_eq!(client.messages().list_messages(Folder::Inbox, 2).unwrap().len(), 2);
    assert!(matches!(
        client.messages().list_messages(Folder::Inbox, 0),
        Err(WilmaError::InvalidArgument(_))
    ));
}

#[test]
fn unknown_folder_is_invalid_argument() {
    let err = "roskakori".parse::<Folder>().unwrap_err();
    assert!(matches!(err, WilmaError::InvalidArgument(_)));
    assert_eq!(err.kind(), "InvalidArgument");
}

#[test]
fn opening_a_message_reads_it_once() {
    let portal = FakePortal::new();
    let client = client(&portal);

    let message = client.messages().get_message(11).unwrap();
    assert_eq!(message.subject, "Retkipäivä");
    assert_eq!(message.sender, "Virtanen Liisa");
    assert_eq!(message.recipients, vec!["Huoltaja Hanna"]);
    assert!(message.is_read());
    assert_eq!(message.body.as_deref(), Some("Viestin 11 sisältö."));
    assert_eq!(
        message.timestamp.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).as_deref(),
        Some("2026-02-08 11:42")
    );
    assert!(portal.message(11).read);

    let inbox = client.messages().list_messages(Folder::Inbox, 20).unwrap();
    assert!(inbox.iter().find(|m| m.id == 11).unwrap().is_read());

    // again: no error, still read
    assert!(client.messages().get_message(11).unwrap().is_read());
    assert_eq!(client.messages().mark_read(11).unwrap(), MarkReadOutcome::AlreadyRead);
}

#[test]
fn mark_read_is_idempotent() {
    let portal = FakePortal::new();
    let client = client(&portal);
    assert_eq!(client.messages().mark_read(10).unwrap(), MarkReadOutcome::MarkedRead);
    assert!(portal.message(10).read);
    assert_eq!(client.messages().mark_read(10).unwrap(), MarkReadOutcome::AlreadyRead);
}

#[test]
fn mark_read_opens_messages_outside_the_inbox() {
    let portal = FakePortal::new();
    let client = client(&portal);
    assert!(!portal.message(4).read);
    assert_eq!(client.messages().mark_read(4).unwrap(), MarkReadOutcome::MarkedRead);
    assert!(portal.message(4).read);
}

#[test]
fn missing_message_is_not_found() {
    let portal = FakePortal::new();
    let client = client(&portal);
    assert!(matches!(client.messages().get_message(999), Err(WilmaError::NotFound(_))));
    assert!(matches!(client.messages().mark_read(999), Err(WilmaError::NotFound(_))));
}

#[test]
fn forbidden_message_is_not_found() {
    let portal = FakePortal::new();
    portal.state().forbidden.push(12);
    let client = client(&portal);
    let result = client.messages().get_message(12);
    assert!(matches!(result, Err(WilmaError::NotFound(_))), "{result:?}");
    assert_eq!(portal.logins(), 1);
}

#[test]
fn recipients_from_compose_page() {
    let portal = FakePortal::new();
    let client = client(&portal);
    let recipients = client.recipients().list_recipients().unwrap();
    let ids: Vec<_> = recipients.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "102", "103"]);
    assert_eq!(recipients[0].display_name, "Virtanen Liisa");
    assert_eq!(recipients[0].role, RecipientRole::Teacher);
    assert_eq!(recipients[1].role, RecipientRole::Staff);
    assert_eq!(recipients[2].role_label.as_deref(), Some("Henkilökunta"));
}

#[test]
fn sent_message_shows_up_in_sent_folder() {
    let portal = FakePortal::new();
    let client = client(&portal);

    let sent = client
        .messages()
        .send_message(Some("101"), Some("Q"), "body", None)
        .unwrap();
    assert_eq!(sent.recipient.as_deref(), Some("101"));
    assert_eq!(sent.subject, "Q");
    assert_eq!(sent.message_id, Some(200));
    assert_eq!(sent.reply_to, None);

    let outbox = client.messages().list_messages(Folder::Sent, 20).unwrap();
    assert!(outbox.iter().any(|m| m.subject == "Q"), "{outbox:?}");
}

#[test]
fn new_message_argument_checks() {
    let portal = FakePortal::new();
    let client = client(&portal);
    let messages = client.messages();

    for (recipient, subject, body) in [
        (Some("101"), Some("Q"), "   "),
        (None, Some("Q"), "body"),
        (Some("101"), None, "body"),
        (Some("101"), Some(" "), "body"),
        (Some("999"), Some("Q"), "body"),
    ] {
        let result = messages.send_message(recipient, subject, body, None);
        assert!(
            matches!(result, Err(WilmaError::InvalidArgument(_))),
            "{recipient:?} {subject:?} {body:?}: {result:?}"
        );
    }
    assert!(portal.state().posted.is_empty());
}

#[test]
fn reply_resolves_sender_from_directory() {
    let portal = FakePortal::new();
    let client = client(&portal);

    let sent = client.messages().reply_to_message(11, "Kiitos tiedosta").unwrap();
    assert_eq!(sent.reply_to, Some(11));
    assert_eq!(sent.recipient.as_deref(), Some("101"));
    assert_eq!(sent.subject, "Re: Retkipäivä");

    let posted = portal.state().posted.last().cloned().unwrap();
    let field = |name: &str| posted.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
    assert_eq!(field("answer").as_deref(), Some("11"));
    assert_eq!(field("rcpt").as_deref(), Some("101"));
    assert_eq!(field("body").as_deref(), Some("Kiitos tiedosta"));
    assert!(field("formkey").is_some());

    let outbox = client.messages().list_messages(Folder::Sent, 20).unwrap();
    assert!(outbox.iter().any(|m| m.subject == "Re: Retkipäivä"));
}

#[test]
fn reply_uses_recipient_prefilled_by_the_form() {
    let portal = FakePortal::new();
    portal.state().reply_prefills_recipient = true;
    let client = client(&portal);

    let sent = client
        .messages()
        .send_message(None, Some("Koeviikosta"), "Kysymys kokeesta", Some(12))
        .unwrap();
    assert_eq!(sent.recipient.as_deref(), Some("102"));
    assert_eq!(sent.subject, "Koeviikosta");

    let posted = portal.state().posted.last().cloned().unwrap();
    assert!(posted.iter().any(|(n, v)| n == "r_teacher" && v == "102"));
    assert!(!posted.iter().any(|(n, _)| n == "rcpt"));
}

#[test]
fn explicit_recipient_wins_for_replies() {
    let portal = FakePortal::new();
    let client = client(&portal);
    let sent = client
        .messages()
        .send_message(Some("103"), None, "Välitän tiedon", Some(11))
        .unwrap();
    assert_eq!(sent.recipient.as_deref(), Some("103"));
}

#[test]
fn explicit_recipient_replaces_the_prefilled_one() {
    let portal = FakePortal::new();
    portal.state().reply_prefills_recipient = true;
    let client = client(&portal);
    let sent = client
        .messages()
        .send_message(Some("103"), None, "Välitän tiedon", Some(11))
        .unwrap();
    assert_eq!(sent.recipient.as_deref(), Some("103"));

    let st = portal.state();
    let addressees: Vec<_> = st.posted[0]
        .iter()
        .filter(|(name, _)| name == "rcpt" || name.starts_with("r_"))
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(addressees, vec!["103"]);
    let delivered = st.messages.iter().find(|m| Some(m.id) == sent.message_id).unwrap();
    assert_eq!(delivered.recipients, "Kanslia (Henkilökunta)");
}

#[test]
fn reply_without_resolvable_recipient_is_invalid() {
    let portal = FakePortal::new();
    let client = client(&portal);
    // Mäkinen Pekka is not in the directory
    let result = client.messages().reply_to_message(10, "Hei");
    assert!(matches!(result, Err(WilmaError::InvalidArgument(_))), "{result:?}");
    assert!(portal.state().posted.is_empty());
}

#[test]
fn reply_to_missing_message_is_not_found() {
    let portal = FakePortal::new();
    let client = client(&portal);
    assert!(matches!(
        client.messages().reply_to_message(999, "Hei"),
        Err(WilmaError::NotFound(_))
    ));
}

#[test]
fn portal_rejection_is_reported() {
    let portal = FakePortal::new();
    portal.state().reject_submissions = true;
    let client = client(&portal);

    let result = client.messages().send_message(Some("102"), Some("Q"), "body", None);
    match result {
        Err(WilmaError::Parse(reason)) => assert!(reason.contains("häiriö"), "{reason}"),
        other => panic!("{other:?}"),
    }
    let outbox = client.messages().list_messages(Folder::Sent, 20).unwrap();
    assert!(outbox.iter().all(|m| m.subject != "Q"));
}
