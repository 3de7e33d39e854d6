//! Plain-text renderings shared by the CLI and the tool server.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{
    DaySchedule, Folder, LessonEntry, MarkReadOutcome, Message, MessageId, Recipient, SentConfirmation,
    WeekSchedule,
};

fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

fn timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}

pub fn lesson(l: &LessonEntry) -> String {
    let mut out = format!(
        "{}-{}: {}",
        l.start_time.format("%H:%M"),
        l.end_time.format("%H:%M"),
        l.subject
    );
    if let Some(room) = &l.room {
        out.push_str(&format!(" (Room: {room})"));
    }
    if let Some(teacher) = &l.teacher {
        out.push_str(&format!(" - {teacher}"));
    }
    if let Some(notes) = &l.notes {
        out.push_str(&format!(" [{notes}]"));
    }
    out
}

pub fn day_schedule(day: &DaySchedule) -> String {
    if day.lessons.is_empty() {
        return format!("No classes scheduled for {}", long_date(day.date));
    }
    let mut lines = vec![format!("Schedule for {}:", long_date(day.date)), String::new()];
    lines.extend(day.lessons.iter().map(|l| format!("  {}", lesson(l))));
    lines.join("\n")
}

pub fn week_schedule(week: &WeekSchedule) -> String {
    let mut lines = vec!["Weekly Schedule".to_string(), "=".repeat(40)];
    for date in week.days.keys() {
        lines.push(String::new());
        lines.push(day_schedule(&week.day(*date)));
    }
    lines.join("\n")
}

pub fn message_list(folder: Folder, messages: &[Message]) -> String {
    if messages.is_empty() {
        return format!("No messages in {folder}.");
    }
    let mut lines = vec![
        format!("Messages in {folder} ({} shown):", messages.len()),
        String::new(),
    ];
    for m in messages {
        let marker = if m.is_read() { " " } else { "*" };
        lines.push(format!("{marker} [{}] {}", m.id, m.subject));
        lines.push(format!("   From: {} | {}", m.sender, timestamp(m.timestamp)));
    }
    lines.join("\n")
}

pub fn message(m: &Message) -> String {
    let mut lines = vec![
        format!("Subject: {}", m.subject),
        format!("From: {}", m.sender),
        format!("Date: {}", timestamp(m.timestamp)),
    ];
    if !m.recipients.is_empty() {
        lines.push(format!("To: {}", m.recipients.join(", ")));
    }
    if !m.attachments.is_empty() {
        lines.push(format!("Attachments: {}", m.attachments.join(", ")));
    }
    lines.extend([String::new(), "---".to_string(), String::new()]);
    lines.push(m.body.clone().unwrap_or_default());
    lines.join("\n")
}

pub fn recipients(list: &[Recipient]) -> String {
    if list.is_empty() {
        return "No recipients found.".to_string();
    }
    let mut lines = vec!["Available Recipients:".to_string(), String::new()];
    for r in list {
        let label = r.role_label.as_deref().unwrap_or(r.role.as_str());
        lines.push(format!("  [{}] {} ({label})", r.id, r.display_name));
    }
    lines.join("\n")
}

pub fn mark_read(id: MessageId, outcome: MarkReadOutcome) -> String {
    match outcome {
        MarkReadOutcome::MarkedRead => format!("Message {id} marked as read."),
        MarkReadOutcome::AlreadyRead => format!("Message {id} was already read."),
    }
}

pub fn sent(c: &SentConfirmation) -> String {
    let mut out = match c.reply_to {
        Some(original) => format!("Reply to message {original} sent"),
        None => "Message sent".to_string(),
    };
    if let Some(r) = &c.recipient {
        out.push_str(&format!(" to recipient {r}"));
    }
    out.push_str(&format!(" with subject \"{}\"", c.subject));
    if let Some(id) = c.message_id {
        out.push_str(&format!(" (id {id})"));
    }
    out.push('.');
    out
}
