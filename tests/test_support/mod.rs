// In-memory Wilma portal for driving the client end to end.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use wilma_client::WilmaClient;
use wilma_client::auth::Credentials;
use wilma_client::domain::Folder;
use wilma_client::error::{Result, WilmaError};
use wilma_client::net::{PortalResponse, Transport};

pub const BASE: &str = "https://fake.inschool.fi";
pub const PREFIX: &str = "/!0411876";
pub const USERNAME: &str = "huoltaja@example.com";
pub const PASSWORD: &str = "salasana";

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: u64,
    pub folder: Folder,
    pub subject: String,
    pub sender: String,
    pub recipients: String,
    pub timestamp: Option<String>,
    pub read: bool,
    pub body: String,
}

impl FakeMessage {
    fn new(id: u64, folder: Folder, subject: &str, sender: &str, ts: Option<&str>, read: bool) -> Self {
        Self {
            id,
            folder,
            subject: subject.into(),
            sender: sender.into(),
            recipients: "Huoltaja Hanna".into(),
            timestamp: ts.map(String::from),
            read,
            body: format!("Viestin {id} sisältö."),
        }
    }
}

#[derive(Debug)]
pub struct PortalState {
    pub username: String,
    pub password: String,
    /// Successful logins.
    pub logins: usize,
    pub login_attempts: usize,
    /// Cookie held by the client side.
    pub client_sid: Option<String>,
    /// Session the server still accepts.
    pub server_sid: Option<String>,
    /// Reject every session, even fresh ones.
    pub reject_sessions: bool,
    pub messages: Vec<FakeMessage>,
    /// (id, label as shown in the dropdown)
    pub recipients: Vec<(String, String)>,
    /// Reply forms pre-address the original sender when known.
    pub reply_prefills_recipient: bool,
    /// Schedule page per ISO (year, week); `default_schedule` otherwise.
    pub schedule_pages: HashMap<(i32, u32), String>,
    pub default_schedule: String,
    pub schedule_requests: Vec<NaiveDate>,
    pub posted: Vec<Vec<(String, String)>>,
    /// Answer every submission with an error alert.
    pub reject_submissions: bool,
    /// Every request fails before reaching the server.
    pub fail_transport: bool,
    /// Messages the account may not open.
    pub forbidden: Vec<u64>,
    pub next_id: u64,
}

pub struct FakePortal {
    state: Mutex<PortalState>,
}

impl FakePortal {
    pub fn new() -> Arc<Self> {
        let messages = vec![
            FakeMessage::new(11, Folder::Inbox, "Retkipäivä", "Virtanen Liisa", Some("2026-02-08 11:42"), false),
            FakeMessage::new(12, Folder::Inbox, "Koeviikko", "Rehtori Rae", Some("2026-02-09 08:00"), true),
            FakeMessage::new(9, Folder::Inbox, "Vanha tiedote", "Kanslia", None, true),
            FakeMessage::new(10, Folder::Inbox, "Sama aika", "Mäkinen Pekka", Some("2026-02-08 11:42"), false),
            FakeMessage::new(5, Folder::Archive, "Syysloma", "Kanslia", Some("2025-10-01 09:00"), true),
            FakeMessage::new(4, Folder::Archive, "Joulujuhla", "Rehtori Rae", Some("2025-12-15 10:30"), false),
            FakeMessage::new(7, Folder::Sent, "Kysymys", "Huoltaja Hanna", Some("2026-02-01 18:30"), true),
        ];
        Arc::new(Self {
            state: Mutex::new(PortalState {
                username: USERNAME.into(),
                password: PASSWORD.into(),
                logins: 0,
                login_attempts: 0,
                client_sid: None,
                server_sid: None,
                reject_sessions: false,
                messages,
                recipients: vec![
                    ("101".into(), "Virtanen Liisa (Opettaja)".into()),
                    ("102".into(), "Rehtori Rae (Rehtori)".into()),
                    ("103".into(), "Kanslia (Henkilökunta)".into()),
                ],
                reply_prefills_recipient: false,
                schedule_pages: HashMap::new(),
                default_schedule: schedule_page(&[]),
                schedule_requests: Vec::new(),
                posted: Vec::new(),
                reject_submissions: false,
                fail_transport: false,
                forbidden: Vec::new(),
                next_id: 200,
            }),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    /// The server forgets the session; the client still holds its cookie.
    pub fn expire_session(&self) {
        self.state().server_sid = None;
    }

    pub fn logins(&self) -> usize {
        self.state().logins
    }

    pub fn message(&self, id: u64) -> FakeMessage {
        self.state()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .unwrap()
    }

    fn page(&self, path: &str, status: u16, body: String) -> Result<PortalResponse> {
        Ok(PortalResponse {
            status,
            url: format!("{BASE}{path}"),
            body,
        })
    }

    fn check_link(&self) -> Result<()> {
        if self.state().fail_transport {
            return Err(WilmaError::Network("connection reset by peer".into()));
        }
        Ok(())
    }

    fn login_redirect(&self, path: &str) -> Result<PortalResponse> {
        self.page(&format!("/login?returnpath={path}"), 200, "<form id=\"login\"></form>".into())
    }

    fn authorised(&self) -> bool {
        let st = self.state();
        !st.reject_sessions && st.server_sid.is_some() && st.client_sid == st.server_sid
    }

    fn route_get(&self, path: &str, scoped: &str) -> Result<PortalResponse> {
        let (route, query) = scoped.split_once('?').unwrap_or((scoped, ""));
        match route {
            "/schedule" => {
                let date = query
                    .strip_prefix("date=")
                    .and_then(|d| NaiveDate::parse_from_str(d, "%d.%m.%Y").ok())
                    .ok_or_else(|| WilmaError::Network(format!("bad schedule query {query}")))?;
                let mut st = self.state();
                st.schedule_requests.push(date);
                let week = date.iso_week();
                let html = st
                    .schedule_pages
                    .get(&(week.year(), week.week()))
                    .cloned()
                    .unwrap_or_else(|| st.default_schedule.clone());
                drop(st);
                self.page(path, 200, html)
            }
            "/messages/list/index_json" => self.page(path, 200, self.listing(Folder::Inbox)),
            "/messages/list/outbox/index_json" => self.page(path, 200, self.listing(Folder::Sent)),
            "/messages/list/archive/index_json" => self.page(path, 200, self.listing(Folder::Archive)),
            "/messages/compose" => {
                let body = match query.strip_prefix("answer=").and_then(|id| id.parse().ok()) {
                    Some(id) => self.reply_form(id),
                    None => Some(self.compose_page()),
                };
                match body {
                    Some(body) => self.page(path, 200, body),
                    None => self.page(path, 404, "<html>Ei löydy</html>".into()),
                }
            }
            _ => {
                let id = route.strip_prefix("/messages/").and_then(|id| id.parse::<u64>().ok());
                let Some(id) = id else {
                    return self.page(path, 404, "<html>404</html>".into());
                };
                if self.state().forbidden.contains(&id) {
                    return self.page(path, 403, "<html><title>Pääsy estetty - Wilma</title></html>".into());
                }
                let html = {
                    let mut st = self.state();
                    let found = st.messages.iter_mut().find(|m| m.id == id).map(|msg| {
                        msg.read = true;
                        message_page(msg)
                    });
                    found
                };
                match html {
                    Some(html) => self.page(path, 200, html),
                    None => self.page(path, 404, "<html><title>Virhe - Wilma</title></html>".into()),
                }
            }
        }
    }

    fn listing(&self, folder: Folder) -> String {
        let st = self.state();
        let entries: Vec<Value> = st
            .messages
            .iter()
            .filter(|m| m.folder == folder)
            .map(|m| {
                json!({
                    // ids alternate between numbers and strings like the real endpoint
                    "Id": if m.id % 2 == 0 { json!(m.id) } else { json!(m.id.to_string()) },
                    "Subject": m.subject,
                    "Sender": m.sender,
                    "Recipients": m.recipients,
                    "TimeStamp": m.timestamp,
                    "Status": if m.read { 1 } else { 0 },
                })
            })
            .collect();
        json!({ "Messages": entries }).to_string()
    }

    fn formkey(&self) -> String {
        let st = self.state();
        format!("0411876:{}", st.server_sid.clone().unwrap_or_default())
    }

    fn compose_page(&self) -> String {
        let options: String = self
            .state()
            .recipients
            .iter()
            .map(|(id, label)| format!("<option value=\"{id}\">{label}</option>\n"))
            .collect();
        format!(
            r#"<html><head><title>Uusi viesti - Wilma</title></head><body>
            <form action="{PREFIX}/messages/compose" method="post">
              <input type="hidden" name="formkey" value="{fk}">
              <select name="r_teacher" id="recipients"><option value="0">-- valitse --</option>
              {options}</select>
              <input type="text" name="subject" value="">
              <textarea name="body" rows="10"></textarea>
              <button type="submit">Lähetä</button>
            </form></body></html>"#,
            fk = self.formkey()
        )
    }

    fn reply_form(&self, id: u64) -> Option<String> {
        let fk = self.formkey();
        let st = self.state();
        let original = st.messages.iter().find(|m| m.id == id)?;
        let prefill = if st.reply_prefills_recipient {
            st.recipients
                .iter()
                .find(|(_, label)| label.starts_with(&original.sender))
                .map(|(rid, _)| format!(r#"<input type="hidden" name="r_teacher" value="{rid}">"#))
                .unwrap_or_default()
        } else {
            String::new()
        };
        Some(format!(
            r#"<html><head><title>Vastaa - Wilma</title></head><body>
            <form action="{PREFIX}/messages/compose" method="post">
              <input type="hidden" name="formkey" value="{fk}">
              <input type="hidden" name="answer" value="{id}">
              {prefill}
              <input type="text" name="subject" value="Re: {subject}">
              <textarea name="body"></textarea>
            </form></body></html>"#,
            subject = original.subject
        ))
    }

    fn submit(&self, form: &[(String, String)]) -> Result<PortalResponse> {
        let fk = self.formkey();
        let mut st = self.state();
        st.posted.push(form.to_vec());
        let field = |name: &str| {
            form.iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let rcpt = form
            .iter()
            .find(|(n, _)| n == "rcpt" || n.starts_with("r_"))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        let problem = if st.reject_submissions {
            Some("palvelussa on häiriö")
        } else if field("formkey") != fk {
            Some("lomake on vanhentunut")
        } else if field("body").trim().is_empty() {
            Some("viesti on tyhjä")
        } else if !st.recipients.iter().any(|(id, _)| *id == rcpt) {
            Some("vastaanottaja puuttuu")
        } else {
            None
        };
        if let Some(problem) = problem {
            drop(st);
            return self.page(
                &format!("{PREFIX}/messages/compose"),
                200,
                format!(r#"<div class="alert alert-danger">Virhe: {problem}</div>"#),
            );
        }

        let id = st.next_id;
        st.next_id += 1;
        let to = st
            .recipients
            .iter()
            .find(|(rid, _)| *rid == rcpt)
            .map(|(_, label)| label.clone())
            .unwrap_or_default();
        st.messages.push(FakeMessage {
            id,
            folder: Folder::Sent,
            subject: field("subject"),
            sender: "Huoltaja Hanna".into(),
            recipients: to,
            timestamp: Some("2026-02-11 12:00".into()),
            read: true,
            body: field("body"),
        });
        drop(st);
        self.page(&format!("{PREFIX}/messages/{id}"), 200, "<html>Viesti lähetetty</html>".into())
    }
}

impl Transport for FakePortal {
    fn get(&self, path: &str) -> Result<PortalResponse> {
        self.check_link()?;
        if path == "/index_json" {
            return self.page(path, 200, json!({ "SessionID": "login-token", "LoginResult": "Ok" }).to_string());
        }
        let Some(scoped) = path.strip_prefix(PREFIX) else {
            return self.page(path, 404, String::new());
        };
        if !self.authorised() {
            return self.login_redirect(path);
        }
        self.route_get(path, scoped)
    }

    fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<PortalResponse> {
        self.check_link()?;
        if path == "/login" {
            let mut st = self.state();
            st.login_attempts += 1;
            let value = |name: &str| form.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());
            let ok = value("Login") == Some(st.username.as_str())
                && value("Password") == Some(st.password.as_str())
                && value("SESSIONID") == Some("login-token");
            if !ok {
                drop(st);
                return self.page("/?loginfailed", 200, "<html>Kirjautuminen epäonnistui</html>".into());
            }
            st.logins += 1;
            let sid = format!("sid-{}", st.logins);
            st.client_sid = Some(sid.clone());
            st.server_sid = Some(sid);
            drop(st);
            return self.page(&format!("{PREFIX}/"), 200, "<html>Etusivu</html>".into());
        }
        let Some(scoped) = path.strip_prefix(PREFIX) else {
            return self.page(path, 404, String::new());
        };
        if !self.authorised() {
            return self.login_redirect(path);
        }
        match scoped {
            "/messages/compose" => self.submit(form),
            _ => self.page(path, 404, String::new()),
        }
    }

    fn cookie(&self, name: &str) -> Option<String> {
        (name == "Wilma2SID").then(|| self.state().client_sid.clone()).flatten()
    }
}

pub fn client(portal: &Arc<FakePortal>) -> WilmaClient {
    client_as(portal, USERNAME, PASSWORD)
}

pub fn client_as(portal: &Arc<FakePortal>, username: &str, password: &str) -> WilmaClient {
    WilmaClient::with_transport(portal.clone(), Credentials::new(username, password))
}

pub fn message_page(m: &FakeMessage) -> String {
    let sent = m
        .timestamp
        .as_deref()
        .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M").ok())
        .map(|t| format!("<tr><th>Lähetetty:</th><td>{}</td></tr>", t.format("%-d.%-m.%Y klo %H:%M")))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{subject} - Wilma</title></head><body>
        <div class="panel panel-default"><div class="panel-body">
          <table class="table">
            <tr><th>Lähettäjä:</th><td><a href="{PREFIX}/profiles/1">{sender}</a></td></tr>
            <tr><th>Vastaanottajat:</th><td>{recipients}</td></tr>
            {sent}
          </table>
          <div class="ckeditor"><p>{body}</p></div>
          <a class="btn btn-default" href="{PREFIX}/messages/compose?answer={id}">Vastaa viestin lähettäjälle</a>
        </div></div></body></html>"#,
        subject = m.subject,
        sender = m.sender,
        recipients = m.recipients,
        body = m.body,
        id = m.id,
    )
}

/// One schedule event: (date "DD.MM.YYYY", start minute, end minute, subject, teacher, room).
pub type Event<'a> = (&'a str, i64, i64, &'a str, Option<&'a str>, Option<&'a str>);

pub fn schedule_page(events: &[Event<'_>]) -> String {
    let events: Vec<Value> = events
        .iter()
        .map(|(date, start, end, subject, teacher, room)| {
            let mut ev = json!({
                "Date": date,
                "Start": start,
                "End": end,
                "Text": { "0": subject },
            });
            if let Some(t) = teacher {
                ev["Opet"] = json!({ "0": format!("O: {t}") });
            }
            if let Some(r) = room {
                ev["Luokat"] = json!({ "0": format!("L: {r}") });
            }
            ev
        })
        .collect();
    format!(
        "<html><body><div id=\"schedule\"></div><script>\nvar eventsJSON = {{ DayCount : 5, Events : {} , ActiveTyyppi : \"oppilas\" }};\n</script></body></html>",
        Value::Array(events)
    )
}
