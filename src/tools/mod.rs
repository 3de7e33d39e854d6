//! Assistant tool server.
//!
//! Speaks line-delimited JSON-RPC 2.0 on stdin/stdout (the MCP stdio
//! transport): `initialize`, `notifications/initialized`, `tools/list` and
//! `tools/call`. Portal failures come back as tool results flagged
//! `isError`, with the error kind leading the text; malformed requests are
//! JSON-RPC errors.
//!
//! Register it with an assistant as:
//! ```json
//! { "mcpServers": { "wilma": { "command": "wilma", "args": ["serve"] } } }
//! ```

mod catalog;

use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDate};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::WilmaClient;
use crate::dates;
use crate::domain::{Folder, MessageId};
use crate::error::WilmaError;
use crate::format;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }
}

/// Outcome of one tool: text for the assistant, or a portal failure.
type ToolOutcome = std::result::Result<String, WilmaError>;

pub struct ToolServer<'a> {
    client: &'a WilmaClient,
    today: Option<NaiveDate>,
}

impl<'a> ToolServer<'a> {
    pub fn new(client: &'a WilmaClient) -> Self {
        Self { client, today: None }
    }

    /// Resolve relative dates against `today` instead of the local clock.
    pub fn with_today(client: &'a WilmaClient, today: NaiveDate) -> Self {
        Self {
            client,
            today: Some(today),
        }
    }

    /// Serve requests from stdin until it closes.
    pub fn run_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        self.run(stdin.lock(), io::stdout())
    }

    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> io::Result<()> {
        info!("tool server started, waiting for requests");
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("error reading request: {e}");
                    return Err(e);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line) {
                writeln!(writer, "{response}")?;
                writer.flush()?;
            }
        }
        info!("tool server stopped");
        Ok(())
    }

    /// Answer one request line. Notifications get no answer.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                return Some(respond(
                    Value::Null,
                    Err(JsonRpcError {
                        code: PARSE_ERROR,
                        message: format!("Parse error: {e}"),
                    }),
                ));
            }
        };
        let id = raw.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                return Some(respond(
                    id,
                    Err(JsonRpcError {
                        code: INVALID_REQUEST,
                        message: format!("Invalid Request: {e}"),
                    }),
                ));
            }
        };
        debug!("request {}", request.method);
        let result = self.handle_method(&request.method, request.params);
        let id = request.id?;
        Some(respond(id, result))
    }

    fn handle_method(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "wilma",
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            "notifications/initialized" | "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": catalog::tools() })),
            "tools/call" => {
                let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| JsonRpcError::invalid_params("Missing tool name"))?;
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                if !args.is_object() {
                    return Err(JsonRpcError::invalid_params("arguments must be an object"));
                }
                let outcome = self.call_tool(name, &args)?;
                Ok(tool_result(outcome))
            }
            _ => Err(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {method}"),
            }),
        }
    }

    fn call_tool(&self, name: &str, args: &Value) -> Result<ToolOutcome, JsonRpcError> {
        match name {
            "get_schedule" => {
                let date = opt_str(args, "date")?;
                Ok(self.get_schedule(date.as_deref().unwrap_or("today")))
            }
            "get_week_schedule" => {
                let start = opt_str(args, "start_date")?;
                Ok(self.get_week_schedule(start.as_deref().unwrap_or("today")))
            }
            "get_messages" => {
                let folder = opt_str(args, "folder")?;
                let limit = opt_u64(args, "limit")?.map_or(DEFAULT_LIMIT, |l| l as usize);
                Ok(self.get_messages(folder.as_deref().unwrap_or("inbox"), limit))
            }
            "get_message" => {
                let id = req_id(args, "message_id")?;
                Ok(self.client.messages().get_message(id).map(|m| format::message(&m)))
            }
            "mark_message_read" => {
                let id = req_id(args, "message_id")?;
                Ok(self
                    .client
                    .messages()
                    .mark_read(id)
                    .map(|outcome| format::mark_read(id, outcome)))
            }
            "get_recipients" => Ok(self
                .client
                .recipients()
                .list_recipients()
                .map(|list| format::recipients(&list))),
            "send_message" => {
                let recipient = opt_str(args, "recipient_id")?;
                let subject = opt_str(args, "subject")?;
                let body = req_str(args, "body")?;
                let reply_to = opt_id(args, "reply_to_id")?;
                Ok(self
                    .client
                    .messages()
                    .send_message(recipient.as_deref(), subject.as_deref(), &body, reply_to)
                    .map(|c| format::sent(&c)))
            }
            "reply_to_message" => {
                let id = req_id(args, "message_id")?;
                let body = req_str(args, "body")?;
                Ok(self
                    .client
                    .messages()
                    .reply_to_message(id, &body)
                    .map(|c| format::sent(&c)))
            }
            _ => Err(JsonRpcError::invalid_params(format!("Unknown tool: {name}"))),
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn get_schedule(&self, when: &str) -> ToolOutcome {
        let date = dates::resolve(when, self.today())?;
        let day = self.client.schedule().get_schedule(date)?;
        let mut text = format::day_schedule(&day);
        if let Some(diagnostic) = &day.diagnostic {
            text.push_str(&format!("\n\nWarning: the schedule page could not be read ({diagnostic})"));
        }
        Ok(text)
    }

    fn get_week_schedule(&self, when: &str) -> ToolOutcome {
        let start = dates::resolve(when, self.today())?;
        let week = self.client.schedule().get_week_schedule(start)?;
        let mut text = format::week_schedule(&week);
        for diagnostic in &week.diagnostics {
            text.push_str(&format!("\n\nWarning: {diagnostic}"));
        }
        Ok(text)
    }

    fn get_messages(&self, folder: &str, limit: usize) -> ToolOutcome {
        let folder: Folder = folder.parse()?;
        let messages = self.client.messages().list_messages(folder, limit)?;
        Ok(format::message_list(folder, &messages))
    }
}

fn respond(id: Value, result: Result<Value, JsonRpcError>) -> Value {
    let (result, error) = match result {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e)),
    };
    let response = JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result,
        error,
    };
    serde_json::to_value(response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": { "code": -32603, "message": format!("Serialization error: {e}") }
        })
    })
}

fn tool_result(outcome: ToolOutcome) -> Value {
    match outcome {
        Ok(text) => json!({ "content": [{ "type": "text", "text": text }] }),
        Err(e) => {
            info!("tool failed: {e}");
            json!({
                "content": [{ "type": "text", "text": format!("{}: {e}", e.kind()) }],
                "isError": true
            })
        }
    }
}

fn opt_str(args: &Value, key: &str) -> Result<Option<String>, JsonRpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(JsonRpcError::invalid_params(format!("'{key}' must be a string"))),
    }
}

fn req_str(args: &Value, key: &str) -> Result<String, JsonRpcError> {
    opt_str(args, key)?.ok_or_else(|| JsonRpcError::invalid_params(format!("Missing '{key}'")))
}

fn opt_u64(args: &Value, key: &str) -> Result<Option<u64>, JsonRpcError> {
    let ill_typed = || JsonRpcError::invalid_params(format!("'{key}' must be a non-negative integer"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(ill_typed),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| ill_typed()),
        Some(_) => Err(ill_typed()),
    }
}

fn opt_id(args: &Value, key: &str) -> Result<Option<MessageId>, JsonRpcError> {
    opt_u64(args, key)
}

fn req_id(args: &Value, key: &str) -> Result<MessageId, JsonRpcError> {
    opt_id(args, key)?.ok_or_else(|| JsonRpcError::invalid_params(format!("Missing '{key}'")))
}
