use serde_json::{Value, json};

/// Tool descriptors returned by `tools/list`.
pub(super) fn tools() -> Value {
    json!([
        {
            "name": "get_schedule",
            "description": "Get the school schedule for one day. Accepts 'today', 'tomorrow', weekday names in English or Finnish (next occurrence), '2026-03-15', '15.3.2026' or '15.3.'.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Day to show (default: today)"}
                }
            }
        },
        {
            "name": "get_week_schedule",
            "description": "Get the school schedule for seven days starting at a date.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "start_date": {"type": "string", "description": "First day of the window (default: today)"}
                }
            }
        },
        {
            "name": "get_messages",
            "description": "List messages in a folder, newest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "folder": {"type": "string", "enum": ["inbox", "sent", "archive"], "description": "Folder to list (default: inbox)"},
                    "limit": {"type": "integer", "minimum": 1, "description": "Maximum number of messages (default: 20)"}
                }
            }
        },
        {
            "name": "get_message",
            "description": "Read one message with its full text. Opening a message marks it read.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message_id": {"type": ["integer", "string"], "description": "Message id from get_messages"}
                },
                "required": ["message_id"]
            }
        },
        {
            "name": "mark_message_read",
            "description": "Mark an inbox message as read. Does nothing if it already is.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message_id": {"type": ["integer", "string"], "description": "Message id from get_messages"}
                },
                "required": ["message_id"]
            }
        },
        {
            "name": "get_recipients",
            "description": "List the teachers and staff the user can write to, with their ids.",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "send_message",
            "description": "Send a message. A new message needs recipient_id and subject; a reply needs only reply_to_id and body.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "recipient_id": {"type": "string", "description": "Recipient id from get_recipients"},
                    "subject": {"type": "string", "description": "Subject line"},
                    "body": {"type": "string", "description": "Message text"},
                    "reply_to_id": {"type": ["integer", "string"], "description": "Id of the message being answered"}
                },
                "required": ["body"]
            }
        },
        {
            "name": "reply_to_message",
            "description": "Reply to a message's sender.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message_id": {"type": ["integer", "string"], "description": "Id of the message being answered"},
                    "body": {"type": "string", "description": "Reply text"}
                },
                "required": ["message_id", "body"]
            }
        }
    ])
}
