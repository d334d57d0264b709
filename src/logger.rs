use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::diff::diff_json;

/// How dashboard reads are written to the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLogMode {
    /// Every dashboard body in full.
    Full,
    /// First body in full, then only changed paths.
    Diffed,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_dashboard: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_dashboard: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body.map(redact),
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "path": path,
            "status": status,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, command_id: &str, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "command_id": command_id,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_dashboard(&mut self, status: u16, body: &Value, command_id: Option<&str>) {
        let mut entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "dashboard",
            "status": status,
            "command_id": command_id,
        });

        match (self.mode, self.previous_dashboard.as_ref()) {
            (MessageLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, body, "", &mut changes);
                let change_entries: Vec<Value> = changes
                    .iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                entry["changes"] = Value::Array(change_entries);
            }
            (MessageLogMode::Diffed, None) => {
                entry["full"] = Value::Bool(true);
                entry["body"] = body.clone();
            }
            (MessageLogMode::Full, _) => {
                entry["body"] = body.clone();
            }
        }

        self.write_line(&entry);
        if self.mode == MessageLogMode::Diffed {
            self.previous_dashboard = Some(body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

fn redact(body: &Value) -> Value {
    let mut body = body.clone();
    if let Some(obj) = body.as_object_mut()
        && obj.contains_key("password")
    {
        obj.insert("password".to_string(), Value::String("***".to_string()));
    }
    body
}
