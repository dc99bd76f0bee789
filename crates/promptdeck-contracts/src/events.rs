use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

pub type EventPayload = Map<String, Value>;

/// Lifecycle events recorded for every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    ActionStarted,
    ActionCompleted,
    ActionFailed,
    SessionFinished,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::ActionStarted => "action_started",
            Self::ActionCompleted => "action_completed",
            Self::ActionFailed => "action_failed",
            Self::SessionFinished => "session_finished",
        }
    }
}

/// Session action log in JSON Lines form.
///
/// Lines start with `type`, `session_id` and `ts`; payload keys follow and
/// replace those on collision. The file is opened on the first record and
/// kept open for the rest of the session.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    session_id: String,
    sink: Option<LineWriter<File>>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
            sink: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&mut self, kind: EventKind, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = EventPayload::new();
        event.insert("type".to_string(), json!(kind));
        event.insert("session_id".to_string(), json!(self.session_id));
        event.insert(
            "ts".to_string(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        event.extend(payload);

        let line = serde_json::to_string(&event)?;
        let path = self.path.display().to_string();
        writeln!(self.sink()?, "{line}")
            .with_context(|| format!("failed to append to event log {path}"))?;
        Ok(Value::Object(event))
    }

    fn sink(&mut self) -> anyhow::Result<&mut LineWriter<File>> {
        if self.sink.is_none() {
            if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .with_context(|| format!("failed to open event log {}", self.path.display()))?;
            self.sink = Some(LineWriter::new(file));
        }
        self.sink
            .as_mut()
            .context("event log sink missing after open")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::json;

    use super::*;

    #[test]
    fn record_writes_one_compact_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let mut log = EventLog::new(&path, "session-1");

        let mut payload = EventPayload::new();
        payload.insert("action".to_string(), json!("ask"));
        let recorded = log.record(EventKind::ActionStarted, payload)?;

        let content = fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 1);
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap_or(""))?;

        assert_eq!(parsed, recorded);
        assert_eq!(parsed["type"], json!("action_started"));
        assert_eq!(parsed["session_id"], json!("session-1"));
        assert_eq!(parsed["action"], json!("ask"));
        DateTime::parse_from_rfc3339(parsed["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn payload_overrides_default_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut log = EventLog::new(temp.path().join("events.jsonl"), "session-1");

        let mut payload = EventPayload::new();
        payload.insert("session_id".to_string(), json!("replayed"));
        let recorded = log.record(EventKind::SessionStarted, payload)?;

        assert_eq!(recorded["type"], json!("session_started"));
        assert_eq!(recorded["session_id"], json!("replayed"));
        Ok(())
    }

    #[test]
    fn existing_log_is_appended_not_truncated() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        fs::write(&path, "{\"type\":\"earlier\"}\n")?;

        let mut log = EventLog::new(&path, "session-2");
        log.record(EventKind::ActionStarted, EventPayload::new())?;
        log.record(EventKind::ActionFailed, EventPayload::new())?;
        log.record(EventKind::SessionFinished, EventPayload::new())?;

        let kinds = fs::read_to_string(&path)?
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).map(|value| value["type"].clone()))
            .collect::<Result<Vec<Value>, _>>()?;
        assert_eq!(
            kinds,
            vec![
                json!("earlier"),
                json!("action_started"),
                json!("action_failed"),
                json!("session_finished")
            ]
        );
        Ok(())
    }

    #[test]
    fn kind_serializes_like_its_name() {
        for kind in [
            EventKind::SessionStarted,
            EventKind::ActionCompleted,
            EventKind::SessionFinished,
        ] {
            assert_eq!(json!(kind), json!(kind.as_str()));
        }
    }

    #[test]
    fn unwritable_path_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("file");
        fs::write(&blocker, "")?;
        let mut log = EventLog::new(blocker.join("events.jsonl"), "session-3");
        assert!(log.record(EventKind::SessionStarted, EventPayload::new()).is_err());
        Ok(())
    }
}
