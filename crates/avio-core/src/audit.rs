use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::Result;

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// One line in the append-only audit log.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: None,
            username: None,
            country: None,
            content: None,
            delivered: None,
            total: None,
            error: None,
        }
    }

    pub fn registered(user_id: i64, username: &str, country: &str) -> Self {
        Self {
            user_id: Some(user_id),
            username: Some(username.to_string()),
            country: Some(country.to_string()),
            ..Self::base("registered")
        }
    }

    pub fn sent(event: &str, user_id: i64, delivered: bool) -> Self {
        Self {
            user_id: Some(user_id),
            delivered: Some(usize::from(delivered)),
            total: Some(1),
            ..Self::base(event)
        }
    }

    pub fn series_started(user_id: i64, count: u32) -> Self {
        Self {
            user_id: Some(user_id),
            total: Some(count as usize),
            ..Self::base("series_started")
        }
    }

    pub fn broadcast(country: &str, text: &str, delivered: usize, total: usize) -> Self {
        Self {
            country: Some(country.to_string()),
            content: Some(text.to_string()),
            delivered: Some(delivered),
            total: Some(total),
            ..Self::base("broadcast")
        }
    }
}

/// Append-only JSONL audit trail of operator-facing operations.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(&event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Audit failures must never break the operation being audited.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!("audit write failed: {e}");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_event() {
        let path = std::env::temp_dir().join(format!("avio-audit-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let log = AuditLogger::new(&path);
        log.write(AuditEvent::broadcast("Testland", "hello", 3, 5))
            .unwrap();
        log.write(AuditEvent::sent("total_sent", 42, true)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "broadcast");
        assert_eq!(first["delivered"], 3);
        assert_eq!(first["total"], 5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncates_long_content() {
        let long = "x".repeat(2000);
        let out = truncate_text(&long, AUDIT_MAX_TEXT);
        assert_eq!(out.len(), AUDIT_MAX_TEXT + 3);
    }
}
