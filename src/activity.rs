use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of account and query activity.
///
/// Passwords are never written.
pub struct ActivityLog {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl ActivityLog {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn register(&mut self, email: &str, ok: bool, outcome: &str) -> Result<()> {
        self.log(
            "register",
            serde_json::json!({ "email": email, "ok": ok, "outcome": outcome }),
        )
    }

    pub fn login(&mut self, email: &str, ok: bool, outcome: &str) -> Result<()> {
        self.log(
            "login",
            serde_json::json!({ "email": email, "ok": ok, "outcome": outcome }),
        )
    }

    pub fn logout(&mut self, email: Option<&str>) -> Result<()> {
        self.log("logout", serde_json::json!({ "email": email }))
    }

    /// Log a read-only submissions query and how many records it returned
    pub fn query(&mut self, name: &str, results: usize) -> Result<()> {
        self.log(
            "query",
            serde_json::json!({ "name": name, "results": results }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_events(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_events_are_appended_as_jsonl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("activity.jsonl");

        let mut log = ActivityLog::new(&path, "run-1").unwrap();
        log.register("ana@example.com", true, "registered").unwrap();
        log.login("ana@example.com", false, "bad_credentials").unwrap();
        log.logout(None).unwrap();
        log.query("stats", 3).unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "register");
        assert_eq!(events[0]["run_id"], "run-1");
        assert_eq!(events[0]["email"], "ana@example.com");
        assert!(events[0]["ts"].is_string());
        assert_eq!(events[1]["ok"], false);
        assert_eq!(events[1]["outcome"], "bad_credentials");
        assert!(events[2]["email"].is_null());
        assert_eq!(events[3]["results"], 3);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activity.jsonl");

        ActivityLog::new(&path, "a").unwrap().logout(None).unwrap();
        ActivityLog::new(&path, "b").unwrap().logout(None).unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["run_id"], "b");
    }
}
