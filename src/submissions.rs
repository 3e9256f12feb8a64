//! Read-only queries and per-user aggregation over form submissions.
//!
//! Submissions are written under the `formSubmissions` key by the form
//! tracker; nothing here mutates them. A missing or unparseable collection
//! reads as empty.

use crate::records;
use crate::store::{KeyValueStore, SUBMISSIONS_KEY};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A `sessionId` or `userId` as the tracker wrote it: text or a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Number(i64),
    Text(String),
}

impl RecordKey {
    /// Compare against a key typed as text; numbers match their decimal form
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Text(text) => text == key,
            Self::Number(n) => key.parse::<i64>().ok() == Some(*n),
        }
    }
}

impl Default for RecordKey {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One tracked form session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_id: RecordKey,
    #[serde(default)]
    pub user_id: Option<RecordKey>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    /// Time spent in the form, in whatever unit the tracker records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    /// Fields written by the tracker that this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Submission {
    /// Entry count: the recorded total when present (even if zero),
    /// otherwise the length of `entries`
    pub fn entry_count(&self) -> u64 {
        self.total_entries
            .unwrap_or_else(|| self.entries.len() as u64)
    }

    pub fn error_count(&self) -> u64 {
        self.errors.unwrap_or(0)
    }

    pub fn time_spent(&self) -> f64 {
        self.total_time.unwrap_or(0.0)
    }
}

/// Totals for one user name, recomputed on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_name: String,
    pub total_sessions: u64,
    pub total_entries: u64,
    pub total_errors: u64,
    pub total_time: f64,
    /// Raw submissions in encounter order
    pub sessions: Vec<Submission>,
}

impl UserStats {
    pub fn new(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            total_sessions: 0,
            total_entries: 0,
            total_errors: 0,
            total_time: 0.0,
            sessions: Vec::new(),
        }
    }

    pub fn add(&mut self, submission: Submission) {
        self.total_sessions = self.total_sessions.saturating_add(1);
        self.total_entries = self.total_entries.saturating_add(submission.entry_count());
        self.total_errors = self.total_errors.saturating_add(submission.error_count());
        self.total_time += submission.time_spent();
        self.sessions.push(submission);
    }
}

/// Query surface over the stored submissions
pub struct SubmissionAggregator<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> SubmissionAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every stored submission that decodes; records of another shape are
    /// skipped without hiding the rest
    pub fn all(&self) -> Vec<Submission> {
        records::load_list(self.store, SUBMISSIONS_KEY)
    }

    pub fn by_user(&self, user_id: i64) -> Vec<Submission> {
        self.all()
            .into_iter()
            .filter(|s| s.user_id == Some(RecordKey::Number(user_id)))
            .collect()
    }

    pub fn by_user_name(&self, user_name: &str) -> Vec<Submission> {
        self.all()
            .into_iter()
            .filter(|s| s.user_name == user_name)
            .collect()
    }

    pub fn by_id(&self, session_id: &str) -> Option<Submission> {
        self.all()
            .into_iter()
            .find(|s| s.session_id.matches(session_id))
    }

    /// Submissions keyed by user name, in first-seen order
    pub fn grouped_by_user_name(&self) -> IndexMap<String, Vec<Submission>> {
        let mut grouped: IndexMap<String, Vec<Submission>> = IndexMap::new();
        for submission in self.all() {
            grouped
                .entry(submission.user_name.clone())
                .or_default()
                .push(submission);
        }
        grouped
    }

    /// One [`UserStats`] per user name, in order of first appearance
    pub fn all_user_stats(&self) -> Vec<UserStats> {
        let mut stats: IndexMap<String, UserStats> = IndexMap::new();
        for submission in self.all() {
            stats
                .entry(submission.user_name.clone())
                .or_insert_with_key(|name| UserStats::new(name))
                .add(submission);
        }
        stats.into_values().collect()
    }

    pub fn user_stats(&self, user_name: &str) -> Option<UserStats> {
        let sessions = self.by_user_name(user_name);
        if sessions.is_empty() {
            return None;
        }

        let mut stats = UserStats::new(user_name);
        for submission in sessions {
            stats.add(submission);
        }
        Some(stats)
    }
}
