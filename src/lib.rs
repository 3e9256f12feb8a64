//! Local account sessions and form-submission statistics.
//!
//! Registration and login are backed by a string-keyed store of JSON values
//! (see [`store`]); form submissions written to the same store by a form
//! tracker are queried and aggregated per user by [`submissions`].

pub mod activity;
pub mod cli;
pub mod config;
pub mod messages;
pub mod records;
pub mod session;
pub mod store;
pub mod submissions;

pub use messages::{Messages, OutcomeKind};
pub use session::{AuthOutcome, SessionManager, SessionUser, User};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use submissions::{RecordKey, Submission, SubmissionAggregator, UserStats};
