//! Store Module
//!
//! The metadata store is an external collaborator: the protocol core only
//! talks to it through [`MetadataStore`]. Rows come back already formatted for
//! display; the list responder only decides field order.
//!
//! ## Implementations
//! - [`MemoryStore`]: in-process tables behind a `RwLock`, seeded from config
//!
//! Chat messages are not metadata; they live in the [`ChatBoard`].

mod memory;
mod chat;

use std::fmt;

use serde::Deserialize;

use crate::error::Result;

pub use memory::MemoryStore;
pub use chat::{ChatBoard, ChatMessage};

// =============================================================================
// Accounts
// =============================================================================

/// Account role, reported on login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "STUDENT")]
    Student,
    #[serde(alias = "TEACHER", alias = "professor")]
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully authenticated account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub role: Role,
    pub display_name: String,
}

// =============================================================================
// Display Rows
// =============================================================================

/// `ASSIGN|id|title|due|summary`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRow {
    pub id: u64,
    pub title: String,
    pub due: Option<String>,
    pub summary: String,
}

/// `SUBMIT|studentId|studentName|submittedAt|filePath`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRow {
    pub student_id: String,
    pub student_name: Option<String>,
    pub submitted_at: String,
    pub file_path: Option<String>,
}

/// `NOTICE|id|title|content|createdAt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRow {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

/// `VIDEO|id|title|weekLabel|progress`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRow {
    pub id: u64,
    pub title: String,
    pub week_label: String,
    pub progress: u8,
}

/// `PROG|studentId|studentName|percent|status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRow {
    pub student_id: String,
    pub student_name: Option<String>,
    pub percent: u8,
    pub status: &'static str,
}

/// `STUDENT|id|name|contact`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub id: String,
    pub name: Option<String>,
    pub contact: Option<String>,
}

/// Metadata for a freshly stored submission file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub task_id: String,
    pub student_id: String,
    pub file_name: String,
    pub stored_name: String,
}

// =============================================================================
// Capability
// =============================================================================

/// Everything the protocol handlers and the video server need from the
/// metadata store.
///
/// Identifiers arrive as the raw protocol text; an implementation decides how
/// to interpret them. Updates and deletes of unknown ids succeed without
/// effect.
pub trait MetadataStore: Send + Sync {
    // Accounts
    fn authenticate(&self, user_id: &str, password: &str) -> Result<Option<Account>>;
    fn list_students(&self) -> Result<Vec<StudentRow>>;

    // Assignments
    fn list_assignments(&self) -> Result<Vec<AssignmentRow>>;
    fn create_assignment(&self, author_id: &str, title: &str, summary: &str) -> Result<u64>;
    fn update_assignment(&self, task_id: &str, title: &str, summary: &str) -> Result<()>;
    fn delete_assignment(&self, task_id: &str) -> Result<()>;
    fn record_submission(&self, submission: NewSubmission) -> Result<()>;
    fn list_submissions(&self, task_id: &str) -> Result<Vec<SubmissionRow>>;

    // Notices
    fn list_notices(&self) -> Result<Vec<NoticeRow>>;
    fn create_notice(&self, author_id: &str, content: &str) -> Result<u64>;
    fn update_notice(&self, notice_id: &str, content: &str) -> Result<()>;
    fn delete_notice(&self, notice_id: &str) -> Result<()>;

    // Videos
    fn list_videos(&self, viewer_id: &str) -> Result<Vec<VideoRow>>;
    fn create_video(&self, week_id: i64, file_name: &str) -> Result<u64>;

    /// Remove a video record, returning its stored file name if it existed
    fn delete_video(&self, video_id: &str) -> Result<Option<String>>;

    /// Stored file name of a video, if the id is known
    fn video_file(&self, video_id: &str) -> Result<Option<String>>;
    fn record_watch(&self, student_id: &str, video_id: &str) -> Result<()>;
    fn list_progress(&self, video_id: &str) -> Result<Vec<ProgressRow>>;
}
