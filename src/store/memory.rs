//! In-memory metadata store
//!
//! BTreeMap tables behind a single RwLock. Stands in for the relational store
//! so the server runs without external services.

use std::collections::{BTreeMap, HashMap};

use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::RwLock;

use crate::config::UserSeed;
use crate::error::{LmsError, Result};

use super::{
    Account, AssignmentRow, MetadataStore, NewSubmission, NoticeRow, ProgressRow, Role,
    StudentRow, SubmissionRow, VideoRow,
};

/// Week every new assignment is filed under
const DEFAULT_WEEK: i64 = 1;

/// Characters of content kept in an assignment summary
const SUMMARY_CHARS: usize = 50;

/// Characters of content kept in a notice title
const NOTICE_TITLE_CHARS: usize = 20;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone)]
struct StudentRecord {
    password: String,
    name: String,
    contact: Option<String>,
}

#[derive(Debug, Clone)]
struct ProfessorRecord {
    password: String,
    name: String,
}

#[derive(Debug, Clone)]
struct TaskRecord {
    week_id: i64,
    due: NaiveDateTime,
    title: String,
    content: String,
}

#[derive(Debug, Clone)]
struct SubmissionRecord {
    seq: u64,
    task_id: u64,
    student_id: String,
    submitted_at: NaiveDateTime,
    stored_name: String,
}

#[derive(Debug, Clone)]
struct NoticeRecord {
    date: NaiveDate,
    content: String,
}

#[derive(Debug, Clone)]
struct VideoRecord {
    week_id: i64,
    file_name: String,
}

#[derive(Debug, Clone)]
struct WatchRecord {
    attended: bool,
}

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<String, StudentRecord>,
    professors: BTreeMap<String, ProfessorRecord>,
    tasks: BTreeMap<u64, TaskRecord>,
    submissions: Vec<SubmissionRecord>,
    notices: BTreeMap<u64, NoticeRecord>,
    videos: BTreeMap<u64, VideoRecord>,
    watches: HashMap<(u64, String), WatchRecord>,
    next_task_id: u64,
    next_notice_id: u64,
    next_video_id: u64,
    next_submission_seq: u64,
}

impl Tables {
    fn allocate(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

// =============================================================================
// Store
// =============================================================================

/// Metadata store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given accounts
    pub fn from_seeds(seeds: &[UserSeed]) -> Self {
        let store = Self::new();
        for seed in seeds {
            match seed.role {
                Role::Student => store.add_student(
                    &seed.id,
                    &seed.password,
                    &seed.name,
                    seed.contact.as_deref(),
                ),
                Role::Teacher => store.add_professor(&seed.id, &seed.password, &seed.name),
            }
        }
        store
    }

    /// Insert or replace a student account
    pub fn add_student(&self, id: &str, password: &str, name: &str, contact: Option<&str>) {
        self.tables.write().students.insert(
            id.to_string(),
            StudentRecord {
                password: password.to_string(),
                name: name.to_string(),
                contact: contact.map(str::to_string),
            },
        );
    }

    /// Insert or replace a professor account
    pub fn add_professor(&self, id: &str, password: &str, name: &str) {
        self.tables.write().professors.insert(
            id.to_string(),
            ProfessorRecord {
                password: password.to_string(),
                name: name.to_string(),
            },
        );
    }

    /// Number of recorded submissions
    pub fn submission_count(&self) -> usize {
        self.tables.read().submissions.len()
    }

    /// Number of video records
    pub fn video_count(&self) -> usize {
        self.tables.read().videos.len()
    }
}

impl MetadataStore for MemoryStore {
    fn authenticate(&self, user_id: &str, password: &str) -> Result<Option<Account>> {
        let tables = self.tables.read();

        // Students first, then professors
        if let Some(student) = tables.students.get(user_id) {
            if student.password == password {
                return Ok(Some(account(user_id, Role::Student, &student.name)));
            }
        }
        if let Some(professor) = tables.professors.get(user_id) {
            if professor.password == password {
                return Ok(Some(account(user_id, Role::Teacher, &professor.name)));
            }
        }

        Ok(None)
    }

    fn list_students(&self) -> Result<Vec<StudentRow>> {
        let tables = self.tables.read();
        Ok(tables
            .students
            .iter()
            .map(|(id, s)| StudentRow {
                id: id.clone(),
                name: non_empty(&s.name),
                contact: s.contact.clone(),
            })
            .collect())
    }

    fn list_assignments(&self) -> Result<Vec<AssignmentRow>> {
        let tables = self.tables.read();
        Ok(tables
            .tasks
            .iter()
            .map(|(&id, task)| {
                let week = week_label(task.week_id);
                let title = if task.title.is_empty() {
                    week.clone()
                } else {
                    format!("[{}] {}", week, task.title)
                };
                AssignmentRow {
                    id,
                    title,
                    due: Some(task.due.format("%Y-%m-%d %H:%M").to_string()),
                    summary: first_line(&task.content).chars().take(SUMMARY_CHARS).collect(),
                }
            })
            .collect())
    }

    fn create_assignment(&self, author_id: &str, title: &str, summary: &str) -> Result<u64> {
        let today = Local::now().date_naive();
        let mut tables = self.tables.write();
        let id = Tables::allocate(&mut tables.next_task_id);
        tables.tasks.insert(
            id,
            TaskRecord {
                week_id: DEFAULT_WEEK,
                due: today.and_time(chrono::NaiveTime::MIN),
                title: title.to_string(),
                content: summary.to_string(),
            },
        );
        tracing::debug!(task = id, author = author_id, "Assignment created");
        Ok(id)
    }

    fn update_assignment(&self, task_id: &str, title: &str, summary: &str) -> Result<()> {
        let id = parse_id(task_id)?;
        if let Some(task) = self.tables.write().tasks.get_mut(&id) {
            task.title = title.to_string();
            task.content = summary.to_string();
        }
        Ok(())
    }

    fn delete_assignment(&self, task_id: &str) -> Result<()> {
        let id = parse_id(task_id)?;
        self.tables.write().tasks.remove(&id);
        Ok(())
    }

    fn record_submission(&self, submission: NewSubmission) -> Result<()> {
        let task_id = parse_id(&submission.task_id)?;
        let mut tables = self.tables.write();
        let seq = Tables::allocate(&mut tables.next_submission_seq);
        tables.submissions.push(SubmissionRecord {
            seq,
            task_id,
            student_id: submission.student_id,
            submitted_at: Local::now().naive_local(),
            stored_name: submission.stored_name,
        });
        Ok(())
    }

    fn list_submissions(&self, task_id: &str) -> Result<Vec<SubmissionRow>> {
        let id = parse_id(task_id)?;
        let tables = self.tables.read();

        let mut matching: Vec<&SubmissionRecord> =
            tables.submissions.iter().filter(|s| s.task_id == id).collect();
        matching.sort_by(|a, b| (b.submitted_at, b.seq).cmp(&(a.submitted_at, a.seq)));

        Ok(matching
            .into_iter()
            .map(|s| SubmissionRow {
                student_id: s.student_id.clone(),
                student_name: tables.students.get(&s.student_id).and_then(|st| non_empty(&st.name)),
                submitted_at: s.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                file_path: non_empty(&s.stored_name),
            })
            .collect())
    }

    fn list_notices(&self) -> Result<Vec<NoticeRow>> {
        let tables = self.tables.read();

        let mut notices: Vec<(&u64, &NoticeRecord)> = tables.notices.iter().collect();
        notices.sort_by(|(a_id, a), (b_id, b)| (b.date, *b_id).cmp(&(a.date, *a_id)));

        Ok(notices
            .into_iter()
            .map(|(&id, notice)| NoticeRow {
                id,
                title: notice_title(id, &notice.content),
                content: notice.content.clone(),
                created_at: notice.date.format("%Y-%m-%d").to_string(),
            })
            .collect())
    }

    fn create_notice(&self, author_id: &str, content: &str) -> Result<u64> {
        let mut tables = self.tables.write();
        let id = Tables::allocate(&mut tables.next_notice_id);
        tables.notices.insert(
            id,
            NoticeRecord {
                date: Local::now().date_naive(),
                content: content.to_string(),
            },
        );
        tracing::debug!(notice = id, author = author_id, "Notice created");
        Ok(id)
    }

    fn update_notice(&self, notice_id: &str, content: &str) -> Result<()> {
        let id = parse_id(notice_id)?;
        if let Some(notice) = self.tables.write().notices.get_mut(&id) {
            notice.content = content.to_string();
        }
        Ok(())
    }

    fn delete_notice(&self, notice_id: &str) -> Result<()> {
        let id = parse_id(notice_id)?;
        self.tables.write().notices.remove(&id);
        Ok(())
    }

    fn list_videos(&self, viewer_id: &str) -> Result<Vec<VideoRow>> {
        let tables = self.tables.read();
        Ok(tables
            .videos
            .iter()
            .map(|(&id, video)| {
                let week = week_label(video.week_id);
                let watched = tables
                    .watches
                    .get(&(id, viewer_id.to_string()))
                    .is_some_and(|w| w.attended);
                VideoRow {
                    id,
                    title: format!("[{}] 강의 영상", week),
                    week_label: week,
                    progress: if watched { 100 } else { 0 },
                }
            })
            .collect())
    }

    fn create_video(&self, week_id: i64, file_name: &str) -> Result<u64> {
        let mut tables = self.tables.write();
        let id = Tables::allocate(&mut tables.next_video_id);
        tables.videos.insert(
            id,
            VideoRecord {
                week_id,
                file_name: file_name.to_string(),
            },
        );
        Ok(id)
    }

    fn delete_video(&self, video_id: &str) -> Result<Option<String>> {
        let id = parse_id(video_id)?;
        let mut tables = self.tables.write();
        let removed = tables.videos.remove(&id).map(|v| v.file_name);
        tables.watches.retain(|(vid, _), _| *vid != id);
        Ok(removed)
    }

    fn video_file(&self, video_id: &str) -> Result<Option<String>> {
        let id = parse_id(video_id)?;
        Ok(self.tables.read().videos.get(&id).map(|v| v.file_name.clone()))
    }

    fn record_watch(&self, student_id: &str, video_id: &str) -> Result<()> {
        let id = parse_id(video_id)?;
        let mut tables = self.tables.write();
        if !tables.videos.contains_key(&id) {
            return Err(LmsError::Store(format!("no video with id {}", id)));
        }
        tables
            .watches
            .entry((id, student_id.to_string()))
            .and_modify(|w| w.attended = true)
            .or_insert(WatchRecord { attended: true });
        Ok(())
    }

    fn list_progress(&self, video_id: &str) -> Result<Vec<ProgressRow>> {
        let id = parse_id(video_id)?;
        let tables = self.tables.read();
        Ok(tables
            .students
            .iter()
            .map(|(sid, student)| {
                let watched = tables
                    .watches
                    .get(&(id, sid.clone()))
                    .is_some_and(|w| w.attended);
                ProgressRow {
                    student_id: sid.clone(),
                    student_name: non_empty(&student.name),
                    percent: if watched { 100 } else { 0 },
                    status: if watched { "DONE" } else { "NOT_YET" },
                }
            })
            .collect())
    }
}

// =============================================================================
// Formatting Helpers
// =============================================================================

fn account(user_id: &str, role: Role, name: &str) -> Account {
    Account {
        user_id: user_id.to_string(),
        role,
        display_name: if name.is_empty() { user_id.to_string() } else { name.to_string() },
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| LmsError::Store(format!("invalid id {:?}", raw)))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn week_label(week_id: i64) -> String {
    if week_id > 0 {
        format!("{}주차", week_id)
    } else {
        "주차 미지정".to_string()
    }
}

fn first_line(content: &str) -> &str {
    content.trim().lines().next().unwrap_or_default()
}

fn notice_title(id: u64, content: &str) -> String {
    let line = first_line(content);
    if line.is_empty() {
        return format!("공지 {}", id);
    }

    let mut title: String = line.chars().take(NOTICE_TITLE_CHARS).collect();
    if line.chars().count() > NOTICE_TITLE_CHARS {
        title.push_str("...");
    }
    title
}
