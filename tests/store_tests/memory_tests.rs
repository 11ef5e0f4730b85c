//! Tests for the in-memory metadata store
//!
//! These tests verify:
//! - Login precedence and display names
//! - Listing formats (titles, dates, summaries, progress)
//! - Update/delete of unknown ids are no-ops
//! - Watch upserts and progress rows

use lms::config::UserSeed;
use lms::store::{ChatBoard, MemoryStore, MetadataStore, NewSubmission, Role};
use lms::LmsError;

// =============================================================================
// Helper Functions
// =============================================================================

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_student("stu1", "1234", "김민상", Some("010-0000-0000"));
    store.add_student("stu2", "abcd", "", None);
    store.add_professor("prof", "1234", "박교수");
    store
}

fn submission(task: &str, student: &str, stored: &str) -> NewSubmission {
    NewSubmission {
        task_id: task.to_string(),
        student_id: student.to_string(),
        file_name: "hw.zip".to_string(),
        stored_name: stored.to_string(),
    }
}

// =============================================================================
// Account Tests
// =============================================================================

#[test]
fn test_login_student() {
    let store = seeded();
    let account = store.authenticate("stu1", "1234").unwrap().unwrap();
    assert_eq!(account.role, Role::Student);
    assert_eq!(account.display_name, "김민상");
}

#[test]
fn test_login_professor() {
    let store = seeded();
    let account = store.authenticate("prof", "1234").unwrap().unwrap();
    assert_eq!(account.role, Role::Teacher);
    assert_eq!(account.role.as_str(), "TEACHER");
}

#[test]
fn test_login_wrong_password() {
    let store = seeded();
    assert!(store.authenticate("stu1", "nope").unwrap().is_none());
    assert!(store.authenticate("ghost", "1234").unwrap().is_none());
}

#[test]
fn test_login_student_checked_before_professor() {
    let store = MemoryStore::new();
    store.add_student("same", "pw", "Student Name", None);
    store.add_professor("same", "pw", "Professor Name");
    let account = store.authenticate("same", "pw").unwrap().unwrap();
    assert_eq!(account.role, Role::Student);
}

#[test]
fn test_empty_name_falls_back_to_id() {
    let store = seeded();
    let account = store.authenticate("stu2", "abcd").unwrap().unwrap();
    assert_eq!(account.display_name, "stu2");
}

#[test]
fn test_from_seeds() {
    let seeds = vec![
        UserSeed {
            id: "student".to_string(),
            password: "1234".to_string(),
            role: Role::Student,
            name: "김민상".to_string(),
            contact: None,
        },
        UserSeed {
            id: "teacher".to_string(),
            password: "1234".to_string(),
            role: Role::Teacher,
            name: "박교수".to_string(),
            contact: None,
        },
    ];
    let store = MemoryStore::from_seeds(&seeds);
    assert_eq!(store.authenticate("teacher", "1234").unwrap().unwrap().role, Role::Teacher);
    assert_eq!(store.list_students().unwrap().len(), 1);
}

#[test]
fn test_list_students() {
    let store = seeded();
    let rows = store.list_students().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "stu1");
    assert_eq!(rows[0].name.as_deref(), Some("김민상"));
    assert_eq!(rows[0].contact.as_deref(), Some("010-0000-0000"));
    assert_eq!(rows[1].name, None);
}

// =============================================================================
// Assignment Tests
// =============================================================================

#[test]
fn test_assignment_listing_format() {
    let store = seeded();
    let long = format!("{}\nsecond line", "x".repeat(80));
    let id = store.create_assignment("prof", "Report", &long).unwrap();

    let rows = store.list_assignments().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].title, "[1주차] Report");
    assert_eq!(rows[0].summary, "x".repeat(50));

    let due = rows[0].due.as_deref().unwrap();
    assert_eq!(due.len(), "YYYY-MM-DD HH:MM".len());
    assert!(due.ends_with("00:00"));
}

#[test]
fn test_update_and_delete_assignment() {
    let store = seeded();
    let id = store.create_assignment("prof", "Old", "old").unwrap();

    store.update_assignment(&id.to_string(), "New", "new body").unwrap();
    let rows = store.list_assignments().unwrap();
    assert_eq!(rows[0].title, "[1주차] New");
    assert_eq!(rows[0].summary, "new body");

    store.delete_assignment(&id.to_string()).unwrap();
    assert!(store.list_assignments().unwrap().is_empty());
}

#[test]
fn test_unknown_ids_are_noops() {
    let store = seeded();
    store.update_assignment("999", "t", "s").unwrap();
    store.delete_assignment("999").unwrap();
    store.update_notice("999", "c").unwrap();
    store.delete_notice("999").unwrap();
    assert_eq!(store.delete_video("999").unwrap(), None);
}

#[test]
fn test_non_numeric_id_is_store_error() {
    let store = seeded();
    let err = store.delete_assignment("abc").unwrap_err();
    assert!(matches!(err, LmsError::Store(_)));
    assert_eq!(err.code().as_str(), "DB_ERROR");
}

// =============================================================================
// Submission Tests
// =============================================================================

#[test]
fn test_submissions_newest_first() {
    let store = seeded();
    store.record_submission(submission("7", "stu1", "first.zip")).unwrap();
    store.record_submission(submission("7", "stu2", "second.zip")).unwrap();
    store.record_submission(submission("8", "stu1", "other.zip")).unwrap();

    let rows = store.list_submissions("7").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].file_path.as_deref(), Some("second.zip"));
    assert_eq!(rows[1].file_path.as_deref(), Some("first.zip"));
    assert_eq!(rows[1].student_name.as_deref(), Some("김민상"));
    assert_eq!(rows[0].submitted_at.len(), "YYYY-MM-DD HH:MM:SS".len());
    assert_eq!(store.submission_count(), 3);
}

// =============================================================================
// Notice Tests
// =============================================================================

#[test]
fn test_notice_titles() {
    let store = seeded();
    let short = store.create_notice("prof", "휴강 안내").unwrap();
    let long = store
        .create_notice("prof", "This notice has a rather long first line\nand more")
        .unwrap();
    let empty = store.create_notice("prof", "").unwrap();

    let rows = store.list_notices().unwrap();
    let title = |id| rows.iter().find(|n| n.id == id).unwrap().title.clone();

    assert_eq!(title(short), "휴강 안내");
    assert_eq!(title(long), "This notice has a ra...");
    assert_eq!(title(empty), format!("공지 {}", empty));
}

#[test]
fn test_notices_newest_first() {
    let store = seeded();
    let first = store.create_notice("prof", "one").unwrap();
    let second = store.create_notice("prof", "two").unwrap();

    let rows = store.list_notices().unwrap();
    assert_eq!(rows[0].id, second);
    assert_eq!(rows[1].id, first);
    assert_eq!(rows[0].created_at.len(), "YYYY-MM-DD".len());
}

#[test]
fn test_update_notice() {
    let store = seeded();
    let id = store.create_notice("prof", "before").unwrap();
    store.update_notice(&id.to_string(), "after").unwrap();
    assert_eq!(store.list_notices().unwrap()[0].content, "after");
}

// =============================================================================
// Video Tests
// =============================================================================

#[test]
fn test_video_listing_and_watch() {
    let store = seeded();
    let id = store.create_video(3, "3_prof_x_lecture.mp4").unwrap();

    let rows = store.list_videos("stu1").unwrap();
    assert_eq!(rows[0].title, "[3주차] 강의 영상");
    assert_eq!(rows[0].week_label, "3주차");
    assert_eq!(rows[0].progress, 0);

    store.record_watch("stu1", &id.to_string()).unwrap();
    // Watching again is an upsert, not a duplicate
    store.record_watch("stu1", &id.to_string()).unwrap();

    assert_eq!(store.list_videos("stu1").unwrap()[0].progress, 100);
    assert_eq!(store.list_videos("stu2").unwrap()[0].progress, 0);
}

#[test]
fn test_unassigned_week_label() {
    let store = seeded();
    store.create_video(0, "x.mp4").unwrap();
    assert_eq!(store.list_videos("stu1").unwrap()[0].week_label, "주차 미지정");
}

#[test]
fn test_watch_unknown_video_fails() {
    let store = seeded();
    assert!(matches!(store.record_watch("stu1", "42"), Err(LmsError::Store(_))));
}

#[test]
fn test_progress_rows() {
    let store = seeded();
    let id = store.create_video(1, "v.mp4").unwrap().to_string();
    store.record_watch("stu2", &id).unwrap();

    let rows = store.list_progress(&id).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].student_id.as_str(), rows[0].percent, rows[0].status), ("stu1", 0, "NOT_YET"));
    assert_eq!((rows[1].student_id.as_str(), rows[1].percent, rows[1].status), ("stu2", 100, "DONE"));
}

#[test]
fn test_delete_video_returns_file() {
    let store = seeded();
    let id = store.create_video(1, "v.mp4").unwrap().to_string();

    assert_eq!(store.video_file(&id).unwrap().as_deref(), Some("v.mp4"));
    assert_eq!(store.delete_video(&id).unwrap().as_deref(), Some("v.mp4"));
    assert_eq!(store.video_file(&id).unwrap(), None);
    assert_eq!(store.video_count(), 0);
}

// =============================================================================
// Chat Board Tests
// =============================================================================

#[test]
fn test_chat_conversation_both_directions() {
    let board = ChatBoard::new();
    board.post("stu1", "prof", "질문 있습니다");
    board.post("stu2", "prof", "unrelated");
    board.post("prof", "stu1", "네");

    let messages = board.conversation("stu1", "prof");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "질문 있습니다");
    assert_eq!(messages[1].from, "prof");
    assert_eq!(board.len(), 3);
}

#[test]
fn test_chat_concurrent_posts() {
    use std::sync::Arc;
    use std::thread;

    let board = Arc::new(ChatBoard::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                for i in 0..100 {
                    board.post(&format!("u{}", t), "hub", &i.to_string());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(board.len(), 800);
    let from_u3: Vec<String> = board.conversation("u3", "hub").into_iter().map(|m| m.body).collect();
    let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(from_u3, expected);
}
