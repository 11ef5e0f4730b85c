//! LMS command handlers
//!
//! One function per verb. Field counts are checked by the registry before a
//! handler runs; the `let ... else` guards only restate the shape.

use std::fs;

use crate::error::{LmsError, Result};
use crate::protocol::{write_frame, write_list, Arity, Frame};
use crate::store::NewSubmission;
use crate::transfer::{resolve_stored_file, send_stored_file, TransferHeader, Upload};

use super::context::Services;
use super::registry::{CommandRegistry, Exchange};

/// Week used when an uploaded video names an unparsable week
const FALLBACK_WEEK: i64 = 1;

impl CommandRegistry {
    /// Registry holding every LMS verb
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            // Accounts
            .register("LOGIN", Arity::Exact(2), login)
            .register("STUDENT_LIST", Arity::Exact(1), student_list)
            // Chat
            .register("CHAT_POST", Arity::Exact(3), chat_post)
            .register("CHAT_LIST", Arity::Exact(2), chat_list)
            // Assignments
            .register("ASSIGN_LIST", Arity::Exact(1), assign_list)
            .register("ASSIGN_CREATE", Arity::AtLeast(3), assign_create)
            .register("ASSIGN_UPDATE", Arity::AtLeast(4), assign_update)
            .register("ASSIGN_DELETE", Arity::Exact(2), assign_delete)
            .register("ASSIGN_SUBMIT_FILE", Arity::Exact(4), assign_submit_file)
            .register("ASSIGN_SUBMISSION_LIST", Arity::Exact(2), assign_submission_list)
            .register("ASSIGN_DOWNLOAD_FILE", Arity::Exact(2), assign_download_file)
            // Notices
            .register("NOTICE_LIST", Arity::Exact(1), notice_list)
            .register("NOTICE_CREATE", Arity::Exact(2), notice_create)
            .register("NOTICE_UPDATE", Arity::Exact(3), notice_update)
            .register("NOTICE_DELETE", Arity::Exact(2), notice_delete)
            // Videos
            .register("VIDEO_LIST", Arity::Exact(1), video_list)
            .register("VIDEO_WATCH", Arity::Exact(2), video_watch)
            .register("VIDEO_CREATE", Arity::Exact(3), video_create)
            .register("VIDEO_DELETE", Arity::Exact(2), video_delete)
            .register("VIDEO_PROGRESS_LIST", Arity::Exact(2), video_progress_list)
            .register("VIDEO_UPLOAD_FILE", Arity::Exact(4), video_upload_file);
        registry
    }
}

fn shape_error(fields: &[String]) -> LmsError {
    LmsError::BadRequest(format!("unexpected field count {}", fields.len()))
}

fn ok(exchange: &mut Exchange<'_>) -> Result<()> {
    write_frame(&mut *exchange.writer, &Frame::ok())
}

// =============================================================================
// Accounts
// =============================================================================

fn login(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_id, password] = fields else {
        return Err(shape_error(fields));
    };

    let account = services
        .store
        .authenticate(user_id, password)
        .map_err(|e| LmsError::Internal(format!("login lookup failed: {}", e)))?
        .ok_or(LmsError::InvalidCredentials)?;

    tracing::info!(peer = %exchange.peer, user = %user_id, role = %account.role, "Login");
    write_frame(
        &mut *exchange.writer,
        &Frame::ok_with([account.role.as_str().to_string(), account.display_name]),
    )
}

fn student_list(services: &Services, _fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let rows = services.store.list_students()?;
    write_list(&mut *exchange.writer, "STUDENT", rows, |s| vec![Some(s.id), s.name, s.contact])?;
    Ok(())
}

// =============================================================================
// Chat
// =============================================================================

fn chat_post(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [from, to, message] = fields else {
        return Err(shape_error(fields));
    };

    services.chat.post(from, to, message);
    tracing::debug!(peer = %exchange.peer, from = %from, to = %to, "Chat message posted");
    ok(exchange)
}

fn chat_list(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_a, user_b] = fields else {
        return Err(shape_error(fields));
    };

    let messages = services.chat.conversation(user_a, user_b);
    write_list(&mut *exchange.writer, "MSG", messages, |m| {
        vec![Some(m.from), Some(m.to), Some(m.body)]
    })?;
    Ok(())
}

// =============================================================================
// Assignments
// =============================================================================

fn assign_list(services: &Services, _fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let rows = services.store.list_assignments()?;
    write_list(&mut *exchange.writer, "ASSIGN", rows, |a| {
        vec![Some(a.id.to_string()), Some(a.title), a.due, Some(a.summary)]
    })?;
    Ok(())
}

fn assign_create(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_id, title, summary @ ..] = fields else {
        return Err(shape_error(fields));
    };

    let summary = summary.join("|");
    services.store.create_assignment(user_id, title, &summary)?;
    ok(exchange)
}

fn assign_update(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, task_id, title, summary @ ..] = fields else {
        return Err(shape_error(fields));
    };

    let summary = summary.join("|");
    services.store.update_assignment(task_id, title, &summary)?;
    ok(exchange)
}

fn assign_delete(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, task_id] = fields else {
        return Err(shape_error(fields));
    };

    services.store.delete_assignment(task_id)?;
    ok(exchange)
}

fn assign_submit_file(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let header = TransferHeader::from_fields(fields)?;
    let task_id = header.resource_id.clone();
    let student_id = header.user_id.clone();

    let mut upload = Upload::new(header, &services.submissions_dir, services.limits);
    upload.run(&mut *exchange.reader, &mut *exchange.writer, |stored| {
        services.store.record_submission(NewSubmission {
            task_id,
            student_id,
            file_name: stored.client_name.clone(),
            stored_name: stored.stored_name.clone(),
        })
    })?;
    Ok(())
}

fn assign_submission_list(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, task_id] = fields else {
        return Err(shape_error(fields));
    };

    let rows = services.store.list_submissions(task_id)?;
    write_list(&mut *exchange.writer, "SUBMIT", rows, |s| {
        vec![Some(s.student_id), s.student_name, Some(s.submitted_at), s.file_path]
    })?;
    Ok(())
}

fn assign_download_file(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_id, file_path] = fields else {
        return Err(shape_error(fields));
    };

    let sent = send_stored_file(
        &mut *exchange.writer,
        &services.submissions_dir,
        file_path,
        services.limits.chunk_size,
    )?;
    tracing::info!(peer = %exchange.peer, user = %user_id, file = %file_path, bytes = sent, "Submission downloaded");
    Ok(())
}

// =============================================================================
// Notices
// =============================================================================

fn notice_list(services: &Services, _fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let rows = services.store.list_notices()?;
    write_list(&mut *exchange.writer, "NOTICE", rows, |n| {
        vec![Some(n.id.to_string()), Some(n.title), Some(n.content), Some(n.created_at)]
    })?;
    Ok(())
}

fn notice_create(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_id, content] = fields else {
        return Err(shape_error(fields));
    };

    services.store.create_notice(user_id, content)?;
    ok(exchange)
}

fn notice_update(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, notice_id, content] = fields else {
        return Err(shape_error(fields));
    };

    services.store.update_notice(notice_id, content)?;
    ok(exchange)
}

fn notice_delete(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, notice_id] = fields else {
        return Err(shape_error(fields));
    };

    services.store.delete_notice(notice_id)?;
    ok(exchange)
}

// =============================================================================
// Videos
// =============================================================================

fn video_list(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [user_id] = fields else {
        return Err(shape_error(fields));
    };

    let rows = services.store.list_videos(user_id)?;
    write_list(&mut *exchange.writer, "VIDEO", rows, |v| {
        vec![
            Some(v.id.to_string()),
            Some(v.title),
            Some(v.week_label),
            Some(v.progress.to_string()),
        ]
    })?;
    Ok(())
}

fn video_watch(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [student_id, video_id] = fields else {
        return Err(shape_error(fields));
    };

    services.store.record_watch(student_id, video_id)?;
    ok(exchange)
}

fn video_create(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, week_id, file_name] = fields else {
        return Err(shape_error(fields));
    };

    let week: i64 = week_id
        .trim()
        .parse()
        .map_err(|_| LmsError::BadRequest(format!("invalid week id {:?}", week_id)))?;
    let id = services.store.create_video(week, file_name)?;
    tracing::info!(peer = %exchange.peer, video = id, file = %file_name, "Video registered");
    ok(exchange)
}

fn video_delete(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, video_id] = fields else {
        return Err(shape_error(fields));
    };

    if let Some(file_name) = services.store.delete_video(video_id)? {
        // The record is gone either way; a leftover file is only logged
        if let Some(path) = resolve_stored_file(&services.videos_dir, &file_name) {
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove video file");
                }
            }
        }
    }
    ok(exchange)
}

fn video_progress_list(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let [_user_id, video_id] = fields else {
        return Err(shape_error(fields));
    };

    let rows = services.store.list_progress(video_id)?;
    write_list(&mut *exchange.writer, "PROG", rows, |p| {
        vec![
            Some(p.student_id),
            p.student_name,
            Some(p.percent.to_string()),
            Some(p.status.to_string()),
        ]
    })?;
    Ok(())
}

fn video_upload_file(services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
    let mut header = TransferHeader::from_fields(fields)?;
    let week = header.resource_id.trim().parse::<i64>().unwrap_or(FALLBACK_WEEK);
    header.resource_id = week.to_string();

    let mut upload = Upload::new(header, &services.videos_dir, services.limits);
    upload.run(&mut *exchange.reader, &mut *exchange.writer, |stored| {
        services
            .store
            .create_video(week, &stored.stored_name)
            .map(|_| ())
    })?;
    Ok(())
}
