// Database CRUD operations
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::db::{DbConnection, DbResult};
use super::models::{LetterProgress, PracticeAttempt};
use crate::pipeline::{Resolution, ValidationResult};
use crate::trace::Trace;

// ==================== ROW HELPERS ====================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn letter_column(row: &Row, idx: usize) -> rusqlite::Result<char> {
    let raw: String = row.get(idx)?;
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(conversion_error(idx, format!("not a single character: {:?}", raw))),
    }
}

// Fixed-width timestamps keep text ordering chronological
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn attempt_from_row(row: &Row) -> rusqlite::Result<PracticeAttempt> {
    Ok(PracticeAttempt {
        id: uuid_column(row, 0)?,
        created_at: timestamp_column(row, 1)?,
        letter: letter_column(row, 2)?,
        accepted: row.get(3)?,
        resolution: Resolution::from_string(&row.get::<_, String>(4)?),
        feedback: row.get(5)?,
        point_count: row.get(6)?,
        stroke_count: row.get(7)?,
    })
}

fn progress_from_row(row: &Row) -> rusqlite::Result<LetterProgress> {
    let last_practiced = match row.get::<_, Option<String>>(3)? {
        Some(raw) => Some(parse_timestamp(3, &raw)?),
        None => None,
    };

    Ok(LetterProgress {
        letter: letter_column(row, 0)?,
        attempts: row.get(1)?,
        accepted: row.get(2)?,
        last_practiced,
    })
}

// ==================== ATTEMPT QUERIES ====================

/// Record the outcome of a submitted trace
pub fn record_attempt(
    db: &DbConnection,
    letter: char,
    trace: &Trace,
    result: &ValidationResult,
) -> DbResult<PracticeAttempt> {
    let attempt = PracticeAttempt {
        id: Uuid::new_v4(),
        // Stored at microsecond precision
        created_at: Utc::now().trunc_subsecs(6),
        letter,
        accepted: result.accepted,
        resolution: result.resolution,
        feedback: result.feedback.clone(),
        point_count: trace.point_count() as i64,
        stroke_count: trace.stroke_count() as i64,
    };

    let conn = db.lock();
    conn.execute(
        "INSERT INTO practice_attempts
            (id, created_at, letter, accepted, resolution, feedback, point_count, stroke_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            attempt.id.to_string(),
            format_timestamp(&attempt.created_at),
            attempt.letter.to_string(),
            attempt.accepted,
            attempt.resolution.as_str(),
            attempt.feedback,
            attempt.point_count,
            attempt.stroke_count,
        ],
    )?;

    log::debug!(
        "Recorded attempt {} for '{}' (accepted={})",
        attempt.id,
        letter,
        attempt.accepted
    );

    Ok(attempt)
}

/// Get an attempt by ID
pub fn get_attempt(db: &DbConnection, id: &Uuid) -> DbResult<Option<PracticeAttempt>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, created_at, letter, accepted, resolution, feedback, point_count, stroke_count
         FROM practice_attempts WHERE id = ?1",
    )?;

    let result = stmt.query_row([id.to_string()], attempt_from_row);

    match result {
        Ok(attempt) => Ok(Some(attempt)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Most recent attempts for a letter, newest first
pub fn list_attempts_for_letter(
    db: &DbConnection,
    letter: char,
    limit: usize,
) -> DbResult<Vec<PracticeAttempt>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, created_at, letter, accepted, resolution, feedback, point_count, stroke_count
         FROM practice_attempts
         WHERE letter = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
    )?;

    let attempts = stmt
        .query_map(params![letter.to_string(), limit as i64], attempt_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(attempts)
}

/// Delete a letter's history, returning how many attempts were removed
pub fn reset_letter(db: &DbConnection, letter: char) -> DbResult<usize> {
    let conn = db.lock();
    let removed = conn.execute(
        "DELETE FROM practice_attempts WHERE letter = ?1",
        params![letter.to_string()],
    )?;

    log::info!("Reset progress for '{}' ({} attempts removed)", letter, removed);
    Ok(removed)
}

// ==================== PROGRESS QUERIES ====================

/// Aggregate progress for one letter; zeroed if never practiced
pub fn letter_progress(db: &DbConnection, letter: char) -> DbResult<LetterProgress> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT letter, COUNT(*), COALESCE(SUM(accepted), 0), MAX(created_at)
         FROM practice_attempts
         WHERE letter = ?1
         GROUP BY letter",
    )?;

    let result = stmt.query_row([letter.to_string()], progress_from_row);

    match result {
        Ok(progress) => Ok(progress),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(LetterProgress::empty(letter)),
        Err(e) => Err(e.into()),
    }
}

/// Progress for every practiced letter, ordered by letter
pub fn list_letter_progress(db: &DbConnection) -> DbResult<Vec<LetterProgress>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT letter, COUNT(*), COALESCE(SUM(accepted), 0), MAX(created_at)
         FROM practice_attempts
         GROUP BY letter
         ORDER BY letter",
    )?;

    let progress = stmt
        .query_map([], progress_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(progress)
}
