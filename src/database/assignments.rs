use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::models::{Assignment, AssignmentStatus, NewAssignment, PayoutStatus};

const COLUMNS: &str = "id, game_id, referee_id, status, is_backup, match_score, distance_km, \
     notified_at, response_deadline, confirmed_at, rejected_at, completed_at, payment_amount, \
     payment_status, created_at";

pub fn insert(conn: &rusqlite::Connection, assignment: &NewAssignment) -> Result<Assignment> {
    let sql = format!(
        "INSERT INTO assignments (game_id, referee_id, status, is_backup, match_score, \
         distance_km, notified_at, response_deadline, payment_amount, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            assignment.game_id,
            assignment.referee_id,
            assignment.status,
            assignment.is_backup,
            assignment.match_score,
            assignment.distance_km,
            assignment.notified_at,
            assignment.response_deadline,
            assignment.payment_amount,
            Utc::now(),
        ],
        parse_assignment_row,
    )
    .context("Failed to insert assignment")
}

pub fn find_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<Assignment>> {
    let sql = format!("SELECT {COLUMNS} FROM assignments WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_assignment_row)
        .optional()
        .context("Failed to query assignment by id")
}

pub fn list_for_game(conn: &rusqlite::Connection, game_id: i64) -> Result<Vec<Assignment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM assignments WHERE game_id = ?1 \
         ORDER BY is_backup ASC, match_score DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![game_id], parse_assignment_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn list_by_status(
    conn: &rusqlite::Connection,
    status: AssignmentStatus,
) -> Result<Vec<Assignment>> {
    let sql = format!("SELECT {COLUMNS} FROM assignments WHERE status = ?1");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![status], parse_assignment_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// True when the game already holds an assignment that is live from the
/// matcher's point of view, i.e. awaiting a response or confirmed.
pub fn exists_active_for_game(conn: &rusqlite::Connection, game_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM assignments \
         WHERE game_id = ?1 AND status IN ('notified', 'confirmed')",
        params![game_id],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

/// True when the referee holds a notified or confirmed assignment for another
/// game whose start falls inside the given window.
pub fn has_conflict_near(
    conn: &rusqlite::Connection,
    referee_id: i64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    exclude_game_id: i64,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM assignments a \
         JOIN games g ON a.game_id = g.id \
         WHERE a.referee_id = ?1 \
           AND a.status IN ('notified', 'confirmed') \
           AND a.game_id != ?2 \
           AND g.scheduled_at BETWEEN ?3 AND ?4",
        params![referee_id, exclude_game_id, window_start, window_end],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

pub fn pending_backups_for_game(
    conn: &rusqlite::Connection,
    game_id: i64,
) -> Result<Vec<Assignment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM assignments \
         WHERE game_id = ?1 AND status = 'pending' AND is_backup = 1 \
         ORDER BY match_score DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![game_id], parse_assignment_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn best_pending_backup(
    conn: &rusqlite::Connection,
    game_id: i64,
) -> Result<Option<Assignment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM assignments \
         WHERE game_id = ?1 AND status = 'pending' AND is_backup = 1 \
         ORDER BY match_score DESC LIMIT 1"
    );

    conn.query_row(&sql, params![game_id], parse_assignment_row)
        .optional()
        .context("Failed to query best pending backup")
}

pub fn set_confirmed(
    conn: &rusqlite::Connection,
    id: i64,
    confirmed_at: DateTime<Utc>,
) -> Result<Assignment> {
    let sql = format!(
        "UPDATE assignments SET status = 'confirmed', confirmed_at = ?1 WHERE id = ?2 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![confirmed_at, id], parse_assignment_row)
        .context("Failed to mark assignment confirmed")
}

pub fn set_rejected(
    conn: &rusqlite::Connection,
    id: i64,
    rejected_at: DateTime<Utc>,
) -> Result<Assignment> {
    let sql = format!(
        "UPDATE assignments SET status = 'rejected', rejected_at = ?1 WHERE id = ?2 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![rejected_at, id], parse_assignment_row)
        .context("Failed to mark assignment rejected")
}

pub fn set_completed(
    conn: &rusqlite::Connection,
    id: i64,
    completed_at: DateTime<Utc>,
) -> Result<Assignment> {
    let sql = format!(
        "UPDATE assignments SET status = 'completed', completed_at = ?1 WHERE id = ?2 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![completed_at, id], parse_assignment_row)
        .context("Failed to mark assignment completed")
}

pub fn set_no_show(conn: &rusqlite::Connection, id: i64) -> Result<Assignment> {
    let sql = format!("UPDATE assignments SET status = 'no_show' WHERE id = ?1 RETURNING {COLUMNS}");

    conn.query_row(&sql, params![id], parse_assignment_row)
        .context("Failed to mark assignment no-show")
}

pub fn set_cancelled(conn: &rusqlite::Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE assignments SET status = 'cancelled' WHERE id = ?1",
        params![id],
    )
    .context("Failed to cancel assignment")
    .map(|_| ())
}

/// Turns a backup into the primary offer: clears the backup flag, moves the
/// row to notified and stamps the fresh response deadline.
pub fn promote_to_primary(
    conn: &rusqlite::Connection,
    id: i64,
    notified_at: DateTime<Utc>,
    response_deadline: DateTime<Utc>,
) -> Result<Assignment> {
    let sql = format!(
        "UPDATE assignments SET is_backup = 0, status = 'notified', notified_at = ?1, \
         response_deadline = ?2 WHERE id = ?3 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![notified_at, response_deadline, id], parse_assignment_row)
        .context("Failed to promote backup assignment")
}

pub fn set_payment_status(
    conn: &rusqlite::Connection,
    id: i64,
    payment_status: PayoutStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE assignments SET payment_status = ?1 WHERE id = ?2",
        params![payment_status, id],
    )
    .context("Failed to update assignment payment status")
    .map(|_| ())
}

fn parse_assignment_row(row: &rusqlite::Row) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        game_id: row.get(1)?,
        referee_id: row.get(2)?,
        status: row.get(3)?,
        is_backup: row.get(4)?,
        match_score: row.get(5)?,
        distance_km: row.get(6)?,
        notified_at: row.get(7)?,
        response_deadline: row.get(8)?,
        confirmed_at: row.get(9)?,
        rejected_at: row.get(10)?,
        completed_at: row.get(11)?,
        payment_amount: row.get(12)?,
        payment_status: row.get(13)?,
        created_at: row.get(14)?,
    })
}
