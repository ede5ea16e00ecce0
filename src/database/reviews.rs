use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::models::Review;

const COLUMNS: &str =
    "id, assignment_id, referee_id, reviewer_id, rating, comment, requested_at, submitted_at";

/// Opens a review slot for a finished assignment. The assignment_id unique
/// constraint keeps it to one slot per assignment.
pub fn insert_request(
    conn: &rusqlite::Connection,
    assignment_id: i64,
    referee_id: i64,
    reviewer_id: i64,
    requested_at: DateTime<Utc>,
) -> Result<Review> {
    let sql = format!(
        "INSERT INTO reviews (assignment_id, referee_id, reviewer_id, requested_at) \
         VALUES (?1, ?2, ?3, ?4) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![assignment_id, referee_id, reviewer_id, requested_at],
        parse_review_row,
    )
    .context("Failed to insert review request")
}

pub fn find_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<Review>> {
    let sql = format!("SELECT {COLUMNS} FROM reviews WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_review_row)
        .optional()
        .context("Failed to query review by id")
}

pub fn find_by_assignment(
    conn: &rusqlite::Connection,
    assignment_id: i64,
) -> Result<Option<Review>> {
    let sql = format!("SELECT {COLUMNS} FROM reviews WHERE assignment_id = ?1");

    conn.query_row(&sql, params![assignment_id], parse_review_row)
        .optional()
        .context("Failed to query review by assignment")
}

pub fn submit(
    conn: &rusqlite::Connection,
    id: i64,
    rating: i64,
    comment: Option<&str>,
    submitted_at: DateTime<Utc>,
) -> Result<Review> {
    let sql = format!(
        "UPDATE reviews SET rating = ?1, comment = ?2, submitted_at = ?3 WHERE id = ?4 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![rating, comment, submitted_at, id], parse_review_row)
        .context("Failed to submit review")
}

fn parse_review_row(row: &rusqlite::Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        referee_id: row.get(2)?,
        reviewer_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        requested_at: row.get(6)?,
        submitted_at: row.get(7)?,
    })
}
