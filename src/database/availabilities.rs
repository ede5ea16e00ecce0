use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::models::Availability;

const COLUMNS: &str = "id, referee_id, time_slots, recurring_weekly, blackout_dates, created_at";

/// One calendar row per referee; a second write replaces the first.
pub fn upsert(
    conn: &rusqlite::Connection,
    referee_id: i64,
    time_slots: &str,
    recurring_weekly: &str,
    blackout_dates: &str,
) -> Result<Availability> {
    let sql = format!(
        "INSERT INTO availabilities (referee_id, time_slots, recurring_weekly, blackout_dates, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(referee_id) DO UPDATE SET \
             time_slots = excluded.time_slots, \
             recurring_weekly = excluded.recurring_weekly, \
             blackout_dates = excluded.blackout_dates \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![referee_id, time_slots, recurring_weekly, blackout_dates, Utc::now()],
        parse_availability_row,
    )
    .context("Failed to upsert availability")
}

pub fn find_for_referee(
    conn: &rusqlite::Connection,
    referee_id: i64,
) -> Result<Option<Availability>> {
    let sql = format!("SELECT {COLUMNS} FROM availabilities WHERE referee_id = ?1");

    conn.query_row(&sql, params![referee_id], parse_availability_row)
        .optional()
        .context("Failed to query availability for referee")
}

fn parse_availability_row(row: &rusqlite::Row) -> rusqlite::Result<Availability> {
    Ok(Availability {
        id: row.get(0)?,
        referee_id: row.get(1)?,
        time_slots: row.get(2)?,
        recurring_weekly: row.get(3)?,
        blackout_dates: row.get(4)?,
        created_at: row.get(5)?,
    })
}
