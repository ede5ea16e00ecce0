use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::models::{CertLevel, Certification, Sport};

const COLUMNS: &str = "id, referee_id, sport, level, is_active, passed_at, expires_at, created_at";

pub fn insert(
    conn: &rusqlite::Connection,
    referee_id: i64,
    sport: Sport,
    level: CertLevel,
    passed_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Certification> {
    let sql = format!(
        "INSERT INTO certifications (referee_id, sport, level, passed_at, expires_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![referee_id, sport, level, passed_at, expires_at, Utc::now()],
        parse_certification_row,
    )
    .context("Failed to insert certification")
}

pub fn list_for_referee(conn: &rusqlite::Connection, referee_id: i64) -> Result<Vec<Certification>> {
    let sql = format!("SELECT {COLUMNS} FROM certifications WHERE referee_id = ?1 ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![referee_id], parse_certification_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_certification_row(row: &rusqlite::Row) -> rusqlite::Result<Certification> {
    Ok(Certification {
        id: row.get(0)?,
        referee_id: row.get(1)?,
        sport: row.get(2)?,
        level: row.get(3)?,
        is_active: row.get(4)?,
        passed_at: row.get(5)?,
        expires_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}
