use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::models::{CertLevel, NewUser, Sport, User};

const COLUMNS: &str = "id, email, phone, first_name, last_name, role, is_active, \
     background_check_status, address, latitude, longitude, reliability_score, \
     total_games_assigned, total_games_completed, no_show_count, emergency_pool_opt_in, \
     travel_radius_km, organization_name, created_at";

pub fn insert(conn: &rusqlite::Connection, user: &NewUser) -> Result<User> {
    let sql = format!(
        "INSERT INTO users (email, phone, first_name, last_name, role, background_check_status, \
         address, latitude, longitude, reliability_score, total_games_completed, no_show_count, \
         emergency_pool_opt_in, travel_radius_km, organization_name, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            user.email,
            user.phone,
            user.first_name,
            user.last_name,
            user.role,
            user.background_check_status,
            user.address,
            user.latitude,
            user.longitude,
            user.reliability_score,
            user.total_games_completed,
            user.no_show_count,
            user.emergency_pool_opt_in,
            user.travel_radius_km,
            user.organization_name,
            Utc::now(),
        ],
        parse_user_row,
    )
    .context("Failed to insert user")
}

pub fn find_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_user_row)
        .optional()
        .context("Failed to query user by id")
}

pub fn find_by_email(conn: &rusqlite::Connection, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?1");

    conn.query_row(&sql, params![email], parse_user_row)
        .optional()
        .context("Failed to query user by email")
}

pub fn list_referees(conn: &rusqlite::Connection) -> Result<Vec<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE role = 'referee' ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_user_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Active, background-cleared referees holding an active, non-expired
/// certification for the sport at a level satisfying the requirement.
/// Distance and availability are filtered by the caller.
pub fn list_certified_referees(
    conn: &rusqlite::Connection,
    sport: Sport,
    required_level: CertLevel,
    exclude_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<User>> {
    let levels = required_level
        .accepted_levels()
        .iter()
        .map(|level| format!("'{}'", level.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT {COLUMNS} FROM users u \
         WHERE u.role = 'referee' \
           AND u.is_active = 1 \
           AND u.background_check_status = 'clear' \
           AND (?1 IS NULL OR u.id != ?1) \
           AND EXISTS ( \
               SELECT 1 FROM certifications c \
               WHERE c.referee_id = u.id \
                 AND c.sport = ?2 \
                 AND c.is_active = 1 \
                 AND (c.expires_at IS NULL OR c.expires_at > ?3) \
                 AND c.level IN ({levels}))"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![exclude_id, sport, now], parse_user_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Opted-in, high-reliability referees with an active, non-expired
/// certification for the sport. No level or distance gate on this path.
pub fn list_emergency_pool(
    conn: &rusqlite::Connection,
    sport: Sport,
    min_reliability: f64,
    now: DateTime<Utc>,
) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM users u \
         WHERE u.role = 'referee' \
           AND u.is_active = 1 \
           AND u.emergency_pool_opt_in = 1 \
           AND u.reliability_score >= ?1 \
           AND EXISTS ( \
               SELECT 1 FROM certifications c \
               WHERE c.referee_id = u.id \
                 AND c.sport = ?2 \
                 AND c.is_active = 1 \
                 AND (c.expires_at IS NULL OR c.expires_at > ?3))"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![min_reliability, sport, now], parse_user_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Single write point for the reliability tracker: score plus the two
/// counters it owns, in one statement.
pub fn update_reliability_stats(
    conn: &rusqlite::Connection,
    referee_id: i64,
    reliability_score: f64,
    total_games_completed: i64,
    no_show_count: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET reliability_score = ?1, total_games_completed = ?2, no_show_count = ?3 \
         WHERE id = ?4",
        params![reliability_score, total_games_completed, no_show_count, referee_id],
    )
    .context("Failed to update referee reliability stats")
    .map(|_| ())
}

pub fn increment_games_assigned(conn: &rusqlite::Connection, referee_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET total_games_assigned = total_games_assigned + 1 WHERE id = ?1",
        params![referee_id],
    )
    .context("Failed to increment referee assigned-games counter")
    .map(|_| ())
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        phone: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role: row.get(5)?,
        is_active: row.get(6)?,
        background_check_status: row.get(7)?,
        address: row.get(8)?,
        latitude: row.get(9)?,
        longitude: row.get(10)?,
        reliability_score: row.get(11)?,
        total_games_assigned: row.get(12)?,
        total_games_completed: row.get(13)?,
        no_show_count: row.get(14)?,
        emergency_pool_opt_in: row.get(15)?,
        travel_radius_km: row.get(16)?,
        organization_name: row.get(17)?,
        created_at: row.get(18)?,
    })
}
