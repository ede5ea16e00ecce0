use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::models::{Game, GameStatus, NewGame};

const COLUMNS: &str = "id, organizer_id, sport, required_level, scheduled_at, duration_minutes, \
     venue_name, address, latitude, longitude, home_team, away_team, importance, notes, status, \
     base_rate, surge_multiplier, final_rate, created_at";

pub fn insert(conn: &rusqlite::Connection, game: &NewGame) -> Result<Game> {
    let sql = format!(
        "INSERT INTO games (organizer_id, sport, required_level, scheduled_at, duration_minutes, \
         venue_name, address, latitude, longitude, home_team, away_team, importance, notes, \
         base_rate, surge_multiplier, final_rate, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            game.organizer_id,
            game.sport,
            game.required_level,
            game.scheduled_at,
            game.duration_minutes,
            game.venue_name,
            game.address,
            game.latitude,
            game.longitude,
            game.home_team,
            game.away_team,
            game.importance,
            game.notes,
            game.base_rate,
            game.surge_multiplier,
            game.final_rate,
            Utc::now(),
        ],
        parse_game_row,
    )
    .context("Failed to insert game")
}

pub fn find_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Option<Game>> {
    let sql = format!("SELECT {COLUMNS} FROM games WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_game_row)
        .optional()
        .context("Failed to query game by id")
}

pub fn list_all(conn: &rusqlite::Connection) -> Result<Vec<Game>> {
    let sql = format!("SELECT {COLUMNS} FROM games ORDER BY scheduled_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_game_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn list_by_status(conn: &rusqlite::Connection, status: GameStatus) -> Result<Vec<Game>> {
    let sql = format!("SELECT {COLUMNS} FROM games WHERE status = ?1 ORDER BY scheduled_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![status], parse_game_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Pending games that have not started yet, soonest first, so the sweep gives
/// the most urgent games first pick of referees.
pub fn list_pending_upcoming(
    conn: &rusqlite::Connection,
    now: DateTime<Utc>,
) -> Result<Vec<Game>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM games \
         WHERE status = 'pending' AND scheduled_at > ?1 \
         ORDER BY scheduled_at ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![now], parse_game_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_by_status(conn: &rusqlite::Connection, status: GameStatus) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM games WHERE status = ?1",
        params![status],
        |row| row.get(0),
    )
    .context("Failed to count games by status")
}

pub fn update_status(conn: &rusqlite::Connection, id: i64, status: GameStatus) -> Result<()> {
    conn.execute(
        "UPDATE games SET status = ?1 WHERE id = ?2",
        params![status, id],
    )
    .context("Failed to update game status")
    .map(|_| ())
}

/// Rewrites the surge multiplier and the rate derived from it, returning the
/// updated row.
pub fn update_surge(
    conn: &rusqlite::Connection,
    id: i64,
    surge_multiplier: f64,
    final_rate: f64,
) -> Result<Game> {
    let sql = format!(
        "UPDATE games SET surge_multiplier = ?1, final_rate = ?2 WHERE id = ?3 \
         RETURNING {COLUMNS}"
    );

    conn.query_row(&sql, params![surge_multiplier, final_rate, id], parse_game_row)
        .context("Failed to update game surge pricing")
}

fn parse_game_row(row: &rusqlite::Row) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        organizer_id: row.get(1)?,
        sport: row.get(2)?,
        required_level: row.get(3)?,
        scheduled_at: row.get(4)?,
        duration_minutes: row.get(5)?,
        venue_name: row.get(6)?,
        address: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        home_team: row.get(10)?,
        away_team: row.get(11)?,
        importance: row.get(12)?,
        notes: row.get(13)?,
        status: row.get(14)?,
        base_rate: row.get(15)?,
        surge_multiplier: row.get(16)?,
        final_rate: row.get(17)?,
        created_at: row.get(18)?,
    })
}
