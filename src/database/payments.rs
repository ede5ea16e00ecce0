use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::models::{Payment, PaymentKind, PaymentStatus};

const COLUMNS: &str = "id, assignment_id, game_id, kind, amount, platform_fee, net_amount, \
     status, reference, created_at";

#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &rusqlite::Connection,
    assignment_id: Option<i64>,
    game_id: i64,
    kind: PaymentKind,
    amount: f64,
    platform_fee: f64,
    net_amount: f64,
    status: PaymentStatus,
    reference: Option<&str>,
) -> Result<Payment> {
    let sql = format!(
        "INSERT INTO payments (assignment_id, game_id, kind, amount, platform_fee, net_amount, \
         status, reference, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            assignment_id,
            game_id,
            kind,
            amount,
            platform_fee,
            net_amount,
            status,
            reference,
            Utc::now(),
        ],
        parse_payment_row,
    )
    .context("Failed to insert payment")
}

pub fn find_completed_payout(
    conn: &rusqlite::Connection,
    assignment_id: i64,
) -> Result<Option<Payment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM payments \
         WHERE assignment_id = ?1 AND kind = 'payout' AND status = 'completed'"
    );

    conn.query_row(&sql, params![assignment_id], parse_payment_row)
        .optional()
        .context("Failed to query completed payout")
}

pub fn list_for_game(conn: &rusqlite::Connection, game_id: i64) -> Result<Vec<Payment>> {
    let sql = format!("SELECT {COLUMNS} FROM payments WHERE game_id = ?1 ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![game_id], parse_payment_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_payment_row(row: &rusqlite::Row) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        game_id: row.get(2)?,
        kind: row.get(3)?,
        amount: row.get(4)?,
        platform_fee: row.get(5)?,
        net_amount: row.get(6)?,
        status: row.get(7)?,
        reference: row.get(8)?,
        created_at: row.get(9)?,
    })
}
