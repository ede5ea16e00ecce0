use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::database::models::{Availability, Game};
use crate::database::{assignments, availabilities};

/// Explicit calendar interval, stored as JSON in the availability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Recurring weekly window as "HH:MM" clock bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSlot {
    pub start: String,
    pub end: String,
}

/// Whether the referee can take the game.
///
/// A notified or confirmed assignment for another game starting within the
/// conflict window vetoes regardless of calendar contents. After that, no
/// calendar record at all means always available; a record is consulted in
/// priority order (explicit slots, recurring template, blackout dates) and a
/// record with data but no match means unavailable.
pub fn is_available(
    conn: &rusqlite::Connection,
    referee_id: i64,
    game: &Game,
    conflict_window_hours: i64,
) -> Result<bool> {
    let window = Duration::hours(conflict_window_hours);
    let conflicting = assignments::has_conflict_near(
        conn,
        referee_id,
        game.scheduled_at - window,
        game.scheduled_at + window,
        game.id,
    )?;
    if conflicting {
        return Ok(false);
    }

    match availabilities::find_for_referee(conn, referee_id)? {
        None => Ok(true),
        Some(record) => calendar_allows(&record, game),
    }
}

/// An explicit slot is checked before blackout dates, so a slot that names
/// the game window wins over a blackout on the same date.
fn calendar_allows(record: &Availability, game: &Game) -> Result<bool> {
    let time_slots: Vec<TimeSlot> = serde_json::from_str(&record.time_slots)
        .context("Failed to parse availability time slots")?;
    let recurring: HashMap<String, Vec<RecurringSlot>> =
        serde_json::from_str(&record.recurring_weekly)
            .context("Failed to parse availability recurring template")?;
    let blackouts: Vec<chrono::NaiveDate> = serde_json::from_str(&record.blackout_dates)
        .context("Failed to parse availability blackout dates")?;

    let game_start = game.scheduled_at;
    let game_end = game_start + Duration::minutes(game.duration_minutes);

    for slot in &time_slots {
        let overlaps = (game_start >= slot.start && game_start < slot.end)
            || (game_end > slot.start && game_end <= slot.end);
        if overlaps {
            return Ok(true);
        }
    }

    if let Some(day_slots) = recurring.get(weekday_key(game_start.weekday())) {
        let start_clock = game_start.time();
        for slot in day_slots {
            let from = parse_clock(&slot.start)?;
            let to = parse_clock(&slot.end)?;
            if start_clock >= from && start_clock <= to {
                return Ok(true);
            }
        }
    }

    if blackouts.contains(&game_start.date_naive()) {
        return Ok(false);
    }

    Ok(time_slots.is_empty() && recurring.is_empty() && blackouts.is_empty())
}

fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Failed to parse clock time '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AssignmentStatus, NewAssignment};
    use crate::testutil;
    use chrono::TimeZone;
    use serde_json::json;

    // 2025-06-02 is a Monday.
    fn monday_evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).unwrap()
    }

    fn notified_assignment(game_id: i64, referee_id: i64) -> NewAssignment {
        NewAssignment {
            game_id,
            referee_id,
            status: AssignmentStatus::Notified,
            is_backup: false,
            match_score: 0.8,
            distance_km: Some(1.0),
            notified_at: Some(Utc::now()),
            response_deadline: Some(Utc::now() + Duration::hours(24)),
            payment_amount: None,
        }
    }

    #[test]
    fn test_no_record_means_available() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_nearby_assignment_blocks() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());
        let other = testutil::insert_game(&conn, organizer.id, monday_evening() + Duration::hours(1));

        assignments::insert(&conn, &notified_assignment(other.id, referee.id)).unwrap();

        assert!(!is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_rejected_assignment_does_not_block() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());
        let other = testutil::insert_game(&conn, organizer.id, monday_evening() + Duration::hours(1));

        let mut stale = notified_assignment(other.id, referee.id);
        stale.status = AssignmentStatus::Rejected;
        assignments::insert(&conn, &stale).unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_own_game_assignment_is_ignored() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        assignments::insert(&conn, &notified_assignment(game.id, referee.id)).unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_explicit_slot_grants() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let slots = json!([{
            "start": (monday_evening() - Duration::hours(1)).to_rfc3339(),
            "end": (monday_evening() + Duration::hours(3)).to_rfc3339(),
        }])
        .to_string();
        availabilities::upsert(&conn, referee.id, &slots, "{}", "[]").unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_slot_match_wins_over_blackout() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let slots = json!([{
            "start": (monday_evening() - Duration::hours(1)).to_rfc3339(),
            "end": (monday_evening() + Duration::hours(3)).to_rfc3339(),
        }])
        .to_string();
        let blackouts = json!(["2025-06-02"]).to_string();
        availabilities::upsert(&conn, referee.id, &slots, "{}", &blackouts).unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_recurring_weekday_grants() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let recurring = json!({"monday": [{"start": "17:00", "end": "21:00"}]}).to_string();
        availabilities::upsert(&conn, referee.id, "[]", &recurring, "[]").unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_recurring_other_weekday_does_not_grant() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let recurring = json!({"tuesday": [{"start": "17:00", "end": "21:00"}]}).to_string();
        availabilities::upsert(&conn, referee.id, "[]", &recurring, "[]").unwrap();

        assert!(!is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_blackout_blocks() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let blackouts = json!(["2025-06-02"]).to_string();
        availabilities::upsert(&conn, referee.id, "[]", "{}", &blackouts).unwrap();

        assert!(!is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_record_with_no_matching_data_blocks() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        let slots = json!([{
            "start": (monday_evening() + Duration::days(10)).to_rfc3339(),
            "end": (monday_evening() + Duration::days(10) + Duration::hours(2)).to_rfc3339(),
        }])
        .to_string();
        availabilities::upsert(&conn, referee.id, &slots, "{}", "[]").unwrap();

        assert!(!is_available(&conn, referee.id, &game, 2).unwrap());
    }

    #[test]
    fn test_empty_record_means_available() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");
        let referee = testutil::insert_referee(&conn, "ref@example.com");
        let game = testutil::insert_game(&conn, organizer.id, monday_evening());

        availabilities::upsert(&conn, referee.id, "[]", "{}", "[]").unwrap();

        assert!(is_available(&conn, referee.id, &game, 2).unwrap());
    }
}
