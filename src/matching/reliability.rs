use anyhow::Result;
use log::{debug, warn};

use crate::database::users;

use super::score::round3;

/// Lifecycle events that move a referee's reliability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityEvent {
    Confirmed,
    Completed,
    Rejected,
    NoResponse,
    NoShow,
    GoodReview,
    BadReview,
}

/// Sole writer of reliability_score and the counters tied to it. Each event
/// applies a fixed delta clamped to its own bound; negative events cannot
/// push below their floor, positive ones cannot exceed 1.0. A missing
/// referee is logged and ignored so lifecycle transitions never fail on a
/// stats update.
pub fn record_event(
    conn: &rusqlite::Connection,
    referee_id: i64,
    event: ReliabilityEvent,
) -> Result<()> {
    let Some(referee) = users::find_by_id(conn, referee_id)? else {
        warn!(
            "Reliability event {:?} for unknown referee {}",
            event, referee_id
        );
        return Ok(());
    };

    let mut completed = referee.total_games_completed;
    let mut no_shows = referee.no_show_count;

    let score = referee.reliability_score;
    let adjusted = match event {
        ReliabilityEvent::Confirmed => (score + 0.01).min(1.0),
        ReliabilityEvent::Completed => {
            completed += 1;
            (score + 0.02).min(1.0)
        }
        ReliabilityEvent::Rejected => (score - 0.05).max(0.5),
        ReliabilityEvent::NoResponse => (score - 0.10).max(0.5),
        ReliabilityEvent::NoShow => {
            no_shows += 1;
            (score - 0.30).max(0.3)
        }
        ReliabilityEvent::GoodReview => (score + 0.03).min(1.0),
        ReliabilityEvent::BadReview => (score - 0.05).max(0.5),
    };

    let adjusted = round3(adjusted);
    users::update_reliability_stats(conn, referee_id, adjusted, completed, no_shows)?;
    debug!(
        "Referee {} reliability {:.3} after {:?}",
        referee_id, adjusted, event
    );

    Ok(())
}
