use std::time::Duration;

use chrono::Utc;
use log::{error, info};

use crate::errors::MatchResult;
use crate::services::assignments::AssignmentService;

use super::{TimerKey, TimerPurpose, TimerService};

/// Drains due timers on a fixed tick and applies each to the assignment
/// lifecycle. Stale fires are no-ops inside the service, so failures here
/// are logged and the loop keeps running.
pub async fn run(timers: TimerService, assignments: AssignmentService, tick_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
    info!("Timer loop started with {}s tick", tick_secs);

    loop {
        interval.tick().await;

        for key in timers.take_due(Utc::now()) {
            if let Err(err) = dispatch(&assignments, key) {
                error!(
                    "Timer {:?} for assignment {} failed: {err:#}",
                    key.purpose, key.assignment_id
                );
            }
        }
    }
}

fn dispatch(assignments: &AssignmentService, key: TimerKey) -> MatchResult<()> {
    match key.purpose {
        TimerPurpose::DeadlineCheck => assignments.expire(key.assignment_id),
        TimerPurpose::ConfirmationReminder { hours_before } => {
            assignments.send_confirmation_reminder(key.assignment_id, hours_before)
        }
        TimerPurpose::GameDayReminder => assignments.send_game_day_reminder(key.assignment_id),
    }
}
