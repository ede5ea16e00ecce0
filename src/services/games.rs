use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::info;
use regex::Regex;
use std::sync::Arc;

use crate::config::{rates, PricingSettings};
use crate::database::{
    self, assignments, games, users, AssignmentStatus, CertLevel, DbPool, Game, GameStatus,
    NewGame, Sport, UserRole,
};
use crate::errors::{MatchError, MatchResult};
use crate::services::assignments::AssignmentService;
use crate::services::notifications::NotificationService;

const DEFAULT_DURATION_MINUTES: i64 = 90;
const DEFAULT_IMPORTANCE: i64 = 3;

/// Organizer-facing intake fields. Pricing is derived from the rate table at
/// creation time, never submitted.
#[derive(Debug, Clone)]
pub struct GameSubmission {
    pub organizer_id: i64,
    pub sport: String,
    pub required_level: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub venue_name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub importance: i64,
    pub notes: Option<String>,
}

/// Game intake and lifecycle outside the assignment state machine: creation
/// with surge pricing, cancellation, and the `field: value` email submission
/// format organizers can send instead of using the API.
pub struct GameService {
    pool: DbPool,
    pricing: PricingSettings,
    notifications: Arc<NotificationService>,
    assignments: AssignmentService,
    patterns: EmailPatterns,
}

impl GameService {
    pub fn new(
        pool: DbPool,
        pricing: PricingSettings,
        notifications: Arc<NotificationService>,
        assignments: AssignmentService,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            pool,
            pricing,
            notifications,
            assignments,
            patterns: EmailPatterns::compile()?,
        })
    }

    /// Validates the submission, prices the game off the rate table plus the
    /// creation-time surge, and writes the pending row.
    pub fn create_game(&self, submission: GameSubmission) -> MatchResult<Game> {
        let sport = Sport::parse(&submission.sport.to_lowercase()).ok_or_else(|| {
            MatchError::Validation(format!("unknown sport '{}'", submission.sport))
        })?;
        let required_level =
            CertLevel::parse(&submission.required_level.to_lowercase()).ok_or_else(|| {
                MatchError::Validation(format!(
                    "unknown certification level '{}'",
                    submission.required_level
                ))
            })?;
        if !(1..=5).contains(&submission.importance) {
            return Err(MatchError::Validation(
                "importance must be between 1 and 5".to_string(),
            ));
        }

        let conn = database::get_connection(&self.pool)?;
        let organizer =
            users::find_by_id(&conn, submission.organizer_id)?.ok_or(MatchError::NotFound {
                entity: "user",
                id: submission.organizer_id,
            })?;
        if organizer.role != UserRole::Organizer {
            return Err(MatchError::Validation(format!(
                "user {} is not an organizer",
                organizer.id
            )));
        }

        let base_rate = rates::base_rate(sport, required_level);
        let pending_count = games::count_by_status(&conn, GameStatus::Pending)?;
        let surge = surge_multiplier(
            submission.scheduled_at,
            Utc::now(),
            submission.importance,
            pending_count,
            &self.pricing,
        );

        let game = games::insert(
            &conn,
            &NewGame {
                organizer_id: organizer.id,
                sport,
                required_level,
                scheduled_at: submission.scheduled_at,
                duration_minutes: submission.duration_minutes,
                venue_name: submission.venue_name,
                address: submission.address,
                latitude: submission.latitude,
                longitude: submission.longitude,
                home_team: submission.home_team,
                away_team: submission.away_team,
                importance: submission.importance,
                notes: submission.notes,
                base_rate,
                surge_multiplier: surge,
                final_rate: base_rate * surge,
            },
        )?;

        info!(
            "Game {} created: {} on {} (rate {:.2}, surge x{:.2})",
            game.id,
            sport.as_str(),
            game.scheduled_at,
            game.final_rate,
            game.surge_multiplier
        );
        Ok(game)
    }

    /// Cancels a game that has not been handed to a referee yet. Any
    /// assignment rows still open against it are released, their timers
    /// dropped, and referees who had already heard about the game told.
    pub fn cancel_game(&self, game_id: i64) -> MatchResult<Game> {
        let (game, released) = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let game = games::find_by_id(&tx, game_id)?.ok_or(MatchError::NotFound {
                entity: "game",
                id: game_id,
            })?;
            if game.status != GameStatus::Pending {
                return Err(MatchError::InvalidState {
                    action: "cancel game",
                    id: game_id,
                    status: game.status.as_str(),
                });
            }

            games::update_status(&tx, game_id, GameStatus::Cancelled)?;

            let mut released = Vec::new();
            for assignment in assignments::list_for_game(&tx, game_id)? {
                let open = matches!(
                    assignment.status,
                    AssignmentStatus::Pending
                        | AssignmentStatus::Notified
                        | AssignmentStatus::Confirmed
                );
                if open {
                    assignments::set_cancelled(&tx, assignment.id)?;
                    released.push(assignment);
                }
            }

            tx.commit()?;
            (
                Game {
                    status: GameStatus::Cancelled,
                    ..game
                },
                released,
            )
        };

        for assignment in &released {
            self.assignments.clear_timers(assignment.id);
            if matches!(
                assignment.status,
                AssignmentStatus::Notified | AssignmentStatus::Confirmed
            ) {
                self.notifications.send_game_cancelled(assignment);
            }
        }

        info!(
            "Game {} cancelled ({} open assignments released)",
            game_id,
            released.len()
        );
        Ok(game)
    }

    /// Parses the organizer email format into a submission:
    ///
    /// ```text
    /// Sport: basketball
    /// Date: 2026-09-12 18:30
    /// Location: Mesa Rec Center, 263 Oak Ave, Mesa AZ
    /// Home: Hawks
    /// Away: Owls
    /// ```
    ///
    /// The sender must be a registered organizer. Level and importance fall
    /// back to entry / 3; the location's first comma-separated segment becomes
    /// the venue name and the remainder the address.
    pub fn parse_email_submission(
        &self,
        email_content: &str,
        from_email: &str,
    ) -> MatchResult<GameSubmission> {
        let sender = {
            let conn = database::get_connection(&self.pool)?;
            users::find_by_email(&conn, from_email)?
        };
        let organizer = match sender {
            Some(user) if user.role == UserRole::Organizer => user,
            _ => {
                return Err(MatchError::Validation(format!(
                    "sender '{from_email}' is not a registered organizer"
                )))
            }
        };

        let sport = required(&self.patterns.sport, email_content, "sport")?;
        let date_text = required(&self.patterns.date, email_content, "date")?;
        let scheduled_at = parse_email_date(date_text)?;
        let location = required(&self.patterns.location, email_content, "location")?;
        let (venue_name, address) = split_location(location);

        Ok(GameSubmission {
            organizer_id: organizer.id,
            sport: sport.to_lowercase(),
            required_level: CertLevel::Entry.as_str().to_string(),
            scheduled_at,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            venue_name,
            address,
            latitude: None,
            longitude: None,
            home_team: capture(&self.patterns.home, email_content).map(str::to_string),
            away_team: capture(&self.patterns.away, email_content).map(str::to_string),
            importance: DEFAULT_IMPORTANCE,
            notes: None,
        })
    }
}

/// Creation-time surge pricing. Short notice, importance above the baseline
/// and pending-game demand each push the multiplier up; the result never
/// leaves `[1.0, surge_cap]`.
pub fn surge_multiplier(
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
    importance: i64,
    pending_count: i64,
    pricing: &PricingSettings,
) -> f64 {
    let mut multiplier = 1.0;

    let hours_until = (scheduled_at - now).num_seconds() as f64 / 3600.0;
    if hours_until < pricing.last_minute_threshold_hours as f64 {
        multiplier += pricing.last_minute_surge;
    }

    multiplier += (importance - 3) as f64 * pricing.importance_surge_step;
    multiplier += (pending_count as f64 / 10.0).min(pricing.demand_surge_cap);

    multiplier.clamp(1.0, pricing.surge_cap)
}

struct EmailPatterns {
    sport: Regex,
    date: Regex,
    location: Regex,
    home: Regex,
    away: Regex,
}

impl EmailPatterns {
    fn compile() -> anyhow::Result<Self> {
        Ok(Self {
            sport: Regex::new(r"(?i)sport:\s*(\w+)").context("Failed to compile sport regex")?,
            date: Regex::new(r"(?i)date:\s*([\d\-\s:]+)")
                .context("Failed to compile date regex")?,
            location: Regex::new(r"(?i)location:\s*(.+)")
                .context("Failed to compile location regex")?,
            home: Regex::new(r"(?i)home:\s*(.+)").context("Failed to compile home team regex")?,
            away: Regex::new(r"(?i)away:\s*(.+)").context("Failed to compile away team regex")?,
        })
    }
}

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str().trim())
        .filter(|value| !value.is_empty())
}

fn required<'t>(pattern: &Regex, text: &'t str, field: &str) -> MatchResult<&'t str> {
    capture(pattern, text)
        .ok_or_else(|| MatchError::Validation(format!("email submission is missing '{field}:'")))
}

fn parse_email_date(text: &str) -> MatchResult<DateTime<Utc>> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(MatchError::Validation(format!(
        "could not parse game date '{text}'"
    )))
}

fn split_location(location: &str) -> (String, String) {
    match location.split_once(',') {
        Some((venue, rest)) if !rest.trim().is_empty() => {
            (venue.trim().to_string(), rest.trim().to_string())
        }
        _ => (location.trim().to_string(), location.trim().to_string()),
    }
}
