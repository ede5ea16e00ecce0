use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::config::{MatchingSettings, PricingSettings};
use crate::database::{self, assignments, games, DbPool, Game, GameStatus};
use crate::errors::{MatchError, MatchResult};
use crate::matching::{self, ScoredCandidate};
use crate::services::assignments::AssignmentService;

/// What one sweep did, for the log line and the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub processed: usize,
    pub assigned: usize,
    pub emergency: usize,
    pub unmatched: usize,
}

enum SweepOutcome {
    Assigned,
    Emergency,
    AlreadyAssigned,
}

/// Walks every pending future game and tries to staff it: best regular
/// referee plus standby backups, falling back to the emergency pool at a
/// surge rate. Matching reads run on a plain connection; each game's writes
/// re-check the slot inside their own transaction, so two overlapping sweeps
/// cannot double-book a game.
#[derive(Clone)]
pub struct SweepService {
    pool: DbPool,
    matching: MatchingSettings,
    pricing: PricingSettings,
    assignments: AssignmentService,
}

impl SweepService {
    pub fn new(
        pool: DbPool,
        matching: MatchingSettings,
        pricing: PricingSettings,
        assignments: AssignmentService,
    ) -> Self {
        Self {
            pool,
            matching,
            pricing,
            assignments,
        }
    }

    /// One pass over the backlog, soonest game first. An unmatched game stays
    /// pending for the next sweep; any other failure on one game is logged
    /// and the sweep moves on.
    pub fn process_pending_games(&self) -> MatchResult<SweepSummary> {
        info!("=== Starting Assignment Sweep ===");
        let now = Utc::now();

        let pending = {
            let conn = database::get_connection(&self.pool)?;
            games::list_pending_upcoming(&conn, now)?
        };
        info!("Found {} pending games", pending.len());

        let mut summary = SweepSummary::default();
        for game in pending {
            summary.processed += 1;
            match self.assign_game(&game) {
                Ok(SweepOutcome::Assigned) => summary.assigned += 1,
                Ok(SweepOutcome::Emergency) => summary.emergency += 1,
                Ok(SweepOutcome::AlreadyAssigned) => {}
                Err(MatchError::NoEligibleCandidate(game_id)) => {
                    warn!("No referee found for game {game_id}");
                    summary.unmatched += 1;
                }
                Err(err) => {
                    error!("Failed to process game {}: {err:?}", game.id);
                }
            }
        }

        info!(
            "=== Sweep Complete: {} assigned, {} emergency, {} unmatched ===",
            summary.assigned, summary.emergency, summary.unmatched
        );
        Ok(summary)
    }

    fn assign_game(&self, game: &Game) -> MatchResult<SweepOutcome> {
        let now = Utc::now();
        let conn = database::get_connection(&self.pool)?;

        if assignments::exists_active_for_game(&conn, game.id)? {
            return Ok(SweepOutcome::AlreadyAssigned);
        }

        if let Some(primary) = matching::find_best_referee(&conn, game, &self.matching, now)? {
            let backups = matching::find_backup_referees(
                &conn,
                game,
                &self.matching,
                primary.referee.id,
                self.matching.backup_count,
                now,
            )?;
            drop(conn);
            return self.commit_regular(game, &primary, &backups, now);
        }

        let emergency = matching::find_emergency_referee(&conn, game, &self.matching, now)?;
        drop(conn);

        match emergency {
            Some(candidate) => self.commit_emergency(game, &candidate, now),
            None => Err(MatchError::NoEligibleCandidate(game.id)),
        }
    }

    fn commit_regular(
        &self,
        game: &Game,
        primary: &ScoredCandidate,
        backups: &[ScoredCandidate],
        now: DateTime<Utc>,
    ) -> MatchResult<SweepOutcome> {
        let assignment = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            if !Self::slot_still_open(&tx, game.id)? {
                return Ok(SweepOutcome::AlreadyAssigned);
            }

            let assignment = self.assignments.create_primary_in(&tx, game, primary, now)?;
            for backup in backups {
                self.assignments.create_backup_in(&tx, game, backup)?;
            }
            games::update_status(&tx, game.id, GameStatus::Assigned)?;
            tx.commit()?;
            assignment
        };

        self.assignments.after_primary_created(&assignment, false);
        info!(
            "Assigned referee {} to game {} with {} backups",
            assignment.referee_id,
            game.id,
            backups.len()
        );
        Ok(SweepOutcome::Assigned)
    }

    fn commit_emergency(
        &self,
        game: &Game,
        candidate: &ScoredCandidate,
        now: DateTime<Utc>,
    ) -> MatchResult<SweepOutcome> {
        let assignment = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            if !Self::slot_still_open(&tx, game.id)? {
                return Ok(SweepOutcome::AlreadyAssigned);
            }

            let surge = (game.surge_multiplier * self.pricing.emergency_surge_multiplier)
                .min(self.pricing.surge_cap);
            let surged = games::update_surge(&tx, game.id, surge, game.base_rate * surge)?;

            let assignment = self
                .assignments
                .create_primary_in(&tx, &surged, candidate, now)?;
            games::update_status(&tx, game.id, GameStatus::Assigned)?;
            tx.commit()?;
            assignment
        };

        self.assignments.after_primary_created(&assignment, true);
        info!(
            "Emergency-assigned referee {} to game {} at surge rate",
            assignment.referee_id, game.id
        );
        Ok(SweepOutcome::Emergency)
    }

    /// Re-check inside the write transaction: the game must still be pending
    /// with nobody holding the authoritative slot.
    fn slot_still_open(tx: &rusqlite::Connection, game_id: i64) -> anyhow::Result<bool> {
        if assignments::exists_active_for_game(tx, game_id)? {
            return Ok(false);
        }
        let still_pending = games::find_by_id(tx, game_id)?
            .map(|game| game.status == GameStatus::Pending)
            .unwrap_or(false);
        Ok(still_pending)
    }
}
