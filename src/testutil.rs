//! Shared fixtures for in-module tests.

use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use r2d2_sqlite::SqliteConnectionManager;

use crate::database::models::{
    BackgroundCheck, CertLevel, Certification, Game, NewGame, NewUser, Sport, User, UserRole,
};
use crate::database::{self, DbPool};
use crate::integrations::{NotificationKind, NotificationMessage, Notifier, PaymentGateway};

/// Single-connection in-memory pool, so every checkout sees the same
/// database and nothing leaks between tests.
pub fn memory_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    database::setup::init_schema(&pool.get().unwrap()).unwrap();
    pool
}

pub fn memory_conn() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    database::setup::init_schema(&conn).unwrap();
    conn
}

// Coordinates below are downtown Phoenix; games and referees default to the
// same spot so distance starts at zero unless a test moves someone.
pub fn referee_fixture(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        phone: None,
        first_name: "Riley".to_string(),
        last_name: "Whistle".to_string(),
        role: UserRole::Referee,
        background_check_status: BackgroundCheck::Clear,
        address: None,
        latitude: Some(33.4484),
        longitude: Some(-112.0740),
        reliability_score: 1.0,
        total_games_completed: 0,
        no_show_count: 0,
        emergency_pool_opt_in: false,
        travel_radius_km: 50.0,
        organization_name: None,
    }
}

pub fn organizer_fixture(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        phone: None,
        first_name: "Jordan".to_string(),
        last_name: "League".to_string(),
        role: UserRole::Organizer,
        background_check_status: BackgroundCheck::Clear,
        address: None,
        latitude: None,
        longitude: None,
        reliability_score: 1.0,
        total_games_completed: 0,
        no_show_count: 0,
        emergency_pool_opt_in: false,
        travel_radius_km: 50.0,
        organization_name: Some("Valley League".to_string()),
    }
}

pub fn game_fixture(organizer_id: i64, scheduled_at: DateTime<Utc>) -> NewGame {
    NewGame {
        organizer_id,
        sport: Sport::Basketball,
        required_level: CertLevel::Entry,
        scheduled_at,
        duration_minutes: 90,
        venue_name: "Court A".to_string(),
        address: "100 Main St, Phoenix".to_string(),
        latitude: Some(33.4484),
        longitude: Some(-112.0740),
        home_team: None,
        away_team: None,
        importance: 3,
        notes: None,
        base_rate: 50.0,
        surge_multiplier: 1.0,
        final_rate: 50.0,
    }
}

/// Detached referee row for pure scoring tests; never touches a database.
pub fn referee_snapshot(reliability: f64, completed: i64, no_shows: i64, radius_km: f64) -> User {
    User {
        id: 0,
        email: "snapshot@example.com".to_string(),
        phone: None,
        first_name: "Snap".to_string(),
        last_name: "Shot".to_string(),
        role: UserRole::Referee,
        is_active: true,
        background_check_status: BackgroundCheck::Clear,
        address: None,
        latitude: Some(33.4484),
        longitude: Some(-112.0740),
        reliability_score: reliability,
        total_games_assigned: 0,
        total_games_completed: completed,
        no_show_count: no_shows,
        emergency_pool_opt_in: false,
        travel_radius_km: radius_km,
        organization_name: None,
        created_at: Utc::now(),
    }
}

pub fn insert_referee(conn: &rusqlite::Connection, email: &str) -> User {
    database::users::insert(conn, &referee_fixture(email)).unwrap()
}

pub fn insert_organizer(conn: &rusqlite::Connection, email: &str) -> User {
    database::users::insert(conn, &organizer_fixture(email)).unwrap()
}

pub fn insert_game(
    conn: &rusqlite::Connection,
    organizer_id: i64,
    scheduled_at: DateTime<Utc>,
) -> Game {
    database::games::insert(conn, &game_fixture(organizer_id, scheduled_at)).unwrap()
}

pub fn insert_certification(
    conn: &rusqlite::Connection,
    referee_id: i64,
    sport: Sport,
    level: CertLevel,
) -> Certification {
    database::certifications::insert(conn, referee_id, sport, level, None, None).unwrap()
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|m| m.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &NotificationMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _message: &NotificationMessage) -> Result<()> {
        anyhow::bail!("notifier offline")
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    pub charges: Mutex<Vec<(i64, f64)>>,
    pub payouts: Mutex<Vec<(i64, f64)>>,
}

impl PaymentGateway for RecordingGateway {
    fn create_charge(&self, game_id: i64, amount: f64) -> Result<String> {
        self.charges.lock().unwrap().push((game_id, amount));
        Ok(format!("pi_test_{game_id}"))
    }

    fn create_payout(&self, assignment_id: i64, amount: f64) -> Result<String> {
        self.payouts.lock().unwrap().push((assignment_id, amount));
        Ok(format!("po_test_{assignment_id}"))
    }
}

pub struct FailingGateway;

impl PaymentGateway for FailingGateway {
    fn create_charge(&self, _game_id: i64, _amount: f64) -> Result<String> {
        anyhow::bail!("gateway offline")
    }

    fn create_payout(&self, _assignment_id: i64, _amount: f64) -> Result<String> {
        anyhow::bail!("gateway offline")
    }
}
