use anyhow::Result;
use chrono::{Duration, Utc};
use log::info;
use serde_json::json;

use crate::config::rates;
use crate::database::{
    self, availabilities, certifications, games, users, BackgroundCheck, CertLevel, DbPool,
    NewGame, NewUser, Sport, UserRole,
};

/// Phoenix city center, the anchor for every seeded coordinate.
const PHOENIX: (f64, f64) = (33.4484, -112.0740);

struct RefereeSeed {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    reliability: f64,
    completed: i64,
    emergency: bool,
    radius_km: f64,
    offset: (f64, f64),
    certs: &'static [(Sport, CertLevel)],
}

const REFEREES: &[RefereeSeed] = &[
    RefereeSeed {
        email: "referee1@email.com",
        first_name: "Marcus",
        last_name: "Reid",
        reliability: 0.97,
        completed: 45,
        emergency: true,
        radius_km: 50.0,
        offset: (0.010, -0.008),
        certs: &[
            (Sport::Basketball, CertLevel::Advanced),
            (Sport::Football, CertLevel::Intermediate),
        ],
    },
    RefereeSeed {
        email: "referee2@email.com",
        first_name: "Dana",
        last_name: "Okafor",
        reliability: 0.94,
        completed: 30,
        emergency: true,
        radius_km: 40.0,
        offset: (-0.012, 0.009),
        certs: &[
            (Sport::Basketball, CertLevel::Intermediate),
            (Sport::Soccer, CertLevel::Entry),
        ],
    },
    RefereeSeed {
        email: "referee3@email.com",
        first_name: "Luis",
        last_name: "Gallardo",
        reliability: 0.91,
        completed: 24,
        emergency: true,
        radius_km: 30.0,
        offset: (0.020, 0.015),
        certs: &[(Sport::Soccer, CertLevel::Advanced)],
    },
    RefereeSeed {
        email: "referee4@email.com",
        first_name: "Priya",
        last_name: "Nair",
        reliability: 0.89,
        completed: 18,
        emergency: false,
        radius_km: 25.0,
        offset: (-0.018, -0.020),
        certs: &[(Sport::Basketball, CertLevel::Entry)],
    },
    RefereeSeed {
        email: "referee5@email.com",
        first_name: "Tom",
        last_name: "Weaver",
        reliability: 0.86,
        completed: 12,
        emergency: false,
        radius_km: 30.0,
        offset: (0.030, -0.025),
        certs: &[
            (Sport::Football, CertLevel::Entry),
            (Sport::Basketball, CertLevel::Entry),
        ],
    },
    RefereeSeed {
        email: "referee6@email.com",
        first_name: "Aisha",
        last_name: "Brooks",
        reliability: 0.84,
        completed: 9,
        emergency: false,
        radius_km: 40.0,
        offset: (-0.028, 0.022),
        certs: &[(Sport::Football, CertLevel::Advanced)],
    },
    RefereeSeed {
        email: "referee7@email.com",
        first_name: "Evan",
        last_name: "Kowalski",
        reliability: 0.82,
        completed: 5,
        emergency: false,
        radius_km: 25.0,
        offset: (0.015, 0.030),
        certs: &[(Sport::Soccer, CertLevel::Intermediate)],
    },
    // No certifications yet, so never matched. Kept for referee listings.
    RefereeSeed {
        email: "referee8@email.com",
        first_name: "Sam",
        last_name: "Ito",
        reliability: 0.80,
        completed: 2,
        emergency: false,
        radius_km: 50.0,
        offset: (-0.010, -0.015),
        certs: &[],
    },
];

struct GameSeed {
    sport: Sport,
    required_level: CertLevel,
    days_out: i64,
    duration_minutes: i64,
    venue_name: &'static str,
    address: &'static str,
    offset: (f64, f64),
    home_team: &'static str,
    away_team: &'static str,
    importance: i64,
}

const GAMES: &[GameSeed] = &[
    GameSeed {
        sport: Sport::Basketball,
        required_level: CertLevel::Advanced,
        days_out: 1,
        duration_minutes: 120,
        venue_name: "Desert Ridge Gym",
        address: "1801 N Desert Ridge Pkwy, Phoenix, AZ",
        offset: (0.008, 0.004),
        home_team: "Desert Ridge Rattlers",
        away_team: "Mesa Thunder",
        importance: 4,
    },
    GameSeed {
        sport: Sport::Basketball,
        required_level: CertLevel::Entry,
        days_out: 2,
        duration_minutes: 90,
        venue_name: "Roosevelt Rec Center",
        address: "512 W Roosevelt St, Phoenix, AZ",
        offset: (-0.006, -0.010),
        home_team: "Roosevelt Rockets",
        away_team: "Garfield Giants",
        importance: 2,
    },
    GameSeed {
        sport: Sport::Soccer,
        required_level: CertLevel::Entry,
        days_out: 3,
        duration_minutes: 100,
        venue_name: "South Mountain Field",
        address: "10919 S Central Ave, Phoenix, AZ",
        offset: (0.014, 0.018),
        home_team: "South Mountain United",
        away_team: "Laveen Strikers",
        importance: 3,
    },
    GameSeed {
        sport: Sport::Football,
        required_level: CertLevel::Intermediate,
        days_out: 5,
        duration_minutes: 150,
        venue_name: "Camelback Stadium",
        address: "4612 N 28th St, Phoenix, AZ",
        offset: (-0.016, 0.006),
        home_team: "Camelback Spartans",
        away_team: "Arcadia Titans",
        importance: 5,
    },
];

/// Loads a fixed demo dataset: an admin, organizers, certified referees with
/// availability records, and pending games ready for the next sweep. Values
/// are deterministic so repeated demos look the same.
pub struct SeedService {
    pool: DbPool,
}

impl SeedService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn run(&self) -> Result<()> {
        info!("=== Seeding Demo Data ===");
        let conn = database::get_connection(&self.pool)?;
        let now = Utc::now();

        users::insert(&conn, &admin_user())?;
        info!("  → Created admin user");

        let mut organizer_ids = Vec::new();
        for index in 0..3 {
            let organizer = users::insert(&conn, &organizer_user(index))?;
            organizer_ids.push(organizer.id);
        }
        info!("  → Created {} organizers", organizer_ids.len());

        let mut cert_count = 0;
        for (index, seed) in REFEREES.iter().enumerate() {
            let referee = users::insert(&conn, &referee_user(seed))?;
            for (sport, level) in seed.certs {
                certifications::insert(
                    &conn,
                    referee.id,
                    *sport,
                    *level,
                    Some(now - Duration::days(120)),
                    Some(now + Duration::days(365)),
                )?;
                cert_count += 1;
            }
            match index {
                // Weekday template wide enough to keep demo games matchable.
                3 => {
                    availabilities::upsert(
                        &conn,
                        referee.id,
                        "[]",
                        &all_week_template(),
                        "[]",
                    )?;
                }
                4 => {
                    availabilities::upsert(
                        &conn,
                        referee.id,
                        "[]",
                        "{}",
                        &json!(["2026-12-25"]).to_string(),
                    )?;
                }
                _ => {}
            }
        }
        info!(
            "  → Created {} referees with {} certifications",
            REFEREES.len(),
            cert_count
        );

        for seed in GAMES {
            let organizer_id = organizer_ids[seed.importance as usize % organizer_ids.len()];
            games::insert(&conn, &game_row(seed, organizer_id, now))?;
        }
        info!("  → Created {} pending games", GAMES.len());

        info!(
            "=== Seed Complete: 1 admin, {} organizers, {} referees, {} games ===",
            organizer_ids.len(),
            REFEREES.len(),
            GAMES.len()
        );
        Ok(())
    }
}

fn admin_user() -> NewUser {
    NewUser {
        email: "admin@refmatch.com".to_string(),
        phone: Some("+16025550100".to_string()),
        first_name: "Alex".to_string(),
        last_name: "Vance".to_string(),
        role: UserRole::Admin,
        background_check_status: BackgroundCheck::Clear,
        address: None,
        latitude: Some(PHOENIX.0),
        longitude: Some(PHOENIX.1),
        reliability_score: 1.0,
        total_games_completed: 0,
        no_show_count: 0,
        emergency_pool_opt_in: false,
        travel_radius_km: 0.0,
        organization_name: None,
    }
}

fn organizer_user(index: usize) -> NewUser {
    let number = index + 1;
    NewUser {
        email: format!("organizer{number}@school.edu"),
        phone: Some(format!("+1602555020{number}")),
        first_name: "Jordan".to_string(),
        last_name: format!("Organizer{number}"),
        role: UserRole::Organizer,
        background_check_status: BackgroundCheck::Clear,
        address: Some(format!("{} School St, Phoenix, AZ", 100 + number)),
        latitude: Some(PHOENIX.0 + index as f64 * 0.01),
        longitude: Some(PHOENIX.1 - index as f64 * 0.01),
        reliability_score: 1.0,
        total_games_completed: 0,
        no_show_count: 0,
        emergency_pool_opt_in: false,
        travel_radius_km: 0.0,
        organization_name: Some(format!("School {number}")),
    }
}

fn referee_user(seed: &RefereeSeed) -> NewUser {
    NewUser {
        email: seed.email.to_string(),
        phone: None,
        first_name: seed.first_name.to_string(),
        last_name: seed.last_name.to_string(),
        role: UserRole::Referee,
        background_check_status: BackgroundCheck::Clear,
        address: None,
        latitude: Some(PHOENIX.0 + seed.offset.0),
        longitude: Some(PHOENIX.1 + seed.offset.1),
        reliability_score: seed.reliability,
        total_games_completed: seed.completed,
        no_show_count: 0,
        emergency_pool_opt_in: seed.emergency,
        travel_radius_km: seed.radius_km,
        organization_name: None,
    }
}

fn game_row(seed: &GameSeed, organizer_id: i64, now: chrono::DateTime<Utc>) -> NewGame {
    let base_rate = rates::base_rate(seed.sport, seed.required_level);
    NewGame {
        organizer_id,
        sport: seed.sport,
        required_level: seed.required_level,
        scheduled_at: now + Duration::days(seed.days_out),
        duration_minutes: seed.duration_minutes,
        venue_name: seed.venue_name.to_string(),
        address: seed.address.to_string(),
        latitude: Some(PHOENIX.0 + seed.offset.0),
        longitude: Some(PHOENIX.1 + seed.offset.1),
        home_team: Some(seed.home_team.to_string()),
        away_team: Some(seed.away_team.to_string()),
        importance: seed.importance,
        notes: None,
        base_rate,
        surge_multiplier: 1.0,
        final_rate: base_rate,
    }
}

fn all_week_template() -> String {
    let window = json!([{"start": "06:00", "end": "23:00"}]);
    json!({
        "monday": window,
        "tuesday": window,
        "wednesday": window,
        "thursday": window,
        "friday": window,
        "saturday": window,
        "sunday": window,
    })
    .to_string()
}
