use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

// Enums are stored as TEXT; as_str/parse define the on-disk vocabulary.
macro_rules! impl_sql_text {
    ($type:ty, $label:literal) => {
        impl ToSql for $type {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $type {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                Self::parse(text).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", $label, text).into())
                })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Referee,
    Organizer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Referee => "referee",
            UserRole::Organizer => "organizer",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "referee" => Some(UserRole::Referee),
            "organizer" => Some(UserRole::Organizer),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl_sql_text!(UserRole, "user role");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundCheck {
    Pending,
    Clear,
    Failed,
}

impl BackgroundCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundCheck::Pending => "pending",
            BackgroundCheck::Clear => "clear",
            BackgroundCheck::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BackgroundCheck::Pending),
            "clear" => Some(BackgroundCheck::Clear),
            "failed" => Some(BackgroundCheck::Failed),
            _ => None,
        }
    }
}

impl_sql_text!(BackgroundCheck, "background check status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Basketball,
    Football,
    Soccer,
    Softball,
    Volleyball,
    Baseball,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Basketball => "basketball",
            Sport::Football => "football",
            Sport::Soccer => "soccer",
            Sport::Softball => "softball",
            Sport::Volleyball => "volleyball",
            Sport::Baseball => "baseball",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basketball" => Some(Sport::Basketball),
            "football" => Some(Sport::Football),
            "soccer" => Some(Sport::Soccer),
            "softball" => Some(Sport::Softball),
            "volleyball" => Some(Sport::Volleyball),
            "baseball" => Some(Sport::Baseball),
            _ => None,
        }
    }

    /// Title-case form used in outbound messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Sport::Basketball => "Basketball",
            Sport::Football => "Football",
            Sport::Soccer => "Soccer",
            Sport::Softball => "Softball",
            Sport::Volleyball => "Volleyball",
            Sport::Baseball => "Baseball",
        }
    }
}

impl_sql_text!(Sport, "sport");

/// Certification tiers, ordered. An advanced requirement is satisfied only by
/// an advanced certification; intermediate accepts intermediate or advanced;
/// entry accepts any tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertLevel {
    Entry,
    Intermediate,
    Advanced,
}

impl CertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertLevel::Entry => "entry",
            CertLevel::Intermediate => "intermediate",
            CertLevel::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entry" => Some(CertLevel::Entry),
            "intermediate" => Some(CertLevel::Intermediate),
            "advanced" => Some(CertLevel::Advanced),
            _ => None,
        }
    }

    /// Levels a certification may hold to satisfy this requirement.
    pub fn accepted_levels(&self) -> &'static [CertLevel] {
        match self {
            CertLevel::Advanced => &[CertLevel::Advanced],
            CertLevel::Intermediate => &[CertLevel::Intermediate, CertLevel::Advanced],
            CertLevel::Entry => &[
                CertLevel::Entry,
                CertLevel::Intermediate,
                CertLevel::Advanced,
            ],
        }
    }
}

impl_sql_text!(CertLevel, "certification level");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::Assigned => "assigned",
            GameStatus::InProgress => "in_progress",
            GameStatus::Completed => "completed",
            GameStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(GameStatus::Pending),
            "assigned" => Some(GameStatus::Assigned),
            "in_progress" => Some(GameStatus::InProgress),
            "completed" => Some(GameStatus::Completed),
            "cancelled" => Some(GameStatus::Cancelled),
            _ => None,
        }
    }
}

impl_sql_text!(GameStatus, "game status");

/// Assignment lifecycle. `Pending` is reserved for unpromoted backups;
/// a primary starts at `Notified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Notified,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
    NoShow,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Notified => "notified",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::Cancelled => "cancelled",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::NoShow => "no_show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AssignmentStatus::Pending),
            "notified" => Some(AssignmentStatus::Notified),
            "confirmed" => Some(AssignmentStatus::Confirmed),
            "rejected" => Some(AssignmentStatus::Rejected),
            "cancelled" => Some(AssignmentStatus::Cancelled),
            "completed" => Some(AssignmentStatus::Completed),
            "no_show" => Some(AssignmentStatus::NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::Cancelled | AssignmentStatus::NoShow
        )
    }
}

impl_sql_text!(AssignmentStatus, "assignment status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Charge,
    Payout,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Charge => "charge",
            PaymentKind::Payout => "payout",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "charge" => Some(PaymentKind::Charge),
            "payout" => Some(PaymentKind::Payout),
            _ => None,
        }
    }
}

impl_sql_text!(PaymentKind, "payment kind");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl_sql_text!(PaymentStatus, "payment status");

/// Whether the referee's payout for an assignment has gone out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PayoutStatus::Pending),
            "paid" => Some(PayoutStatus::Paid),
            _ => None,
        }
    }
}

impl_sql_text!(PayoutStatus, "payout status");

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub background_check_status: BackgroundCheck,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reliability_score: f64,
    pub total_games_assigned: i64,
    pub total_games_completed: i64,
    pub no_show_count: i64,
    pub emergency_pool_opt_in: bool,
    pub travel_radius_km: f64,
    pub organization_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: i64,
    pub organizer_id: i64,
    pub sport: Sport,
    pub required_level: CertLevel,
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
    pub status: GameStatus,
    pub base_rate: f64,
    pub surge_multiplier: f64,
    pub final_rate: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Certification {
    pub id: i64,
    pub referee_id: i64,
    pub sport: Sport,
    pub level: CertLevel,
    pub is_active: bool,
    pub passed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Calendar record; the three collections are stored as JSON text and parsed
/// by the availability check.
#[derive(Debug, Clone)]
pub struct Availability {
    pub id: i64,
    pub referee_id: i64,
    pub time_slots: String,
    pub recurring_weekly: String,
    pub blackout_dates: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: i64,
    pub game_id: i64,
    pub referee_id: i64,
    pub status: AssignmentStatus,
    pub is_backup: bool,
    pub match_score: f64,
    pub distance_km: Option<f64>,
    pub notified_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_amount: Option<f64>,
    pub payment_status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Review {
    pub id: i64,
    pub assignment_id: i64,
    pub referee_id: i64,
    pub reviewer_id: i64,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub id: i64,
    pub assignment_id: Option<i64>,
    pub game_id: i64,
    pub kind: PaymentKind,
    pub amount: f64,
    pub platform_fee: f64,
    pub net_amount: f64,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Insert DTOs, to keep the insert functions off the long-argument-list style.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub background_check_status: BackgroundCheck,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reliability_score: f64,
    pub total_games_completed: i64,
    pub no_show_count: i64,
    pub emergency_pool_opt_in: bool,
    pub travel_radius_km: f64,
    pub organization_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGame {
    pub organizer_id: i64,
    pub sport: Sport,
    pub required_level: CertLevel,
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
    pub base_rate: f64,
    pub surge_multiplier: f64,
    pub final_rate: f64,
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub game_id: i64,
    pub referee_id: i64,
    pub status: AssignmentStatus,
    pub is_backup: bool,
    pub match_score: f64,
    pub distance_km: Option<f64>,
    pub notified_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub payment_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advanced_requirement_accepts_only_advanced() {
        assert_eq!(
            CertLevel::Advanced.accepted_levels(),
            &[CertLevel::Advanced]
        );
    }

    #[test]
    fn test_intermediate_requirement_accepts_intermediate_and_advanced() {
        let accepted = CertLevel::Intermediate.accepted_levels();
        assert!(accepted.contains(&CertLevel::Intermediate));
        assert!(accepted.contains(&CertLevel::Advanced));
        assert!(!accepted.contains(&CertLevel::Entry));
    }

    #[test]
    fn test_entry_requirement_accepts_all_levels() {
        assert_eq!(CertLevel::Entry.accepted_levels().len(), 3);
    }

    #[test]
    fn test_assignment_status_round_trips_through_text() {
        for status in [
            AssignmentStatus::Pending,
            AssignmentStatus::Notified,
            AssignmentStatus::Confirmed,
            AssignmentStatus::Rejected,
            AssignmentStatus::Cancelled,
            AssignmentStatus::Completed,
            AssignmentStatus::NoShow,
        ] {
            assert_eq!(AssignmentStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(AssignmentStatus::Completed.is_terminal());
        assert!(AssignmentStatus::Cancelled.is_terminal());
        assert!(AssignmentStatus::NoShow.is_terminal());
        assert!(!AssignmentStatus::Notified.is_terminal());
        assert!(!AssignmentStatus::Pending.is_terminal());
        assert!(!AssignmentStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_sport_parse_rejects_unknown() {
        assert_eq!(Sport::parse("cricket"), None);
    }
}
