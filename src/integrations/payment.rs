use anyhow::Result;
use chrono::Utc;
use log::info;

/// Processor boundary for money movement. Implementations return an opaque
/// reference for the created charge or payout.
pub trait PaymentGateway: Send + Sync {
    fn create_charge(&self, game_id: i64, amount: f64) -> Result<String>;
    fn create_payout(&self, assignment_id: i64, amount: f64) -> Result<String>;
}

/// Stand-in processor: fabricates references and logs the movement. Keeps the
/// ledger flowing in environments without a real processor account.
pub struct LogGateway;

impl PaymentGateway for LogGateway {
    fn create_charge(&self, game_id: i64, amount: f64) -> Result<String> {
        let reference = format!("pi_{}_{}", game_id, Utc::now().timestamp());
        info!("Charge of {:.2} for game {} as {}", amount, game_id, reference);
        Ok(reference)
    }

    fn create_payout(&self, assignment_id: i64, amount: f64) -> Result<String> {
        let reference = format!("po_{}_{}", assignment_id, Utc::now().timestamp());
        info!(
            "Payout of {:.2} for assignment {} as {}",
            amount, assignment_id, reference
        );
        Ok(reference)
    }
}
