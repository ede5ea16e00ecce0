pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod geo;
pub mod integrations;
pub mod matching;
pub mod rate_limiter;
pub mod scheduler;
pub mod services;

#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::integrations::{LogGateway, LogNotifier};
use crate::scheduler::TimerService;
use crate::services::assignments::AssignmentService;
use crate::services::notifications::NotificationService;
use crate::services::payments::PaymentService;
use crate::services::reviews::ReviewService;
use crate::services::seed::SeedService;
use crate::services::server::ServerService;
use crate::services::sweep::SweepService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

/// One-shot sweep for cron-style scheduling; notifications go to the log.
pub fn handle_sweep() -> Result<()> {
    let config = AppConfig::new();
    let pool = open_database()?;

    let notifications = Arc::new(NotificationService::new(
        pool.clone(),
        config.notifier.clone(),
        Arc::new(LogNotifier),
    ));
    let payments = Arc::new(PaymentService::new(
        pool.clone(),
        config.pricing.clone(),
        Arc::new(LogGateway),
        notifications.clone(),
    ));
    let reviews = Arc::new(ReviewService::new(pool.clone(), notifications.clone()));
    let assignments = AssignmentService::new(
        pool.clone(),
        config.matching.clone(),
        TimerService::new(),
        notifications,
        payments,
        reviews,
    );
    let sweep = SweepService::new(pool, config.matching, config.pricing, assignments);

    sweep.process_pending_games()?;
    Ok(())
}

pub fn handle_seed() -> Result<()> {
    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "refmatch.db".to_string());
    if std::path::Path::new(&db_path).exists() {
        std::fs::remove_file(&db_path)?;
        info!("Removed existing database at {}", db_path);
    }

    let pool = open_database()?;
    SeedService::new(pool).run()
}

fn open_database() -> Result<database::DbPool> {
    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "refmatch.db".to_string());
    let pool = database::create_pool(&db_path)?;
    {
        let conn = database::get_connection(&pool)?;
        database::setup::init_schema(&conn)?;
    }
    Ok(pool)
}
