use anyhow::Result;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::config::AppConfig;
use crate::database;
use crate::integrations::{GeocodeClient, LogGateway, LogNotifier, Notifier, WebhookNotifier};
use crate::scheduler::{self, TimerService};
use crate::services::assignments::AssignmentService;
use crate::services::games::GameService;
use crate::services::notifications::NotificationService;
use crate::services::payments::PaymentService;
use crate::services::reviews::ReviewService;
use crate::services::sweep::SweepService;

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let db_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "refmatch.db".to_string());

        let pool = database::create_pool(&db_path)?;
        {
            let conn = database::get_connection(&pool)?;
            database::setup::init_schema(&conn)?;
        }

        let mut config = self.config.clone();
        if config.notifier.webhook_url.is_none() {
            config.notifier.webhook_url = std::env::var("NOTIFY_WEBHOOK_URL").ok();
        }

        let notifier: Arc<dyn Notifier> = match config.notifier.webhook_url.clone() {
            Some(url) => {
                info!("Delivering notifications to webhook at {url}");
                Arc::new(WebhookNotifier::new(url)?)
            }
            None => Arc::new(LogNotifier),
        };

        let timers = TimerService::new();
        let notifications = Arc::new(NotificationService::new(
            pool.clone(),
            config.notifier.clone(),
            notifier,
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
            timers.clone(),
            notifications.clone(),
            payments.clone(),
            reviews.clone(),
        );
        let games = GameService::new(
            pool.clone(),
            config.pricing.clone(),
            notifications.clone(),
            assignments.clone(),
        )?;
        let sweep = SweepService::new(
            pool.clone(),
            config.matching.clone(),
            config.pricing.clone(),
            assignments.clone(),
        );
        let geocoder = GeocodeClient::new()?;

        // Confirmation deadlines and reminders do not survive a restart on
        // their own; rebuild them from the open assignment rows.
        let rehydrated = assignments.rehydrate_timers()?;
        info!("Rehydrated {} timers from open assignments", rehydrated);

        tokio::spawn(scheduler::runner::run(
            timers.clone(),
            assignments.clone(),
            config.matching.timer_tick_secs,
        ));
        tokio::spawn(run_periodic_sweep(
            sweep.clone(),
            config.matching.sweep_interval_secs,
        ));

        let state = Arc::new(AppState {
            pool,
            config: config.clone(),
            games,
            assignments,
            payments,
            reviews,
            sweep,
            geocoder,
        });

        let app = create_router(state).layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn run_periodic_sweep(sweep: SweepService, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    info!("Sweep loop started with {}s interval", interval_secs);

    loop {
        interval.tick().await;

        if let Err(err) = sweep.process_pending_games() {
            error!("Periodic sweep failed: {err:?}");
        }
    }
}
