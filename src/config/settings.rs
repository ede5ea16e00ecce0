#[derive(Clone)]
pub struct MatchingSettings {
    pub confirmation_window_hours: i64,
    pub backup_count: usize,
    pub conflict_window_hours: i64,
    pub reminder_offsets_hours: [i64; 2],
    pub emergency_min_reliability: f64,
    pub sweep_interval_secs: u64,
    pub timer_tick_secs: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            confirmation_window_hours: 24,
            backup_count: 2,
            conflict_window_hours: 2,
            reminder_offsets_hours: [12, 1],
            emergency_min_reliability: 0.9,
            sweep_interval_secs: 3600,
            timer_tick_secs: 30,
        }
    }
}

#[derive(Clone)]
pub struct PricingSettings {
    pub surge_cap: f64,
    pub platform_fee: f64,
    pub emergency_surge_multiplier: f64,
    pub last_minute_surge: f64,
    pub last_minute_threshold_hours: i64,
    pub importance_surge_step: f64,
    pub demand_surge_cap: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            surge_cap: 1.5,
            platform_fee: 0.15,
            emergency_surge_multiplier: 1.2,
            last_minute_surge: 0.2,
            last_minute_threshold_hours: 24,
            importance_surge_step: 0.05,
            demand_surge_cap: 0.3,
        }
    }
}

#[derive(Clone)]
pub struct NotifierSettings {
    pub admin_email: &'static str,
    pub app_url: &'static str,
    /// When set, notifications are POSTed here instead of logged.
    pub webhook_url: Option<String>,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            admin_email: "admin@refmatch.com",
            app_url: "http://localhost:3000",
            webhook_url: None,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub matching: MatchingSettings,
    pub pricing: PricingSettings,
    pub notifier: NotifierSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            matching: MatchingSettings::default(),
            pricing: PricingSettings::default(),
            notifier: NotifierSettings::default(),
        }
    }
}
