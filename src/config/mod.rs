pub mod rates;
pub mod settings;

pub use settings::{AppConfig, MatchingSettings, NotifierSettings, PricingSettings};
