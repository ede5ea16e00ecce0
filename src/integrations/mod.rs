pub mod geocode;
pub mod notifier;
pub mod payment;

pub use geocode::GeocodeClient;
pub use notifier::{
    LogNotifier, NotificationKind, NotificationMessage, Notifier, Recipient, WebhookNotifier,
};
pub use payment::{LogGateway, PaymentGateway};
