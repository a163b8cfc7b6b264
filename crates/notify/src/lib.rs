//! Outbound email for imgocr.
//!
//! [`EmailDelivery`] sends through SMTP with `lettre`. When `SMTP_HOST` is
//! not configured, [`notifier_from_env`] hands out a [`DisabledNotifier`]
//! so callers can still run; every send then fails with
//! [`DeliveryError::NotConfigured`](imgocr_core::notify::DeliveryError).

pub mod disabled;
pub mod email;

use std::sync::Arc;

use imgocr_core::notify::Notifier;

pub use disabled::DisabledNotifier;
pub use email::{EmailConfig, EmailDelivery, EmailError};

/// Build the process-wide notifier from environment variables.
pub fn notifier_from_env() -> Result<Arc<dyn Notifier>, EmailError> {
    match EmailConfig::from_env() {
        Some(config) => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP email delivery enabled");
            Ok(Arc::new(EmailDelivery::new(config)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, email delivery disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
