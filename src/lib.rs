//! Watches a ticket sales page and sends a WhatsApp message once it becomes accessible.

pub mod checker;
pub mod config;
pub mod error;
pub mod messaging;
pub mod monitor;
pub mod notifier;
pub mod scheduler;
pub mod telemetry;
