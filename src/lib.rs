// Odoo Bill Webhook - Core Library
// Shared by the CLI, the webhook server, and tests

pub mod bills;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod odoo;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use bills::{
    bill_values, create_bill, ensure_vendor, pick_expense_account, submit_bill, submit_bill_with,
};
pub use command::{BillIntent, CommandIntent, Currency, DEFAULT_DESCRIPTION};
pub use config::{Config, OdooCredentials};
pub use error::{WebhookError, WebhookResult};
pub use logging::init_logging;
pub use odoo::{DomainTerm, OdooClient, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
