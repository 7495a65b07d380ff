//! Core engine for an emergency-department patient-tracking desktop
//! application.
//!
//! The GUI shell owns the forms, dialogs, and the live board table; this
//! crate owns everything behind them: the patient data model, the
//! triage-to-discharge precedence rules, pending-task derivation,
//! transition timestamps, workflow-timing metrics, staff accounts, and
//! the audit trail. All state lives in a SQLite database that several
//! installations may share.

pub mod accounts;
pub mod audit;
pub mod config;
pub mod db;
pub mod models;
pub mod service;
pub mod session;
pub mod workflow;

use tracing_subscriber::EnvFilter;

/// Initialize tracing. The GUI shell calls this once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} core starting v{}", config::APP_NAME, config::APP_VERSION);
}
