pub mod audit;
pub mod enums;
pub mod filters;
pub mod metrics;
pub mod patient;
pub mod user;

pub use audit::AuditEntry;
pub use filters::PatientFilter;
pub use metrics::PatientMetrics;
pub use patient::{NewPatient, Patient, StageTimestamps};
pub use user::{User, UserRoles};
