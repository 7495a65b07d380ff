pub mod metrics;
pub mod pending;
pub mod transitions;
pub mod validator;

pub use pending::{derive_pending, render_pending, PendingTask};
pub use transitions::{record_transition, StageField};
pub use validator::{validate, validate_identity, ValidationError};
