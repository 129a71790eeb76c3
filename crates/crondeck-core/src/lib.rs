//! Reconciliation engine for crondeck functions and scheduled triggers.
//!
//! Brings remote function resources (code artifact, execution role, runtime
//! configuration) and cron-scheduled invocation triggers (rule, permission
//! grant, target) into agreement with their local declarations. All remote
//! state lives behind the client traits of `crondeck-platform`; no local
//! cache is kept between operations.

pub mod function;
pub mod naming;
pub mod package;
pub mod retry;
pub mod role;
pub mod trigger;

pub use function::{DeployAction, DeployOutcome, Deployer, FunctionSpec};
pub use package::package_dir;
pub use retry::Backoff;
pub use role::RoleProvisioner;
pub use trigger::{TriggerEntry, TriggerReconciler};

use crondeck_platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("packaging error: {0}")]
    Packaging(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("declaration error: {0}")]
    Declaration(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("data integrity error: {0}")]
    Integrity(String),
    #[error("execution role not assumable after {attempts} attempts")]
    RoleSettleTimeout { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_errors_convert() {
        let err: CoreError = PlatformError::NotFound("x".to_owned()).into();
        assert!(matches!(err, CoreError::Platform(_)));
    }

    #[test]
    fn error_messages_are_prefixed() {
        assert!(CoreError::Packaging("bad".to_owned())
            .to_string()
            .starts_with("packaging error:"));
        assert!(CoreError::Declaration("bad".to_owned())
            .to_string()
            .starts_with("declaration error:"));
    }
}
