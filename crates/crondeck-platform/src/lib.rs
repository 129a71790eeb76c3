//! Remote control-plane clients for the crondeck serverless platform.
//!
//! This crate defines one client trait per remote capability (compute,
//! scheduler, identity, object storage), a shared error taxonomy, an HTTP
//! backend speaking a plain REST control-plane API, and an in-memory mock
//! platform used by reconciler tests.

pub mod config;
pub mod http;
pub mod mock;
pub mod types;

pub use config::PlatformConfig;
pub use http::HttpPlatform;
pub use mock::MemoryPlatform;
pub use types::{
    CodeLocation, CreateFunction, FunctionConfig, FunctionRecord, NetworkConfig, PermissionGrant,
    RoleRecord, RuleRecord, RuleTarget,
};

/// Protocol version sent as `X-Crondeck-Protocol` header on all HTTP requests.
pub const PROTOCOL_VERSION: u32 = 1;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("resource already exists: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("execution role not yet assumable: {0}")]
    RoleNotReady(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("platform config error: {0}")]
    Config(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_role_not_ready(&self) -> bool {
        matches!(self, Self::RoleNotReady(_))
    }
}

/// Outcome of an idempotent "ensure it exists" operation.
///
/// Create-like calls against the control plane fail on duplicates; ensure
/// operations convert that conflict into `AlreadyPresent` instead of making
/// callers catch and classify errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Created,
    AlreadyPresent,
}

/// Function resource operations on the compute platform.
pub trait ComputeClient {
    /// Fetch a function by its platform-visible name. `NotFound` if absent.
    fn get_function(&self, name: &str) -> Result<FunctionRecord, PlatformError>;

    /// Create a function. `Conflict` if one with the same name exists,
    /// `RoleNotReady` if the execution role is not yet assumable.
    fn create_function(&self, req: &CreateFunction) -> Result<FunctionRecord, PlatformError>;

    /// Point an existing function at a new code artifact.
    fn update_function_code(
        &self,
        name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), PlatformError>;

    /// Overwrite an existing function's runtime configuration.
    fn update_function_configuration(
        &self,
        name: &str,
        config: &FunctionConfig,
    ) -> Result<(), PlatformError>;

    fn delete_function(&self, name: &str) -> Result<(), PlatformError>;

    /// List functions whose names start with `prefix`.
    fn list_functions(&self, prefix: &str) -> Result<Vec<FunctionRecord>, PlatformError>;

    /// Synchronous request/response invocation. Returns the raw response body.
    fn invoke(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>, PlatformError>;

    /// Grant a principal permission to invoke the function. `Conflict` if a
    /// grant with the same statement id already exists.
    fn add_permission(&self, name: &str, grant: &PermissionGrant) -> Result<(), PlatformError>;

    fn remove_permission(&self, name: &str, statement_id: &str) -> Result<(), PlatformError>;
}

/// Schedule-rule operations on the event scheduler.
pub trait SchedulerClient {
    /// Create or replace a rule. Returns the rule's platform identifier,
    /// used as the source scope of invocation permission grants.
    fn put_rule(&self, name: &str, schedule: &str) -> Result<String, PlatformError>;

    fn list_rules(&self, prefix: &str) -> Result<Vec<RuleRecord>, PlatformError>;

    /// Bind or replace a target on a rule, keyed by the target id.
    fn put_target(&self, rule: &str, target: &RuleTarget) -> Result<(), PlatformError>;

    fn list_targets(&self, rule: &str) -> Result<Vec<RuleTarget>, PlatformError>;

    fn remove_target(&self, rule: &str, target_id: &str) -> Result<(), PlatformError>;

    fn delete_rule(&self, name: &str) -> Result<(), PlatformError>;

    /// Enable or disable a rule without touching its targets.
    fn set_rule_state(&self, name: &str, enabled: bool) -> Result<(), PlatformError>;
}

/// Execution-role operations on the identity service.
pub trait IamClient {
    fn get_role(&self, name: &str) -> Result<RoleRecord, PlatformError>;

    /// Create a role with the given trust policy. `Conflict` if it exists.
    fn create_role(&self, name: &str, trust_policy: &str) -> Result<RoleRecord, PlatformError>;

    /// Attach or overwrite an inline policy document on a role.
    fn put_role_policy(&self, role: &str, policy: &str, doc: &str) -> Result<(), PlatformError>;

    fn delete_role_policy(&self, role: &str, policy: &str) -> Result<(), PlatformError>;

    /// Attach a managed policy by its platform identifier. Idempotent.
    fn attach_managed_policy(&self, role: &str, policy_id: &str) -> Result<(), PlatformError>;

    /// Delete a role. `Conflict` if inline policies are still attached.
    fn delete_role(&self, name: &str) -> Result<(), PlatformError>;
}

/// Artifact blob operations on the object store.
pub trait StorageClient {
    fn put_object(&self, bucket: &str, key: &str, local: &Path) -> Result<(), PlatformError>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classifiers() {
        assert!(PlatformError::NotFound("x".to_owned()).is_not_found());
        assert!(PlatformError::Conflict("x".to_owned()).is_conflict());
        assert!(PlatformError::RoleNotReady("x".to_owned()).is_role_not_ready());
        assert!(!PlatformError::Http("x".to_owned()).is_not_found());
    }

    #[test]
    fn ensured_variants_distinct() {
        assert_ne!(Ensured::Created, Ensured::AlreadyPresent);
    }
}
