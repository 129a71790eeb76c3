use serde::{Deserialize, Serialize};

/// Network attachment for a function: the subnets it joins and the security
/// groups governing its traffic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

/// Location of a code artifact in the object store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeLocation {
    pub bucket: String,
    pub key: String,
}

/// Runtime configuration of a function, updated independently of its code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionConfig {
    pub timeout: u64,
    pub memory: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
}

/// Request to create a function resource in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFunction {
    pub name: String,
    pub code: CodeLocation,
    pub role_id: String,
    #[serde(flatten)]
    pub config: FunctionConfig,
}

/// The platform's native descriptor for a deployed function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    /// Platform-wide identifier, e.g. `frn:compute:function:Crondeck-report`.
    pub function_id: String,
    pub role_id: String,
    pub code: CodeLocation,
    #[serde(flatten)]
    pub config: FunctionConfig,
    pub last_modified: String,
}

/// An execution role known to the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,
    pub role_id: String,
    pub trust_policy: String,
}

/// An authorization record allowing a principal to invoke a function,
/// scoped to a source resource (the schedule rule).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGrant {
    pub statement_id: String,
    pub principal: String,
    pub action: String,
    pub source_id: String,
}

/// A cron/rate-triggered event source on the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub name: String,
    pub rule_id: String,
    pub schedule: String,
    pub enabled: bool,
}

/// The binding of a rule to the resource it invokes, plus the payload
/// delivered verbatim at invocation time (serialized JSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleTarget {
    pub id: String,
    pub function_id: String,
    pub input: String,
}
