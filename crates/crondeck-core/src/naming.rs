//! Derived-name conventions.
//!
//! Every remote identifier this system touches is a pure function of a
//! user-chosen name: the platform-visible function name carries a fixed
//! namespace prefix, and role, policy, rule, artifact, and permission
//! statement names are derived from it. Nothing here is persisted; keeping
//! the derivations in one module keeps every call site in agreement.

/// Namespace prefix for all remote resources owned by this tool.
pub const NAME_PREFIX: &str = "Crondeck-";

/// Platform-visible function name for a user-chosen spec name.
pub fn qualified(name: &str) -> String {
    format!("{NAME_PREFIX}{name}")
}

/// Strip the namespace prefix from a platform-visible name.
/// Names outside the namespace are returned unchanged.
pub fn unqualified(long_name: &str) -> &str {
    long_name.strip_prefix(NAME_PREFIX).unwrap_or(long_name)
}

/// Object-store key for a function's code artifact.
pub fn artifact_key(name: &str) -> String {
    format!("crondeck/artifacts/{name}.tar")
}

/// Execution role name for a function.
pub fn role_name(name: &str) -> String {
    format!("{}-exec-role", qualified(name))
}

/// Inline policy name attached to a function's execution role.
pub fn policy_name(name: &str) -> String {
    format!("{}-exec-policy", qualified(name))
}

/// Schedule rule name for a trigger.
pub fn rule_name(trigger: &str) -> String {
    format!("{NAME_PREFIX}{trigger}")
}

/// Permission statement id for a trigger invoking a function.
///
/// Keyed on the (trigger, function) pair so that two triggers targeting the
/// same function hold independent grants; deleting one trigger cannot revoke
/// the permission the other still relies on.
pub fn statement_id(trigger: &str, function: &str) -> String {
    format!("{NAME_PREFIX}{trigger}-{function}-invoke")
}

/// Recover the platform-visible function name from a function identifier
/// such as `frn:compute:function:Crondeck-report`.
pub fn function_name_from_id(function_id: &str) -> &str {
    function_id.rsplit(':').next().unwrap_or(function_id)
}
