use crate::CoreError;
use crondeck_platform::{Ensured, IamClient, RoleRecord};

/// Trust policy attached to every execution role: the compute service may
/// assume the role at invocation time. Fixed for all functions.
pub const TRUST_POLICY: &str = r#"{
  "statement": [
    {
      "effect": "Allow",
      "principal": { "service": ["compute.platform.internal"] },
      "action": ["identity:AssumeRole"]
    }
  ]
}"#;

/// Managed policy granting the permissions needed for network-attached
/// execution. Attached only when the function spec requests a network
/// attachment.
pub const NETWORK_ACCESS_POLICY_ID: &str = "prn:iam:policy:service-role/NetworkAccessExecution";

/// Idempotent provisioning of a function's execution role.
///
/// The identity service treats duplicate creates as errors, so every
/// mutation here is preceded by an existence check and conflicts from
/// racing creates are folded into [`Ensured::AlreadyPresent`]. The
/// provisioner tolerates re-running against partially provisioned state.
pub struct RoleProvisioner<'a> {
    iam: &'a dyn IamClient,
}

impl<'a> RoleProvisioner<'a> {
    pub fn new(iam: &'a dyn IamClient) -> Self {
        Self { iam }
    }

    /// Return the existing role unchanged, or create it with the fixed
    /// trust policy.
    pub fn ensure_role(&self, name: &str) -> Result<(RoleRecord, Ensured), CoreError> {
        match self.iam.get_role(name) {
            Ok(role) => Ok((role, Ensured::AlreadyPresent)),
            Err(e) if e.is_not_found() => match self.iam.create_role(name, TRUST_POLICY) {
                Ok(role) => {
                    tracing::info!("created execution role {name}");
                    Ok((role, Ensured::Created))
                }
                // Lost a race with a concurrent create; the role exists now.
                Err(e) if e.is_conflict() => Ok((self.iam.get_role(name)?, Ensured::AlreadyPresent)),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Attach or overwrite the role's inline policy. Overwrite semantics,
    /// unconditionally idempotent.
    pub fn put_inline_policy(
        &self,
        role: &str,
        policy: &str,
        document: &str,
    ) -> Result<(), CoreError> {
        self.iam.put_role_policy(role, policy, document)?;
        Ok(())
    }

    /// Attach the managed network-access policy to the role.
    pub fn attach_network_policy(&self, role: &str) -> Result<(), CoreError> {
        self.iam.attach_managed_policy(role, NETWORK_ACCESS_POLICY_ID)?;
        Ok(())
    }

    /// Ensure the role and its inline policy are absent. The inline policy
    /// must go first: the identity service refuses to delete a role that
    /// still carries one. Already-absent resources are success.
    pub fn delete_role(&self, role: &str, policy: &str) -> Result<(), CoreError> {
        match self.iam.delete_role_policy(role, policy) {
            Ok(()) => tracing::debug!("deleted inline policy {policy}"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        match self.iam.delete_role(role) {
            Ok(()) => {
                tracing::info!("deleted execution role {role}");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
