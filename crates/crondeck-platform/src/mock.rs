use crate::types::{
    CreateFunction, FunctionConfig, FunctionRecord, PermissionGrant, RoleRecord, RuleRecord,
    RuleTarget,
};
use crate::{ComputeClient, IamClient, PlatformError, SchedulerClient, StorageClient};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// In-memory control plane implementing every client trait.
///
/// Mirrors the remote API's failure behavior: duplicate creates conflict,
/// lookups of absent resources are not found, and a role with inline
/// policies still attached refuses deletion. Failure injection hooks let
/// reconciler tests exercise partial-failure paths.
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    functions: BTreeMap<String, FunctionRecord>,
    permissions: BTreeMap<String, BTreeMap<String, PermissionGrant>>,
    roles: BTreeMap<String, RoleRecord>,
    role_policies: BTreeMap<String, BTreeMap<String, String>>,
    attachments: BTreeMap<String, Vec<String>>,
    rules: BTreeMap<String, RuleRecord>,
    targets: BTreeMap<String, BTreeMap<String, RuleTarget>>,
    objects: BTreeMap<String, Vec<u8>>,
    fail_put_object: bool,
    role_not_ready: u32,
    create_function_calls: u32,
    update_code_calls: u32,
}

fn function_id(name: &str) -> String {
    format!("frn:compute:function:{name}")
}

fn object_key(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a test thread panicked; the data is still
    // usable, so recover it instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `put_object` calls fail with an HTTP error.
    pub fn set_fail_put_object(&self, fail: bool) {
        self.lock().fail_put_object = fail;
    }

    /// Reject the next `n` `create_function` calls with `RoleNotReady`,
    /// simulating the role-propagation window of the real control plane.
    pub fn set_role_not_ready(&self, n: u32) {
        self.lock().role_not_ready = n;
    }

    pub fn object_exists(&self, bucket: &str, key: &str) -> bool {
        self.lock().objects.contains_key(&object_key(bucket, key))
    }

    pub fn function(&self, name: &str) -> Option<FunctionRecord> {
        self.lock().functions.get(name).cloned()
    }

    pub fn role(&self, name: &str) -> Option<RoleRecord> {
        self.lock().roles.get(name).cloned()
    }

    pub fn rule(&self, name: &str) -> Option<RuleRecord> {
        self.lock().rules.get(name).cloned()
    }

    /// Statement ids of all permission grants on a function.
    pub fn permission_ids(&self, function: &str) -> Vec<String> {
        self.lock()
            .permissions
            .get(function)
            .map(|grants| grants.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Managed policies attached to a role.
    pub fn attached_policies(&self, role: &str) -> Vec<String> {
        self.lock().attachments.get(role).cloned().unwrap_or_default()
    }

    /// `(create_function, update_function_code)` call counts.
    pub fn call_counts(&self) -> (u32, u32) {
        let state = self.lock();
        (state.create_function_calls, state.update_code_calls)
    }
}

impl ComputeClient for MemoryPlatform {
    fn get_function(&self, name: &str) -> Result<FunctionRecord, PlatformError> {
        self.lock()
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("function '{name}'")))
    }

    fn create_function(&self, req: &CreateFunction) -> Result<FunctionRecord, PlatformError> {
        let mut state = self.lock();
        state.create_function_calls += 1;
        if state.role_not_ready > 0 {
            state.role_not_ready -= 1;
            return Err(PlatformError::RoleNotReady(format!(
                "role '{}' cannot be assumed yet",
                req.role_id
            )));
        }
        if state.functions.contains_key(&req.name) {
            return Err(PlatformError::Conflict(format!("function '{}'", req.name)));
        }
        if !state.roles.values().any(|r| r.role_id == req.role_id) {
            return Err(PlatformError::NotFound(format!("role '{}'", req.role_id)));
        }
        let record = FunctionRecord {
            name: req.name.clone(),
            function_id: function_id(&req.name),
            role_id: req.role_id.clone(),
            code: req.code.clone(),
            config: req.config.clone(),
            last_modified: chrono::Utc::now().to_rfc3339(),
        };
        state.functions.insert(req.name.clone(), record.clone());
        Ok(record)
    }

    fn update_function_code(
        &self,
        name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.update_code_calls += 1;
        let record = state
            .functions
            .get_mut(name)
            .ok_or_else(|| PlatformError::NotFound(format!("function '{name}'")))?;
        record.code.bucket = bucket.to_owned();
        record.code.key = key.to_owned();
        record.last_modified = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    fn update_function_configuration(
        &self,
        name: &str,
        config: &FunctionConfig,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let record = state
            .functions
            .get_mut(name)
            .ok_or_else(|| PlatformError::NotFound(format!("function '{name}'")))?;
        record.config = config.clone();
        record.last_modified = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    fn delete_function(&self, name: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state
            .functions
            .remove(name)
            .ok_or_else(|| PlatformError::NotFound(format!("function '{name}'")))?;
        state.permissions.remove(name);
        Ok(())
    }

    fn list_functions(&self, prefix: &str) -> Result<Vec<FunctionRecord>, PlatformError> {
        Ok(self
            .lock()
            .functions
            .values()
            .filter(|f| f.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn invoke(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>, PlatformError> {
        let state = self.lock();
        if !state.functions.contains_key(name) {
            return Err(PlatformError::NotFound(format!("function '{name}'")));
        }
        Ok(payload.to_vec())
    }

    fn add_permission(&self, name: &str, grant: &PermissionGrant) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.functions.contains_key(name) {
            return Err(PlatformError::NotFound(format!("function '{name}'")));
        }
        let grants = state.permissions.entry(name.to_owned()).or_default();
        if grants.contains_key(&grant.statement_id) {
            return Err(PlatformError::Conflict(format!(
                "statement '{}'",
                grant.statement_id
            )));
        }
        grants.insert(grant.statement_id.clone(), grant.clone());
        Ok(())
    }

    fn remove_permission(&self, name: &str, statement_id: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state
            .permissions
            .get_mut(name)
            .and_then(|grants| grants.remove(statement_id))
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("statement '{statement_id}'")))
    }
}

impl SchedulerClient for MemoryPlatform {
    fn put_rule(&self, name: &str, schedule: &str) -> Result<String, PlatformError> {
        let mut state = self.lock();
        let rule_id = format!("srn:scheduler:rule:{name}");
        match state.rules.get_mut(name) {
            // Replacing a rule updates the schedule but preserves its state.
            Some(rule) => rule.schedule = schedule.to_owned(),
            None => {
                state.rules.insert(
                    name.to_owned(),
                    RuleRecord {
                        name: name.to_owned(),
                        rule_id: rule_id.clone(),
                        schedule: schedule.to_owned(),
                        enabled: true,
                    },
                );
            }
        }
        Ok(rule_id)
    }

    fn list_rules(&self, prefix: &str) -> Result<Vec<RuleRecord>, PlatformError> {
        Ok(self
            .lock()
            .rules
            .values()
            .filter(|r| r.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn put_target(&self, rule: &str, target: &RuleTarget) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.rules.contains_key(rule) {
            return Err(PlatformError::NotFound(format!("rule '{rule}'")));
        }
        state
            .targets
            .entry(rule.to_owned())
            .or_default()
            .insert(target.id.clone(), target.clone());
        Ok(())
    }

    fn list_targets(&self, rule: &str) -> Result<Vec<RuleTarget>, PlatformError> {
        let state = self.lock();
        if !state.rules.contains_key(rule) {
            return Err(PlatformError::NotFound(format!("rule '{rule}'")));
        }
        Ok(state
            .targets
            .get(rule)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn remove_target(&self, rule: &str, target_id: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state
            .targets
            .get_mut(rule)
            .and_then(|t| t.remove(target_id))
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("target '{target_id}'")))
    }

    fn delete_rule(&self, name: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state
            .rules
            .remove(name)
            .ok_or_else(|| PlatformError::NotFound(format!("rule '{name}'")))?;
        state.targets.remove(name);
        Ok(())
    }

    fn set_rule_state(&self, name: &str, enabled: bool) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let rule = state
            .rules
            .get_mut(name)
            .ok_or_else(|| PlatformError::NotFound(format!("rule '{name}'")))?;
        rule.enabled = enabled;
        Ok(())
    }
}

impl IamClient for MemoryPlatform {
    fn get_role(&self, name: &str) -> Result<RoleRecord, PlatformError> {
        self.lock()
            .roles
            .get(name)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("role '{name}'")))
    }

    fn create_role(&self, name: &str, trust_policy: &str) -> Result<RoleRecord, PlatformError> {
        let mut state = self.lock();
        if state.roles.contains_key(name) {
            return Err(PlatformError::Conflict(format!("role '{name}'")));
        }
        let record = RoleRecord {
            name: name.to_owned(),
            role_id: format!("rrn:iam:role:{name}"),
            trust_policy: trust_policy.to_owned(),
        };
        state.roles.insert(name.to_owned(), record.clone());
        Ok(record)
    }

    fn put_role_policy(&self, role: &str, policy: &str, doc: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.roles.contains_key(role) {
            return Err(PlatformError::NotFound(format!("role '{role}'")));
        }
        state
            .role_policies
            .entry(role.to_owned())
            .or_default()
            .insert(policy.to_owned(), doc.to_owned());
        Ok(())
    }

    fn delete_role_policy(&self, role: &str, policy: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state
            .role_policies
            .get_mut(role)
            .and_then(|p| p.remove(policy))
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("policy '{policy}'")))
    }

    fn attach_managed_policy(&self, role: &str, policy_id: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.roles.contains_key(role) {
            return Err(PlatformError::NotFound(format!("role '{role}'")));
        }
        let attached = state.attachments.entry(role.to_owned()).or_default();
        if !attached.iter().any(|p| p == policy_id) {
            attached.push(policy_id.to_owned());
        }
        Ok(())
    }

    fn delete_role(&self, name: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.roles.contains_key(name) {
            return Err(PlatformError::NotFound(format!("role '{name}'")));
        }
        if state
            .role_policies
            .get(name)
            .is_some_and(|p| !p.is_empty())
        {
            return Err(PlatformError::Conflict(format!(
                "role '{name}' still has inline policies"
            )));
        }
        state.roles.remove(name);
        state.role_policies.remove(name);
        state.attachments.remove(name);
        Ok(())
    }
}

impl StorageClient for MemoryPlatform {
    fn put_object(&self, bucket: &str, key: &str, local: &Path) -> Result<(), PlatformError> {
        let data = std::fs::read(local)?;
        let mut state = self.lock();
        if state.fail_put_object {
            return Err(PlatformError::Http("injected upload failure".to_owned()));
        }
        state.objects.insert(object_key(bucket, key), data);
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PlatformError> {
        self.lock()
            .objects
            .remove(&object_key(bucket, key))
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(format!("object '{bucket}/{key}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeLocation;

    fn create_req(name: &str, role_id: &str) -> CreateFunction {
        CreateFunction {
            name: name.to_owned(),
            code: CodeLocation {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
            },
            role_id: role_id.to_owned(),
            config: FunctionConfig {
                timeout: 30,
                memory: 128,
                description: String::new(),
                network: None,
            },
        }
    }

    #[test]
    fn create_function_requires_role() {
        let platform = MemoryPlatform::new();
        let result = platform.create_function(&create_req("f", "rrn:iam:role:missing"));
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }

    #[test]
    fn duplicate_function_create_conflicts() {
        let platform = MemoryPlatform::new();
        let role = platform.create_role("r", "{}").unwrap();
        platform.create_function(&create_req("f", &role.role_id)).unwrap();
        let result = platform.create_function(&create_req("f", &role.role_id));
        assert!(matches!(result, Err(PlatformError::Conflict(_))));
    }

    #[test]
    fn role_not_ready_injection_counts_down() {
        let platform = MemoryPlatform::new();
        let role = platform.create_role("r", "{}").unwrap();
        platform.set_role_not_ready(2);

        assert!(platform
            .create_function(&create_req("f", &role.role_id))
            .is_err_and(|e| e.is_role_not_ready()));
        assert!(platform
            .create_function(&create_req("f", &role.role_id))
            .is_err_and(|e| e.is_role_not_ready()));
        assert!(platform.create_function(&create_req("f", &role.role_id)).is_ok());
    }

    #[test]
    fn role_with_inline_policy_refuses_deletion() {
        let platform = MemoryPlatform::new();
        platform.create_role("r", "{}").unwrap();
        platform.put_role_policy("r", "p", "{}").unwrap();

        let blocked = platform.delete_role("r");
        assert!(matches!(blocked, Err(PlatformError::Conflict(_))));

        platform.delete_role_policy("r", "p").unwrap();
        platform.delete_role("r").unwrap();
        assert!(platform.role("r").is_none());
    }

    #[test]
    fn put_rule_replace_preserves_state() {
        let platform = MemoryPlatform::new();
        platform.put_rule("rule", "rate(1 hour)").unwrap();
        platform.set_rule_state("rule", false).unwrap();

        platform.put_rule("rule", "rate(2 hours)").unwrap();
        let rule = platform.rule("rule").unwrap();
        assert_eq!(rule.schedule, "rate(2 hours)");
        assert!(!rule.enabled);
    }

    #[test]
    fn duplicate_permission_grant_conflicts() {
        let platform = MemoryPlatform::new();
        let role = platform.create_role("r", "{}").unwrap();
        platform.create_function(&create_req("f", &role.role_id)).unwrap();

        let grant = PermissionGrant {
            statement_id: "sid".to_owned(),
            principal: "scheduler".to_owned(),
            action: "invoke".to_owned(),
            source_id: "rule".to_owned(),
        };
        platform.add_permission("f", &grant).unwrap();
        let dup = platform.add_permission("f", &grant);
        assert!(matches!(dup, Err(PlatformError::Conflict(_))));
    }

    #[test]
    fn object_store_roundtrip_and_injected_failure() {
        let platform = MemoryPlatform::new();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.tar");
        std::fs::write(&local, b"bytes").unwrap();

        platform.put_object("bucket", "key", &local).unwrap();
        assert!(platform.object_exists("bucket", "key"));
        platform.delete_object("bucket", "key").unwrap();
        assert!(!platform.object_exists("bucket", "key"));

        platform.set_fail_put_object(true);
        assert!(platform.put_object("bucket", "key", &local).is_err());
    }
}
