use crate::{naming, CoreError};
use crondeck_platform::{ComputeClient, PermissionGrant, RuleTarget, SchedulerClient};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Principal named in every trigger's invocation permission grant.
pub const SCHEDULER_PRINCIPAL: &str = "scheduler.platform.internal";

/// Action granted to the scheduler on the target function.
pub const INVOKE_ACTION: &str = "compute:InvokeFunction";

fn default_true() -> bool {
    true
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A declared scheduled trigger: one rule, one target, one permission grant.
/// Also the element type of the bulk-load file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerEntry {
    pub name: String,
    pub cron: String,
    pub function_name: String,
    #[serde(default = "empty_object")]
    pub input_event: serde_json::Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl fmt::Display for TriggerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name, self.cron, self.function_name, self.enabled
        )
    }
}

/// Manages the rule / permission / target triple of each scheduled trigger
/// as one logical unit: a three-step saga with no compensating transaction.
/// Each step is individually idempotent, so a failed `add` is retried by
/// running `add` again.
pub struct TriggerReconciler<'a> {
    scheduler: &'a dyn SchedulerClient,
    compute: &'a dyn ComputeClient,
}

impl<'a> TriggerReconciler<'a> {
    pub fn new(scheduler: &'a dyn SchedulerClient, compute: &'a dyn ComputeClient) -> Self {
        Self { scheduler, compute }
    }

    /// Create or replace a trigger. The target function must already be
    /// deployed. A permission grant left behind by an earlier run of the
    /// same trigger is treated as success, not a failure.
    pub fn add(&self, entry: &TriggerEntry) -> Result<(), CoreError> {
        let rule = naming::rule_name(&entry.name);
        let function = naming::qualified(&entry.function_name);
        tracing::info!("adding trigger {} -> {function}", entry.name);

        let rule_id = self.scheduler.put_rule(&rule, &entry.cron)?;

        let grant = PermissionGrant {
            statement_id: naming::statement_id(&entry.name, &entry.function_name),
            principal: SCHEDULER_PRINCIPAL.to_owned(),
            action: INVOKE_ACTION.to_owned(),
            source_id: rule_id,
        };
        match self.compute.add_permission(&function, &grant) {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                tracing::debug!("grant {} already present", grant.statement_id);
            }
            Err(e) => return Err(e.into()),
        }

        // Fatal if the function was never deployed.
        let record = self.compute.get_function(&function)?;

        let input = serde_json::to_string(&entry.input_event)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        self.scheduler.put_target(
            &rule,
            &RuleTarget {
                id: entry.name.clone(),
                function_id: record.function_id,
                input,
            },
        )?;

        self.scheduler.set_rule_state(&rule, entry.enabled)?;
        Ok(())
    }

    /// Delete a trigger: target, permission grant, then the rule itself.
    /// An already-revoked grant is tolerated; everything else propagates.
    pub fn delete(&self, name: &str) -> Result<(), CoreError> {
        let rule = naming::rule_name(name);
        tracing::info!("deleting trigger {name}");

        let target = self.single_target(&rule)?;
        let function = naming::function_name_from_id(&target.function_id).to_owned();
        let statement = naming::statement_id(name, naming::unqualified(&function));

        self.scheduler.remove_target(&rule, &target.id)?;
        match self.compute.remove_permission(&function, &statement) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("grant {statement} already absent");
            }
            Err(e) => return Err(e.into()),
        }
        self.scheduler.delete_rule(&rule)?;
        Ok(())
    }

    pub fn enable(&self, name: &str) -> Result<(), CoreError> {
        self.scheduler
            .set_rule_state(&naming::rule_name(name), true)?;
        Ok(())
    }

    pub fn disable(&self, name: &str) -> Result<(), CoreError> {
        self.scheduler
            .set_rule_state(&naming::rule_name(name), false)?;
        Ok(())
    }

    /// All triggers in this tool's namespace, recovered from remote state.
    pub fn list(&self) -> Result<Vec<TriggerEntry>, CoreError> {
        let rules = self.scheduler.list_rules(naming::NAME_PREFIX)?;
        let mut entries = Vec::with_capacity(rules.len());
        for rule in rules {
            let target = self.single_target(&rule.name)?;
            let function = naming::function_name_from_id(&target.function_id);
            entries.push(TriggerEntry {
                name: target.id,
                cron: rule.schedule,
                function_name: naming::unqualified(function).to_owned(),
                input_event: serde_json::from_str(&target.input).unwrap_or_else(|_| empty_object()),
                enabled: rule.enabled,
            });
        }
        Ok(entries)
    }

    /// Apply `add` for each entry in order. No atomicity across entries:
    /// a failure leaves earlier entries applied and later ones untouched.
    pub fn load(&self, entries: &[TriggerEntry]) -> Result<(), CoreError> {
        for entry in entries {
            self.add(entry)?;
        }
        Ok(())
    }

    /// Every rule owns exactly one target; anything else is remote state
    /// this system did not write and must not guess about.
    fn single_target(&self, rule: &str) -> Result<RuleTarget, CoreError> {
        let mut targets = self.scheduler.list_targets(rule)?.into_iter();
        match (targets.next(), targets.next()) {
            (Some(target), None) => Ok(target),
            (None, _) => Err(CoreError::Integrity(format!("rule '{rule}' has no target"))),
            (Some(_), Some(_)) => Err(CoreError::Integrity(format!(
                "rule '{rule}' has multiple targets, expected exactly one"
            ))),
        }
    }
}
