use crate::role::RoleProvisioner;
use crate::{naming, package, retry::Backoff, CoreError};
use crondeck_platform::{
    CodeLocation, ComputeClient, CreateFunction, Ensured, FunctionConfig, FunctionRecord,
    IamClient, NetworkConfig, StorageClient,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

fn default_timeout() -> u64 {
    60
}

fn default_memory() -> u32 {
    128
}

/// Accept either a comma-joined string (`"a,b"`) or a JSON list (`["a","b"]`).
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        List(Vec<String>),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Joined(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect(),
        Raw::List(v) => v,
    })
}

/// Declared shape of a function, loaded from `function.json` in the project
/// directory. CLI options override these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub s3_bucket: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub subnet_ids: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub security_group_ids: Vec<String>,
}

impl FunctionSpec {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Declaration(format!("read '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CoreError::Declaration(format!("parse '{}': {e}", path.display())))
    }

    /// Network attachment, if any subnet or security group is declared.
    pub fn network(&self) -> Option<NetworkConfig> {
        if self.subnet_ids.is_empty() && self.security_group_ids.is_empty() {
            return None;
        }
        Some(NetworkConfig {
            subnet_ids: self.subnet_ids.clone(),
            security_group_ids: self.security_group_ids.clone(),
        })
    }

    fn config(&self) -> FunctionConfig {
        FunctionConfig {
            timeout: self.timeout,
            memory: self.memory,
            description: self.description.clone(),
            network: self.network(),
        }
    }
}

/// Which path a deploy took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Created,
    Updated,
}

#[derive(Debug)]
pub struct DeployOutcome {
    pub function_id: String,
    pub action: DeployAction,
}

/// Brings a remote function resource into agreement with its declaration:
/// artifact upload, execution role, inline policy, and the function itself,
/// created if absent or updated in place if present.
pub struct Deployer<'a> {
    compute: &'a dyn ComputeClient,
    iam: &'a dyn IamClient,
    storage: &'a dyn StorageClient,
    backoff: Backoff,
}

impl<'a> Deployer<'a> {
    pub fn new(
        compute: &'a dyn ComputeClient,
        iam: &'a dyn IamClient,
        storage: &'a dyn StorageClient,
    ) -> Self {
        Self {
            compute,
            iam,
            storage,
            backoff: Backoff::default(),
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Deploy a function. Re-running with an unchanged spec converges: the
    /// second run takes the update path. There is no rollback — a failure
    /// after the artifact upload leaves the artifact (and possibly the role)
    /// behind until an explicit [`Deployer::delete`].
    pub fn deploy(
        &self,
        spec: &FunctionSpec,
        source_dir: &Path,
        policy_doc: &str,
    ) -> Result<DeployOutcome, CoreError> {
        let long_name = naming::qualified(&spec.name);
        let key = naming::artifact_key(&spec.name);
        tracing::info!("deploying function {long_name}");

        // Package and upload; the temp archive is removed when `archive`
        // drops, on success and failure alike.
        let archive = package::package_dir(source_dir)?;
        self.storage.put_object(&spec.s3_bucket, &key, archive.path())?;
        drop(archive);

        let role_name = naming::role_name(&spec.name);
        let provisioner = RoleProvisioner::new(self.iam);
        let (role, ensured) = provisioner.ensure_role(&role_name)?;
        if ensured == Ensured::AlreadyPresent {
            tracing::debug!("execution role {role_name} already present");
        }
        provisioner.put_inline_policy(&role_name, &naming::policy_name(&spec.name), policy_doc)?;
        if spec.network().is_some() {
            provisioner.attach_network_policy(&role_name)?;
        }

        let config = spec.config();
        match self.compute.get_function(&long_name) {
            Ok(existing) => {
                // Two separate remote calls; code and configuration updates
                // are not atomic with respect to each other.
                self.compute
                    .update_function_code(&long_name, &spec.s3_bucket, &key)?;
                self.compute
                    .update_function_configuration(&long_name, &config)?;
                tracing::info!("updated function {long_name}");
                Ok(DeployOutcome {
                    function_id: existing.function_id,
                    action: DeployAction::Updated,
                })
            }
            Err(e) if e.is_not_found() => {
                let request = CreateFunction {
                    name: long_name.clone(),
                    code: CodeLocation {
                        bucket: spec.s3_bucket.clone(),
                        key,
                    },
                    role_id: role.role_id.clone(),
                    config,
                };
                let record = self
                    .backoff
                    .retry("create function", || self.compute.create_function(&request))?;
                tracing::info!("created function {long_name}");
                Ok(DeployOutcome {
                    function_id: record.function_id,
                    action: DeployAction::Created,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the function, its execution role, and its artifact.
    ///
    /// All three removals are attempted even if an earlier one fails; the
    /// first hard error is returned after the remaining steps have run.
    /// Already-absent resources count as removed.
    pub fn delete(&self, name: &str, bucket: &str) -> Result<(), CoreError> {
        let long_name = naming::qualified(name);
        tracing::info!("deleting function {long_name}");
        let mut first_err: Option<CoreError> = None;

        match self.compute.delete_function(&long_name) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("function {long_name} already absent");
            }
            Err(e) => {
                tracing::warn!("delete function {long_name} failed: {e}");
                first_err = Some(e.into());
            }
        }

        let provisioner = RoleProvisioner::new(self.iam);
        if let Err(e) =
            provisioner.delete_role(&naming::role_name(name), &naming::policy_name(name))
        {
            tracing::warn!("delete role for {name} failed: {e}");
            first_err.get_or_insert(e);
        }

        match self.storage.delete_object(bucket, &naming::artifact_key(name)) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("artifact for {name} already absent");
            }
            Err(e) => {
                tracing::warn!("delete artifact for {name} failed: {e}");
                first_err.get_or_insert(e.into());
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Platform descriptors for every function in this tool's namespace.
    pub fn list(&self) -> Result<Vec<FunctionRecord>, CoreError> {
        Ok(self.compute.list_functions(naming::NAME_PREFIX)?)
    }

    /// Synchronous pass-through invocation; returns the raw response body.
    pub fn invoke(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>, CoreError> {
        Ok(self.compute.invoke(&naming::qualified(name), payload)?)
    }
}
