//! One-shot rewrite of persisted custom resources after the storage version moved on.
//!
//! The api server keeps objects in the version they were written with. Before an old version
//! can be dropped from a CRD, every object has to be written again, which persists it in the
//! current storage version. Only then the old version is removed from
//! `status.storedVersions`.

pub mod backoff;

use crate::apis::log_pipeline::LogPipeline;
use crate::apis::metric_pipeline::MetricPipeline;
use crate::apis::telemetry::Telemetry;
use crate::apis::trace_pipeline::TracePipeline;
use crate::k8s::error::K8sError;
use async_trait::async_trait;
use backoff::Backoff;
use kube::ResourceExt;
use kube::core::{ApiResource, DynamicObject};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Version no object may be persisted in after a migration.
pub const OLD_VERSION: &str = "v1alpha1";

/// Identifies an object; cluster scoped objects have no namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectKey {
    pub fn of(object: &DynamicObject) -> Result<Self, K8sError> {
        Ok(Self {
            name: object.metadata.name.clone().ok_or(K8sError::MissingName)?,
            namespace: object.namespace(),
        })
    }
}

/// `status.storedVersions` of a CRD, together with the resource version it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredVersions {
    pub resource_version: String,
    pub versions: Vec<String>,
}

impl StoredVersions {
    pub fn contains_old_version(&self) -> bool {
        self.versions.iter().any(|v| v == OLD_VERSION)
    }

    /// Same record without the old version.
    pub fn without_old_version(&self) -> Self {
        Self {
            resource_version: self.resource_version.clone(),
            versions: self
                .versions
                .iter()
                .filter(|v| *v != OLD_VERSION)
                .cloned()
                .collect(),
        }
    }
}

/// Api access the migration needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageVersionClient: Send + Sync {
    /// `None` when the CRD is not installed.
    async fn get_stored_versions(&self, crd_name: &str)
    -> Result<Option<StoredVersions>, K8sError>;

    /// Fails with a conflict when the CRD changed since `stored` was read.
    async fn update_stored_versions(
        &self,
        crd_name: &str,
        stored: &StoredVersions,
    ) -> Result<(), K8sError>;

    async fn list_objects(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>, K8sError>;

    async fn get_object(
        &self,
        resource: &ApiResource,
        key: &ObjectKey,
    ) -> Result<Option<DynamicObject>, K8sError>;

    async fn replace_object(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<(), K8sError>;
}

#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    #[error("storage version migration did not finish in time, last error: {last}")]
    MigrationTimeout { last: String },

    #[error("storage version migration was canceled")]
    ContextCanceled,

    #[error("retries exhausted, last error: {last}")]
    RetriesExhausted { last: String },

    #[error("storage version migration failed: {0}")]
    Client(#[from] K8sError),
}

/// A CRD whose objects are migrated.
#[derive(Debug, Clone)]
pub struct ManagedResource {
    pub crd_name: String,
    pub resource: ApiResource,
}

impl ManagedResource {
    fn of<K>() -> Self
    where
        K: kube::Resource<DynamicType = ()>,
    {
        let resource = ApiResource::erase::<K>(&());
        Self {
            crd_name: format!("{}.{}", resource.plural, resource.group),
            resource,
        }
    }
}

/// Every CRD owned by the telemetry manager.
pub fn managed_resources() -> Vec<ManagedResource> {
    vec![
        ManagedResource::of::<LogPipeline>(),
        ManagedResource::of::<MetricPipeline>(),
        ManagedResource::of::<TracePipeline>(),
        ManagedResource::of::<Telemetry>(),
    ]
}

/// Per run state: the cancellation signal and the error that caused the latest retry.
struct Run {
    token: CancellationToken,
    last_error: Option<String>,
}

impl Run {
    /// Waits before retry `attempt` after `err`, or gives up when the budget is spent.
    async fn retry_after(
        &mut self,
        backoff: &Backoff,
        attempt: &mut usize,
        err: K8sError,
    ) -> Result<(), MigrationError> {
        let last = err.to_string();
        self.last_error = Some(last.clone());
        if *attempt >= backoff.steps() {
            return Err(MigrationError::RetriesExhausted { last });
        }
        let delay = backoff.delay(*attempt);
        debug!(attempt = *attempt, ?delay, error = %last, "retrying api call");
        *attempt += 1;
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.token.cancelled() => Err(MigrationError::ContextCanceled),
        }
    }

    fn check_canceled(&self) -> Result<(), MigrationError> {
        if self.token.is_cancelled() {
            return Err(MigrationError::ContextCanceled);
        }
        Ok(())
    }
}

pub struct StorageVersionMigrator<C> {
    client: C,
    backoff: Backoff,
    resources: Vec<ManagedResource>,
}

impl<C: StorageVersionClient> StorageVersionMigrator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            backoff: Backoff::default(),
            resources: managed_resources(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Migrates every managed CRD that still lists the old version as stored. Does nothing
    /// when no CRD does, so repeated runs are cheap.
    pub async fn migrate_if_needed(&self, token: CancellationToken) -> Result<(), MigrationError> {
        let mut run = Run {
            token,
            last_error: None,
        };
        let outcome = tokio::time::timeout(self.backoff.deadline(), self.migrate(&mut run)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(MigrationError::MigrationTimeout {
                last: run.last_error.unwrap_or_else(|| "none".to_string()),
            }),
        }
    }

    async fn migrate(&self, run: &mut Run) -> Result<(), MigrationError> {
        let mut pending = Vec::new();
        for managed in &self.resources {
            let stored = self.stored_versions(run, &managed.crd_name).await?;
            if stored.is_some_and(|s| s.contains_old_version()) {
                pending.push(managed);
            }
        }
        if pending.is_empty() {
            debug!("no stored {OLD_VERSION} objects, skipping storage version migration");
            return Ok(());
        }

        for managed in &pending {
            info!(crd = %managed.crd_name, "migrating objects to the current storage version");
            let objects = self.list_objects(run, &managed.resource).await?;
            for object in objects {
                self.rewrite_object(run, &managed.resource, object).await?;
            }
        }

        for managed in &pending {
            self.drop_old_version(run, &managed.crd_name).await?;
            info!(crd = %managed.crd_name, "removed {OLD_VERSION} from stored versions");
        }
        Ok(())
    }

    async fn stored_versions(
        &self,
        run: &mut Run,
        crd_name: &str,
    ) -> Result<Option<StoredVersions>, MigrationError> {
        let mut attempt = 0;
        loop {
            run.check_canceled()?;
            match self.client.get_stored_versions(crd_name).await {
                Ok(stored) => return Ok(stored),
                Err(err) if err.is_retryable() => {
                    run.retry_after(&self.backoff, &mut attempt, err).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn list_objects(
        &self,
        run: &mut Run,
        resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, MigrationError> {
        let mut attempt = 0;
        loop {
            run.check_canceled()?;
            match self.client.list_objects(resource).await {
                Ok(objects) => return Ok(objects),
                Err(err) if err.is_retryable() => {
                    run.retry_after(&self.backoff, &mut attempt, err).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Writes `object` back unchanged. A conflict means it was written in the meantime, so the
    /// latest version is fetched and written instead.
    async fn rewrite_object(
        &self,
        run: &mut Run,
        resource: &ApiResource,
        object: DynamicObject,
    ) -> Result<(), MigrationError> {
        let key = ObjectKey::of(&object)?;
        let mut current = object;
        let mut attempt = 0;
        loop {
            run.check_canceled()?;
            match self.client.replace_object(resource, &current).await {
                Ok(()) => {
                    debug!(name = %key.name, kind = %resource.kind, "object rewritten");
                    return Ok(());
                }
                Err(err) if err.is_not_found() => {
                    debug!(name = %key.name, kind = %resource.kind, "object deleted meanwhile");
                    return Ok(());
                }
                Err(err) if err.is_conflict() => {
                    run.retry_after(&self.backoff, &mut attempt, err).await?;
                    match self.client.get_object(resource, &key).await? {
                        Some(latest) => current = latest,
                        None => return Ok(()),
                    }
                }
                Err(err) if err.is_retryable() => {
                    run.retry_after(&self.backoff, &mut attempt, err).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn drop_old_version(&self, run: &mut Run, crd_name: &str) -> Result<(), MigrationError> {
        let mut attempt = 0;
        loop {
            let Some(stored) = self.stored_versions(run, crd_name).await? else {
                warn!(crd = %crd_name, "CRD disappeared during storage version migration");
                return Ok(());
            };
            if !stored.contains_old_version() {
                return Ok(());
            }
            match self
                .client
                .update_stored_versions(crd_name, &stored.without_old_version())
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) if err.is_conflict() || err.is_retryable() => {
                    run.retry_after(&self.backoff, &mut attempt, err).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
