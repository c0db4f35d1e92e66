//! Status reporting for Argora resources.
//!
//! Conditions are changed in memory with [`StatusReporter::set_condition`]
//! and persisted together with the coarse state by
//! [`StatusReporter::update_to_ready`] or [`StatusReporter::update_to_error`].
//! Persisting re-reads the latest object, copies the status block onto it
//! and writes it back, retrying on resourceVersion conflicts only.

use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use crds::{Condition, ConditionStatus, HasReconcileStatus, State};
use kube::{Resource, ResourceExt};
use tracing::{debug, error};

use crate::backoff::{retry_on_conflict, ConflictBackoff};
use crate::store::{ObjectStore, StoreError};

/// Condition type maintained on every Argora resource
pub const CONDITION_TYPE_READY: &str = "Ready";

pub const REASON_UPDATE_SUCCEEDED: &str = "UpdateSucceeded";
pub const REASON_UPDATE_FAILED: &str = "UpdateFailed";
pub const REASON_CLUSTER_IMPORT_SUCCEEDED: &str = "ClusterImportSucceeded";
pub const REASON_CLUSTER_IMPORT_FAILED: &str = "ClusterImportFailed";
pub const REASON_IP_POOL_IMPORT_SUCCEEDED: &str = "IPPoolImportSucceeded";
pub const REASON_IP_POOL_IMPORT_FAILED: &str = "IPPoolImportFailed";

struct ConditionTemplate {
    reason: &'static str,
    condition_type: &'static str,
    status: ConditionStatus,
    message: &'static str,
}

const CONDITIONS: &[ConditionTemplate] = &[
    ConditionTemplate {
        reason: REASON_UPDATE_SUCCEEDED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::True,
        message: "update succeeded",
    },
    ConditionTemplate {
        reason: REASON_UPDATE_FAILED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::False,
        message: "update failed",
    },
    ConditionTemplate {
        reason: REASON_CLUSTER_IMPORT_SUCCEEDED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::True,
        message: "cluster import succeeded",
    },
    ConditionTemplate {
        reason: REASON_CLUSTER_IMPORT_FAILED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::False,
        message: "cluster import failed",
    },
    ConditionTemplate {
        reason: REASON_IP_POOL_IMPORT_SUCCEEDED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::True,
        message: "ip pool import succeeded",
    },
    ConditionTemplate {
        reason: REASON_IP_POOL_IMPORT_FAILED,
        condition_type: CONDITION_TYPE_READY,
        status: ConditionStatus::False,
        message: "ip pool import failed",
    },
];

/// A condition reason, optionally with a message replacing the default one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonWithMessage {
    pub reason: String,
    pub message: Option<String>,
}

impl ReasonWithMessage {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Persists reconciliation outcomes onto resources of kind `K`
pub struct StatusReporter<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    store: Arc<dyn ObjectStore<K>>,
    backoff: ConflictBackoff,
}

impl<K> StatusReporter<K>
where
    K: Resource + HasReconcileStatus + Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn ObjectStore<K>>, backoff: ConflictBackoff) -> Self {
        Self { store, backoff }
    }

    /// Upsert the condition registered for `reason` on `resource` (in
    /// memory only). Unknown reasons are logged and leave the resource
    /// untouched. Returns whether a condition was set.
    pub fn set_condition(&self, resource: &mut K, reason: &ReasonWithMessage) -> bool {
        let Some(template) = CONDITIONS.iter().find(|t| t.reason == reason.reason) else {
            error!(
                "Unknown condition reason {} for {}, condition not set",
                reason.reason,
                resource.name_any()
            );
            return false;
        };

        let condition = Condition {
            r#type: template.condition_type.to_string(),
            status: template.status,
            reason: template.reason.to_string(),
            message: reason
                .message
                .clone()
                .unwrap_or_else(|| template.message.to_string()),
            last_transition_time: None,
            observed_generation: resource.meta().generation,
        };
        resource
            .reconcile_status_mut()
            .set_condition(condition, Utc::now());
        true
    }

    /// Persist state `Ready` with an empty description
    pub async fn update_to_ready(&self, resource: &K) -> Result<K, StoreError> {
        self.persist(resource, State::Ready, String::new()).await
    }

    /// Persist state `Error` with the error text as description
    pub async fn update_to_error(
        &self,
        resource: &K,
        err: &(dyn Display + Send + Sync),
    ) -> Result<K, StoreError> {
        self.persist(resource, State::Error, err.to_string()).await
    }

    async fn persist(&self, resource: &K, state: State, description: String) -> Result<K, StoreError> {
        let mut status = resource.reconcile_status().cloned().unwrap_or_default();
        status.state = Some(state);
        status.description = description;

        let name = resource.name_any();
        let namespace = resource.namespace();
        debug!("Updating status of {} to {:?}", name, state);

        retry_on_conflict(self.backoff, || {
            let status = status.clone();
            let name = name.clone();
            let namespace = namespace.clone();
            async move {
                let mut latest = self
                    .store
                    .get(namespace.as_deref(), &name)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(name.clone()))?;
                *latest.reconcile_status_mut() = status;
                self.store.replace_status(&latest).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use crds::Update;

    fn reporter(store: &Arc<MemoryStore<Update>>) -> StatusReporter<Update> {
        StatusReporter::new(store.clone(), fast_backoff())
    }

    #[tokio::test]
    async fn test_set_condition_transition_false_to_true() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let mut update = create_test_update("update", "default", vec![]);

        assert!(reporter.set_condition(
            &mut update,
            &ReasonWithMessage::new(REASON_UPDATE_FAILED).with_message("boom")
        ));
        // Pretend the failure happened a while ago
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        update.reconcile_status_mut().conditions[0].last_transition_time = Some(earlier);

        assert!(reporter.set_condition(&mut update, &ReasonWithMessage::new(REASON_UPDATE_SUCCEEDED)));

        let status = update.reconcile_status().unwrap();
        assert_eq!(status.conditions.len(), 1);
        let ready = status.condition(CONDITION_TYPE_READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason, REASON_UPDATE_SUCCEEDED);
        assert_eq!(ready.message, "update succeeded");
        assert!(ready.last_transition_time.unwrap() > earlier + ChronoDuration::days(1));
    }

    #[tokio::test]
    async fn test_set_condition_same_status_keeps_transition_time() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let mut update = create_test_update("update", "default", vec![]);

        reporter.set_condition(&mut update, &ReasonWithMessage::new(REASON_UPDATE_FAILED).with_message("first"));
        let first = update.reconcile_status().unwrap().conditions[0].last_transition_time;
        reporter.set_condition(&mut update, &ReasonWithMessage::new(REASON_UPDATE_FAILED).with_message("second"));

        let ready = update.reconcile_status().unwrap().condition(CONDITION_TYPE_READY).unwrap();
        assert_eq!(ready.message, "second");
        assert_eq!(ready.last_transition_time, first);
    }

    #[tokio::test]
    async fn test_set_condition_unknown_reason_is_noop() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let mut update = create_test_update("update", "default", vec![]);

        assert!(!reporter.set_condition(&mut update, &ReasonWithMessage::new("SomethingElse")));
        assert!(update.status.is_none());
    }

    #[tokio::test]
    async fn test_update_to_error_then_ready() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let mut update = store.insert(create_test_update("update", "default", vec![]));

        reporter.set_condition(&mut update, &ReasonWithMessage::new(REASON_UPDATE_FAILED).with_message("boom"));
        reporter.update_to_error(&update, &"boom").await.unwrap();

        let stored = store.get_stored(Some("default"), "update").unwrap();
        let status = stored.status.unwrap();
        assert_eq!(status.state, Some(State::Error));
        assert_eq!(status.description, "boom");
        assert_eq!(status.conditions[0].status, ConditionStatus::False);

        reporter.set_condition(&mut update, &ReasonWithMessage::new(REASON_UPDATE_SUCCEEDED));
        reporter.update_to_ready(&update).await.unwrap();

        let status = store.get_stored(Some("default"), "update").unwrap().status.unwrap();
        assert_eq!(status.state, Some(State::Ready));
        assert_eq!(status.description, "");
        assert_eq!(status.conditions[0].status, ConditionStatus::True);
    }

    #[tokio::test]
    async fn test_update_retries_conflicts_on_latest_object() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let update = store.insert(create_test_update("update", "default", vec![]));

        store.inject_conflicts(2);
        reporter.update_to_ready(&update).await.unwrap();

        assert_eq!(store.calls("replace_status"), 3);
        assert_eq!(store.calls("get"), 3);
        let status = store.get_stored(Some("default"), "update").unwrap().status.unwrap();
        assert_eq!(status.state, Some(State::Ready));
    }

    #[tokio::test]
    async fn test_update_conflict_exhaustion_surfaces() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let update = store.insert(create_test_update("update", "default", vec![]));

        store.inject_conflicts(10);
        let err = reporter.update_to_ready(&update).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.calls("replace_status"), fast_backoff().steps as usize);
    }

    #[tokio::test]
    async fn test_non_conflict_errors_are_not_retried() {
        let store = Arc::new(MemoryStore::<Update>::new());
        let reporter = reporter(&store);
        let update = create_test_update("missing", "default", vec![]);

        let err = reporter.update_to_ready(&update).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.calls("get"), 1);
    }
}
