//! Reconciliation status shared by the Argora custom resources
//!
//! Every Argora kind carries the same status block: a coarse `state`, a
//! human readable `description` of the last failure, and a list of
//! Kubernetes-style conditions keyed by type.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarse outcome of the last reconciliation pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum State {
    /// Last pass converged without error
    Ready,
    /// Last pass failed; see `description`
    Error,
}

/// Condition status as used by the Kubernetes condition convention
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A typed, timestamped status entry
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, e.g. `Ready`
    #[serde(rename = "type")]
    pub r#type: String,

    pub status: ConditionStatus,

    /// Machine readable reason (CamelCase)
    pub reason: String,

    #[serde(default)]
    pub message: String,

    /// Only moves when `status` flips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Status block of `Update`, `ClusterImport` and `IPPoolImport`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,

    /// Error text of the last failed pass, empty when ready
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ReconcileStatus {
    /// Find a condition by type
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }

    /// Upsert a condition keyed by its type.
    ///
    /// `last_transition_time` is set to `now` for new conditions and when the
    /// status changes; otherwise the previous timestamp is kept. Reason,
    /// message and observed generation always take the new values.
    pub fn set_condition(&mut self, mut condition: Condition, now: DateTime<Utc>) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) => {
                if existing.status != condition.status {
                    existing.status = condition.status;
                    existing.last_transition_time = Some(condition.last_transition_time.unwrap_or(now));
                }
                existing.reason = condition.reason;
                existing.message = condition.message;
                existing.observed_generation = condition.observed_generation;
            }
            None => {
                if condition.last_transition_time.is_none() {
                    condition.last_transition_time = Some(now);
                }
                self.conditions.push(condition);
            }
        }
    }
}

/// Access to the shared status block of an Argora resource
pub trait HasReconcileStatus {
    fn reconcile_status(&self) -> Option<&ReconcileStatus>;
    fn reconcile_status_mut(&mut self) -> &mut ReconcileStatus;
}

macro_rules! impl_has_reconcile_status {
    ($($kind:ty),* $(,)?) => {
        $(
            impl HasReconcileStatus for $kind {
                fn reconcile_status(&self) -> Option<&ReconcileStatus> {
                    self.status.as_ref()
                }

                fn reconcile_status_mut(&mut self) -> &mut ReconcileStatus {
                    self.status.get_or_insert_with(ReconcileStatus::default)
                }
            }
        )*
    };
}

impl_has_reconcile_status!(
    crate::update::Update,
    crate::cluster_import::ClusterImport,
    crate::ip_pool_import::IPPoolImport,
);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ready(status: ConditionStatus, reason: &str) -> Condition {
        Condition {
            r#type: "Ready".to_string(),
            status,
            reason: reason.to_string(),
            message: String::new(),
            last_transition_time: None,
            observed_generation: None,
        }
    }

    #[test]
    fn test_set_condition_inserts_with_transition_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut status = ReconcileStatus::default();
        status.set_condition(ready(ConditionStatus::True, "UpdateSucceeded"), now);

        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].last_transition_time, Some(now));
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut status = ReconcileStatus::default();
        status.set_condition(ready(ConditionStatus::False, "UpdateFailed"), first);

        let mut again = ready(ConditionStatus::False, "UpdateFailed");
        again.message = "boom".to_string();
        status.set_condition(again, later);

        let condition = status.condition("Ready").unwrap();
        assert_eq!(condition.last_transition_time, Some(first));
        assert_eq!(condition.message, "boom");
    }

    #[test]
    fn test_set_condition_flips_status_and_time() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut status = ReconcileStatus::default();
        status.set_condition(ready(ConditionStatus::False, "UpdateFailed"), first);
        status.set_condition(ready(ConditionStatus::True, "UpdateSucceeded"), later);

        assert_eq!(status.conditions.len(), 1);
        let condition = status.condition("Ready").unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, "UpdateSucceeded");
        assert_eq!(condition.last_transition_time, Some(later));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ReconcileStatus {
            state: Some(State::Error),
            description: "unable to reconcile cluster: boom".to_string(),
            conditions: vec![],
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "Error");
        assert_eq!(json["description"], "unable to reconcile cluster: boom");
        assert!(json.get("conditions").is_none());
    }
}
