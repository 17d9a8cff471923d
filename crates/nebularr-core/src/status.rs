// ── Object status ──
//
// What a reconcile reports back for one managed object. Persisted between
// passes; `managed_resources` and `last_applied_hash` are the durable
// ownership and drift bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::adapter::HealthStatus;
use crate::ownership::ManagedResources;

/// Reconcile state machine. The last four are terminal for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Phase {
    Connecting,
    Discovering,
    ReadingState,
    Diffing,
    Applying,
    Reporting,
    Ready,
    Degraded,
    Failed,
    Suspended,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Degraded | Self::Failed | Self::Suspended
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ConditionType {
    Ready,
    Connected,
    Healthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    /// Last time `status` changed.
    pub last_transition_time: DateTime<Utc>,
}

/// Observed pull-model registration with an indexer aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProwlarrRegistration {
    pub registered: bool,
    pub prowlarr_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub synced_indexers: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub conditions: Vec<Condition>,
    pub managed_resources: ManagedResources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prowlarr_registration: Option<ProwlarrRegistration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
}

impl ObjectStatus {
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Upsert a condition. The transition time moves only when the status
    /// value flips.
    pub fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let message = message.into();
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            if existing.status != status {
                existing.last_transition_time = now;
            }
            existing.status = status;
            existing.reason = reason.to_owned();
            existing.message = message;
            return;
        }
        self.conditions.push(Condition {
            condition_type,
            status,
            reason: reason.to_owned(),
            message,
            last_transition_time: now,
        });
    }

    pub fn is_ready(&self) -> bool {
        self.condition(ConditionType::Ready)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// Human-readable message of the `Ready` condition.
    pub fn message(&self) -> &str {
        self.condition(ConditionType::Ready)
            .map_or("", |c| c.message.as_str())
    }
}
