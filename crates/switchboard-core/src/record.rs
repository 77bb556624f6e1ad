//! Per-action mutable state.
//!
//! Transitions: `Idle → Running → Completed | Error`, and any state other
//! than `Running` accepts a new trigger. A record that was never written is
//! indistinguishable from `ActionRecord::new(name)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Idle => "idle",
            ActionStatus::Running => "running",
            ActionStatus::Completed => "completed",
            ActionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_result: Option<String>,
}

impl ActionRecord {
    /// The default record: disabled and idle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            status: ActionStatus::Idle,
            last_run_at: None,
            last_result: None,
        }
    }

    /// Merge the fields set in `patch` into this record.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(at) = patch.last_run_at {
            self.last_run_at = Some(at);
        }
        if let Some(result) = &patch.last_result {
            self.last_result = Some(result.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// RecordPatch
// ---------------------------------------------------------------------------

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub enabled: Option<bool>,
    pub status: Option<ActionStatus>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_result: Option<String>,
}

impl RecordPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ActionStatus::Running),
            last_run_at: Some(at),
            ..Self::default()
        }
    }

    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            status: Some(ActionStatus::Completed),
            last_result: Some(output.into()),
            ..Self::default()
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: Some(ActionStatus::Error),
            last_result: Some(detail.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_disabled_and_idle() {
        let record = ActionRecord::new("ping");
        assert!(!record.enabled);
        assert_eq!(record.status, ActionStatus::Idle);
        assert!(record.last_run_at.is_none());
        assert!(record.last_result.is_none());
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut record = ActionRecord::new("ping");
        record.apply(&RecordPatch::enabled(true));
        record.apply(&RecordPatch::completed("pong"));
        assert!(record.enabled);
        assert_eq!(record.status, ActionStatus::Completed);
        assert_eq!(record.last_result.as_deref(), Some("pong"));

        let now = Utc::now();
        record.apply(&RecordPatch::started(now));
        assert!(record.enabled);
        assert_eq!(record.status, ActionStatus::Running);
        assert_eq!(record.last_run_at, Some(now));
        // the previous result survives until the run finishes
        assert_eq!(record.last_result.as_deref(), Some("pong"));
    }

    #[test]
    fn serializes_camel_case_with_lowercase_status() {
        let mut record = ActionRecord::new("ping");
        record.apply(&RecordPatch::failed("boom"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["lastResult"], "boom");
        assert!(json["lastRunAt"].is_null());
    }

    #[test]
    fn sparse_documents_deserialize_to_defaults() {
        let record: ActionRecord =
            serde_json::from_value(serde_json::json!({ "name": "ping", "enabled": true }))
                .unwrap();
        assert!(record.enabled);
        assert_eq!(record.status, ActionStatus::Idle);
    }
}
