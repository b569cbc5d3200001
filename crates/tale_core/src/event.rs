//! Payloads pushed by the backend job runner over the event stream.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{JobId, JobStatus};

pub const JOB_STATUS_EVENT: &str = "job_status";
pub const PROGRESS_EVENT: &str = "progress";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusEvent {
    #[serde(rename = "_id")]
    pub id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "_id")]
    pub id: JobId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(default)]
    pub resource: Option<ResourceRef>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

impl ProgressEvent {
    pub fn resource_id(&self) -> Option<&JobId> {
        self.resource.as_ref().map(|resource| &resource.id)
    }

    /// `ceil(100 * current / total)` clamped to `0..=100`.
    ///
    /// `None` when either counter is missing or `total` is not positive.
    pub fn percent(&self) -> Option<u8> {
        let current = self.current?;
        let total = self.total?;
        if !(total > 0.0) || !current.is_finite() || !total.is_finite() {
            return None;
        }
        let percent = (100.0 * current / total).ceil().clamp(0.0, 100.0);
        Some(percent as u8)
    }
}

/// A decoded event-stream notification.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    JobStatus(JobStatusEvent),
    Progress(ProgressEvent),
    /// Any other notification type; carried so subscribers can ignore it.
    Other { kind: String },
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl BusEvent {
    /// Decodes a `{"type": ..., "data": ...}` notification envelope.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let notification: Notification = serde_json::from_str(raw)?;
        match notification.kind.as_str() {
            JOB_STATUS_EVENT => Ok(BusEvent::JobStatus(serde_json::from_value(notification.data)?)),
            PROGRESS_EVENT => Ok(BusEvent::Progress(serde_json::from_value(notification.data)?)),
            _ => Ok(BusEvent::Other {
                kind: notification.kind,
            }),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            BusEvent::JobStatus(_) => JOB_STATUS_EVENT,
            BusEvent::Progress(_) => PROGRESS_EVENT,
            BusEvent::Other { kind } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(current: Option<f64>, total: Option<f64>) -> ProgressEvent {
        ProgressEvent {
            resource: None,
            message: None,
            current,
            total,
        }
    }

    #[test]
    fn percent_rounds_up() {
        assert_eq!(progress(Some(50.0), Some(200.0)).percent(), Some(25));
        assert_eq!(progress(Some(10.0), Some(40.0)).percent(), Some(25));
        assert_eq!(progress(Some(1.0), Some(3.0)).percent(), Some(34));
    }

    #[test]
    fn percent_guards_zero_and_missing_total() {
        assert_eq!(progress(Some(5.0), Some(0.0)).percent(), None);
        assert_eq!(progress(Some(5.0), None).percent(), None);
        assert_eq!(progress(None, Some(10.0)).percent(), None);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(progress(Some(500.0), Some(10.0)).percent(), Some(100));
        assert_eq!(progress(Some(-3.0), Some(10.0)).percent(), Some(0));
    }

    #[test]
    fn decodes_notification_envelopes() {
        let status = BusEvent::from_json(r#"{"type":"job_status","data":{"_id":"j1","status":2,"title":"x"}}"#)
            .unwrap();
        assert_eq!(
            status,
            BusEvent::JobStatus(JobStatusEvent {
                id: JobId::new("j1"),
                status: JobStatus::Running,
            })
        );

        let progress = BusEvent::from_json(
            r#"{"type":"progress","data":{"resource":null,"message":"m","current":1,"total":2}}"#,
        )
        .unwrap();
        match progress {
            BusEvent::Progress(event) => {
                assert!(event.resource.is_none());
                assert_eq!(event.percent(), Some(50));
            }
            other => panic!("unexpected event {other:?}"),
        }

        let other = BusEvent::from_json(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(other.kind(), "heartbeat");
    }
}
