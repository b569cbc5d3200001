use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a background job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Job lifecycle status, in its single total order.
///
/// On the wire this is the jobs plugin's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobStatus {
    Created,
    Queued,
    Running,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Whether moving from `self` to `next` respects the monotonic order.
    ///
    /// Terminal states have no successors; repeating the current status is
    /// not an advance.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        !self.is_terminal() && next > self
    }

    pub fn code(self) -> u8 {
        match self {
            JobStatus::Created => 0,
            JobStatus::Queued => 1,
            JobStatus::Running => 2,
            JobStatus::Success => 3,
            JobStatus::Error => 4,
        }
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = UnknownJobStatus;

    fn try_from(code: u8) -> Result<Self, UnknownJobStatus> {
        match code {
            0 => Ok(JobStatus::Created),
            1 => Ok(JobStatus::Queued),
            2 => Ok(JobStatus::Running),
            3 => Ok(JobStatus::Success),
            4 => Ok(JobStatus::Error),
            other => Err(UnknownJobStatus(other)),
        }
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownJobStatus(pub u8);

impl fmt::Display for UnknownJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status code {}", self.0)
    }
}

/// A job tracked by the launch flow.
///
/// `result_requested` latches on the first terminal transition so the
/// result is fetched at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub(crate) result_requested: bool,
}

impl Job {
    pub fn new(id: JobId, status: JobStatus) -> Self {
        Self {
            id,
            status,
            result_requested: false,
        }
    }

    pub fn result_requested(&self) -> bool {
        self.result_requested
    }

    /// Applies a status if it moves forward; returns whether it did.
    pub(crate) fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Takes the result-fetch latch. Returns `true` only the first time a
    /// terminal job asks.
    pub(crate) fn take_result_latch(&mut self) -> bool {
        if self.status.is_terminal() && !self.result_requested {
            self.result_requested = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_monotonic() {
        assert!(JobStatus::Created.can_advance_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_advance_to(JobStatus::Success));
        assert!(!JobStatus::Running.can_advance_to(JobStatus::Queued));
        assert!(!JobStatus::Running.can_advance_to(JobStatus::Running));
        assert!(!JobStatus::Success.can_advance_to(JobStatus::Error));
        assert!(!JobStatus::Error.can_advance_to(JobStatus::Success));
    }

    #[test]
    fn status_decodes_from_numeric_code() {
        let status: JobStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, JobStatus::Running);
        assert!(serde_json::from_str::<JobStatus>("9").is_err());
        assert_eq!(serde_json::to_string(&JobStatus::Error).unwrap(), "4");
    }

    #[test]
    fn result_latch_fires_once() {
        let mut job = Job::new(JobId::new("j1"), JobStatus::Running);
        assert!(!job.take_result_latch());
        assert!(job.advance(JobStatus::Success));
        assert!(job.take_result_latch());
        assert!(!job.take_result_latch());
    }
}
