use serde_json::Value;

use crate::{Image, JobId, JobStatus, JobStatusEvent, ProgressEvent, Provider, RequestOrigin};

#[derive(Debug, Clone, PartialEq)]
pub enum LaunchMsg {
    /// The launch view was mounted.
    Opened,
    /// The image catalogue arrived.
    ImagesLoaded(Vec<Image>),
    /// The image catalogue could not be loaded.
    ImagesFailed(String),
    /// User edited the data reference.
    DataReferenceChanged(String),
    /// User edited the tale title.
    TitleChanged(String),
    /// User picked a base image.
    ImageSelected(String),
    /// User pressed the launch/run control.
    SubmitClicked,
    /// `tale/import` accepted the request for `attempt`.
    SubmitAccepted {
        attempt: u64,
        job_id: JobId,
        status: Option<JobStatus>,
    },
    /// `tale/import` failed for `attempt`.
    SubmitFailed { attempt: u64, message: String },
    /// A `job_status` event from the event stream, for any job.
    JobStatus(JobStatusEvent),
    /// A `progress` event from the event stream, for any resource.
    Progress(ProgressEvent),
    /// `job/{id}/result` arrived.
    ResultFetched { job_id: JobId, result: Value },
    /// `job/{id}/result` failed.
    ResultFailed { job_id: JobId, message: String },
    /// User clicked Cancel.
    CancelClicked,
    /// The view is being torn down.
    TornDown,
    NoOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialMsg {
    /// The linked-accounts view was mounted.
    Opened,
    /// User asked for a fresh provider list.
    RefreshRequested,
    ProvidersLoaded {
        generation: u64,
        providers: Vec<Provider>,
    },
    ProvidersFailed { generation: u64, message: String },
    /// Body of the pre-authorization exchange, or the transport failure.
    PreauthorizationFetched {
        provider: String,
        response: Result<String, String>,
    },
    AuthorizeClicked { provider: String },
    RevokeClicked {
        provider: String,
        resource_server: Option<String>,
    },
    Revoked {
        provider: String,
        origin: RequestOrigin,
        result: Result<(), String>,
    },
    KeyDialogOpened { provider: String },
    TargetsLoaded {
        provider: String,
        targets: Vec<String>,
    },
    TargetsFailed { provider: String, message: String },
    KeyTargetSelected(String),
    KeyInputChanged(String),
    KeySubmitClicked,
    KeyBound {
        provider: String,
        origin: RequestOrigin,
        result: Result<(), String>,
    },
    KeyDialogClosed,
    NoticeDismissed,
    NoOp,
}
