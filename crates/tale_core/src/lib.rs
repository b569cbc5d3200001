//! Tale core: pure launch and credential-linking state machines.
mod assertion;
mod effect;
mod event;
mod job;
mod msg;
mod provider;
mod route;
pub mod settings;
mod state;
mod update;
mod view_model;

pub use assertion::parse_signed_assertion;
pub use effect::{CredentialEffect, LaunchEffect, RequestOrigin};
pub use event::{BusEvent, JobStatusEvent, ProgressEvent, ResourceRef, JOB_STATUS_EVENT, PROGRESS_EVENT};
pub use job::{Job, JobId, JobStatus, UnknownJobStatus};
pub use msg::{CredentialMsg, LaunchMsg};
pub use provider::{
    button_style, classify, ApiKeyBinding, AuthState, BoundTarget, Bucket, ButtonStyle, KeyType,
    Provider, ProviderIcon, ProviderKind, TargetDescriptor, PREAUTH_RESOURCE_SERVER,
};
pub use route::{Route, DEFAULT_DATA_REFERENCE};
pub use state::{
    CredentialState, Image, ImportRequest, Instance, KeyDialog, LaunchFailure, LaunchPhase,
    LaunchState, ProgressTone, ProgressView, ProviderButton, ProviderBuckets, TaleParameters,
};
pub use update::{
    update_credentials, update_launch, HOME_PATH, NO_API_KEY, NO_IMAGE_SELECTED,
    NO_RESOURCE_SERVER,
};
pub use view_model::{
    CredentialsViewModel, ImageOption, KeyDialogView, KeyProviderView, LaunchViewModel,
    ProviderButtonView, SubmitLabel,
};
