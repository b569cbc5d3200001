use crate::{JobId, JobStatus, LaunchPhase, ProgressView, ProviderIcon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitLabel {
    #[default]
    Launch,
    Run,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchViewModel {
    pub phase: LaunchPhase,
    pub data_reference: String,
    pub title: String,
    pub images: Vec<ImageOption>,
    pub images_loaded: bool,
    pub selected_image_name: Option<String>,
    pub job_id: Option<JobId>,
    pub job_status: Option<JobStatus>,
    pub progress: ProgressView,
    pub submit_enabled: bool,
    pub submit_label: SubmitLabel,
    /// Where the run control navigates once an instance exists.
    pub run_url: Option<String>,
    pub error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderButtonView {
    pub provider: String,
    pub text: String,
    pub icon: ProviderIcon,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProviderView {
    pub name: String,
    pub label: String,
    pub docs_href: Option<String>,
    pub authorized: bool,
    pub bound_targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDialogView {
    pub provider: String,
    pub loading_targets: bool,
    pub targets: Vec<String>,
    pub selected: Option<String>,
    pub submit_enabled: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialsViewModel {
    /// The OAuth section is drawn only when at least one button exists.
    pub show_oauth_section: bool,
    pub authorize: Vec<ProviderButtonView>,
    pub revoke: Vec<ProviderButtonView>,
    pub key_providers: Vec<KeyProviderView>,
    pub loaded: bool,
    pub refreshing: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub dialog: Option<KeyDialogView>,
    pub dirty: bool,
}
