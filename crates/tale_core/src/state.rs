use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::{button_style, classify, Bucket, ButtonStyle};
use crate::view_model::{
    CredentialsViewModel, ImageOption, KeyDialogView, KeyProviderView, LaunchViewModel,
    ProviderButtonView, SubmitLabel,
};
use crate::{Job, Provider};

/// A selectable base image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// User-supplied tale metadata, sent as `taleKwargs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaleParameters {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub url: String,
    pub image_id: String,
    pub tale_kwargs: TaleParameters,
}

/// A running deployment of a launched tale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchPhase {
    #[default]
    Idle,
    Submitting,
    Tracking,
    Succeeded,
    Failed,
}

impl LaunchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchPhase::Succeeded | LaunchPhase::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressTone {
    #[default]
    Info,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub message: Option<String>,
    pub percent: u8,
    pub tone: ProgressTone,
}

/// Inline message shown by the launch view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchFailure {
    /// Input incomplete; nothing was sent.
    Validation(String),
    /// A request was rejected or could not be made.
    Remote(String),
    /// The job ended in ERROR; the text is its diagnostic.
    Job(String),
}

impl LaunchFailure {
    pub fn text(&self) -> &str {
        match self {
            LaunchFailure::Validation(text)
            | LaunchFailure::Remote(text)
            | LaunchFailure::Job(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaunchState {
    pub(crate) data_reference: String,
    pub(crate) title: String,
    pub(crate) images: Vec<Image>,
    pub(crate) images_loaded: bool,
    pub(crate) selected_image: Option<String>,
    pub(crate) phase: LaunchPhase,
    pub(crate) attempt: u64,
    pub(crate) job: Option<Job>,
    pub(crate) progress: ProgressView,
    pub(crate) tale: Option<Value>,
    pub(crate) instance: Option<Instance>,
    pub(crate) result_applied: bool,
    pub(crate) failure: Option<LaunchFailure>,
    pub(crate) torn_down: bool,
    dirty: bool,
}

impl LaunchState {
    pub fn new(data_reference: impl Into<String>) -> Self {
        Self {
            data_reference: data_reference.into(),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn failure(&self) -> Option<&LaunchFailure> {
        self.failure.as_ref()
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn tale(&self) -> Option<&Value> {
        self.tale.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Terminal, and the job result (or its failure) has been applied.
    pub fn is_settled(&self) -> bool {
        self.phase.is_terminal() && (self.result_applied || self.failure.is_some())
    }

    pub(crate) fn run_url(&self) -> Option<&str> {
        match self.phase {
            LaunchPhase::Succeeded => self.instance.as_ref().map(|instance| instance.url.as_str()),
            _ => None,
        }
    }

    pub(crate) fn submit_enabled(&self) -> bool {
        if self.torn_down {
            return false;
        }
        match self.phase {
            LaunchPhase::Idle | LaunchPhase::Failed => self.selected_image.is_some(),
            LaunchPhase::Submitting | LaunchPhase::Tracking => false,
            LaunchPhase::Succeeded => self.run_url().is_some(),
        }
    }

    pub(crate) fn reset_for_attempt(&mut self) {
        self.attempt += 1;
        self.phase = LaunchPhase::Submitting;
        self.job = None;
        self.progress = ProgressView::default();
        self.tale = None;
        self.instance = None;
        self.result_applied = false;
        self.failure = None;
    }

    pub fn view(&self) -> LaunchViewModel {
        let images = self
            .images
            .iter()
            .map(|image| ImageOption {
                id: image.id.clone(),
                name: image.name.clone(),
                selected: self.selected_image.as_deref() == Some(image.id.as_str()),
            })
            .collect();
        let selected_image_name = self.selected_image.as_ref().map(|id| {
            self.images
                .iter()
                .find(|image| &image.id == id)
                .map(|image| image.name.clone())
                .unwrap_or_else(|| id.clone())
        });

        LaunchViewModel {
            phase: self.phase,
            data_reference: self.data_reference.clone(),
            title: self.title.clone(),
            images,
            images_loaded: self.images_loaded,
            selected_image_name,
            job_id: self.job.as_ref().map(|job| job.id.clone()),
            job_status: self.job.as_ref().map(|job| job.status),
            progress: self.progress.clone(),
            submit_enabled: self.submit_enabled(),
            submit_label: if self.run_url().is_some() {
                SubmitLabel::Run
            } else {
                SubmitLabel::Launch
            },
            run_url: self.run_url().map(ToOwned::to_owned),
            error: self.failure.as_ref().map(|failure| failure.text().to_string()),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the view changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// A dedicated OAuth button, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderButton {
    pub provider: String,
    pub style: ButtonStyle,
    pub url: Option<String>,
}

/// Result of classifying one provider refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderBuckets {
    pub authorize: Vec<ProviderButton>,
    pub revoke: Vec<ProviderButton>,
    pub key_providers: Vec<Provider>,
}

impl ProviderBuckets {
    pub fn from_providers(providers: &[Provider]) -> Self {
        let mut buckets = Self::default();
        for provider in providers {
            let button = |style: ButtonStyle| ProviderButton {
                provider: provider.name.clone(),
                style,
                url: provider.redirect_url().map(str::to_string),
            };
            match (classify(provider), button_style(&provider.name)) {
                (Bucket::Authorize, Some(style)) => buckets.authorize.push(button(style)),
                (Bucket::Revoke, Some(style)) => buckets.revoke.push(button(style)),
                _ => buckets.key_providers.push(provider.clone()),
            }
        }
        buckets
    }

    pub fn bucket_of(&self, provider: &str) -> Option<Bucket> {
        if self.authorize.iter().any(|button| button.provider == provider) {
            Some(Bucket::Authorize)
        } else if self.revoke.iter().any(|button| button.provider == provider) {
            Some(Bucket::Revoke)
        } else if self.key_providers.iter().any(|p| p.name == provider) {
            Some(Bucket::KeyProvider)
        } else {
            None
        }
    }
}

/// The API-key submission dialog for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDialog {
    pub(crate) provider: String,
    pub(crate) targets: Option<Vec<String>>,
    pub(crate) selected: Option<String>,
    pub(crate) key: String,
    pub(crate) submitting: bool,
    pub(crate) error: Option<String>,
}

impl KeyDialog {
    pub(crate) fn new(provider: String) -> Self {
        Self {
            provider,
            targets: None,
            selected: None,
            key: String::new(),
            submitting: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialState {
    pub(crate) redirect: String,
    pub(crate) providers: Vec<Provider>,
    pub(crate) buckets: ProviderBuckets,
    pub(crate) loaded: bool,
    pub(crate) generation: u64,
    pub(crate) refreshing: bool,
    /// Providers whose pre-authorization exchange is still outstanding.
    pub(crate) pending_exchanges: BTreeSet<String>,
    /// Providers already exchanged in the current refresh chain.
    pub(crate) exchanged: BTreeSet<String>,
    pub(crate) dialog: Option<KeyDialog>,
    pub(crate) error: Option<String>,
    pub(crate) notice: Option<String>,
    dirty: bool,
}

impl CredentialState {
    pub fn new(redirect: impl Into<String>) -> Self {
        Self {
            redirect: redirect.into(),
            ..Self::default()
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn buckets(&self) -> &ProviderBuckets {
        &self.buckets
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn find_provider(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|provider| provider.name == name)
    }

    pub fn view(&self) -> CredentialsViewModel {
        let button_view = |button: &ProviderButton| ProviderButtonView {
            provider: button.provider.clone(),
            text: button.provider.clone(),
            icon: button.style.icon,
            class: button.style.class,
        };
        let key_providers = self
            .buckets
            .key_providers
            .iter()
            .map(|provider| KeyProviderView {
                name: provider.name.clone(),
                label: provider.display_name().to_string(),
                docs_href: provider.docs_href.clone(),
                authorized: !provider.targets.is_empty(),
                bound_targets: provider
                    .targets
                    .iter()
                    .map(|target| target.resource_server.clone())
                    .collect(),
            })
            .collect();

        CredentialsViewModel {
            show_oauth_section: !self.buckets.authorize.is_empty()
                || !self.buckets.revoke.is_empty(),
            authorize: self.buckets.authorize.iter().map(button_view).collect(),
            revoke: self.buckets.revoke.iter().map(button_view).collect(),
            key_providers,
            loaded: self.loaded,
            refreshing: self.refreshing || !self.pending_exchanges.is_empty(),
            error: self.error.clone(),
            notice: self.notice.clone(),
            dialog: self.dialog.as_ref().map(|dialog| KeyDialogView {
                provider: dialog.provider.clone(),
                loading_targets: dialog.targets.is_none(),
                targets: dialog.targets.clone().unwrap_or_default(),
                selected: dialog.selected.clone(),
                submit_enabled: !dialog.submitting,
                error: dialog.error.clone(),
            }),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether the view changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
