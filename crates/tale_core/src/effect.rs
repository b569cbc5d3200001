use crate::{ApiKeyBinding, ImportRequest, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEffect {
    SubscribeEvents,
    UnsubscribeEvents,
    FetchImages,
    SubmitImport { attempt: u64, request: ImportRequest },
    FetchJobResult { job_id: JobId },
    /// Leave the view, e.g. to run an instance.
    Navigate { url: String },
}

/// Who issued a credential request; decides what its completion does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    User,
    Dialog,
    Preauthorization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEffect {
    FetchProviders { generation: u64, redirect: String },
    ExchangePreauthorization { provider: String, url: String },
    BindKey {
        binding: ApiKeyBinding,
        origin: RequestOrigin,
    },
    Revoke {
        provider: String,
        resource_server: Option<String>,
        origin: RequestOrigin,
    },
    FetchTargets { provider: String },
    /// Full-page redirect to an OAuth provider.
    Redirect { url: String },
    Notify { text: String },
}
