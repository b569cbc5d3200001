use serde_json::Value;
use tale_logging::{tale_debug, tale_trace, tale_warn};

use crate::assertion::parse_signed_assertion;
use crate::provider::PREAUTH_RESOURCE_SERVER;
use crate::state::{KeyDialog, ProviderBuckets};
use crate::{
    ApiKeyBinding, CredentialEffect, CredentialMsg, CredentialState, ImportRequest, Instance, Job,
    JobId, JobStatus, KeyType, LaunchEffect, LaunchFailure, LaunchMsg, LaunchPhase, LaunchState,
    ProgressEvent, ProgressTone, RequestOrigin,
};

/// In-app path of the landing page.
pub const HOME_PATH: &str = "/";

pub const NO_IMAGE_SELECTED: &str = "Please select an image.";
pub const NO_RESOURCE_SERVER: &str = "Please select a resource server.";
pub const NO_API_KEY: &str = "Please enter an API key.";

/// Pure update function for the launch flow.
pub fn update_launch(mut state: LaunchState, msg: LaunchMsg) -> (LaunchState, Vec<LaunchEffect>) {
    if state.torn_down {
        tale_trace!("launch view torn down; dropping {:?}", msg);
        return (state, Vec::new());
    }

    let effects = match msg {
        LaunchMsg::Opened => vec![LaunchEffect::SubscribeEvents, LaunchEffect::FetchImages],
        LaunchMsg::ImagesLoaded(images) => {
            state.images = images;
            state.images_loaded = true;
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::ImagesFailed(message) => {
            state.images_loaded = true;
            if state.failure.is_none() || state.phase == LaunchPhase::Idle {
                state.failure = Some(LaunchFailure::Remote(message));
            } else {
                tale_debug!("keeping current failure over image error: {message}");
            }
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::DataReferenceChanged(data_reference) => {
            state.data_reference = data_reference;
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::TitleChanged(title) => {
            state.title = title;
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::ImageSelected(image_id) => {
            state.selected_image = Some(image_id).filter(|id| !id.trim().is_empty());
            if matches!(state.failure, Some(LaunchFailure::Validation(_))) {
                state.failure = None;
            }
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::SubmitClicked => submit(&mut state),
        LaunchMsg::SubmitAccepted {
            attempt,
            job_id,
            status,
        } => {
            if attempt != state.attempt || state.phase != LaunchPhase::Submitting {
                tale_debug!("stale import response for attempt {attempt} (job {job_id})");
                return (state, Vec::new());
            }
            state.job = Some(Job::new(job_id, JobStatus::Created));
            state.phase = LaunchPhase::Tracking;
            state.mark_dirty();
            match status {
                Some(status) => apply_status(&mut state, status),
                None => Vec::new(),
            }
        }
        LaunchMsg::SubmitFailed { attempt, message } => {
            if attempt != state.attempt || state.phase != LaunchPhase::Submitting {
                tale_debug!("stale import failure for attempt {attempt}: {message}");
                return (state, Vec::new());
            }
            state.phase = LaunchPhase::Idle;
            state.failure = Some(LaunchFailure::Remote(message));
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::JobStatus(event) => {
            if !is_tracked(&state, &event.id) {
                tale_trace!("ignoring status {} for untracked job {}", event.status, event.id);
                return (state, Vec::new());
            }
            apply_status(&mut state, event.status)
        }
        LaunchMsg::Progress(event) => {
            apply_progress(&mut state, event);
            Vec::new()
        }
        LaunchMsg::ResultFetched { job_id, result } => {
            if !is_tracked(&state, &job_id) {
                tale_debug!("dropping result for job {job_id}; no longer tracked");
                return (state, Vec::new());
            }
            apply_result(&mut state, result);
            Vec::new()
        }
        LaunchMsg::ResultFailed { job_id, message } => {
            if !is_tracked(&state, &job_id) {
                return (state, Vec::new());
            }
            state.failure = Some(LaunchFailure::Remote(message));
            state.mark_dirty();
            Vec::new()
        }
        LaunchMsg::CancelClicked => vec![LaunchEffect::Navigate {
            url: HOME_PATH.to_string(),
        }],
        LaunchMsg::TornDown => {
            state.torn_down = true;
            state.mark_dirty();
            vec![LaunchEffect::UnsubscribeEvents]
        }
        LaunchMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut LaunchState) -> Vec<LaunchEffect> {
    if let Some(url) = state.run_url() {
        return vec![LaunchEffect::Navigate {
            url: url.to_string(),
        }];
    }
    match state.phase {
        LaunchPhase::Submitting | LaunchPhase::Tracking | LaunchPhase::Succeeded => {
            return Vec::new();
        }
        LaunchPhase::Idle | LaunchPhase::Failed => {}
    }

    let Some(image_id) = state.selected_image.clone() else {
        state.failure = Some(LaunchFailure::Validation(NO_IMAGE_SELECTED.to_string()));
        state.mark_dirty();
        return Vec::new();
    };

    state.reset_for_attempt();
    state.mark_dirty();
    vec![LaunchEffect::SubmitImport {
        attempt: state.attempt,
        request: ImportRequest {
            url: state.data_reference.clone(),
            image_id,
            tale_kwargs: crate::TaleParameters {
                title: state.title.clone(),
            },
        },
    }]
}

fn is_tracked(state: &LaunchState, job_id: &JobId) -> bool {
    state.job.as_ref().is_some_and(|job| &job.id == job_id)
}

fn apply_status(state: &mut LaunchState, status: JobStatus) -> Vec<LaunchEffect> {
    let Some(job) = state.job.as_mut() else {
        return Vec::new();
    };
    if !job.advance(status) {
        tale_debug!("job {} ignoring status {} after {}", job.id, status, job.status);
        return Vec::new();
    }
    let job_id = job.id.clone();
    let fetch_result = job.take_result_latch();

    match status {
        JobStatus::Success => {
            state.phase = LaunchPhase::Succeeded;
            state.progress.percent = 100;
            state.progress.tone = ProgressTone::Success;
        }
        JobStatus::Error => {
            state.phase = LaunchPhase::Failed;
            state.progress.percent = 100;
            state.progress.tone = ProgressTone::Danger;
        }
        JobStatus::Created | JobStatus::Queued | JobStatus::Running => {}
    }
    state.mark_dirty();

    if fetch_result {
        vec![LaunchEffect::FetchJobResult { job_id }]
    } else {
        Vec::new()
    }
}

fn apply_progress(state: &mut LaunchState, event: ProgressEvent) {
    let Some(resource_id) = event.resource_id() else {
        return;
    };
    let Some(job) = state.job.as_ref() else {
        return;
    };
    if &job.id != resource_id {
        tale_trace!("ignoring progress for untracked resource {resource_id}");
        return;
    }

    // The bar is frozen once the job is terminal; the message still updates.
    let terminal = job.status.is_terminal();
    if let Some(message) = event.message.clone() {
        state.progress.message = Some(message);
    }
    if !terminal {
        if let Some(percent) = event.percent() {
            state.progress.percent = percent;
        }
    }
    state.mark_dirty();
}

fn apply_result(state: &mut LaunchState, result: Value) {
    match state.phase {
        LaunchPhase::Succeeded => {
            state.tale = result.get("tale").cloned().filter(|tale| !tale.is_null());
            state.instance = match result.get("instance") {
                None | Some(Value::Null) => None,
                Some(raw) => match serde_json::from_value::<Instance>(raw.clone()) {
                    Ok(instance) => Some(instance),
                    Err(err) => {
                        tale_warn!("job result carries an unusable instance: {err}");
                        None
                    }
                },
            };
        }
        LaunchPhase::Failed => {
            state.failure = Some(LaunchFailure::Job(diagnostic_text(&result)));
        }
        LaunchPhase::Idle | LaunchPhase::Submitting | LaunchPhase::Tracking => return,
    }
    state.result_applied = true;
    state.mark_dirty();
}

fn diagnostic_text(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(text)) => text.clone(),
            _ => result.to_string(),
        },
        Value::Null => "Unknown error".to_string(),
        other => other.to_string(),
    }
}

/// Pure update function for credential linking.
pub fn update_credentials(
    mut state: CredentialState,
    msg: CredentialMsg,
) -> (CredentialState, Vec<CredentialEffect>) {
    let effects = match msg {
        CredentialMsg::Opened | CredentialMsg::RefreshRequested => {
            // A user-initiated refresh starts a new exchange chain.
            state.exchanged.clear();
            state.pending_exchanges.clear();
            vec![start_refresh(&mut state)]
        }
        CredentialMsg::ProvidersLoaded {
            generation,
            providers,
        } => {
            if generation != state.generation {
                tale_debug!("dropping provider list from refresh {generation}");
                return (state, Vec::new());
            }
            state.refreshing = false;
            apply_providers(&mut state, providers)
        }
        CredentialMsg::ProvidersFailed {
            generation,
            message,
        } => {
            if generation != state.generation {
                return (state, Vec::new());
            }
            // The previous display stays as it was.
            state.refreshing = false;
            state.error = Some(message);
            state.mark_dirty();
            Vec::new()
        }
        CredentialMsg::PreauthorizationFetched { provider, response } => {
            if !state.pending_exchanges.contains(&provider) {
                tale_debug!("dropping pre-authorization response for {provider}");
                return (state, Vec::new());
            }
            let token = match response {
                Ok(body) => Some(body.trim().to_string())
                    .filter(|body| parse_signed_assertion(body).is_some()),
                Err(err) => {
                    tale_warn!("pre-authorization exchange for {provider} failed: {err}");
                    None
                }
            };
            match token {
                Some(key) => vec![CredentialEffect::BindKey {
                    binding: ApiKeyBinding {
                        provider,
                        resource_server: PREAUTH_RESOURCE_SERVER.to_string(),
                        key,
                        key_type: KeyType::DataOne,
                    },
                    origin: RequestOrigin::Preauthorization,
                }],
                None => vec![CredentialEffect::Revoke {
                    provider,
                    resource_server: None,
                    origin: RequestOrigin::Preauthorization,
                }],
            }
        }
        CredentialMsg::AuthorizeClicked { provider } => {
            let button = state
                .buckets
                .authorize
                .iter()
                .find(|button| button.provider == provider);
            match button.and_then(|button| button.url.clone()) {
                Some(url) => vec![CredentialEffect::Redirect { url }],
                None => {
                    tale_debug!("{provider} cannot be authorized from the current view");
                    Vec::new()
                }
            }
        }
        CredentialMsg::RevokeClicked {
            provider,
            resource_server,
        } => revoke(&mut state, provider, resource_server),
        CredentialMsg::Revoked {
            provider,
            origin,
            result,
        } => request_finished(&mut state, provider, origin, result, None),
        CredentialMsg::KeyDialogOpened { provider } => {
            state.dialog = Some(KeyDialog::new(provider.clone()));
            state.mark_dirty();
            vec![CredentialEffect::FetchTargets { provider }]
        }
        CredentialMsg::TargetsLoaded { provider, targets } => {
            if let Some(dialog) = dialog_for(&mut state, &provider) {
                dialog.selected = targets.first().cloned();
                dialog.targets = Some(targets);
                state.mark_dirty();
            }
            Vec::new()
        }
        CredentialMsg::TargetsFailed { provider, message } => {
            if let Some(dialog) = dialog_for(&mut state, &provider) {
                dialog.targets = Some(Vec::new());
                dialog.error = Some(message);
                state.mark_dirty();
            }
            Vec::new()
        }
        CredentialMsg::KeyTargetSelected(label) => {
            if let Some(dialog) = state.dialog.as_mut() {
                dialog.selected = Some(clean_target_label(&label)).filter(|s| !s.is_empty());
                state.mark_dirty();
            }
            Vec::new()
        }
        CredentialMsg::KeyInputChanged(key) => {
            if let Some(dialog) = state.dialog.as_mut() {
                dialog.key = key;
            }
            Vec::new()
        }
        CredentialMsg::KeySubmitClicked => submit_key(&mut state),
        CredentialMsg::KeyBound {
            provider,
            origin,
            result,
        } => {
            let notice = format!("{provider} API Key has been set.");
            request_finished(&mut state, provider, origin, result, Some(notice))
        }
        CredentialMsg::KeyDialogClosed => {
            state.dialog = None;
            state.mark_dirty();
            Vec::new()
        }
        CredentialMsg::NoticeDismissed => {
            state.notice = None;
            state.mark_dirty();
            Vec::new()
        }
        CredentialMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_refresh(state: &mut CredentialState) -> CredentialEffect {
    state.generation += 1;
    state.refreshing = true;
    state.mark_dirty();
    CredentialEffect::FetchProviders {
        generation: state.generation,
        redirect: state.redirect.clone(),
    }
}

fn apply_providers(
    state: &mut CredentialState,
    providers: Vec<crate::Provider>,
) -> Vec<CredentialEffect> {
    let mut effects = Vec::new();
    for provider in &providers {
        if !provider.needs_preauthorization_exchange() || state.exchanged.contains(&provider.name)
        {
            continue;
        }
        state.exchanged.insert(provider.name.clone());
        state.pending_exchanges.insert(provider.name.clone());
        effects.push(match provider.url.clone().filter(|url| !url.is_empty()) {
            Some(url) => CredentialEffect::ExchangePreauthorization {
                provider: provider.name.clone(),
                url,
            },
            None => CredentialEffect::Revoke {
                provider: provider.name.clone(),
                resource_server: None,
                origin: RequestOrigin::Preauthorization,
            },
        });
    }

    if !effects.is_empty() {
        // Classification waits for the follow-up refresh.
        state.mark_dirty();
        return effects;
    }

    state.buckets = ProviderBuckets::from_providers(&providers);
    state.providers = providers;
    state.loaded = true;
    state.error = None;
    state.mark_dirty();
    Vec::new()
}

fn revoke(
    state: &mut CredentialState,
    provider: String,
    resource_server: Option<String>,
) -> Vec<CredentialEffect> {
    let Some(kind) = state.find_provider(&provider).map(|p| p.kind.clone()) else {
        tale_debug!("revoke requested for unknown provider {provider}");
        return Vec::new();
    };
    let resource_server = resource_server
        .map(|server| server.trim().to_string())
        .filter(|server| !server.is_empty());

    if kind.requires_resource_server() {
        if resource_server.is_none() {
            state.error = Some(format!("Missing resource server for {provider}."));
            state.mark_dirty();
            return Vec::new();
        }
        vec![CredentialEffect::Revoke {
            provider,
            resource_server,
            origin: RequestOrigin::User,
        }]
    } else {
        vec![CredentialEffect::Revoke {
            provider,
            resource_server: None,
            origin: RequestOrigin::User,
        }]
    }
}

fn request_finished(
    state: &mut CredentialState,
    provider: String,
    origin: RequestOrigin,
    result: Result<(), String>,
    success_notice: Option<String>,
) -> Vec<CredentialEffect> {
    match origin {
        RequestOrigin::Preauthorization => {
            // Fire and forget: either outcome settles the exchange.
            if let Err(err) = &result {
                tale_warn!("settling pre-authorization for {provider} despite error: {err}");
            }
            if !state.pending_exchanges.remove(&provider) {
                return Vec::new();
            }
            if state.pending_exchanges.is_empty() {
                vec![start_refresh(state)]
            } else {
                Vec::new()
            }
        }
        RequestOrigin::Dialog => {
            let open_for_provider = state
                .dialog
                .as_ref()
                .is_some_and(|dialog| dialog.provider == provider);
            match result {
                Ok(()) => {
                    let mut effects = Vec::new();
                    if open_for_provider {
                        state.dialog = None;
                        if let Some(text) = success_notice {
                            state.notice = Some(text.clone());
                            effects.push(CredentialEffect::Notify { text });
                        }
                    }
                    effects.push(start_refresh(state));
                    effects
                }
                Err(message) => {
                    if let Some(dialog) = dialog_for(state, &provider) {
                        dialog.error = Some(message);
                        dialog.submitting = false;
                        state.mark_dirty();
                    }
                    Vec::new()
                }
            }
        }
        RequestOrigin::User => match result {
            Ok(()) => vec![start_refresh(state)],
            Err(message) => {
                state.error = Some(message);
                state.mark_dirty();
                Vec::new()
            }
        },
    }
}

fn dialog_for<'a>(state: &'a mut CredentialState, provider: &str) -> Option<&'a mut KeyDialog> {
    state
        .dialog
        .as_mut()
        .filter(|dialog| dialog.provider == provider)
}

fn submit_key(state: &mut CredentialState) -> Vec<CredentialEffect> {
    let Some(dialog) = state.dialog.as_mut() else {
        return Vec::new();
    };
    if dialog.submitting {
        return Vec::new();
    }

    let key = dialog.key.trim().to_string();
    let resource_server = dialog
        .selected
        .as_deref()
        .map(clean_target_label)
        .filter(|server| !server.is_empty());

    let binding = match (resource_server, key.is_empty()) {
        (None, _) => Err(NO_RESOURCE_SERVER),
        (Some(_), true) => Err(NO_API_KEY),
        (Some(resource_server), false) => Ok(ApiKeyBinding {
            provider: dialog.provider.clone(),
            resource_server,
            key,
            key_type: KeyType::ApiKey,
        }),
    };

    let effects = match binding {
        Ok(binding) => {
            dialog.submitting = true;
            dialog.error = None;
            vec![CredentialEffect::BindKey {
                binding,
                origin: RequestOrigin::Dialog,
            }]
        }
        Err(message) => {
            dialog.error = Some(message.to_string());
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}

/// Strips quote characters and surrounding whitespace from a target label.
fn clean_target_label(label: &str) -> String {
    label.replace(['\'', '"'], "").trim().to_string()
}
