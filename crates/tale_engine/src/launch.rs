use std::fmt;
use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tale_core::{
    update_launch, BusEvent, ImportRequest, JobId, JobStatus, LaunchEffect, LaunchFailure,
    LaunchMsg, LaunchState, LaunchViewModel, TaleParameters,
};
use tale_logging::{tale_info, tale_trace};
use tokio::sync::{mpsc, watch};

use crate::api::{fetch_all_images, TaleApi};
use crate::bus::{EventBus, EventSubscription};
use crate::config::EngineConfig;
use crate::shell::Shell;
use crate::{ApiError, LaunchError};

/// Outcome of a launch request.
#[derive(Debug)]
pub enum Submission {
    /// A new import job is being tracked.
    Tracking(JobHandle),
    /// The previous launch already succeeded; the host was sent to its instance.
    Navigated(String),
}

/// A job accepted by `tale/import`.
///
/// The status follows the orchestrator as it applies bus events; the handle
/// stays valid after the orchestrator is gone but stops updating.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    status: watch::Receiver<JobStatus>,
    result: watch::Receiver<Option<Value>>,
    api: Arc<dyn TaleApi>,
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl JobHandle {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Latest status applied by the orchestrator.
    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// Resolves once the job reaches SUCCESS or ERROR, or with the last known
    /// status if the orchestrator is dropped first.
    pub async fn wait_until_terminal(&mut self) -> JobStatus {
        if let Ok(status) = self.status.wait_for(|status| status.is_terminal()).await {
            return *status;
        }
        *self.status.borrow()
    }

    /// The result the orchestrator already fetched, if any.
    ///
    /// Before that, this issues its own `job/{id}/result` request, outside
    /// the orchestrator's once-per-job fetch.
    pub async fn fetch_result(&self) -> Result<Value, ApiError> {
        let cached = self.result.borrow().clone();
        match cached {
            Some(result) => Ok(result),
            None => self.api.job_result(&self.id).await,
        }
    }
}

struct JobWatch {
    id: JobId,
    status: watch::Sender<JobStatus>,
    result: watch::Sender<Option<Value>>,
}

impl JobWatch {
    fn new(id: JobId, status: JobStatus) -> Self {
        Self {
            id,
            status: watch::channel(status).0,
            result: watch::channel(None).0,
        }
    }

    fn handle(&self, api: Arc<dyn TaleApi>) -> JobHandle {
        JobHandle {
            id: self.id.clone(),
            status: self.status.subscribe(),
            result: self.result.subscribe(),
            api,
        }
    }
}

/// Drives one launch view: submits an import, follows its job over the
/// event bus and fetches the result once the job finishes.
///
/// Must be created inside a Tokio runtime; background requests are spawned
/// onto it and report back through an internal channel.
pub struct LaunchOrchestrator {
    api: Arc<dyn TaleApi>,
    shell: Arc<dyn Shell>,
    bus: EventBus,
    image_page_size: usize,
    state: LaunchState,
    events: Option<EventSubscription>,
    job_watch: Option<JobWatch>,
    completion_tx: mpsc::UnboundedSender<LaunchMsg>,
    completion_rx: mpsc::UnboundedReceiver<LaunchMsg>,
}

impl LaunchOrchestrator {
    /// Mounts the view: subscribes to the bus and starts loading images.
    pub fn open(
        api: Arc<dyn TaleApi>,
        bus: &EventBus,
        shell: Arc<dyn Shell>,
        config: &EngineConfig,
        data_reference: impl Into<String>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let mut orchestrator = Self {
            api,
            shell,
            bus: bus.clone(),
            image_page_size: config.image_page_size,
            state: LaunchState::new(data_reference),
            events: None,
            job_watch: None,
            completion_tx,
            completion_rx,
        };
        orchestrator.dispatch(LaunchMsg::Opened);
        orchestrator
    }

    pub fn state(&self) -> &LaunchState {
        &self.state
    }

    pub fn view(&self) -> LaunchViewModel {
        self.state.view()
    }

    pub fn is_subscribed(&self) -> bool {
        self.events.is_some()
    }

    /// Handle for the job currently tracked, if any.
    pub fn job_handle(&self) -> Option<JobHandle> {
        self.job_watch
            .as_ref()
            .map(|watch| watch.handle(self.api.clone()))
    }

    pub fn dispatch(&mut self, msg: LaunchMsg) {
        let fetched = match &msg {
            LaunchMsg::ResultFetched { job_id, result } => Some((job_id.clone(), result.clone())),
            _ => None,
        };
        let effects = self.apply(msg);
        self.sync_job_watch(fetched);
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Validates the inputs and starts (or, after success, follows) a launch.
    pub async fn submit(
        &mut self,
        data_reference: impl Into<String>,
        image_id: Option<String>,
        params: TaleParameters,
    ) -> Result<Submission, LaunchError> {
        self.dispatch(LaunchMsg::DataReferenceChanged(data_reference.into()));
        self.dispatch(LaunchMsg::TitleChanged(params.title));
        if let Some(image_id) = image_id {
            self.dispatch(LaunchMsg::ImageSelected(image_id));
        }

        let mut outcome = None;
        let effects = self.apply(LaunchMsg::SubmitClicked);
        self.sync_job_watch(None);
        for effect in effects {
            match effect {
                LaunchEffect::SubmitImport { attempt, request } => {
                    let (msg, failure) = import(self.api.as_ref(), attempt, &request).await;
                    self.dispatch(msg);
                    outcome = Some(match failure {
                        Some(err) => Err(LaunchError::Remote(err)),
                        None => self
                            .job_handle()
                            .map(Submission::Tracking)
                            .ok_or(LaunchError::Busy),
                    });
                }
                LaunchEffect::Navigate { url } => {
                    self.shell.navigate(&url);
                    outcome = Some(Ok(Submission::Navigated(url)));
                }
                other => self.run_effect(other),
            }
        }

        outcome.unwrap_or_else(|| match self.state.failure() {
            Some(LaunchFailure::Validation(text)) => Err(LaunchError::Validation(text.clone())),
            _ => Err(LaunchError::Busy),
        })
    }

    /// Waits for the next bus event or background completion and applies it.
    ///
    /// Returns `false` once nothing more can arrive.
    pub async fn step(&mut self) -> bool {
        if self.state.is_torn_down() {
            return false;
        }
        let msg = tokio::select! {
            Some(event) = next_event(&mut self.events) => event_msg(event),
            Some(msg) = self.completion_rx.recv() => Some(msg),
            else => return false,
        };
        if let Some(msg) = msg {
            self.dispatch(msg);
        }
        true
    }

    /// Steps until the job is terminal and its result has been applied.
    pub async fn run_until_settled(&mut self) {
        while !self.state.is_settled() {
            if !self.step().await {
                break;
            }
        }
    }

    /// Unsubscribes from the bus; results still in flight are dropped.
    pub fn teardown(mut self) {
        self.dispatch(LaunchMsg::TornDown);
    }

    /// Mirrors the tracked job into its watch channels.
    fn sync_job_watch(&mut self, fetched: Option<(JobId, Value)>) {
        let Some(job) = self.state.job() else {
            self.job_watch = None;
            return;
        };
        let status = job.status;
        if self.job_watch.as_ref().map_or(true, |watch| watch.id != job.id) {
            self.job_watch = Some(JobWatch::new(job.id.clone(), status));
        }
        let Some(current) = self.job_watch.as_ref() else {
            return;
        };
        current.status.send_if_modified(|seen| {
            let changed = *seen != status;
            *seen = status;
            changed
        });
        if let Some((job_id, result)) = fetched {
            if job_id == current.id && self.state.is_settled() {
                current.result.send_replace(Some(result));
            }
        }
    }

    fn apply(&mut self, msg: LaunchMsg) -> Vec<LaunchEffect> {
        let (state, effects) = update_launch(mem::take(&mut self.state), msg);
        self.state = state;
        effects
    }

    fn run_effect(&mut self, effect: LaunchEffect) {
        tale_info!("launch effect {:?}", effect);
        match effect {
            LaunchEffect::SubscribeEvents => {
                if self.events.is_none() {
                    self.events = Some(self.bus.subscribe());
                }
            }
            LaunchEffect::UnsubscribeEvents => {
                self.events = None;
            }
            LaunchEffect::FetchImages => {
                let api = self.api.clone();
                let tx = self.completion_tx.clone();
                let page_size = self.image_page_size;
                tokio::spawn(async move {
                    let msg = match fetch_all_images(api.as_ref(), page_size).await {
                        Ok(images) => LaunchMsg::ImagesLoaded(images),
                        Err(err) => LaunchMsg::ImagesFailed(err.message),
                    };
                    let _ = tx.send(msg);
                });
            }
            LaunchEffect::SubmitImport { attempt, request } => {
                let api = self.api.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let (msg, _) = import(api.as_ref(), attempt, &request).await;
                    let _ = tx.send(msg);
                });
            }
            LaunchEffect::FetchJobResult { job_id } => {
                let api = self.api.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let msg = match api.job_result(&job_id).await {
                        Ok(result) => LaunchMsg::ResultFetched { job_id, result },
                        Err(err) => LaunchMsg::ResultFailed {
                            job_id,
                            message: err.message,
                        },
                    };
                    let _ = tx.send(msg);
                });
            }
            LaunchEffect::Navigate { url } => self.shell.navigate(&url),
        }
    }
}

/// Runs `tale/import` and turns the outcome into the message the state
/// machine expects; the error is handed back for callers that report it.
async fn import(
    api: &dyn TaleApi,
    attempt: u64,
    request: &ImportRequest,
) -> (LaunchMsg, Option<ApiError>) {
    tale_info!("Importing {} with image {}", request.url, request.image_id);
    match api.import_tale(request).await {
        Ok(response) => (
            LaunchMsg::SubmitAccepted {
                attempt,
                job_id: response.id,
                status: response.status,
            },
            None,
        ),
        Err(err) => (
            LaunchMsg::SubmitFailed {
                attempt,
                message: err.message.clone(),
            },
            Some(err),
        ),
    }
}

async fn next_event(events: &mut Option<EventSubscription>) -> Option<BusEvent> {
    match events {
        Some(subscription) => subscription.recv().await,
        None => None,
    }
}

fn event_msg(event: BusEvent) -> Option<LaunchMsg> {
    match event {
        BusEvent::JobStatus(status) => Some(LaunchMsg::JobStatus(status)),
        BusEvent::Progress(progress) => Some(LaunchMsg::Progress(progress)),
        BusEvent::Other { kind } => {
            tale_trace!("launch ignoring {kind} event");
            None
        }
    }
}
