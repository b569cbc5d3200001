use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use tale_core::{
    update_credentials, CredentialEffect, CredentialMsg, CredentialState, CredentialsViewModel,
    Provider,
};
use tale_logging::{tale_info, tale_warn};

use crate::api::TaleApi;
use crate::shell::Shell;
use crate::ApiError;

/// Drives the linked-accounts view and its API-key dialog.
///
/// Every request is awaited before the next message is applied, so a call
/// returns only after the chain it started (exchanges, binds, follow-up
/// refreshes) has settled.
pub struct CredentialLinker {
    api: Arc<dyn TaleApi>,
    shell: Arc<dyn Shell>,
    state: CredentialState,
    last_refresh_error: Option<ApiError>,
}

impl CredentialLinker {
    pub fn new(api: Arc<dyn TaleApi>, shell: Arc<dyn Shell>, redirect: impl Into<String>) -> Self {
        Self {
            api,
            shell,
            state: CredentialState::new(redirect),
            last_refresh_error: None,
        }
    }

    /// Creates the linker and loads the provider list.
    pub async fn open(
        api: Arc<dyn TaleApi>,
        shell: Arc<dyn Shell>,
        redirect: impl Into<String>,
    ) -> Self {
        let mut linker = Self::new(api, shell, redirect);
        linker.dispatch(CredentialMsg::Opened).await;
        linker
    }

    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    pub fn view(&self) -> CredentialsViewModel {
        self.state.view()
    }

    /// Reloads providers, running any pre-authorization exchanges first.
    ///
    /// On failure the previous display is kept.
    pub async fn refresh(&mut self) -> Result<Vec<Provider>, ApiError> {
        self.last_refresh_error = None;
        self.dispatch(CredentialMsg::RefreshRequested).await;
        match self.last_refresh_error.take() {
            Some(err) => Err(err),
            None => Ok(self.state.providers().to_vec()),
        }
    }

    pub async fn authorize(&mut self, provider: &str) {
        self.dispatch(CredentialMsg::AuthorizeClicked {
            provider: provider.to_string(),
        })
        .await;
    }

    pub async fn revoke(&mut self, provider: &str, resource_server: Option<&str>) {
        self.dispatch(CredentialMsg::RevokeClicked {
            provider: provider.to_string(),
            resource_server: resource_server.map(str::to_string),
        })
        .await;
    }

    pub async fn open_key_dialog(&mut self, provider: &str) {
        self.dispatch(CredentialMsg::KeyDialogOpened {
            provider: provider.to_string(),
        })
        .await;
    }

    pub async fn select_key_target(&mut self, label: &str) {
        self.dispatch(CredentialMsg::KeyTargetSelected(label.to_string()))
            .await;
    }

    pub async fn set_key(&mut self, key: &str) {
        self.dispatch(CredentialMsg::KeyInputChanged(key.to_string()))
            .await;
    }

    pub async fn submit_key(&mut self) {
        self.dispatch(CredentialMsg::KeySubmitClicked).await;
    }

    pub async fn close_key_dialog(&mut self) {
        self.dispatch(CredentialMsg::KeyDialogClosed).await;
    }

    /// Applies `msg` and every completion it leads to.
    pub async fn dispatch(&mut self, msg: CredentialMsg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let (state, effects) = update_credentials(mem::take(&mut self.state), msg);
            self.state = state;
            for effect in effects {
                if let Some(next) = self.execute(effect).await {
                    queue.push_back(next);
                }
            }
        }
    }

    async fn execute(&mut self, effect: CredentialEffect) -> Option<CredentialMsg> {
        tale_info!("credential effect {:?}", effect);
        match effect {
            CredentialEffect::FetchProviders {
                generation,
                redirect,
            } => match self.api.list_accounts(&redirect).await {
                Ok(providers) => {
                    self.last_refresh_error = None;
                    Some(CredentialMsg::ProvidersLoaded {
                        generation,
                        providers,
                    })
                }
                Err(err) => {
                    tale_warn!("Provider list failed: {}", err);
                    let message = err.message.clone();
                    self.last_refresh_error = Some(err);
                    Some(CredentialMsg::ProvidersFailed {
                        generation,
                        message,
                    })
                }
            },
            CredentialEffect::ExchangePreauthorization { provider, url } => {
                tale_info!("Pre-authorization exchange for {provider}");
                let response = self
                    .api
                    .fetch_preauthorization(&url)
                    .await
                    .map_err(|err| err.to_string());
                Some(CredentialMsg::PreauthorizationFetched { provider, response })
            }
            CredentialEffect::BindKey { binding, origin } => {
                let result = self
                    .api
                    .add_account_key(&binding)
                    .await
                    .map_err(|err| err.message);
                Some(CredentialMsg::KeyBound {
                    provider: binding.provider,
                    origin,
                    result,
                })
            }
            CredentialEffect::Revoke {
                provider,
                resource_server,
                origin,
            } => {
                let result = self
                    .api
                    .revoke_account(&provider, resource_server.as_deref())
                    .await
                    .map_err(|err| err.message);
                Some(CredentialMsg::Revoked {
                    provider,
                    origin,
                    result,
                })
            }
            CredentialEffect::FetchTargets { provider } => {
                match self.api.account_targets(&provider).await {
                    Ok(targets) => Some(CredentialMsg::TargetsLoaded { provider, targets }),
                    Err(err) => Some(CredentialMsg::TargetsFailed {
                        provider,
                        message: err.message,
                    }),
                }
            }
            CredentialEffect::Redirect { url } => {
                self.shell.navigate(&url);
                None
            }
            CredentialEffect::Notify { text } => {
                self.shell.notify(&text);
                None
            }
        }
    }
}
