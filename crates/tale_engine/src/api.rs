use serde::Deserialize;
use serde_json::Value;
use tale_core::{ApiKeyBinding, Image, ImportRequest, JobId, JobStatus, Provider};
use tale_logging::tale_debug;

use crate::ApiError;

/// The job reference returned by `POST tale/import`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportResponse {
    #[serde(rename = "_id")]
    pub id: JobId,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// Backend operations the launch and credential flows depend on.
#[async_trait::async_trait]
pub trait TaleApi: Send + Sync {
    async fn import_tale(&self, request: &ImportRequest) -> Result<ImportResponse, ApiError>;

    /// Success payload `{tale, instance}` or the job's error diagnostic.
    async fn job_result(&self, job_id: &JobId) -> Result<Value, ApiError>;

    async fn list_images(&self, limit: usize, offset: usize) -> Result<Vec<Image>, ApiError>;

    async fn list_accounts(&self, redirect: &str) -> Result<Vec<Provider>, ApiError>;

    /// Resource-server names the provider accepts keys for.
    async fn account_targets(&self, provider: &str) -> Result<Vec<String>, ApiError>;

    async fn add_account_key(&self, binding: &ApiKeyBinding) -> Result<(), ApiError>;

    async fn revoke_account(
        &self,
        provider: &str,
        resource_server: Option<&str>,
    ) -> Result<(), ApiError>;

    /// Reads the raw body of a provider's pre-authorization URL.
    async fn fetch_preauthorization(&self, url: &str) -> Result<String, ApiError>;
}

/// Pages through `list_images` until a short page comes back.
pub async fn fetch_all_images(api: &dyn TaleApi, page_size: usize) -> Result<Vec<Image>, ApiError> {
    let page_size = page_size.max(1);
    let mut images = Vec::new();
    loop {
        let page = api.list_images(page_size, images.len()).await?;
        let short = page.len() < page_size;
        images.extend(page);
        if short {
            break;
        }
    }
    tale_debug!("Loaded {} images", images.len());
    Ok(images)
}
