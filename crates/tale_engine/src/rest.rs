use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tale_core::settings::{SettingDefault, SettingEntry};
use tale_core::{ApiKeyBinding, Image, ImportRequest, JobId, Provider, TargetDescriptor};
use tale_logging::{tale_debug, tale_warn};

use crate::api::{ImportResponse, TaleApi};
use crate::config::ApiSettings;
use crate::{ApiError, ApiErrorKind};

const TOKEN_HEADER: &str = "Girder-Token";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: String,
}

/// REST client for the backend, speaking form-encoded requests and JSON responses.
#[derive(Debug, Clone)]
pub struct RestClient {
    settings: ApiSettings,
    base: Url,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut base_url = settings.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| ApiError::new(ApiErrorKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Reads plugin settings; `mode` decides what unset keys come back as.
    pub async fn get_settings(
        &self,
        keys: &[&str],
        mode: SettingDefault,
    ) -> Result<serde_json::Map<String, Value>, ApiError> {
        let list = serde_json::to_string(keys)
            .map_err(|err| ApiError::new(ApiErrorKind::Decode, err.to_string()))?;
        let url = self.endpoint(
            "system/setting",
            &[("list", list.as_str()), ("default", mode.as_str())],
        )?;
        self.send_json(self.request(Method::GET, url)).await
    }

    pub async fn put_settings(&self, entries: &[SettingEntry]) -> Result<(), ApiError> {
        let list = serde_json::to_string(entries)
            .map_err(|err| ApiError::new(ApiErrorKind::Decode, err.to_string()))?;
        let url = self.endpoint("system/setting", &[])?;
        let builder = with_form(self.request(Method::PUT, url), &[("list", list.as_str())]);
        self.send(builder).await.map(drop)
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tale_debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match self.settings.token.as_deref() {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let max_bytes = self.settings.max_response_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    ApiErrorKind::TooLarge { max_bytes },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ApiError::new(
                    ApiErrorKind::TooLarge { max_bytes },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<ServerMessage>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            tale_warn!("Request failed with {}: {}", status, message);
            return Err(ApiError::new(
                ApiErrorKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        Ok(bytes)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let bytes = self.send(builder).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(ApiErrorKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl TaleApi for RestClient {
    async fn import_tale(&self, request: &ImportRequest) -> Result<ImportResponse, ApiError> {
        let kwargs = serde_json::to_string(&request.tale_kwargs)
            .map_err(|err| ApiError::new(ApiErrorKind::Decode, err.to_string()))?;
        let url = self.endpoint("tale/import", &[])?;
        let builder = with_form(
            self.request(Method::POST, url),
            &[
                ("url", request.url.as_str()),
                ("imageId", request.image_id.as_str()),
                ("taleKwargs", kwargs.as_str()),
            ],
        );
        self.send_json(builder).await
    }

    async fn job_result(&self, job_id: &JobId) -> Result<Value, ApiError> {
        let url = self.endpoint(&format!("job/{}/result", job_id.as_str()), &[])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn list_images(&self, limit: usize, offset: usize) -> Result<Vec<Image>, ApiError> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let url = self.endpoint(
            "image",
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn list_accounts(&self, redirect: &str) -> Result<Vec<Provider>, ApiError> {
        let url = self.endpoint("account", &[("redirect", redirect)])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn account_targets(&self, provider: &str) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&format!("account/{provider}/targets"), &[])?;
        let targets: Vec<TargetDescriptor> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(targets
            .into_iter()
            .map(TargetDescriptor::into_resource_server)
            .collect())
    }

    async fn add_account_key(&self, binding: &ApiKeyBinding) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("account/{}/key", binding.provider), &[])?;
        let builder = with_form(
            self.request(Method::POST, url),
            &[
                ("resource_server", binding.resource_server.as_str()),
                ("key", binding.key.as_str()),
                ("key_type", binding.key_type.as_str()),
            ],
        );
        self.send(builder).await.map(drop)
    }

    async fn revoke_account(
        &self,
        provider: &str,
        resource_server: Option<&str>,
    ) -> Result<(), ApiError> {
        let query: Vec<(&str, &str)> = resource_server
            .map(|server| vec![("resource_server", server)])
            .unwrap_or_default();
        let url = self.endpoint(&format!("account/{provider}/revoke"), &query)?;
        self.send(self.request(Method::GET, url)).await.map(drop)
    }

    async fn fetch_preauthorization(&self, url: &str) -> Result<String, ApiError> {
        let parsed = Url::parse(url)
            .or_else(|_| self.base.join(url))
            .map_err(|err| ApiError::new(ApiErrorKind::InvalidUrl, err.to_string()))?;
        let mut builder = self
            .request(Method::GET, parsed)
            .header(CONTENT_TYPE, "text/xml");
        if let Some(cookie) = self.settings.cookie.as_deref() {
            builder = builder.header(COOKIE, cookie);
        }
        let bytes = self.send(builder).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn with_form(builder: RequestBuilder, pairs: &[(&str, &str)]) -> RequestBuilder {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiErrorKind::Timeout, err.to_string());
    }
    ApiError::new(ApiErrorKind::Network, err.to_string())
}
