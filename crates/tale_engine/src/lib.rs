//! Tale engine: REST client, event bus and the drivers that execute core effects.
mod api;
mod bus;
mod config;
mod credentials;
mod launch;
mod rest;
mod shell;
mod types;

pub use api::{fetch_all_images, ImportResponse, TaleApi};
pub use bus::{EventBus, EventSubscription, DEFAULT_EVENT_BUFFER};
pub use config::{ApiSettings, ConfigError, EngineConfig};
pub use credentials::CredentialLinker;
pub use launch::{JobHandle, LaunchOrchestrator, Submission};
pub use rest::RestClient;
pub use shell::{LoggingShell, Shell};
pub use types::{ApiError, ApiErrorKind, LaunchError};
