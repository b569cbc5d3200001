//! External credential providers and the button capability table.
use serde::{Deserialize, Serialize};

/// Resource server sent with a pre-authorization key; the backend replaces it.
pub const PREAUTH_RESOURCE_SERVER: &str = "willBeOverridden";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    OAuth,
    DataOne,
    ApiKey,
    Other(String),
}

impl From<String> for ProviderKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bearer" | "oauth" => ProviderKind::OAuth,
            "dataone" => ProviderKind::DataOne,
            "apikey" => ProviderKind::ApiKey,
            _ => ProviderKind::Other(value),
        }
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OAuth => "bearer".to_string(),
            ProviderKind::DataOne => "dataone".to_string(),
            ProviderKind::ApiKey => "apikey".to_string(),
            ProviderKind::Other(other) => other,
        }
    }
}

impl ProviderKind {
    /// Key-based providers need a resource server to say which key to revoke.
    pub fn requires_resource_server(&self) -> bool {
        matches!(self, ProviderKind::ApiKey | ProviderKind::Other(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    #[default]
    Unauthorized,
    Authorized,
    Preauthorized,
}

/// An API key already bound for a key-based provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundTarget {
    pub resource_server: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(rename = "fullName", default)]
    pub label: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub state: AuthState,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub targets: Vec<BoundTarget>,
    #[serde(default)]
    pub docs_href: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Provider {
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// DataONE hands over credentials through a silent assertion exchange.
    pub fn needs_preauthorization_exchange(&self) -> bool {
        self.kind == ProviderKind::DataOne && self.state == AuthState::Preauthorized
    }

    /// Redirect URL for interactive authorization, when it is meaningful.
    pub fn redirect_url(&self) -> Option<&str> {
        if self.state == AuthState::Unauthorized {
            self.url.as_deref().filter(|url| !url.is_empty())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderIcon {
    Orcid,
    Globus,
    DataOne,
    Box,
}

/// How a provider with a dedicated OAuth button is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStyle {
    pub icon: ProviderIcon,
    pub class: &'static str,
}

/// Providers that get a dedicated OAuth button.
pub fn button_style(provider_name: &str) -> Option<ButtonStyle> {
    let (icon, class) = match provider_name {
        "orcid" => (ProviderIcon::Orcid, "g-oauth-button-orcid"),
        "globus" => (ProviderIcon::Globus, "g-oauth-button-globus"),
        "dataoneprod" => (ProviderIcon::DataOne, "g-oauth-button-dataoneprod"),
        "dataonestage" => (ProviderIcon::DataOne, "g-oauth-button-dataonestage"),
        "dataonestage2" => (ProviderIcon::DataOne, "g-oauth-button-dataonestage2"),
        "box" => (ProviderIcon::Box, "g-oauth-button-box"),
        _ => return None,
    };
    Some(ButtonStyle { icon, class })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Dedicated button, not yet authorized.
    Authorize,
    /// Dedicated button, some authorization exists.
    Revoke,
    /// No dedicated button; managed through API keys.
    KeyProvider,
}

/// Bucket for a provider whose pre-authorization exchange (if any) is done.
pub fn classify(provider: &Provider) -> Bucket {
    match button_style(&provider.name) {
        Some(_) if provider.state == AuthState::Unauthorized => Bucket::Authorize,
        Some(_) => Bucket::Revoke,
        None => Bucket::KeyProvider,
    }
}

/// `(provider name, resource server, key)` submitted to bind an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyBinding {
    pub provider: String,
    pub resource_server: String,
    pub key: String,
    pub key_type: KeyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    ApiKey,
    DataOne,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::ApiKey => "apikey",
            KeyType::DataOne => "dataone",
        }
    }
}

/// A resource-server target as returned by `account/{provider}/targets`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TargetDescriptor {
    Name(String),
    Server { resource_server: String },
}

impl TargetDescriptor {
    pub fn into_resource_server(self) -> String {
        match self {
            TargetDescriptor::Name(name) => name,
            TargetDescriptor::Server { resource_server } => resource_server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_decodes_server_shape() {
        let raw = r#"{"name":"zenodo","fullName":"Zenodo","logo":"","type":"apikey",
            "url":"","targets":[{"resource_server":"zenodo.org","url":"x"}],"tags":["data"]}"#;
        let provider: Provider = serde_json::from_str(raw).unwrap();
        assert_eq!(provider.kind, ProviderKind::ApiKey);
        assert_eq!(provider.state, AuthState::Unauthorized);
        assert_eq!(provider.targets[0].resource_server, "zenodo.org");
        assert_eq!(provider.display_name(), "Zenodo");
        assert_eq!(provider.redirect_url(), None);
    }

    #[test]
    fn unknown_kind_is_kept() {
        let kind = ProviderKind::from("ssh".to_string());
        assert_eq!(kind, ProviderKind::Other("ssh".into()));
        assert!(kind.requires_resource_server());
        assert!(!ProviderKind::OAuth.requires_resource_server());
    }

    #[test]
    fn targets_accept_names_and_objects() {
        let targets: Vec<TargetDescriptor> =
            serde_json::from_str(r#"["zenodo.org", {"resource_server":"sandbox.zenodo.org"}]"#)
                .unwrap();
        let names: Vec<String> = targets
            .into_iter()
            .map(TargetDescriptor::into_resource_server)
            .collect();
        assert_eq!(names, vec!["zenodo.org", "sandbox.zenodo.org"]);
    }
}
