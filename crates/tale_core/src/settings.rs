//! Plugin setting keys and the config form that writes them.
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INSTANCE_CAP: &str = "wholetale.instance_cap";
pub const DATAVERSE_URL: &str = "wholetale.dataverse_url";
pub const DATAVERSE_EXTRA_HOSTS: &str = "wholetale.dataverse_extra_hosts";
pub const EXTERNAL_AUTH_PROVIDERS: &str = "wholetale.external_auth_providers";
pub const EXTERNAL_APIKEY_GROUPS: &str = "wholetale.external_apikey_groups";

pub const PLUGIN_SETTING_KEYS: [&str; 5] = [
    INSTANCE_CAP,
    DATAVERSE_URL,
    DATAVERSE_EXTRA_HOSTS,
    EXTERNAL_AUTH_PROVIDERS,
    EXTERNAL_APIKEY_GROUPS,
];

/// How the settings store fills keys that were never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingDefault {
    /// Unset keys come back as `null`.
    None,
    /// Unset keys come back as their default value.
    Default,
}

impl SettingDefault {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingDefault::None => "none",
            SettingDefault::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: Value,
}

/// Raw text of the plugin configuration form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    pub instance_cap: String,
    pub dataverse_url: String,
    pub dataverse_extra_hosts: String,
    pub external_auth_providers: String,
    pub external_apikey_groups: String,
}

impl ConfigForm {
    /// Entries to store; multi-line fields are trimmed.
    pub fn to_entries(&self) -> Vec<SettingEntry> {
        let entry = |key: &str, value: &str| SettingEntry {
            key: key.to_string(),
            value: Value::String(value.to_string()),
        };
        vec![
            entry(INSTANCE_CAP, &self.instance_cap),
            entry(DATAVERSE_URL, &self.dataverse_url),
            entry(DATAVERSE_EXTRA_HOSTS, self.dataverse_extra_hosts.trim()),
            entry(EXTERNAL_AUTH_PROVIDERS, self.external_auth_providers.trim()),
            entry(EXTERNAL_APIKEY_GROUPS, self.external_apikey_groups.trim()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_trims_multiline_fields_only() {
        let form = ConfigForm {
            instance_cap: "2".into(),
            dataverse_url: "https://dv.example/installations".into(),
            dataverse_extra_hosts: "  [\"a.example\"]\n".into(),
            external_auth_providers: "[]\n".into(),
            external_apikey_groups: " [] ".into(),
        };
        let entries = form.to_entries();
        assert_eq!(entries.len(), PLUGIN_SETTING_KEYS.len());
        assert_eq!(entries[2].value, Value::String("[\"a.example\"]".into()));
        assert_eq!(entries[4].value, Value::String("[]".into()));
        assert_eq!(entries[0].key, INSTANCE_CAP);
    }
}
