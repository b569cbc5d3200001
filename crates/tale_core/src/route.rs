//! In-app navigation paths consumed by the host router.
use url::form_urlencoded;

pub const INSTANCE_LIST_PREFIX: &str = "instance/user/";
pub const LAUNCH_PATH: &str = "launch";
pub const EXT_KEYS_PATH: &str = "ext_keys";
pub const CONFIG_PATH: &str = "plugins/wholetale/config";

/// Data reference used when the launch route carries none.
pub const DEFAULT_DATA_REFERENCE: &str = "nothing was passed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    InstanceList { user_id: String },
    Launch { url: Option<String> },
    ExtKeys,
    Config,
}

impl Route {
    /// Parses a fragment such as `launch?url=...` or `#ext_keys`.
    pub fn parse(fragment: &str) -> Option<Route> {
        let fragment = fragment.trim().trim_start_matches('#').trim_start_matches('/');
        let (path, query) = match fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (fragment, None),
        };
        let path = path.trim_end_matches('/');

        if let Some(user_id) = path.strip_prefix(INSTANCE_LIST_PREFIX) {
            if user_id.is_empty() || user_id.contains('/') {
                return None;
            }
            return Some(Route::InstanceList {
                user_id: user_id.to_string(),
            });
        }

        match path {
            LAUNCH_PATH => {
                let url = query.and_then(|query| {
                    form_urlencoded::parse(query.as_bytes())
                        .find(|(key, _)| key == "url")
                        .map(|(_, value)| value.into_owned())
                });
                Some(Route::Launch { url })
            }
            EXT_KEYS_PATH => Some(Route::ExtKeys),
            CONFIG_PATH => Some(Route::Config),
            _ => None,
        }
    }

    pub fn to_path(&self) -> String {
        match self {
            Route::InstanceList { user_id } => format!("{INSTANCE_LIST_PREFIX}{user_id}"),
            Route::Launch { url: Some(url) } => {
                let query: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("url", url)
                    .finish();
                format!("{LAUNCH_PATH}?{query}")
            }
            Route::Launch { url: None } => LAUNCH_PATH.to_string(),
            Route::ExtKeys => EXT_KEYS_PATH.to_string(),
            Route::Config => CONFIG_PATH.to_string(),
        }
    }

    /// Data reference the launch view should start from.
    pub fn launch_data_reference(&self) -> Option<&str> {
        match self {
            Route::Launch { url } => Some(url.as_deref().unwrap_or(DEFAULT_DATA_REFERENCE)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_routes() {
        assert_eq!(
            Route::parse("instance/user/abc123"),
            Some(Route::InstanceList {
                user_id: "abc123".into()
            })
        );
        assert_eq!(Route::parse("#ext_keys"), Some(Route::ExtKeys));
        assert_eq!(Route::parse("plugins/wholetale/config"), Some(Route::Config));
        assert_eq!(Route::parse("launch"), Some(Route::Launch { url: None }));
        assert_eq!(Route::parse("instance/user/"), None);
        assert_eq!(Route::parse("nowhere"), None);
    }

    #[test]
    fn launch_url_is_decoded_and_defaulted() {
        let route = Route::parse("launch?url=http%3A%2F%2Fexample.org%2Fd").unwrap();
        assert_eq!(route.launch_data_reference(), Some("http://example.org/d"));
        assert_eq!(Route::parse(&route.to_path()), Some(route));

        let bare = Route::parse("launch").unwrap();
        assert_eq!(bare.launch_data_reference(), Some(DEFAULT_DATA_REFERENCE));
    }
}
