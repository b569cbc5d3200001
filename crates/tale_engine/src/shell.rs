use tale_logging::tale_info;

/// Host capabilities the flows need but do not own: page navigation and
/// transient user notices.
pub trait Shell: Send + Sync {
    fn navigate(&self, url: &str);
    fn notify(&self, text: &str);
}

/// A shell that only records requests in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingShell;

impl Shell for LoggingShell {
    fn navigate(&self, url: &str) {
        tale_info!("navigate to {url}");
    }

    fn notify(&self, text: &str) {
        tale_info!("notice: {text}");
    }
}
