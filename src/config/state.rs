// Application state module
// Read-only state shared by every connection task

use super::types::Config;
use crate::app::App;
use crate::logger::AccessLogFormat;

/// Application state
pub struct AppState {
    pub config: Config,
    pub app: App,

    // Parsed once so the request path does not re-parse the format string
    pub access_log_format: AccessLogFormat,
}

impl AppState {
    pub fn new(config: Config, app: App) -> Self {
        let access_log_format = AccessLogFormat::parse(&config.logging.access_log_format);

        Self {
            config,
            app,
            access_log_format,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
