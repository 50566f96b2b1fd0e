use std::env;

// Some broadcaster endpoints reject unrecognized clients, so the default
// mirrors a desktop browser.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:49.0) Gecko/20100101 Firefox/49.0";

/// Backend configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct PvrConfig {
    /// User agent presented to broadcaster endpoints.
    pub user_agent: String,

    /// Whole-request timeout for schedule and stream-resolution fetches.
    pub fetch_timeout_secs: u64,

    /// Connection-establishment timeout.
    pub connect_timeout_secs: u64,
}

impl PvrConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            user_agent: env::var("PVR_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),

            fetch_timeout_secs: env::var("PVR_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),

            connect_timeout_secs: env::var("PVR_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        }
    }
}

impl Default for PvrConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
