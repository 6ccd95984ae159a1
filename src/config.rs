//! Client-wide settings.

use std::time::Duration;

pub const DEFAULT_SERVER: &str = "2captcha.com";
pub const DEFAULT_SOFT_ID: u32 = 4580;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RECAPTCHA_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum number of images accepted by multi-image tasks.
pub const MAX_FILES: usize = 9;

/// Environment variables checked by [`crate::TwoCaptchaBuilder::from_env`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["TWOCAPTCHA_API_KEY", "APIKEY"];

/// Settings read by every call. Never mutated after the client is built.
#[derive(Clone)]
pub struct SolverConfig {
    pub api_key: String,
    /// Software id sent as `soft_id`; 0 disables it
    pub soft_id: u32,
    /// Pingback URL; when set, `solve` returns right after submission
    pub callback: Option<String>,
    pub default_timeout: Duration,
    pub recaptcha_timeout: Duration,
    pub polling_interval: Duration,
    /// Host serving `in.php` / `res.php`, e.g. `rucaptcha.com`
    pub server: String,
    /// Poll with `json=1` and return the whole envelope
    pub extended_response: bool,
}

impl SolverConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            soft_id: DEFAULT_SOFT_ID,
            callback: None,
            default_timeout: DEFAULT_TIMEOUT,
            recaptcha_timeout: DEFAULT_RECAPTCHA_TIMEOUT,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            server: DEFAULT_SERVER.to_string(),
            extended_response: false,
        }
    }

    /// Read the API key from the first non-empty variable in [`API_KEY_ENV_VARS`].
    pub fn api_key_from_env() -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

// Keeps the API key out of debug output and logs.
impl std::fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverConfig")
            .field("api_key", &"<redacted>")
            .field("soft_id", &self.soft_id)
            .field("callback", &self.callback)
            .field("default_timeout", &self.default_timeout)
            .field("recaptcha_timeout", &self.recaptcha_timeout)
            .field("polling_interval", &self.polling_interval)
            .field("server", &self.server)
            .field("extended_response", &self.extended_response)
            .finish()
    }
}
