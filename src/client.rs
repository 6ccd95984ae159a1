//! Main TwoCaptcha client: submission and polling.

use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::models::{Answer, FieldValue, Options, Params, PollStatus, TaskResult};
use crate::normalize::{Files, TaskRequest};
use crate::tasks::CaptchaTask;
use crate::transport::{check_api_error, HttpTransport, HttpTransportBuilder, Transport};
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Poll body while the worker is still busy.
pub const NOT_READY: &str = "CAPCHA_NOT_READY";

/// Prefix of every successful plain-text answer.
const OK_PREFIX: &str = "OK|";

/// Builder for creating a TwoCaptcha client.
pub struct TwoCaptchaBuilder {
    config: SolverConfig,
    transport: HttpTransportBuilder,
}

impl TwoCaptchaBuilder {
    /// Create a new builder with the account API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            config: SolverConfig::new(api_key),
            transport: HttpTransportBuilder::new(),
        }
    }

    /// Create a builder with the API key taken from `TWOCAPTCHA_API_KEY` or `APIKEY`.
    pub fn from_env() -> Result<Self> {
        SolverConfig::api_key_from_env()
            .map(Self::new)
            .ok_or_else(|| {
                SolverError::validation("API key not set: export TWOCAPTCHA_API_KEY or APIKEY")
            })
    }

    /// Software id sent with every task; 0 disables it.
    pub fn soft_id(mut self, soft_id: u32) -> Self {
        self.config.soft_id = soft_id;
        self
    }

    /// Pingback URL registered in the account settings.
    ///
    /// With a pingback set, `solve` returns right after submission and the
    /// answer is delivered to the URL instead.
    pub fn callback(mut self, url: impl Into<String>) -> Self {
        self.config.callback = Some(url.into());
        self
    }

    /// Polling timeout for everything except reCAPTCHA.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn recaptcha_timeout(mut self, timeout: Duration) -> Self {
        self.config.recaptcha_timeout = timeout;
        self
    }

    /// Spacing between `res.php` polls. Values under 5 seconds are not recommended.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    /// API host, e.g. `rucaptcha.com`.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.server = server.into();
        self
    }

    /// Poll with `json=1` and keep every field of the answer envelope.
    pub fn extended_response(mut self, enabled: bool) -> Self {
        self.config.extended_response = enabled;
        self
    }

    /// Proxy for the client's own connections to the API.
    ///
    /// This is unrelated to the proxy a worker uses to load the captcha;
    /// set that one per task with [`Options::proxy`].
    pub fn http_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.transport = self.transport.proxy(proxy);
        self
    }

    /// Bind outgoing connections to a specific local address.
    pub fn local_address(mut self, addr: IpAddr) -> Self {
        self.transport = self.transport.local_address(addr);
        self
    }

    /// Per-request HTTP timeout, independent of the polling deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Build a client over HTTPS.
    pub fn build(self) -> Result<TwoCaptcha<HttpTransport>> {
        let transport = self.transport.server(self.config.server.clone()).build()?;
        Ok(TwoCaptcha::with_transport(self.config, transport))
    }

    /// Build a blocking client that drives the same engine on its own runtime.
    pub fn build_blocking(self) -> Result<crate::blocking::TwoCaptcha<HttpTransport>> {
        crate::blocking::TwoCaptcha::from_builder(self)
    }

    /// Build a client over a custom transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> TwoCaptcha<T> {
        TwoCaptcha::with_transport(self.config, transport)
    }
}

/// 2captcha client.
///
/// Cheap to clone; clones share the configuration and the HTTP connection pool.
/// Each `solve` drives one submission and one polling loop, so many solves can
/// run concurrently on separate tasks.
///
/// # Example
/// ```ignore
/// use twocaptcha::{CaptchaTask, Options, TwoCaptcha};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let solver = TwoCaptcha::builder("YOUR_API_KEY").build()?;
///
///     let task = CaptchaTask::hcaptcha("SITEKEY", "https://example.com", Options::new());
///     let result = solver.solve(task).await?;
///     println!("Solved: {:?}", result.code);
///     Ok(())
/// }
/// ```
pub struct TwoCaptcha<T = HttpTransport> {
    transport: Arc<T>,
    config: Arc<SolverConfig>,
}

impl<T> Clone for TwoCaptcha<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl TwoCaptcha<HttpTransport> {
    /// Create a builder for the TwoCaptcha client.
    pub fn builder(api_key: impl Into<String>) -> TwoCaptchaBuilder {
        TwoCaptchaBuilder::new(api_key)
    }
}

impl<T: Transport> TwoCaptcha<T> {
    pub fn with_transport(config: SolverConfig, transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit a task and wait for its answer.
    ///
    /// With a pingback URL in effect the returned result only carries the
    /// captcha id and no polling happens.
    pub async fn solve(&self, task: CaptchaTask) -> Result<TaskResult> {
        let timeout = task.timeout_for(&self.config);
        let interval = task.polling_interval_for(&self.config);

        let request = self.prepare(task).await?;
        let has_callback = request.has_callback();

        let captcha_id = self.submit(request).await?;
        let result = TaskResult::pending(captcha_id.clone());

        if has_callback {
            tracing::info!(captcha_id = %captcha_id, "Pingback set, skipping polling");
            return Ok(result);
        }

        let answer = self.wait_result(&captcha_id, timeout, interval).await?;
        Ok(result.with_answer(answer))
    }

    /// Submit a task without waiting; returns the captcha id.
    pub async fn send(&self, task: CaptchaTask) -> Result<String> {
        let request = self.prepare(task).await?;
        self.submit(request).await
    }

    /// Submit any `in.php` method with raw fields, for methods without a
    /// [`CaptchaTask`] constructor. Fields are renamed like any other task.
    pub async fn send_raw(&self, method: &str, options: Options) -> Result<String> {
        let mut fields: Params = options.fields;
        fields.insert("method".into(), FieldValue::from(method));
        let request = TaskRequest::new(fields, Files::new()).normalize(&self.config)?;
        self.submit(request).await
    }

    async fn prepare(&self, task: CaptchaTask) -> Result<TaskRequest> {
        task.into_request(&*self.transport)
            .await?
            .normalize(&self.config)
    }

    async fn submit(&self, request: TaskRequest) -> Result<String> {
        tracing::debug!(
            method = request.method().unwrap_or_default(),
            files = request.files.len(),
            "Submitting captcha"
        );

        let body = self.transport.submit(&request.into_submission()).await?;
        let captcha_id = decode_submit(&body)?;

        tracing::debug!(captcha_id = %captcha_id, "Captcha accepted");
        Ok(captcha_id)
    }

    /// Poll `res.php` once.
    pub async fn get_result(&self, captcha_id: &str) -> Result<PollStatus> {
        let mut query = self.query("get");
        query.push(("id".into(), captcha_id.to_string()));
        if self.config.extended_response {
            query.push(("json".into(), "1".into()));
        }

        let body = self.transport.poll(&query).await?;
        decode_poll(&body, self.config.extended_response)
    }

    /// Poll every `interval` until the task is ready or `timeout` elapses.
    ///
    /// The deadline is checked before each poll, so a slow request can
    /// overrun it by up to one round trip. A timeout too large to form a
    /// deadline (e.g. `Duration::MAX`) polls until the task settles.
    pub async fn wait_result(
        &self,
        captcha_id: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Answer> {
        let deadline = Instant::now().checked_add(timeout);
        let mut attempt = 0u32;

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            attempt += 1;
            match self.get_result(captcha_id).await? {
                PollStatus::Ready(answer) => {
                    tracing::debug!(captcha_id, attempt, "Captcha solved");
                    return Ok(answer);
                }
                PollStatus::NotReady => {
                    tracing::debug!(captcha_id, attempt, "Captcha not ready, retrying...");
                    tokio::time::sleep(interval).await;
                }
            }
        }

        tracing::warn!(captcha_id, ?timeout, "Polling timed out");
        Err(SolverError::Timeout(timeout))
    }

    /// Current account balance.
    pub async fn balance(&self) -> Result<f64> {
        let body = self.transport.poll(&self.query("getbalance")).await?;
        check_api_error(&body)?;

        let balance = body
            .trim()
            .parse::<f64>()
            .map_err(|_| SolverError::Api(format!("cannot recognize balance {}", body)))?;
        tracing::debug!(balance, "Fetched balance");
        Ok(balance)
    }

    /// Report an answer as correct or incorrect. The response body is ignored.
    pub async fn report(&self, captcha_id: &str, correct: bool) -> Result<()> {
        let action = if correct { "reportgood" } else { "reportbad" };
        let mut query = self.query(action);
        query.push(("id".into(), captcha_id.to_string()));

        let body = self.transport.poll(&query).await?;
        check_api_error(&body)?;
        tracing::debug!(captcha_id, action, "Reported captcha");
        Ok(())
    }

    fn query(&self, action: &str) -> Vec<(String, String)> {
        vec![
            ("key".into(), self.config.api_key.clone()),
            ("action".into(), action.to_string()),
        ]
    }
}

/// Decode an `in.php` acknowledgement into the captcha id.
pub fn decode_submit(body: &str) -> Result<String> {
    check_api_error(body)?;
    body.strip_prefix(OK_PREFIX)
        .map(str::to_string)
        .ok_or_else(|| SolverError::Api(format!("cannot recognize response {}", body)))
}

/// Classify a `res.php` answer as not-ready, ready or failed.
pub fn decode_poll(body: &str, extended: bool) -> Result<PollStatus> {
    check_api_error(body)?;

    if !extended {
        if body == NOT_READY {
            return Ok(PollStatus::NotReady);
        }
        return body
            .strip_prefix(OK_PREFIX)
            .map(|code| PollStatus::Ready(Answer::Text(code.to_string())))
            .ok_or_else(|| SolverError::Api(format!("cannot recognize response {}", body)));
    }

    let envelope = match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => map,
        other => {
            return Err(SolverError::Api(format!(
                "Unexpected response: {}",
                other
            )))
        }
    };

    match envelope.get("status").and_then(Value::as_i64) {
        Some(0) => Ok(PollStatus::NotReady),
        Some(1) if !envelope.contains_key("request") => Err(SolverError::Api(format!(
            "Missing request in response: {}",
            body
        ))),
        Some(1) => Ok(PollStatus::Ready(Answer::Envelope(envelope))),
        _ => Err(SolverError::Api(format!(
            "Unexpected status in response: {}",
            body
        ))),
    }
}
