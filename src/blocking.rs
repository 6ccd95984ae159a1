//! Blocking client for callers without an async runtime.
//!
//! Wraps the async [`crate::TwoCaptcha`] and drives every call to completion
//! on a private current-thread runtime. Do not use it from inside an async
//! context; `block_on` panics there.
//!
//! ```ignore
//! use twocaptcha::{CaptchaTask, Options, TwoCaptcha};
//!
//! let solver = TwoCaptcha::builder("YOUR_API_KEY").build_blocking()?;
//! let result = solver.solve(CaptchaTask::normal("captcha.jpg", Options::new())?)?;
//! println!("{:?}", result.code);
//! ```

use crate::client::{TwoCaptcha as AsyncTwoCaptcha, TwoCaptchaBuilder};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::models::{Answer, Options, PollStatus, TaskResult};
use crate::tasks::CaptchaTask;
use crate::transport::{HttpTransport, Transport};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Synchronous 2captcha client with the same surface as the async one.
pub struct TwoCaptcha<T = HttpTransport> {
    inner: AsyncTwoCaptcha<T>,
    runtime: Runtime,
}

fn runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

impl TwoCaptcha<HttpTransport> {
    pub fn builder(api_key: impl Into<String>) -> TwoCaptchaBuilder {
        TwoCaptchaBuilder::new(api_key)
    }

    pub(crate) fn from_builder(builder: TwoCaptchaBuilder) -> Result<Self> {
        let runtime = runtime()?;
        // The HTTP client must be created inside the runtime that will drive it.
        let inner = {
            let _guard = runtime.enter();
            builder.build()?
        };
        Ok(Self { inner, runtime })
    }
}

impl<T: Transport> TwoCaptcha<T> {
    pub fn with_transport(config: SolverConfig, transport: T) -> Result<Self> {
        Ok(Self {
            inner: AsyncTwoCaptcha::with_transport(config, transport),
            runtime: runtime()?,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        self.inner.config()
    }

    /// The async client underneath.
    pub fn inner(&self) -> &AsyncTwoCaptcha<T> {
        &self.inner
    }

    pub fn solve(&self, task: CaptchaTask) -> Result<TaskResult> {
        self.runtime.block_on(self.inner.solve(task))
    }

    pub fn send(&self, task: CaptchaTask) -> Result<String> {
        self.runtime.block_on(self.inner.send(task))
    }

    pub fn send_raw(&self, method: &str, options: Options) -> Result<String> {
        self.runtime.block_on(self.inner.send_raw(method, options))
    }

    pub fn get_result(&self, captcha_id: &str) -> Result<PollStatus> {
        self.runtime.block_on(self.inner.get_result(captcha_id))
    }

    pub fn wait_result(
        &self,
        captcha_id: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Answer> {
        self.runtime
            .block_on(self.inner.wait_result(captcha_id, timeout, interval))
    }

    pub fn balance(&self) -> Result<f64> {
        self.runtime.block_on(self.inner.balance())
    }

    pub fn report(&self, captcha_id: &str, correct: bool) -> Result<()> {
        self.runtime.block_on(self.inner.report(captcha_id, correct))
    }
}
