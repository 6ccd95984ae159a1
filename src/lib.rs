//! # twocaptcha
//!
//! An async Rust client for the [2captcha](https://2captcha.com) captcha-solving service.
//!
//! ## Features
//!
//! - **30 Captcha Families**: Image, audio and text captchas, reCAPTCHA, hCaptcha,
//!   Turnstile, GeeTest, Amazon WAF, DataDome and more, one constructor each.
//! - **Submit and Poll**: `solve` submits the task and polls until the answer is
//!   ready or the timeout expires.
//! - **Pingback Support**: with a callback URL set, `solve` returns the captcha id
//!   right after submission.
//! - **Proxy Support**: per-task worker proxies, plus an HTTP/SOCKS5 proxy for the
//!   client's own traffic.
//! - **Async/Await**: built on Tokio; a blocking client is included for sync callers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use twocaptcha::{CaptchaTask, Options, TwoCaptcha};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let solver = TwoCaptcha::builder("YOUR_API_KEY").build()?;
//!
//!     let task = CaptchaTask::recaptcha(
//!         "6Le-wvkSVVABCPBMRTvw0Q4Muexq1bi0DJwx_mJ-",
//!         "https://mysite.com/page/with/recaptcha",
//!         Options::new().set("invisible", 1),
//!     );
//!     let result = solver.solve(task).await?;
//!
//!     println!("captcha_id: {}", result.captcha_id);
//!     println!("code: {:?}", result.code);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Image Captchas
//!
//! ```ignore
//! use twocaptcha::{CaptchaTask, Options};
//!
//! // Local path, URL or base64 string
//! let task = CaptchaTask::normal(
//!     "captcha.jpg",
//!     Options::new().set("numeric", 4).set("minLen", 4),
//! )?;
//! let result = solver.solve(task).await?;
//! ```
//!
//! ## Without Waiting
//!
//! ```ignore
//! let id = solver.send(task).await?;
//! // ... later
//! let status = solver.get_result(&id).await?;
//! ```
//!
//! ## Errors
//!
//! Every call returns [`SolverError`]. Bad input fails before anything is sent
//! (`Validation`), service error codes surface as `Api`, transport failures as
//! `Network`, and an expired polling deadline as `Timeout`.

#![allow(missing_docs)]

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod tasks;
pub mod transport;

// Re-exports for convenience
pub use client::{TwoCaptcha, TwoCaptchaBuilder};
pub use config::SolverConfig;
pub use error::{ErrorKind, Result, SolverError};
pub use models::{Answer, FieldValue, ImageFiles, Method, Options, PollStatus, Proxy, TaskResult};
pub use tasks::CaptchaTask;
pub use transport::{HttpTransport, Submission, Transport};
