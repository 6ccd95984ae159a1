//! Solve a local image captcha with the blocking client.
//!
//! Run with: TWOCAPTCHA_API_KEY=... cargo run --example blocking_normal -- captcha.jpg

use std::time::Duration;
use twocaptcha::{CaptchaTask, Options, TwoCaptchaBuilder};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: blocking_normal <image>"))?;

    let solver = TwoCaptchaBuilder::from_env()?
        .default_timeout(Duration::from_secs(60))
        .polling_interval(Duration::from_secs(5))
        .build_blocking()?;

    let task = CaptchaTask::normal(&path, Options::new().set("caseSensitive", 1))?;
    let result = solver.solve(task)?;

    println!("{} -> {:?}", result.captcha_id, result.code);
    Ok(())
}
