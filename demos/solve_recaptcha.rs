//! Solve a reCAPTCHA v2 demo page.
//!
//! Run with: TWOCAPTCHA_API_KEY=... cargo run --example solve_recaptcha

use twocaptcha::{CaptchaTask, Options, TwoCaptchaBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let solver = TwoCaptchaBuilder::from_env()?.build()?;

    let balance = solver.balance().await?;
    println!("Balance: {balance}");

    let task = CaptchaTask::recaptcha(
        "6LfD3PIbAAAAAJs_eEHvoOl75_83eXSqpPSRFJ_u",
        "https://2captcha.com/demo/recaptcha-v2",
        Options::new(),
    );

    let start = std::time::Instant::now();
    let result = solver.solve(task).await?;

    println!("\n=== Captcha Solved ===");
    println!("captcha_id: {}", result.captcha_id);
    println!("code: {}", result.code.as_deref().unwrap_or("<pending>"));
    println!("elapsed: {:?}", start.elapsed());

    Ok(())
}
