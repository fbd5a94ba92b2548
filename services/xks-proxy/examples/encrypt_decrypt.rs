//! Run a handful of encrypt and decrypt round trips against a live proxy.
//!
//! Reads the same environment variables as the load harness, for example:
//!
//! ```shell
//! CM_URL=cm.example.com AWS_ACCOUNT_ID=111122223333 AWS_REGION=us-east-1 \
//! CKS_ID=... HYOK_KEY_ID=... CKS_ACCESS_ID=... CKS_SECRET_KEY=... \
//! SKIP_TLS_VERIFICATION=false cargo run --example encrypt_decrypt
//! ```

use xksbench_core::{Context, OsEnv};
use xksbench_http_send_reqwest::ReqwestHttpSend;
use xksbench_xks_proxy::{run_iteration, Config, Driver, MemoryMetrics, Metric};

const ITERATIONS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let ctx = Context::new().with_env(OsEnv);
    let config = Config::from_env(&ctx)?;
    let ctx = ctx.with_http_send(ReqwestHttpSend::with_tls_verification(
        config.skip_tls_verification,
    )?);
    let driver = Driver::new(ctx, config);

    let metrics = MemoryMetrics::new();
    for i in 0..ITERATIONS {
        let outcome = run_iteration(&driver, &metrics).await;
        println!("iteration {i}: {outcome:?}");
    }

    println!();
    for metric in [
        Metric::EncryptErrors,
        Metric::DecryptErrors,
        Metric::EncryptDecryptErrors,
        Metric::EncryptTimeouts,
        Metric::DecryptTimeouts,
        Metric::ResponseParseErrors,
    ] {
        let rate = metrics.rate(metric);
        println!("{metric}: {}/{} ({:.2})", rate.hits, rate.total, rate.ratio());
    }
    for metric in [Metric::EncryptTime, Metric::DecryptTime] {
        let samples = metrics.trend(metric);
        let avg = samples.iter().sum::<std::time::Duration>() / samples.len().max(1) as u32;
        println!("{metric}: avg {avg:?} over {} calls", samples.len());
    }

    Ok(())
}
