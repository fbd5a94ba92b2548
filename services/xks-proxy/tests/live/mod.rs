use anyhow::Result;
use log::warn;
use std::env;
use xksbench_core::{Context, OsEnv};
use xksbench_http_send_reqwest::ReqwestHttpSend;
use xksbench_xks_proxy::{run_iteration, Config, Driver, IterationOutcome, MemoryMetrics, Metric};

/// Build a driver against a real proxy, configured from the environment.
fn init_live_driver() -> Result<Option<Driver>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("XKSBENCH_TEST").ok().as_deref() != Some("on") {
        return Ok(None);
    }

    let ctx = Context::new().with_env(OsEnv);
    let config = Config::from_env(&ctx)?;
    let ctx = ctx.with_http_send(ReqwestHttpSend::with_tls_verification(
        config.skip_tls_verification,
    )?);

    Ok(Some(Driver::new(ctx, config)))
}

#[tokio::test]
async fn test_live_round_trip() -> Result<()> {
    let Some(driver) = init_live_driver()? else {
        warn!("XKSBENCH_TEST is not set, skipped");
        return Ok(());
    };

    let metrics = MemoryMetrics::new();
    let outcome = run_iteration(&driver, &metrics).await;

    assert_eq!(outcome, IterationOutcome::Completed { matched: true });
    assert_eq!(metrics.rate(Metric::EncryptErrors).hits, 0);
    assert_eq!(metrics.rate(Metric::DecryptErrors).hits, 0);
    Ok(())
}
