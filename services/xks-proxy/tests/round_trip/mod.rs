use crate::mock::{init_logger, test_config, test_driver, MockProxy};
use anyhow::Result;
use http::StatusCode;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use xksbench_core::hash::base64_encode;
use xksbench_core::Context;
use xksbench_xks_proxy::payload::{DecryptResponse, EncryptResponse};
use xksbench_xks_proxy::{
    random_material, run_iteration, run_iteration_with, Driver, IterationOutcome, MemoryMetrics,
    Metric, Rate,
};

#[tokio::test]
async fn test_decrypt_receives_encrypt_output() -> Result<()> {
    let proxy = MockProxy::default();
    let driver = test_driver(proxy.clone());
    let (plaintext, aad) = random_material();

    let encrypted = driver.encrypt(&plaintext, &aad).await?;
    assert_eq!(encrypted.status(), StatusCode::OK);
    let fields = EncryptResponse::from_slice(encrypted.body())?;

    let decrypted = driver
        .decrypt(
            &fields.ciphertext,
            &aad,
            &fields.initialization_vector,
            &fields.authentication_tag,
            fields.ciphertext_metadata.as_deref(),
        )
        .await?;
    assert_eq!(decrypted.status(), StatusCode::OK);

    let sent = proxy.decrypt_requests().remove(0);
    let echoed = proxy.encrypt_responses().remove(0);
    assert_eq!(sent.additional_authenticated_data, aad);
    assert_eq!(sent.ciphertext, echoed["ciphertext"]);
    assert_eq!(sent.initialization_vector, echoed["initializationVector"]);
    assert_eq!(sent.authentication_tag, echoed["authenticationTag"]);
    assert_eq!(
        sent.ciphertext_metadata.as_deref(),
        echoed["ciphertextMetadata"].as_str()
    );
    assert_eq!(
        DecryptResponse::from_slice(decrypted.body())?.plaintext,
        plaintext
    );
    Ok(())
}

#[tokio::test]
async fn test_round_trip_returns_plaintext() {
    let proxy = MockProxy::default();
    let driver = test_driver(proxy.clone());
    let metrics = MemoryMetrics::new();

    let plaintexts = [
        base64_encode(b""),
        base64_encode(b"hello world"),
        base64_encode(&[0u8; 32]),
        base64_encode(&[0xffu8; 4096]),
    ];
    for plaintext in &plaintexts {
        let outcome = run_iteration_with(&driver, &metrics, plaintext, "YWFk").await;
        assert_eq!(outcome, IterationOutcome::Completed { matched: true });
    }

    assert_eq!(
        metrics.rate(Metric::EncryptDecryptErrors),
        Rate {
            hits: 0,
            total: plaintexts.len() as u64
        }
    );
    assert_eq!(metrics.rate(Metric::EncryptErrors).hits, 0);
    assert_eq!(metrics.rate(Metric::DecryptErrors).hits, 0);
}

#[tokio::test]
async fn test_every_request_is_freshly_identified() {
    let proxy = MockProxy::default();
    let driver = test_driver(proxy.clone());
    let metrics = MemoryMetrics::new();

    run_iteration(&driver, &metrics).await;
    run_iteration(&driver, &metrics).await;

    let mut ids: Vec<_> = proxy
        .encrypt_requests()
        .into_iter()
        .map(|r| r.request_metadata.kms_request_id)
        .chain(
            proxy
                .decrypt_requests()
                .into_iter()
                .map(|r| r.request_metadata.kms_request_id),
        )
        .collect();
    assert_eq!(ids.len(), 4);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    init_logger();
    let config = xksbench_xks_proxy::Config {
        cks_secret_key: "not-the-secret".to_string(),
        ..test_config()
    };
    let driver = Driver::new(Context::new().with_http_send(MockProxy::default()), config);
    let metrics = MemoryMetrics::new();

    let outcome = run_iteration(&driver, &metrics).await;

    assert_eq!(outcome, IterationOutcome::EncryptFailed);
    assert_eq!(metrics.rate(Metric::EncryptErrors), Rate { hits: 1, total: 1 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_iterations() -> Result<()> {
    let proxy = MockProxy::default();
    let driver = Arc::new(test_driver(proxy.clone()));
    let metrics = Arc::new(MemoryMetrics::new());

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let driver = driver.clone();
        let metrics = metrics.clone();
        tasks.push(tokio::spawn(async move {
            run_iteration(&driver, metrics.as_ref()).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await?, IterationOutcome::Completed { matched: true });
    }

    assert_eq!(
        metrics.rate(Metric::EncryptDecryptErrors),
        Rate { hits: 0, total: 32 }
    );
    assert_eq!(metrics.trend(Metric::EncryptTime).len(), 32);
    assert_eq!(metrics.trend(Metric::DecryptTime).len(), 32);
    Ok(())
}
