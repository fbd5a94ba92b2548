//! One encrypt then decrypt round trip, as called by the load harness.

use crate::constants::RANDOM_PAYLOAD_SIZE;
use crate::metrics::{record_call, record_failed_call, Metric, Metrics};
use crate::payload::{DecryptResponse, EncryptResponse, KmsOperation};
use crate::Driver;
use http::StatusCode;
use log::warn;
use rand::RngCore;
use xksbench_core::hash::base64_encode;

/// How an iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Both calls completed; `matched` tells whether the plaintext came back unchanged.
    Completed {
        /// Decrypted plaintext equals the original one.
        matched: bool,
    },
    /// The encrypt call didn't produce a usable response.
    EncryptFailed,
    /// The encrypt response body couldn't be parsed.
    EncryptResponseInvalid,
    /// The decrypt call never produced a response.
    DecryptFailed,
}

/// Run one iteration with freshly generated random plaintext and aad.
pub async fn run_iteration(driver: &Driver, metrics: &dyn Metrics) -> IterationOutcome {
    let (plaintext, aad) = random_material();
    run_iteration_with(driver, metrics, &plaintext, &aad).await
}

/// Run one iteration for base64 encoded `plaintext` and `aad`.
///
/// No error escapes: every failure is recorded as a metric and ends the
/// iteration early. The configured pause is still taken before returning.
pub async fn run_iteration_with(
    driver: &Driver,
    metrics: &dyn Metrics,
    plaintext: &str,
    aad: &str,
) -> IterationOutcome {
    let outcome = round_trip(driver, metrics, plaintext, aad).await;

    let matched = matches!(outcome, IterationOutcome::Completed { matched: true });
    if !matched {
        warn!("round trip didn't return the original plaintext: {outcome:?}");
    }
    metrics.add_rate(Metric::EncryptDecryptErrors, !matched);

    pace(driver).await;
    outcome
}

async fn round_trip(
    driver: &Driver,
    metrics: &dyn Metrics,
    plaintext: &str,
    aad: &str,
) -> IterationOutcome {
    let config = driver.config();

    let encrypted = match driver.encrypt(plaintext, aad).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!("encrypt failed: {err}");
            record_failed_call(metrics, KmsOperation::Encrypt);
            return IterationOutcome::EncryptFailed;
        }
    };
    record_call(
        metrics,
        KmsOperation::Encrypt,
        encrypted.status(),
        encrypted.duration,
        config.timeout_threshold,
    );
    if encrypted.status() != StatusCode::OK {
        return IterationOutcome::EncryptFailed;
    }

    let fields = match EncryptResponse::from_slice(encrypted.body()) {
        Ok(fields) => {
            metrics.add_rate(Metric::ResponseParseErrors, false);
            fields
        }
        Err(err) => {
            warn!("encrypt response is invalid: {err}");
            metrics.add_rate(Metric::ResponseParseErrors, true);
            return IterationOutcome::EncryptResponseInvalid;
        }
    };

    pace(driver).await;

    let decrypted = match driver
        .decrypt(
            &fields.ciphertext,
            aad,
            &fields.initialization_vector,
            &fields.authentication_tag,
            fields.ciphertext_metadata.as_deref(),
        )
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            warn!("decrypt failed: {err}");
            record_failed_call(metrics, KmsOperation::Decrypt);
            return IterationOutcome::DecryptFailed;
        }
    };
    record_call(
        metrics,
        KmsOperation::Decrypt,
        decrypted.status(),
        decrypted.duration,
        config.timeout_threshold,
    );

    match DecryptResponse::from_slice(decrypted.body()) {
        Ok(resp) => {
            metrics.add_rate(Metric::ResponseParseErrors, false);
            IterationOutcome::Completed {
                matched: resp.plaintext == plaintext,
            }
        }
        Err(err) => {
            warn!("decrypt response is invalid: {err}");
            metrics.add_rate(Metric::ResponseParseErrors, true);
            IterationOutcome::Completed { matched: false }
        }
    }
}

/// Random base64 plaintext and aad, in that order.
pub fn random_material() -> (String, String) {
    let mut rng = rand::thread_rng();
    let mut plaintext = [0u8; RANDOM_PAYLOAD_SIZE];
    let mut aad = [0u8; RANDOM_PAYLOAD_SIZE];
    rng.fill_bytes(&mut aad);
    rng.fill_bytes(&mut plaintext);

    (base64_encode(&plaintext), base64_encode(&aad))
}

async fn pace(driver: &Driver) {
    if let Some(d) = driver.config().sleep_duration {
        tokio::time::sleep(d).await;
    }
}
