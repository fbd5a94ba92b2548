use crate::payload::{DecryptRequest, EncryptRequest, KmsOperation};
use crate::{Config, ConfigCredentialProvider, Credential, RequestSigner};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use log::debug;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use xksbench_core::{Context, Error, Result, Signer};

/// Response of one proxy call together with the time it took.
#[derive(Debug)]
pub struct TimedResponse {
    /// Raw response, uninterpreted.
    pub response: http::Response<Bytes>,
    /// Wall time spent in the http call, signing excluded.
    pub duration: Duration,
}

impl TimedResponse {
    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Body of the response.
    pub fn body(&self) -> &Bytes {
        self.response.body()
    }
}

/// Driver issues signed encrypt and decrypt calls against one xks proxy key.
///
/// Every call builds its own payload, signing context and canonical request,
/// so one driver can be shared by any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct Driver {
    ctx: Context,
    config: Arc<Config>,
    signer: Signer<Credential>,
}

impl Driver {
    /// Create a new driver that signs with the credential in `config`.
    pub fn new(ctx: Context, config: Config) -> Self {
        let config = Arc::new(config);
        let signer = Signer::new(
            ctx.clone(),
            ConfigCredentialProvider::new(config.clone()),
            RequestSigner::new(&config.aws_region),
        );

        Self {
            ctx,
            config,
            signer,
        }
    }

    /// Replace the signer used for outgoing requests.
    pub fn with_signer(mut self, signer: Signer<Credential>) -> Self {
        self.signer = signer;
        self
    }

    /// Config of this driver.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Encrypt base64 encoded `plaintext` bound to base64 encoded `aad`.
    pub async fn encrypt(&self, plaintext: &str, aad: &str) -> Result<TimedResponse> {
        let payload = EncryptRequest::new(&self.config, plaintext, aad);
        self.send(KmsOperation::Encrypt, &payload).await
    }

    /// Decrypt the fields returned by a previous encrypt call.
    pub async fn decrypt(
        &self,
        ciphertext: &str,
        aad: &str,
        iv: &str,
        tag: &str,
        metadata: Option<&str>,
    ) -> Result<TimedResponse> {
        let payload = DecryptRequest::new(&self.config, ciphertext, aad, iv, tag, metadata);
        self.send(KmsOperation::Decrypt, &payload).await
    }

    async fn send(&self, op: KmsOperation, payload: &impl Serialize) -> Result<TimedResponse> {
        let body = serde_json::to_vec(payload).map_err(|e| {
            Error::request_invalid(format!("failed to serialize {op:?} request")).with_source(e)
        })?;

        let (mut parts, ()) = http::Request::post(self.config.operation_url(op))
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .body(())?
            .into_parts();
        self.signer.sign(&mut parts, &body).await?;
        let req = http::Request::from_parts(parts, Bytes::from(body));

        let start = Instant::now();
        let response = self.ctx.http_send(req).await?;
        let duration = start.elapsed();
        debug!(
            "{} finished with status {} in {duration:?}",
            op.path_segment(),
            response.status()
        );

        Ok(TimedResponse { response, duration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::X_AMZ_DATE;
    use crate::sign_request::SigningContext;
    use crate::StaticCredentialProvider;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use xksbench_core::time::parse_iso8601;
    use xksbench_core::HttpSend;

    #[derive(Debug, Default, Clone)]
    struct RecordingHttpSend {
        requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    }

    impl RecordingHttpSend {
        fn take(&self) -> Vec<http::Request<Bytes>> {
            std::mem::take(&mut *self.requests.lock().expect("lock poisoned"))
        }
    }

    #[async_trait]
    impl HttpSend for RecordingHttpSend {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.requests.lock().expect("lock poisoned").push(req);
            Ok(http::Response::builder()
                .status(StatusCode::OK)
                .body(Bytes::from_static(b"{}"))?)
        }
    }

    fn config() -> Config {
        Config {
            cm_url: "cm.example.com".to_string(),
            aws_account_id: "111122223333".to_string(),
            aws_region: "us-east-1".to_string(),
            cks_id: "cks-1".to_string(),
            hyok_key_id: "key-1".to_string(),
            cks_access_id: "AKIDTEST".to_string(),
            cks_secret_key: "testsecret".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_encrypt_request_shape() -> anyhow::Result<()> {
        let transport = RecordingHttpSend::default();
        let driver = Driver::new(Context::new().with_http_send(transport.clone()), config());

        let resp = driver.encrypt("cGxhaW4=", "YWFk").await?;
        assert_eq!(resp.status(), StatusCode::OK);

        let reqs = transport.take();
        assert_eq!(reqs.len(), 1);
        let req = &reqs[0];
        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(
            req.uri().to_string(),
            "https://cm.example.com/api/v1/cckm/aws/xks-proxy-endpoints/cks-1/kms/xks/v1/keys/key-1/encrypt"
        );
        assert_eq!(req.headers()[header::CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_slice(req.body())?;
        assert_eq!(body["plaintext"], "cGxhaW4=");
        assert_eq!(body["additionalAuthenticatedData"], "YWFk");
        assert_eq!(body["requestMetadata"]["kmsOperation"], "Encrypt");
        Ok(())
    }

    #[tokio::test]
    async fn test_signature_covers_sent_body() -> anyhow::Result<()> {
        let transport = RecordingHttpSend::default();
        let driver = Driver::new(Context::new().with_http_send(transport.clone()), config());

        driver
            .decrypt("Y3Q=", "YWFk", "aXY=", "dGFn", Some("bWQ="))
            .await?;

        let req = transport.take().remove(0);
        let date = req.headers()[X_AMZ_DATE].to_str()?;
        let cred = Credential {
            access_key_id: "AKIDTEST".to_string(),
            secret_access_key: "testsecret".to_string(),
        };
        let expected = SigningContext::new(
            &cred,
            "us-east-1",
            "kms-xks-proxy",
            parse_iso8601(date)?,
        )
        .authorize("cm.example.com", req.uri().path(), req.body());

        assert_eq!(
            req.headers()[header::AUTHORIZATION].to_str()?,
            expected.to_string()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_each_request_gets_its_own_signature() -> anyhow::Result<()> {
        let transport = RecordingHttpSend::default();
        let driver = Driver::new(Context::new().with_http_send(transport.clone()), config());

        driver.encrypt("cGxhaW4=", "YWFk").await?;
        driver.encrypt("cGxhaW4=", "YWFk").await?;

        let reqs = transport.take();
        assert_ne!(
            reqs[0].headers()[header::AUTHORIZATION],
            reqs[1].headers()[header::AUTHORIZATION]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_with_signer() -> anyhow::Result<()> {
        let transport = RecordingHttpSend::default();
        let ctx = Context::new().with_http_send(transport.clone());
        let signer = Signer::new(
            ctx.clone(),
            StaticCredentialProvider::new("AKIDOTHER", "othersecret"),
            RequestSigner::new("eu-west-1"),
        );
        let driver = Driver::new(ctx, config()).with_signer(signer);

        driver.encrypt("cGxhaW4=", "YWFk").await?;

        let req = transport.take().remove(0);
        let auth = req.headers()[header::AUTHORIZATION].to_str()?.to_string();
        assert!(auth.contains("Credential=AKIDOTHER/"));
        assert!(auth.contains("/eu-west-1/kms-xks-proxy/aws4_request"));
        Ok(())
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let driver = Driver::new(Context::new(), config());

        let err = driver
            .encrypt("cGxhaW4=", "YWFk")
            .await
            .expect_err("noop http must fail");
        assert_eq!(err.kind(), xksbench_core::ErrorKind::Unexpected);
    }
}
