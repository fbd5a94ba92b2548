use async_trait::async_trait;
use bytes::Bytes;
use http::{header, StatusCode};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use xksbench_core::hash::{base64_decode, base64_encode};
use xksbench_core::time::parse_iso8601;
use xksbench_core::{Context, HttpSend, Result};
use xksbench_xks_proxy::payload::{DecryptRequest, EncryptRequest};
use xksbench_xks_proxy::{Config, Credential, Driver, SigningContext};

pub const ACCESS_ID: &str = "AKIDTEST";
pub const SECRET_KEY: &str = "testsecret";
pub const REGION: &str = "us-east-1";

pub fn test_config() -> Config {
    Config {
        cm_url: "cm.example.com".to_string(),
        aws_account_id: "111122223333".to_string(),
        aws_region: REGION.to_string(),
        cks_id: "cks-1".to_string(),
        hyok_key_id: "key-1".to_string(),
        cks_access_id: ACCESS_ID.to_string(),
        cks_secret_key: SECRET_KEY.to_string(),
        ..Default::default()
    }
}

pub fn test_driver(proxy: MockProxy) -> Driver {
    init_logger();
    Driver::new(Context::new().with_http_send(proxy), test_config())
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// MockProxy behaves like an xks proxy holding one key.
///
/// "Encryption" xors the plaintext with a fixed byte and binds the aad
/// through the tag. Every request must carry a valid signature.
#[derive(Debug, Clone, Default)]
pub struct MockProxy {
    encrypts: Arc<Mutex<Vec<EncryptRequest>>>,
    decrypts: Arc<Mutex<Vec<DecryptRequest>>>,
    responses: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockProxy {
    pub fn encrypt_requests(&self) -> Vec<EncryptRequest> {
        self.encrypts.lock().unwrap().clone()
    }

    pub fn decrypt_requests(&self) -> Vec<DecryptRequest> {
        self.decrypts.lock().unwrap().clone()
    }

    pub fn encrypt_responses(&self) -> Vec<serde_json::Value> {
        self.responses.lock().unwrap().clone()
    }

    fn verify_signature(req: &http::Request<Bytes>) -> bool {
        let (Some(date), Some(auth)) = (
            req.headers().get("x-amz-date"),
            req.headers().get(header::AUTHORIZATION),
        ) else {
            return false;
        };
        let Ok(time) = parse_iso8601(date.to_str().unwrap()) else {
            return false;
        };

        let cred = Credential {
            access_key_id: ACCESS_ID.to_string(),
            secret_access_key: SECRET_KEY.to_string(),
        };
        let expected = SigningContext::new(&cred, REGION, "kms-xks-proxy", time).authorize(
            req.uri().authority().unwrap().as_str(),
            req.uri().path(),
            req.body(),
        );
        auth.to_str().unwrap() == expected.to_string()
    }

    fn tag(aad: &str, ciphertext: &str) -> String {
        let mut h = Sha256::new();
        h.update(aad.as_bytes());
        h.update(ciphertext.as_bytes());
        base64_encode(&h.finalize()[..16])
    }

    fn xor(data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| b ^ 0x5a).collect()
    }

    fn encrypt(&self, body: &[u8]) -> (StatusCode, serde_json::Value) {
        let req: EncryptRequest = serde_json::from_slice(body).unwrap();
        let plaintext = base64_decode(&req.plaintext).unwrap();
        let ciphertext = base64_encode(&Self::xor(&plaintext));

        let resp = json!({
            "authenticationTag": Self::tag(&req.additional_authenticated_data, &ciphertext),
            "ciphertext": ciphertext,
            "ciphertextMetadata": base64_encode(b"mock-metadata"),
            "initializationVector": base64_encode(&[7u8; 12]),
        });
        self.encrypts.lock().unwrap().push(req);
        self.responses.lock().unwrap().push(resp.clone());
        (StatusCode::OK, resp)
    }

    fn decrypt(&self, body: &[u8]) -> (StatusCode, serde_json::Value) {
        let req: DecryptRequest = serde_json::from_slice(body).unwrap();
        self.decrypts.lock().unwrap().push(req.clone());

        if Self::tag(&req.additional_authenticated_data, &req.ciphertext) != req.authentication_tag
        {
            return (
                StatusCode::BAD_REQUEST,
                json!({"errorName": "InvalidCiphertextException"}),
            );
        }

        let plaintext = Self::xor(&base64_decode(&req.ciphertext).unwrap());
        (
            StatusCode::OK,
            json!({ "plaintext": base64_encode(&plaintext) }),
        )
    }
}

#[async_trait]
impl HttpSend for MockProxy {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (status, body) = if !Self::verify_signature(&req) {
            (
                StatusCode::FORBIDDEN,
                json!({"errorName": "AuthenticationFailedException"}),
            )
        } else if req.uri().path().ends_with("/encrypt") {
            self.encrypt(req.body())
        } else if req.uri().path().ends_with("/decrypt") {
            self.decrypt(req.body())
        } else {
            (StatusCode::NOT_FOUND, json!({}))
        };

        Ok(http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(body.to_string()))?)
    }
}
