//! JSON bodies exchanged with the xks proxy.

use crate::constants::KMS_VIA_SERVICE;
use crate::Config;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xksbench_core::Result;

/// Crypto operation requested from the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KmsOperation {
    /// `Encrypt`
    Encrypt,
    /// `Decrypt`
    Decrypt,
}

impl KmsOperation {
    /// Last path segment of the operation url.
    pub fn path_segment(self) -> &'static str {
        match self {
            KmsOperation::Encrypt => "encrypt",
            KmsOperation::Decrypt => "decrypt",
        }
    }
}

/// Encryption algorithm requested from the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// `AES_GCM`
    #[default]
    #[serde(rename = "AES_GCM")]
    AesGcm,
}

/// Metadata attached to every request, describing the calling principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub aws_principal_arn: String,
    pub kms_key_arn: String,
    pub kms_operation: KmsOperation,
    pub kms_request_id: String,
    pub kms_via_service: String,
}

impl RequestMetadata {
    /// Build metadata with a freshly generated request id.
    pub fn new(config: &Config, op: KmsOperation) -> Self {
        Self {
            aws_principal_arn: config.principal_arn(),
            kms_key_arn: config.kms_key_arn(),
            kms_operation: op,
            kms_request_id: Uuid::new_v4().to_string(),
            kms_via_service: KMS_VIA_SERVICE.to_string(),
        }
    }
}

/// Body of `POST .../encrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    pub request_metadata: RequestMetadata,
    pub additional_authenticated_data: String,
    pub plaintext: String,
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl EncryptRequest {
    /// Build an encrypt request for base64 encoded `plaintext` and `aad`.
    pub fn new(config: &Config, plaintext: &str, aad: &str) -> Self {
        Self {
            request_metadata: RequestMetadata::new(config, KmsOperation::Encrypt),
            additional_authenticated_data: aad.to_string(),
            plaintext: plaintext.to_string(),
            encryption_algorithm: EncryptionAlgorithm::AesGcm,
        }
    }
}

/// Body of `POST .../decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    pub request_metadata: RequestMetadata,
    pub additional_authenticated_data: String,
    pub ciphertext: String,
    pub initialization_vector: String,
    pub authentication_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext_metadata: Option<String>,
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl DecryptRequest {
    /// Build a decrypt request from the fields of a previous encrypt response.
    pub fn new(
        config: &Config,
        ciphertext: &str,
        aad: &str,
        iv: &str,
        tag: &str,
        metadata: Option<&str>,
    ) -> Self {
        Self {
            request_metadata: RequestMetadata::new(config, KmsOperation::Decrypt),
            additional_authenticated_data: aad.to_string(),
            ciphertext: ciphertext.to_string(),
            initialization_vector: iv.to_string(),
            authentication_tag: tag.to_string(),
            ciphertext_metadata: metadata.map(|v| v.to_string()),
            encryption_algorithm: EncryptionAlgorithm::AesGcm,
        }
    }
}

/// Fields consumed from an encrypt response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    pub ciphertext: String,
    pub initialization_vector: String,
    pub authentication_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext_metadata: Option<String>,
}

/// Fields consumed from a decrypt response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptResponse {
    pub plaintext: String,
}

impl EncryptResponse {
    /// Parse an encrypt response body.
    ///
    /// Fails with `ErrorKind::ResponseInvalid` if the body isn't the expected json.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

impl DecryptResponse {
    /// Parse a decrypt response body.
    ///
    /// Fails with `ErrorKind::ResponseInvalid` if the body isn't the expected json.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}
