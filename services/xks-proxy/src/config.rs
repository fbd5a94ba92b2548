use crate::constants::*;
use crate::payload::KmsOperation;
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use xksbench_core::utils::Redact;
use xksbench_core::{Context, Error, Result};

/// Config for the xks proxy driver.
///
/// Built once, then handed to [`crate::Driver`]; the driver never reads the
/// environment itself.
#[derive(Clone)]
pub struct Config {
    /// Host (and optional port) of the key manager, also used as the signed `host` header.
    pub cm_url: String,
    /// Cloud account id used in the principal and key ARNs.
    pub aws_account_id: String,
    /// Region used for signing and in the key ARN.
    pub aws_region: String,
    /// Identifier of the xks proxy endpoint on the key manager.
    pub cks_id: String,
    /// HYOK key addressed by the encrypt and decrypt calls.
    pub hyok_key_id: String,
    /// Access id used in the credential scope.
    pub cks_access_id: String,
    /// Secret key used to derive the signing key.
    pub cks_secret_key: String,
    /// Skip TLS certificate verification.
    pub skip_tls_verification: bool,
    /// Optional pause after each crypto call.
    pub sleep_duration: Option<Duration>,

    /// IAM user named in the principal ARN.
    pub aws_user: String,
    /// KMS key id named in the key ARN.
    pub kms_key_id: String,
    /// Calls slower than this count as timeouts.
    pub timeout_threshold: Duration,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cm_url", &self.cm_url)
            .field("aws_account_id", &self.aws_account_id)
            .field("aws_region", &self.aws_region)
            .field("cks_id", &self.cks_id)
            .field("hyok_key_id", &self.hyok_key_id)
            .field("cks_access_id", &Redact::from(&self.cks_access_id))
            .field("cks_secret_key", &Redact::from(&self.cks_secret_key))
            .field("skip_tls_verification", &self.skip_tls_verification)
            .field("sleep_duration", &self.sleep_duration)
            .field("aws_user", &self.aws_user)
            .field("kms_key_id", &self.kms_key_id)
            .field("timeout_threshold", &self.timeout_threshold)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cm_url: String::new(),
            aws_account_id: String::new(),
            aws_region: String::new(),
            cks_id: String::new(),
            hyok_key_id: String::new(),
            cks_access_id: String::new(),
            cks_secret_key: String::new(),
            skip_tls_verification: false,
            sleep_duration: None,
            aws_user: DEFAULT_AWS_USER.to_string(),
            kms_key_id: DEFAULT_KMS_KEY_ID.to_string(),
            timeout_threshold: DEFAULT_TIMEOUT_THRESHOLD,
        }
    }
}

impl Config {
    /// Load config from the context's env.
    ///
    /// Every variable is required except `SLEEP_DURATION`.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            ctx.env_var(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config_invalid(format!("{key} is not set")))
        };

        let skip_tls_verification = match required(SKIP_TLS_VERIFICATION)?
            .to_lowercase()
            .as_str()
        {
            "true" => true,
            "false" => false,
            v => {
                return Err(Error::config_invalid(format!(
                    "{SKIP_TLS_VERIFICATION} must be true or false, got {v}"
                )))
            }
        };

        let sleep_duration = match ctx.env_var(SLEEP_DURATION).filter(|v| !v.is_empty()) {
            None => None,
            Some(v) => {
                let invalid = || {
                    Error::config_invalid(format!(
                        "{SLEEP_DURATION} must be milliseconds, got {v}"
                    ))
                };
                let ms: f64 = v.trim().parse().map_err(|e| invalid().with_source(e))?;
                // Fractional milliseconds are allowed.
                let d = Duration::try_from_secs_f64(ms / 1000.0)
                    .map_err(|e| invalid().with_source(e))?;
                Some(d)
            }
        };

        Ok(Self {
            cm_url: required(CM_URL)?,
            aws_account_id: required(AWS_ACCOUNT_ID)?,
            aws_region: required(AWS_REGION)?,
            cks_id: required(CKS_ID)?,
            hyok_key_id: required(HYOK_KEY_ID)?,
            cks_access_id: required(CKS_ACCESS_ID)?,
            cks_secret_key: required(CKS_SECRET_KEY)?,
            skip_tls_verification,
            sleep_duration,
            ..Default::default()
        })
    }

    /// Path prefix of the xks proxy api: `/api/v1/cckm/aws/xks-proxy-endpoints/{cks_id}/kms/xks/v1`
    pub fn xks_proxy_uri(&self) -> String {
        format!(
            "/api/v1/cckm/aws/xks-proxy-endpoints/{}/kms/xks/v1",
            self.cks_id
        )
    }

    /// Path used both for the request and the canonical request.
    pub fn operation_path(&self, op: KmsOperation) -> String {
        format!(
            "{}/keys/{}/{}",
            self.xks_proxy_uri(),
            self.hyok_key_id,
            op.path_segment()
        )
    }

    /// Full url of the operation.
    pub fn operation_url(&self, op: KmsOperation) -> String {
        format!("https://{}{}", self.cm_url, self.operation_path(op))
    }

    /// `arn:aws:iam::{account}:user/{user}`
    pub fn principal_arn(&self) -> String {
        format!("arn:aws:iam::{}:user/{}", self.aws_account_id, self.aws_user)
    }

    /// `arn:aws:kms:{region}:{account}:/key/{key_id}`
    pub fn kms_key_arn(&self) -> String {
        format!(
            "arn:aws:kms:{}:{}:/key/{}",
            self.aws_region, self.aws_account_id, self.kms_key_id
        )
    }
}
