use crate::constants::{ALGORITHM, REQUEST_TYPE, XKS_SERVICE, X_AMZ_DATE};
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderValue, Method};
use log::debug;
use std::fmt::{Debug, Display, Formatter};
use xksbench_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use xksbench_core::time::{format_date, format_iso8601, now, DateTime};
use xksbench_core::utils::Redact;
use xksbench_core::{Context, Error, Result, SignRequest};

/// RequestSigner signs xks proxy requests with the SigV4 header scheme.
///
/// Only the fixed proxy request shape is supported: `POST`, a json body, no
/// query string, and exactly `host` and `x-amz-date` as signed headers.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for `region`, using the `kms-xks-proxy` service.
    pub fn new(region: &str) -> Self {
        Self {
            service: XKS_SERVICE.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: &[u8],
        cred: &Self::Credential,
    ) -> Result<()> {
        // Sampled once: timestamp and date stamp both derive from this value.
        let now = self.time.unwrap_or_else(now);

        if req.uri.query().is_some() {
            return Err(Error::request_invalid(
                "xks proxy requests must not carry a query string",
            ));
        }

        let host = match req.headers.get(header::HOST) {
            Some(v) => v
                .to_str()
                .map_err(|e| Error::request_invalid("host header is not ascii").with_source(e))?
                .to_string(),
            None => req
                .uri
                .authority()
                .ok_or_else(|| Error::request_invalid("request without authority can't be signed"))?
                .to_string(),
        };

        let ctx = SigningContext::new(cred, &self.region, &self.service, now);
        let authorization = ctx.authorize(&host, req.uri.path(), body);

        req.headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(ctx.timestamp())?);
        let mut value = HeaderValue::try_from(authorization.to_string())?;
        value.set_sensitive(true);
        req.headers.insert(header::AUTHORIZATION, value);

        Ok(())
    }
}

/// Credential scope: `20240601/us-east-1/kms-xks-proxy/aws4_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    /// Day precision date, `YYYYMMDD`.
    pub date_stamp: String,
    /// Signing region.
    pub region: String,
    /// Signing service.
    pub service: String,
    /// Always `aws4_request`.
    pub request_type: &'static str,
}

impl CredentialScope {
    /// Build the scope for `time`.
    pub fn new(time: DateTime, region: &str, service: &str) -> Self {
        Self {
            date_stamp: format_date(time),
            region: region.to_string(),
            service: service.to_string(),
            request_type: REQUEST_TYPE,
        }
    }
}

impl Display for CredentialScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.date_stamp, self.region, self.service, self.request_type
        )
    }
}

/// Everything needed to sign one request. Built fresh for every request.
#[derive(Clone)]
pub struct SigningContext {
    access_key_id: String,
    secret_access_key: String,
    time: DateTime,
    scope: CredentialScope,
}

impl Debug for SigningContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("time", &self.time)
            .field("scope", &self.scope)
            .finish()
    }
}

impl SigningContext {
    /// Create a signing context for `time`.
    pub fn new(cred: &Credential, region: &str, service: &str, time: DateTime) -> Self {
        Self {
            access_key_id: cred.access_key_id.clone(),
            secret_access_key: cred.secret_access_key.clone(),
            time,
            scope: CredentialScope::new(time, region, service),
        }
    }

    /// Second precision timestamp, `YYYYMMDDTHHMMSSZ`.
    pub fn timestamp(&self) -> String {
        format_iso8601(self.time)
    }

    /// Day precision date, `YYYYMMDD`.
    pub fn date_stamp(&self) -> &str {
        &self.scope.date_stamp
    }

    /// Credential scope of this request.
    pub fn scope(&self) -> &CredentialScope {
        &self.scope
    }

    /// Derive the request signing key for this scope.
    pub fn signing_key(&self) -> Vec<u8> {
        derive_signing_key(
            &self.secret_access_key,
            &self.scope.date_stamp,
            &self.scope.region,
            &self.scope.service,
        )
    }

    /// Sign `payload` sent to `uri` on `host`.
    pub fn authorize(&self, host: &str, uri: &str, payload: &[u8]) -> AuthorizationHeader {
        build_authorization_header(
            &self.signing_key(),
            payload,
            host,
            self.time,
            uri,
            &self.access_key_id,
            &self.scope,
        )
    }
}

/// Canonical form of a proxy request.
///
/// The signed headers are kept in insertion order, `host` then `x-amz-date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: Method,
    uri: String,
    query: String,
    headers: Vec<(&'static str, String)>,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Build the canonical request of a `POST` to `uri`.
    pub fn new(uri: &str, host: &str, timestamp: &str, payload: &[u8]) -> Self {
        Self {
            method: Method::POST,
            uri: uri.to_string(),
            query: String::new(),
            headers: vec![
                ("host", host.to_string()),
                (X_AMZ_DATE, timestamp.to_string()),
            ],
            payload_hash: hex_sha256(payload),
        }
    }

    /// Signed header names joined by `;`.
    pub fn signed_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(k, _)| *k)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Hex encoded sha256 of the payload.
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Hex encoded sha256 of the canonical request string.
    pub fn hash(&self) -> String {
        hex_sha256(self.to_string().as_bytes())
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.uri)?;
        writeln!(f, "{}", self.query)?;
        for (k, v) in &self.headers {
            writeln!(f, "{k}:{v}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        write!(f, "{}", self.payload_hash)
    }
}

/// Value of the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    /// Always `AWS4-HMAC-SHA256`.
    pub algorithm: &'static str,
    /// Access id the request is signed for.
    pub access_key_id: String,
    /// Rendered credential scope.
    pub credential_scope: String,
    /// Signed header names joined by `;`.
    pub signed_headers: String,
    /// Hex encoded signature.
    pub signature: String,
}

impl Display for AuthorizationHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            self.algorithm,
            self.access_key_id,
            self.credential_scope,
            self.signed_headers,
            self.signature
        )
    }
}

/// Derive the request signing key.
///
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
pub fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), REQUEST_TYPE.as_bytes())
}

/// Build the string to sign for a canonical request.
///
/// ```text
/// AWS4-HMAC-SHA256
/// 20240601T120000Z
/// 20240601/<region>/kms-xks-proxy/aws4_request
/// <hashed_canonical_request>
/// ```
pub fn string_to_sign(time: DateTime, scope: &CredentialScope, creq: &CanonicalRequest) -> String {
    format!(
        "{ALGORITHM}\n{}\n{scope}\n{}",
        format_iso8601(time),
        creq.hash()
    )
}

/// Build the authorization header for one request.
pub fn build_authorization_header(
    signing_key: &[u8],
    payload: &[u8],
    host: &str,
    time: DateTime,
    uri: &str,
    access_key_id: &str,
    scope: &CredentialScope,
) -> AuthorizationHeader {
    let creq = CanonicalRequest::new(uri, host, &format_iso8601(time), payload);
    debug!("calculated canonical request: {creq}");

    let scope_str = scope.to_string();
    debug!("calculated scope: {scope_str}");

    let string_to_sign = string_to_sign(time, scope, &creq);
    debug!("calculated string to sign: {string_to_sign}");

    AuthorizationHeader {
        algorithm: ALGORITHM,
        access_key_id: access_key_id.to_string(),
        credential_scope: scope_str,
        signed_headers: creq.signed_headers(),
        signature: hex_hmac_sha256(signing_key, string_to_sign.as_bytes()),
    }
}
