//! Signed load generation against an XKS proxy.
//!
//! The crate signs encrypt and decrypt calls with the SigV4 header scheme
//! used by XKS proxies, sends them through a [`Context`](xksbench_core::Context)
//! and reports the outcome of every call to a [`Metrics`] sink.
//!
//! ## Example
//!
//! ```no_run
//! use xksbench_core::{Context, OsEnv};
//! use xksbench_xks_proxy::{run_iteration, Config, Driver, MemoryMetrics};
//!
//! # async fn example() -> xksbench_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let driver = Driver::new(ctx.clone(), Config::from_env(&ctx)?);
//!
//! let metrics = MemoryMetrics::new();
//! run_iteration(&driver, &metrics).await;
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::{
    build_authorization_header, derive_signing_key, string_to_sign, AuthorizationHeader,
    CanonicalRequest, CredentialScope, RequestSigner, SigningContext,
};

pub mod payload;

mod driver;
pub use driver::{Driver, TimedResponse};

mod metrics;
pub use metrics::{record_call, record_failed_call, MemoryMetrics, Metric, Metrics, Rate};

mod iteration;
pub use iteration::{random_material, run_iteration, run_iteration_with, IterationOutcome};

mod constants;
