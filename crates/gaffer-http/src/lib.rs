#![warn(missing_docs)]

//! HTTP plumbing for talking to a Gaffer REST service, expressed as [`tower`] services

use std::time::Duration;

/// Install ring as the default rustls crypto provider. This runs automatically
/// as a global constructor in every binary that links gaffer-http.
#[ctor::ctor]
fn install_ring_crypto_provider() {
    // .ok() because the provider may already be installed
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();
}

use buildstructor::Builder;
use bytes::Bytes;
use derive_getters::Getters;
pub use http_body_util::Full;
use tower::{timeout::error::Elapsed, util::BoxCloneService};

mod error;
pub mod headers;
mod reqwest;

pub use error::HttpServiceError;
pub use reqwest::{collect_body, ReqwestService};

/// Request type accepted by every service in this crate
pub type HttpRequest = http::Request<Full<Bytes>>;
/// Response type produced by every service in this crate
pub type HttpResponse = http::Response<Full<Bytes>>;
/// Type-erased, cloneable HTTP service
pub type HttpService = BoxCloneService<HttpRequest, HttpResponse, HttpServiceError>;

/// Request timeout applied when the configuration does not name one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Settings used when constructing an [`HttpService`]
#[derive(Clone, Debug, Builder, Default, Getters)]
pub struct HttpServiceConfig {
    accept_invalid_certificates: Option<bool>,
    timeout: Option<Duration>,
}

impl From<Box<dyn std::error::Error + Send + Sync>> for HttpServiceError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<Elapsed>() {
            Ok(elapsed) => HttpServiceError::TimedOut(elapsed),
            Err(err) => match err.downcast::<::reqwest::Error>() {
                Ok(err) => HttpServiceError::from(*err),
                Err(err) => match err.downcast::<HttpServiceError>() {
                    Ok(err) => *err,
                    Err(err) => HttpServiceError::Unexpected(err),
                },
            },
        }
    }
}
