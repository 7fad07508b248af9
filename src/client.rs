//! The tower stack that carries operation chains to the REST service.

use gaffer_chain::{ChainLayer, ChainService};
use gaffer_http::{
    headers::DefaultHeadersLayer, HttpService, HttpServiceConfig, ReqwestService, DEFAULT_TIMEOUT,
};
use tower::ServiceBuilder;

use crate::{config::QueryConfig, error::ConfigError};

/// Executes operation chains against the configured REST service
pub type GafferService = ChainService<HttpService>;

/// The HTTP stack: the configured headers on top of a reqwest client bounded
/// by the configured timeout
pub fn http_service(config: &QueryConfig) -> Result<HttpService, ConfigError> {
    let http_config = HttpServiceConfig::builder()
        .accept_invalid_certificates(*config.accept_invalid_certificates())
        .timeout(config.timeout().unwrap_or(DEFAULT_TIMEOUT))
        .build();
    let reqwest = ReqwestService::builder()
        .config(http_config)
        .build()
        .map_err(|err| ConfigError::Client(Box::new(err)))?;

    Ok(ServiceBuilder::new()
        .boxed_clone()
        .layer(DefaultHeadersLayer::new(config.header_map()?))
        .service(reqwest))
}

/// The service a [`crate::SubmissionController`] submits chains through
pub fn chain_service(config: &QueryConfig) -> Result<GafferService, ConfigError> {
    tracing::debug!(endpoint = %config.rest_endpoint(), "building chain service");
    let http_service = http_service(config)?;
    Ok(ServiceBuilder::new()
        .layer(ChainLayer::new(config.rest_endpoint().clone()))
        .service(http_service))
}
