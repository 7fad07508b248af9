#![warn(missing_docs)]

//! Operation-chain middleware for HTTP services: posts a chain to a Gaffer REST
//! endpoint and decodes the array of results it returns

use std::{collections::BTreeMap, fmt, str::FromStr};

use bytes::Bytes;
use derive_getters::Getters;
use gaffer_http::{collect_body, Full, HttpRequest, HttpResponse};
use gaffer_tower::ResponseFuture;
use http::{uri::InvalidUri, HeaderValue, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::{Layer, Service};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Class marker of a Gaffer operation chain
pub const OPERATION_CHAIN_CLASS: &str = "uk.gov.gchq.gaffer.operation.OperationChain";

/// Path, relative to the REST endpoint, that executes an operation chain
pub const EXECUTE_PATH: &str = "graph/operations/execute";

/// The request document: a sequence of operations run one after another
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Getters)]
pub struct OperationChain {
    class: String,
    operations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<BTreeMap<String, String>>,
}

impl OperationChain {
    /// Constructs a chain of `operations` sharing the given `options`
    pub fn new(operations: Vec<Value>, options: Option<BTreeMap<String, String>>) -> Self {
        OperationChain {
            class: OPERATION_CHAIN_CLASS.to_string(),
            operations,
            options,
        }
    }
}

/// Error document returned by the REST service on failure
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct GafferErrorBody {
    simple_message: Option<String>,
    detail_message: Option<String>,
}

impl GafferErrorBody {
    fn message(self) -> Option<String> {
        self.simple_message.or(self.detail_message)
    }
}

/// Errors that may occur from using a [`ChainService`]
#[derive(thiserror::Error, Debug)]
pub enum ChainServiceError {
    /// The chain could not be encoded as JSON
    #[error("Serialization error")]
    Serialization(serde_json::Error),
    /// The service answered successfully, but not with an array of results
    #[error("Deserialization error")]
    Deserialization {
        /// The source error
        error: serde_json::Error,
        /// The body that failed to decode
        data: Bytes,
        /// The [`StatusCode`] of the response
        status_code: StatusCode,
    },
    /// The service rejected the chain and explained why
    #[error("Gaffer returned {status_code}: {message}")]
    Gaffer {
        /// The [`StatusCode`] of the response
        status_code: StatusCode,
        /// The message reported by the service
        message: String,
    },
    /// The service rejected the chain without a readable explanation
    #[error("Bad status code: {status_code}")]
    BadStatus {
        /// The [`StatusCode`] of the response
        status_code: StatusCode,
        /// The raw response body
        data: Bytes,
    },
    /// [`http`]-related error, probably from header-related tasks
    #[error("HTTP error: {:?}", .0)]
    Http(#[from] http::Error),
    /// The endpoint could not be turned into a [`Uri`]
    #[error("Unable to convert URL to URI.")]
    InvalidUri(#[from] InvalidUri),
    /// The underlying HTTP service failed
    #[error("Upstream service error: {:?}", .0)]
    UpstreamService(Box<dyn std::error::Error + Send + Sync>),
}

/// [`Layer`] that wraps an HTTP service with operation-chain handling
#[derive(Clone, Debug)]
pub struct ChainLayer {
    endpoint: Url,
}

impl ChainLayer {
    /// Constructs a new [`ChainLayer`] targeting the REST service rooted at `endpoint`
    pub fn new(endpoint: Url) -> ChainLayer {
        ChainLayer { endpoint }
    }
}

impl<S> Layer<S> for ChainLayer {
    type Service = ChainService<S>;
    fn layer(&self, inner: S) -> Self::Service {
        ChainService::new(self.endpoint.clone(), inner)
    }
}

/// Service that executes [`OperationChain`]s over an inner HTTP service
#[derive(Clone, Debug)]
pub struct ChainService<S> {
    inner: S,
    endpoint: Url,
}

impl<S> ChainService<S> {
    /// Constructs a new [`ChainService`]
    pub fn new(endpoint: Url, inner: S) -> ChainService<S> {
        ChainService { endpoint, inner }
    }

    fn execute_uri(&self) -> Result<Uri, InvalidUri> {
        let root = self.endpoint.as_str().trim_end_matches('/');
        Uri::from_str(&format!("{root}/{EXECUTE_PATH}"))
    }
}

fn decode_results(status_code: StatusCode, body: Bytes) -> Result<Vec<Value>, ChainServiceError> {
    if !status_code.is_success() {
        return match serde_json::from_slice::<GafferErrorBody>(&body)
            .ok()
            .and_then(GafferErrorBody::message)
        {
            Some(message) => Err(ChainServiceError::Gaffer {
                status_code,
                message,
            }),
            None => Err(ChainServiceError::BadStatus {
                status_code,
                data: body,
            }),
        };
    }
    serde_json::from_slice(&body).map_err(|error| ChainServiceError::Deserialization {
        error,
        data: body,
        status_code,
    })
}

impl<S> Service<OperationChain> for ChainService<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Vec<Value>;
    type Error = ChainServiceError;
    type Future = ResponseFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        tower::Service::poll_ready(&mut self.inner, cx)
            .map_err(|err| ChainServiceError::UpstreamService(Box::new(err)))
    }

    fn call(&mut self, chain: OperationChain) -> Self::Future {
        let mut client = gaffer_tower::take_ready_service::<_, HttpRequest>(&mut self.inner);
        let uri = self.execute_uri();

        let fut = async move {
            let uri = uri?;
            let body = serde_json::to_vec(&chain).map_err(ChainServiceError::Serialization)?;
            tracing::debug!(%uri, operations = chain.operations.len(), "executing operation chain");
            let req = http::Request::builder()
                .uri(uri)
                .method(Method::POST)
                .header(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static(JSON_CONTENT_TYPE),
                )
                .header(http::header::ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
                .body(Full::new(Bytes::from(body)))?;
            let mut resp = client
                .call(req)
                .await
                .map_err(|err| ChainServiceError::UpstreamService(Box::new(err)))?;
            let status_code = resp.status();
            let body = collect_body(resp.body_mut())
                .await
                .map_err(|err| ChainServiceError::UpstreamService(Box::new(err)))?;
            let results = decode_results(status_code, body)?;
            tracing::debug!(%status_code, results = results.len(), "operation chain finished");
            Ok(results)
        };
        Box::pin(fut)
    }
}

impl fmt::Display for OperationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes: Vec<&str> = self
            .operations
            .iter()
            .map(|op| op.get("class").and_then(Value::as_str).unwrap_or("?"))
            .collect();
        write!(f, "{}", classes.join(" -> "))
    }
}
