use buildstructor::buildstructor;
use bytes::Bytes;
use gaffer_tower::ResponseFuture;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use reqwest::ClientBuilder;
use tower::{util::BoxCloneService, Service, ServiceBuilder, ServiceExt};

use crate::{
    HttpRequest, HttpResponse, HttpService, HttpServiceConfig, HttpServiceError, DEFAULT_TIMEOUT,
};

/// Reads a whole [`Body`] into [`Bytes`]
pub async fn collect_body<B>(body: &mut B) -> Result<Bytes, B::Error>
where
    B: Body<Data = Bytes> + Unpin,
{
    BodyExt::collect(body).await.map(|buf| buf.to_bytes())
}

/// A [`Service`] that sends [`http`] requests through a [`reqwest`] client
#[derive(Clone, Debug)]
pub struct ReqwestService {
    client: BoxCloneService<reqwest::Request, reqwest::Response, HttpServiceError>,
}

#[buildstructor]
impl ReqwestService {
    /// Constructs a new [`ReqwestService`], wrapping the client in the configured timeout
    #[builder]
    pub fn new(
        config: Option<HttpServiceConfig>,
        client: Option<reqwest::Client>,
    ) -> Result<ReqwestService, reqwest::Error> {
        let config = config.unwrap_or_default();
        let client = match client {
            Some(client) => client,
            None => ClientBuilder::new()
                .danger_accept_invalid_certs(
                    config.accept_invalid_certificates().unwrap_or_default(),
                )
                .build()?,
        };
        let timeout = config.timeout().unwrap_or(DEFAULT_TIMEOUT);
        tracing::debug!(?timeout, "building reqwest service");
        let client = ServiceBuilder::new()
            .map_err(HttpServiceError::from)
            .timeout(timeout)
            .service(client)
            .boxed_clone();
        Ok(ReqwestService { client })
    }
}

impl From<reqwest::Error> for HttpServiceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_body() {
            HttpServiceError::Body(value.into())
        } else if value.is_connect() {
            HttpServiceError::Connect(value.into())
        } else {
            HttpServiceError::Unexpected(value.into())
        }
    }
}

impl Service<HttpRequest> for ReqwestService {
    type Response = HttpResponse;
    type Error = HttpServiceError;
    type Future = ResponseFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.client.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let mut client =
            gaffer_tower::take_ready_service::<_, reqwest::Request>(&mut self.client);
        let fut = async move {
            let (parts, mut body) = req.into_parts();
            let bytes = collect_body(&mut body)
                .await
                .map_err(|err| HttpServiceError::Body(Box::new(err)))?;
            let req = http::Request::from_parts(parts, reqwest::Body::from(bytes));
            let req = reqwest::Request::try_from(req)?;
            let mut resp = http::Response::from(client.call(req).await?);
            let bytes = collect_body(resp.body_mut())
                .await
                .map_err(|err| HttpServiceError::Body(Box::new(err)))?;
            Ok(resp.map(|_| Full::new(bytes)))
        };
        Box::pin(fut)
    }
}

impl From<ReqwestService> for HttpService {
    fn from(value: ReqwestService) -> Self {
        value.boxed_clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use bytes::Bytes;
    use http::HeaderValue;
    use http_body_util::Full;
    use httpmock::{Method, MockServer};
    use rstest::{fixture, rstest};
    use speculoos::prelude::*;
    use tower::{Service, ServiceExt};

    use crate::{collect_body, HttpService, HttpServiceConfig, HttpServiceError, ReqwestService};

    #[fixture]
    pub fn plain_service() -> HttpService {
        ReqwestService::builder()
            .client(reqwest::Client::default())
            .build()
            .unwrap()
            .boxed_clone()
    }

    #[fixture]
    pub fn short_timeout_service() -> HttpService {
        ReqwestService::builder()
            .config(
                HttpServiceConfig::builder()
                    .timeout(Duration::from_millis(100))
                    .build(),
            )
            .client(reqwest::Client::default())
            .build()
            .unwrap()
            .boxed_clone()
    }

    #[rstest]
    #[case::plain(plain_service(), None)]
    #[case::fast_enough(short_timeout_service(), None)]
    #[case::too_slow(short_timeout_service(), Some(Duration::from_millis(300)))]
    #[tokio::test]
    pub async fn it_posts_to_the_rest_service(
        #[case] mut service: HttpService,
        #[case] delay: Option<Duration>,
    ) -> Result<()> {
        let server = MockServer::start();
        let uri = format!("http://{}/rest/graph/operations/execute", server.address());

        let mock = server.mock(|when, then| {
            when.method(Method::POST)
                .path("/rest/graph/operations/execute")
                .header("content-type", "application/json")
                .body("{}");

            let then = then
                .status(200)
                .header("content-type", "application/json")
                .body("[]");
            if let Some(delay) = delay {
                then.delay(delay);
            }
        });

        let request = http::Request::builder()
            .uri(uri)
            .method(http::Method::POST)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{}")))?;

        let resp = service.ready().await?.call(request).await;

        mock.assert_calls(1);

        if delay.is_some() {
            assert_that!(resp)
                .is_err()
                .matches(HttpServiceError::is_timeout);
        } else {
            let mut resp = resp?;
            assert_that!(resp.headers().get("content-type"))
                .is_some()
                .is_equal_to(&HeaderValue::from_static("application/json"));
            let body = collect_body(resp.body_mut()).await?;
            assert_that!(body).is_equal_to(Bytes::from_static(b"[]"));
        }

        Ok(())
    }

    #[tokio::test]
    async fn it_reports_unreachable_hosts_as_connect_errors() -> Result<()> {
        let mut service = plain_service();
        let request = http::Request::builder()
            .uri("http://127.0.0.1:1/rest/graph/operations/execute")
            .method(http::Method::POST)
            .body(Full::new(Bytes::new()))?;

        let resp = service.ready().await?.call(request).await;

        assert_that!(resp)
            .is_err()
            .matches(HttpServiceError::is_connect);
        Ok(())
    }
}
