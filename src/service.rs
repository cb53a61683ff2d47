use crate::headers::Headers;
use crate::{Error, ErrorKind, MockRequest, MockResponse};
use bytes::{Buf, Bytes};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use hyper::service::Service;
use std::fmt::Display;

///
/// Calls a hyper `service` with `req` and records its response into `res`.
///
/// The status code and headers are applied through `write_head_with_headers`, every data
/// frame is written in order and the response is ended once the body is exhausted.
/// Trailers are discarded.
///
/// ## Example
///
/// ```
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use hyper::service::service_fn;
/// use mock_req_res::{call_service, MockRequest, MockResponse, RequestOptions};
/// use std::convert::Infallible;
///
/// # #[tokio::main]
/// # async fn main() {
/// let service = service_fn(|req: http::Request<Full<Bytes>>| async move {
///     let greeting = format!("hello from {}", req.uri().path());
///     Ok::<_, Infallible>(http::Response::new(Full::new(Bytes::from(greeting))))
/// });
///
/// let req = MockRequest::new(RequestOptions::default().with_url("/world"));
/// let mut res = MockResponse::default();
///
/// call_service(&service, req, &mut res).await.unwrap();
///
/// assert!(res.has_ended());
/// res.assert_body("hello from /world");
/// # }
/// ```
///
pub async fn call_service<S, B>(
    service: &S,
    req: MockRequest,
    res: &mut MockResponse,
) -> Result<(), Error>
where
    S: Service<http::Request<Full<Bytes>>, Response = http::Response<B>>,
    S::Error: Display,
    B: Body,
    B::Error: Display,
{
    let request = req.into_http()?;
    let response = service
        .call(request)
        .await
        .map_err(|err| Error::new_with_context(ErrorKind::ServiceFailure, err))?;

    let (parts, body) = response.into_parts();
    let headers = Headers::from_header_map(&parts.headers)?;
    res.write_head_with_headers(
        parts.status.as_u16(),
        headers.iter().map(|(name, values)| (name, values.clone())),
    )?;

    let mut body = std::pin::pin!(body);
    while let Some(frame) = body.frame().await {
        let frame =
            frame.map_err(|err| Error::new_with_context(ErrorKind::ResponseBodyFailure, err))?;

        if let Ok(mut data) = frame.into_data() {
            let chunk = data.copy_to_bytes(data.remaining());
            res.write(chunk);
        }
    }

    res.end();

    Ok(())
}
