use crate::matcher::{Rejection, Route};
use crate::options::ResponseSpec;
use crate::{Error, ErrorKind};
use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;

pub(crate) type Body = Full<Bytes>;

///
/// Builds the configured response for a matched request.
///
pub(crate) fn respond_with_spec(spec: &ResponseSpec) -> Result<Response<Body>, Error> {
    Response::builder()
        .status(spec.status)
        .header(CONTENT_TYPE, spec.content_type.clone())
        .body(Full::new(spec.encoded_body.clone()))
        .map_err(|err| Error::new_with_context(ErrorKind::ResponseFailure, err))
}

///
/// Builds the in-band answer to a request rejected by `route`: 404 for an unknown
/// path, 405 (with an `allow` header) for a known path with the wrong method.
///
pub(crate) fn respond_with_mismatch(
    rejection: Rejection,
    route: &Route,
) -> Result<Response<Body>, Error> {
    let status = match rejection {
        Rejection::PathNotFound => StatusCode::NOT_FOUND,
        Rejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
    };

    let mut response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

    if status == StatusCode::METHOD_NOT_ALLOWED {
        response = response.header(ALLOW, route.method().as_str());
    }

    let body = format!(
        "{}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );

    response
        .body(Full::new(Bytes::from(body)))
        .map_err(|err| Error::new_with_context(ErrorKind::ResponseFailure, err))
}
