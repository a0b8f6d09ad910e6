use crate::matcher::Route;
use crate::{Error, ErrorKind};
use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, StatusCode};
use std::convert::TryFrom;
use std::time::Duration;

/// The port a responder binds to when none is given.
pub const DEFAULT_PORT: u16 = 5000;

/// Asks the OS for any available port.
pub const ANY_PORT: u16 = 0;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const ALLOWED_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
    Method::PATCH,
];

///
/// Describes the response a responder serves and the single route it serves it on.
///
/// Exactly one of `text`, `json` or `body` has to be set, otherwise `respond` fails
/// with `ErrorKind::Configuration` before any socket is touched.
///
/// ## Example
///
/// ```
/// use local_responder::Options;
///
/// let opts = Options::new()
///     .text("Where am I?")
///     .path("/secret/path")
///     .status(201)
///     .port(0);
///
/// let opts = Options {
///     json: Some(serde_json::json!({ "status": "OK" })),
///     method: "POST".into(),
///     ..Default::default()
/// };
/// ```
///
#[derive(Clone, Debug)]
pub struct Options {
    /// A UTF-8 text body, served as `text/plain`
    pub text: Option<String>,
    /// A JSON body, served as `application/json`
    pub json: Option<serde_json::Value>,
    /// A raw body, served byte for byte
    pub body: Option<Vec<u8>>,
    /// Status code of the matched response (defaults to 200)
    pub status_code: u16,
    /// The only path this responder answers on (defaults to `/`)
    pub path: String,
    /// The only method this responder answers to (defaults to `GET`)
    pub method: String,
    /// The host to bind to (defaults to `127.0.0.1`)
    pub host: String,
    /// The port to bind to, `ANY_PORT` for an ephemeral one (defaults to `DEFAULT_PORT`)
    pub port: u16,
    /// Panic when the responder is dropped after receiving an unexpected request
    pub assert_on_drop: bool,
    /// Upper bound for in-flight responses to finish once the scope closes
    pub drain_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            text: None,
            json: None,
            body: None,
            status_code: StatusCode::OK.as_u16(),
            path: "/".to_string(),
            method: Method::GET.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            assert_on_drop: true,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl Options {
    /// Same as `Options::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `text` as a UTF-8 `text/plain` body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Serves the JSON encoding of `value`.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.json = Some(value);
        self
    }

    /// Serves `body` byte for byte.
    pub fn body<StrOrBytes: AsRef<[u8]>>(mut self, body: StrOrBytes) -> Self {
        self.body = Some(body.as_ref().to_owned());
        self
    }

    /// Sets the status code of the matched response. Informational (1xx) codes are rejected.
    pub fn status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Sets the path requests are expected on.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the method requests are expected with. The letter case is ignored.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the host to bind to.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port to bind to. Use `ANY_PORT` to let the OS pick one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Whether dropping a responder that received unexpected requests panics.
    pub fn assert_on_drop(mut self, assert_on_drop: bool) -> Self {
        self.assert_on_drop = assert_on_drop;
        self
    }

    /// Bounds how long closing waits for in-flight responses.
    pub fn drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }
}

/// The configured body, in the representation it was given.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// Plain text
    Text(String),
    /// A JSON value
    Json(serde_json::Value),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl ResponseBody {
    fn content_type(&self) -> HeaderValue {
        match self {
            ResponseBody::Text(_) => HeaderValue::from_static("text/plain; charset=utf-8"),
            ResponseBody::Json(_) => HeaderValue::from_static("application/json"),
            ResponseBody::Bytes(_) => HeaderValue::from_static("application/octet-stream"),
        }
    }

    fn encode(&self) -> Bytes {
        match self {
            ResponseBody::Text(text) => Bytes::from(text.clone()),
            ResponseBody::Json(value) => Bytes::from(value.to_string()),
            ResponseBody::Bytes(bytes) => Bytes::from(bytes.clone()),
        }
    }
}

///
/// The validated, immutable form of `Options` a responder serves for its whole lifetime.
///
#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub(crate) status: StatusCode,
    pub(crate) body: ResponseBody,
    pub(crate) encoded_body: Bytes,
    pub(crate) content_type: HeaderValue,
    pub(crate) route: Route,
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) assert_on_drop: bool,
    pub(crate) drain_timeout: Duration,
}

impl ResponseSpec {
    /// The status code of the matched response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The configured body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The expected method.
    pub fn method(&self) -> &Method {
        self.route.method()
    }

    /// The expected path.
    pub fn path(&self) -> &str {
        self.route.path()
    }

    /// The requested port, `ANY_PORT` when the OS picks one.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl TryFrom<Options> for ResponseSpec {
    type Error = Error;

    fn try_from(opts: Options) -> Result<Self, Self::Error> {
        let body = match (opts.text, opts.json, opts.body) {
            (Some(text), None, None) => ResponseBody::Text(text),
            (None, Some(value), None) => ResponseBody::Json(value),
            (None, None, Some(bytes)) => ResponseBody::Bytes(bytes),
            (None, None, None) => {
                return Err(Error::new_with_context(
                    ErrorKind::Configuration,
                    "one of `text`, `json` or `body` is required",
                ))
            }
            _ => {
                return Err(Error::new_with_context(
                    ErrorKind::Configuration,
                    "only one of `text`, `json` or `body` can be set",
                ))
            }
        };

        let status = StatusCode::from_u16(opts.status_code)
            .ok()
            .filter(|status| !status.is_informational())
            .ok_or_else(|| {
                Error::new_with_context(
                    ErrorKind::Configuration,
                    format!("invalid status code {}", opts.status_code),
                )
            })?;

        let method = parse_method(&opts.method)?;

        if !opts.path.starts_with('/') {
            return Err(Error::new_with_context(
                ErrorKind::Configuration,
                format!("path {:?} must start with a slash", opts.path),
            ));
        }

        let encoded_body = body.encode();
        let content_type = body.content_type();

        Ok(ResponseSpec {
            status,
            body,
            encoded_body,
            content_type,
            route: Route::new(method, opts.path),
            host: opts.host,
            port: opts.port,
            assert_on_drop: opts.assert_on_drop,
            drain_timeout: opts.drain_timeout,
        })
    }
}

fn parse_method(method: &str) -> Result<Method, Error> {
    let upper = method.to_ascii_uppercase();

    ALLOWED_METHODS
        .iter()
        .find(|allowed| allowed.as_str() == upper)
        .cloned()
        .ok_or_else(|| {
            Error::new_with_context(
                ErrorKind::Configuration,
                format!("unsupported method {:?}", method),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(opts: Options) -> Result<ResponseSpec, Error> {
        ResponseSpec::try_from(opts)
    }

    #[test]
    fn test_defaults() {
        let spec = spec(Options::new().text("hello")).unwrap();

        assert_eq!(StatusCode::OK, spec.status());
        assert_eq!(&Method::GET, spec.method());
        assert_eq!("/", spec.path());
        assert_eq!(DEFAULT_PORT, spec.port());
        assert!(spec.assert_on_drop);
    }

    #[test]
    fn test_missing_body_is_a_configuration_error() {
        let err = spec(Options::new()).unwrap_err();

        assert_eq!(ErrorKind::Configuration, err.kind);
    }

    #[test]
    fn test_multiple_bodies_are_a_configuration_error() {
        let err = spec(Options::new().text("a").body(b"b")).unwrap_err();
        assert_eq!(ErrorKind::Configuration, err.kind);

        let err = spec(Options::new().text("a").json(json!(null))).unwrap_err();
        assert_eq!(ErrorKind::Configuration, err.kind);
    }

    #[test]
    fn test_json_null_is_a_body() {
        let spec = spec(Options::new().json(json!(null))).unwrap();

        assert_eq!(&ResponseBody::Json(json!(null)), spec.body());
        assert_eq!(Bytes::from_static(b"null"), spec.encoded_body);
    }

    #[test]
    fn test_method_is_normalized() {
        let spec = spec(Options::new().text("a").method("post")).unwrap();

        assert_eq!(&Method::POST, spec.method());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = spec(Options::new().text("a").method("BREW")).unwrap_err();

        assert_eq!(ErrorKind::Configuration, err.kind);
        assert!(err.to_string().contains("BREW"));
    }

    #[test]
    fn test_invalid_status_code_is_rejected() {
        let err = spec(Options::new().text("a").status(1000)).unwrap_err();

        assert_eq!(ErrorKind::Configuration, err.kind);
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_informational_status_code_is_rejected() {
        for status_code in [100, 101, 199] {
            let err = spec(Options::new().text("a").status(status_code)).unwrap_err();

            assert_eq!(ErrorKind::Configuration, err.kind);
            assert!(err.to_string().contains(&status_code.to_string()));
        }

        assert!(spec(Options::new().text("a").status(200)).is_ok());
        assert!(spec(Options::new().text("a").status(999)).is_ok());
    }

    #[test]
    fn test_relative_path_is_rejected() {
        let err = spec(Options::new().text("a").path("relative")).unwrap_err();

        assert_eq!(ErrorKind::Configuration, err.kind);
    }

    #[test]
    fn test_content_types() {
        let text = spec(Options::new().text("a")).unwrap();
        let json = spec(Options::new().json(json!({"a": 1}))).unwrap();
        let bytes = spec(Options::new().body(vec![0, 1, 2])).unwrap();

        assert_eq!("text/plain; charset=utf-8", text.content_type);
        assert_eq!("application/json", json.content_type);
        assert_eq!("application/octet-stream", bytes.content_type);
        assert_eq!(Bytes::from_static(&[0, 1, 2]), bytes.encoded_body);
    }
}
