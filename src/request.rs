use crate::recorder::{Mismatch, RecordedCall};
use crate::{Error, ErrorKind};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request as HyperRequest;

///
/// Stores information about an incoming request.
///
#[derive(Debug)]
pub(crate) struct Request {
    inner: Parts,
    body: Option<Incoming>,
    body_bytes: Vec<u8>,
}

impl Request {
    pub(crate) fn new(request: HyperRequest<Incoming>) -> Self {
        let (inner, body) = request.into_parts();

        Request {
            inner,
            body: Some(body),
            body_bytes: Vec::new(),
        }
    }

    /// The request method
    pub(crate) fn method(&self) -> &str {
        self.inner.method.as_str()
    }

    /// The request path, without the query
    pub(crate) fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// The raw query, without the leading `?`
    pub(crate) fn query(&self) -> &str {
        self.inner.uri.query().unwrap_or("")
    }

    ///
    /// Reads the whole body. Subsequent calls are no-ops.
    ///
    pub(crate) async fn read_body(&mut self) -> Result<&[u8], Error> {
        if let Some(body) = self.body.take() {
            let collected = body
                .collect()
                .await
                .map_err(|err| Error::new_with_context(ErrorKind::RequestBodyFailure, err))?;

            self.body_bytes = collected.to_bytes().to_vec();
        }

        Ok(&self.body_bytes)
    }

    pub(crate) fn formatted(&self) -> String {
        let mut formatted = format!(
            "\r\n{} {}\r\n",
            &self.inner.method, &self.inner.uri
        );

        for (key, value) in &self.inner.headers {
            formatted.push_str(&format!(
                "{}: {}\r\n",
                key,
                value.to_str().unwrap_or("<invalid>")
            ));
        }

        if !self.body_bytes.is_empty() {
            formatted.push_str(&format!("{}\r\n", &String::from_utf8_lossy(&self.body_bytes)));
        }

        formatted
    }

    pub(crate) fn to_mismatch(&self) -> Mismatch {
        Mismatch::new(self.method(), self.path())
    }

    ///
    /// Builds the entry recorded for this request. Expects the body to have been read.
    ///
    pub(crate) fn to_recorded_call(&self) -> RecordedCall {
        RecordedCall {
            method: self.method().to_string(),
            path: self.path().to_string(),
            query: parse_query(self.query()),
            headers: self
                .inner
                .headers
                .iter()
                .map(|(field, value)| {
                    (
                        field.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: self.body_bytes.clone(),
            json: self.json_body(),
        }
    }

    fn has_json_content_type(&self) -> bool {
        match self.inner.headers.get(CONTENT_TYPE) {
            Some(value) => value
                .to_str()
                .map(|value| value.to_ascii_lowercase().contains("json"))
                .unwrap_or(false),
            None => true,
        }
    }

    fn json_body(&self) -> Option<serde_json::Value> {
        if self.body_bytes.is_empty() || !self.has_json_content_type() {
            return None;
        }

        match serde_json::from_slice(&self.body_bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!("Request body is not valid JSON: {}", err);
                None
            }
        }
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }

    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|err| {
        log::debug!("Could not decode query {:?}: {}", query, err);
        Vec::new()
    })
}
