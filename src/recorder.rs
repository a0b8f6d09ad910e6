use crate::{Error, ErrorKind};
use std::fmt;

///
/// A request received by a responder on its configured route.
///
/// Calls are recorded once the request body has been read completely and never
/// change afterwards.
///
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) json: Option<serde_json::Value>,
}

impl RecordedCall {
    /// The request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path, without the query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded query parameters, in the order they were received.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The first value of the query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// The first value of the header `name`. The field letter case is ignored.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The raw request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The request body decoded as JSON, if it was a JSON body.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }
}

///
/// A request that didn't match the responder's method and path.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub(crate) method: String,
    pub(crate) path: String,
}

impl Mismatch {
    pub(crate) fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Mismatch {
            method: method.into(),
            path: path.into(),
        }
    }

    /// The method of the unexpected request.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The path of the unexpected request.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} request made to \"{}\"", self.method, self.path)
    }
}

/// Append-only, ordered log of the calls received during one scope.
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    calls: Vec<RecordedCall>,
}

impl CallLog {
    pub(crate) fn append(&mut self, call: RecordedCall) {
        self.calls.push(call);
    }

    pub(crate) fn snapshot(&self) -> Vec<RecordedCall> {
        self.calls.clone()
    }

    pub(crate) fn last(&self) -> Option<&RecordedCall> {
        self.calls.last()
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}

///
/// Everything a responder observes. Shared between the request handlers, which
/// append, and the caller, which reads.
///
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) calls: CallLog,
    pub(crate) mismatches: Vec<Mismatch>,
}

impl State {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_call(&mut self, call: RecordedCall) {
        self.calls.append(call);
    }

    pub(crate) fn record_mismatch(&mut self, mismatch: Mismatch) {
        self.mismatches.push(mismatch);
    }

    /// Fails with the first mismatch, if any.
    pub(crate) fn verify(&self) -> Result<(), Error> {
        match self.mismatches.first() {
            Some(mismatch) => Err(Error::new_with_context(ErrorKind::InvalidPath, mismatch)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(query: &[(&str, &str)]) -> RecordedCall {
        RecordedCall {
            method: "GET".into(),
            path: "/".into(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: b"{\"foo\":\"bar\"}".to_vec(),
            json: Some(json!({"foo": "bar"})),
        }
    }

    #[test]
    fn test_calls_keep_arrival_order() {
        let mut state = State::new();
        state.record_call(call(&[("foo", "bar")]));
        state.record_call(call(&[("baz", "qux")]));

        let calls = state.calls.snapshot();
        assert_eq!(2, state.calls.len());
        assert_eq!(Some("bar"), calls[0].query_param("foo"));
        assert_eq!(Some("qux"), calls[1].query_param("baz"));
        assert_eq!(Some(&calls[1]), state.calls.last());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut state = State::new();
        state.record_call(call(&[]));

        let before = state.calls.snapshot();
        state.record_call(call(&[]));

        assert_eq!(1, before.len());
        assert_eq!(2, state.calls.len());
    }

    #[test]
    fn test_query_param_returns_the_first_value() {
        let recorded = call(&[("a", "1"), ("a", "2")]);

        assert_eq!(Some("1"), recorded.query_param("a"));
        assert_eq!(None, recorded.query_param("b"));
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let recorded = call(&[]);

        assert_eq!(Some("application/json"), recorded.header("content-type"));
        assert_eq!(Some(&json!({"foo": "bar"})), recorded.json());
    }

    #[test]
    fn test_mismatch_message() {
        let mismatch = Mismatch::new("GET", "/doesnt/exist");

        assert_eq!("Invalid GET request made to \"/doesnt/exist\"", mismatch.to_string());
    }

    #[test]
    fn test_verify_reports_the_first_mismatch() {
        let mut state = State::new();
        assert!(state.verify().is_ok());

        state.record_mismatch(Mismatch::new("POST", "/does/exist"));
        state.record_mismatch(Mismatch::new("GET", "/other"));

        let err = state.verify().unwrap_err();
        assert_eq!(ErrorKind::InvalidPath, err.kind);
        assert_eq!("Invalid POST request made to \"/does/exist\"", err.to_string());
    }
}
