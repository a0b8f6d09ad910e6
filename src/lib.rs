#![warn(missing_docs)]

//!
//! Local Responder runs a real, short-lived HTTP server on a local port and answers a
//! single route with a canned response. Use it to exercise your HTTP client code against
//! a predictable peer instead of mocking the client library.
//!
//! Each responder runs on its own thread with its own runtime, so it can be used from
//! plain `#[test]` functions as well as from async tests. Responders are fully isolated
//! from each other: run as many as you like, in parallel, as long as they use distinct
//! ports.
//!
//! # Getting Started
//!
//! Describe the response with `Options` and start serving it with `respond`:
//!
//! ```
//! use local_responder::{respond, Options, ANY_PORT};
//!
//! let responder = respond(Options::new().text("Hello, world!").port(ANY_PORT)).unwrap();
//!
//! // Any GET request to `/` on this port beyond this line is answered
//! // with 200 and the body "Hello, world!".
//! let url = responder.url();
//!
//! // Shuts down the server and releases the port.
//! responder.close().unwrap();
//! ```
//!
//! The responder is torn down when it goes out of scope, even if your test panics.
//! Calling `close` (or `close_async`) is only needed to get hold of the outcome.
//!
//! # Responses
//!
//! Exactly one body representation has to be set:
//!
//! ```
//! use local_responder::Options;
//! use serde_json::json;
//!
//! // Served as `text/plain; charset=utf-8`
//! Options::new().text("Hello, world!");
//!
//! // Served as `application/json`
//! Options::new().json(json!({ "status": "OK", "values": [1, 2, 3] }));
//!
//! // Served byte for byte
//! Options::new().body(b"body contents");
//! ```
//!
//! Setting none or more than one fails with `ErrorKind::Configuration` before any port
//! is bound. The status code defaults to 200 and can be changed with `Options::status`.
//!
//! # Routes
//!
//! A responder answers one method and one path, by default `GET /`:
//!
//! ```
//! use local_responder::Options;
//!
//! Options::new().text("Where am I?").method("POST").path("/secret/path");
//! ```
//!
//! Any other request still gets a well-formed answer, so your client never hangs:
//! `404 Not Found` for an unknown path and `405 Method Not Allowed` for the right path
//! with the wrong method. The request is however reported as an error of kind
//! `ErrorKind::InvalidPath` once the responder is closed, with a message like
//! `Invalid GET request made to "/doesnt/exist"`. A responder dropped without being
//! closed panics with that message instead, unless `Options::assert_on_drop` is disabled.
//!
//! Use `Handle::verify` to check for unexpected requests without closing the responder.
//!
//! # Recorded calls
//!
//! Every request received on the configured route is recorded, in arrival order, with
//! its decoded query parameters and its JSON body:
//!
//! ```no_run
//! use local_responder::{respond, Options, ANY_PORT};
//!
//! # async fn run() {
//! let responder = respond(Options::new().text("ok").method("POST").port(ANY_PORT)).unwrap();
//!
//! reqwest::Client::new()
//!     .post(format!("{}/?foo=bar", responder.url()))
//!     .json(&serde_json::json!({ "foo": "bar" }))
//!     .send()
//!     .await
//!     .unwrap();
//!
//! let calls = responder.calls();
//! assert_eq!(Some("bar"), calls[0].query_param("foo"));
//! assert_eq!(Some(&serde_json::json!({ "foo": "bar" })), calls[0].json());
//!
//! responder.close_async().await.unwrap();
//! # }
//! ```
//!
//! A freshly started responder always starts with an empty call log.
//!
//! # Scoped usage
//!
//! `respond_scoped` runs a block against a responder and closes it afterwards, returning
//! either the block's output or the first unexpected request:
//!
//! ```no_run
//! use local_responder::{respond_scoped, Options};
//!
//! # async fn run() -> Result<(), local_responder::Error> {
//! let status = respond_scoped(Options::new().text("Hi, I'm Bob!").path("/bob").port(5001), |handle| async move {
//!     reqwest::get(format!("{}/bob", handle.url())).await.unwrap().status()
//! })
//! .await?;
//!
//! assert_eq!(200, status.as_u16());
//! # Ok(())
//! # }
//! ```
//!
//! # Ports
//!
//! The default port is `DEFAULT_PORT` (5000). Use `ANY_PORT` to let the OS pick a free
//! port and read it back with `Handle::port` or `Handle::url`. Binding a port that is
//! already in use fails with `ErrorKind::BindAddress`:
//!
//! ```
//! use local_responder::{respond, ErrorKind, Options, ANY_PORT};
//!
//! let first = respond(Options::new().text("First").port(ANY_PORT)).unwrap();
//! let err = respond(Options::new().text("Second").port(first.port())).err().unwrap();
//!
//! assert_eq!(ErrorKind::BindAddress, err.kind);
//! ```
//!
//! # Debug
//!
//! Local Responder logs through the `log` crate: every request at `debug` level,
//! unexpected requests at `warn` level. Install any logger, e.g. `env_logger`, and run
//! your tests with `RUST_LOG=local_responder=debug`.
//!
pub use error::{Error, ErrorKind};
pub use options::{Options, ResponseBody, ResponseSpec, ANY_PORT, DEFAULT_PORT};
pub use recorder::{Mismatch, RecordedCall};
pub use server::{Handle, Responder};

use std::future::Future;

mod binder;
mod error;
mod matcher;
mod options;
mod recorder;
mod request;
mod response;
mod server;

///
/// Starts a responder serving the response described by `opts`.
///
/// Same as `Responder::start`.
///
pub fn respond(opts: Options) -> Result<Responder, Error> {
    Responder::start(opts)
}

///
/// Starts a responder, runs `scope` against it and closes it.
///
/// Returns the output of `scope`, or the `ErrorKind::InvalidPath` error of the first
/// unexpected request received while it ran. The responder is torn down on every exit
/// path, including a panic inside `scope`.
///
pub async fn respond_scoped<F, Fut, T>(opts: Options, scope: F) -> Result<T, Error>
where
    F: FnOnce(Handle) -> Fut,
    Fut: Future<Output = T>,
{
    let responder = Responder::start(opts)?;
    let output = scope(responder.handle()).await;
    responder.close_async().await?;

    Ok(output)
}
