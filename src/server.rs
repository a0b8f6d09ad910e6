use crate::binder;
use crate::options::ResponseSpec;
use crate::recorder::{Mismatch, RecordedCall, State};
use crate::request::Request;
use crate::response::{self, Body};
use crate::{Error, ErrorKind, Options};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::TryFrom;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::ops::{Deref, Drop};
use std::sync::{mpsc, Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::{self, Runtime};
use tokio::sync::oneshot;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

///
/// A cheap, cloneable view on a running responder: where it listens and what it
/// received so far.
///
#[derive(Clone, Debug)]
pub struct Handle {
    address: SocketAddr,
    state: Arc<RwLock<State>>,
}

impl Handle {
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    ///
    /// The calls received on the configured route, in the order their bodies were read.
    /// Returns a snapshot: calls received later won't show up in it.
    ///
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.read_state().calls.snapshot()
    }

    /// The number of calls received on the configured route.
    pub fn call_count(&self) -> usize {
        self.read_state().calls.len()
    }

    /// The most recent call received on the configured route.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.read_state().calls.last().cloned()
    }

    /// The requests that didn't match the configured method and path, in arrival order.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.read_state().mismatches.clone()
    }

    ///
    /// Fails with `ErrorKind::InvalidPath` if an unexpected request was received so far.
    ///
    /// Closing the responder performs the same check. Use this to fail early, while
    /// the responder is still serving.
    ///
    pub fn verify(&self) -> Result<(), Error> {
        self.read_state().verify()
    }

    ///
    /// The host and port of the responder. Can be used with `std::net::TcpStream`.
    ///
    pub fn host_with_port(&self) -> String {
        self.address.to_string()
    }

    ///
    /// The URL of the responder, e.g. `http://127.0.0.1:5000`. Append the path to it.
    ///
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// The port actually bound, even when any port was requested.
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// The address actually bound.
    pub fn socket_address(&self) -> SocketAddr {
        self.address
    }
}

struct ServerThread {
    shutdown_sender: oneshot::Sender<()>,
    stopped_receiver: oneshot::Receiver<()>,
    join_handle: thread::JoinHandle<()>,
}

impl ServerThread {
    fn stop(self) -> Result<(), Error> {
        let _ = self.shutdown_sender.send(());

        self.join_handle.join().map_err(|_| {
            log::error!("The server thread panicked");
            Error::new(ErrorKind::ServerFailure)
        })
    }

    async fn stop_async(self) -> Result<(), Error> {
        let _ = self.shutdown_sender.send(());

        // Resolves once the runtime and every socket it owned are gone
        let _ = self.stopped_receiver.await;

        self.join_handle.join().map_err(|_| {
            log::error!("The server thread panicked");
            Error::new(ErrorKind::ServerFailure)
        })
    }
}

///
/// A running local HTTP server answering one route with a canned response.
///
/// The server is shut down and its port released when the responder is closed or
/// dropped, whichever comes first. Dropping happens on every exit path of the
/// enclosing scope, including panics.
///
/// Dereferences to `Handle`.
///
/// ## Example
///
/// ```
/// use local_responder::{respond, Options, ANY_PORT};
///
/// let responder = respond(Options::new().text("Hello, world!").port(ANY_PORT)).unwrap();
///
/// // Point your client to `responder.url()`
/// assert!(responder.calls().is_empty());
///
/// responder.close().unwrap();
/// ```
///
pub struct Responder {
    handle: Handle,
    server: Option<ServerThread>,
    assert_on_drop: bool,
}

impl Responder {
    ///
    /// Validates the options, binds the address and starts serving.
    ///
    /// Fails with `ErrorKind::Configuration` before touching the network when the options
    /// are invalid, and with `ErrorKind::BindAddress` when the address can't be bound.
    /// Nothing is left running in either case.
    ///
    pub fn start(opts: Options) -> Result<Responder, Error> {
        let spec = ResponseSpec::try_from(opts)?;
        let (listener, address) = binder::bind(&spec.host, spec.port)?;

        let state = Arc::new(RwLock::new(State::new()));
        let (ready_sender, ready_receiver) = mpsc::sync_channel::<Result<(), Error>>(1);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();
        let (stopped_sender, stopped_receiver) = oneshot::channel::<()>();
        let assert_on_drop = spec.assert_on_drop;
        let spec = Arc::new(spec);

        let state_clone = state.clone();
        let join_handle = thread::Builder::new()
            .name(format!("local-responder::{}", address))
            .spawn(move || {
                let (runtime, listener) = match start_runtime(listener) {
                    Ok(started) => started,
                    Err(err) => {
                        let _ = ready_sender.send(Err(err));
                        return;
                    }
                };

                log::info!("Responder listening on {} for {}", address, spec.route);
                let _ = ready_sender.send(Ok(()));

                runtime.block_on(serve(listener, spec, state_clone, shutdown_receiver));
                drop(runtime);

                log::info!("Responder on {} stopped", address);
                let _ = stopped_sender.send(());
            })
            .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?;

        match ready_receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = join_handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = join_handle.join();
                return Err(Error::new_with_context(
                    ErrorKind::ServerFailure,
                    "the server thread exited before serving",
                ));
            }
        }

        Ok(Responder {
            handle: Handle { address, state },
            server: Some(ServerThread {
                shutdown_sender,
                stopped_receiver,
                join_handle,
            }),
            assert_on_drop,
        })
    }

    /// A cloneable view on this responder.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    ///
    /// Stops accepting connections, waits (up to the drain timeout) for in-flight
    /// responses and releases the port. Blocks the current thread until then.
    ///
    /// Fails with `ErrorKind::InvalidPath` if an unexpected request was received.
    ///
    pub fn close(mut self) -> Result<(), Error> {
        if let Some(server) = self.server.take() {
            server.stop()?;
        }

        self.outcome()
    }

    ///
    /// Same as `Responder::close` but async.
    ///
    pub async fn close_async(mut self) -> Result<(), Error> {
        if let Some(server) = self.server.take() {
            server.stop_async().await?;
        }

        self.outcome()
    }

    fn outcome(&self) -> Result<(), Error> {
        let state = self.handle.read_state();

        for mismatch in state.mismatches.iter() {
            log::warn!(
                "Responder on {} received an unexpected request: {}",
                self.handle.address,
                mismatch
            );
        }

        state.verify()
    }
}

impl Deref for Responder {
    type Target = Handle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        let Some(server) = self.server.take() else {
            return;
        };

        let stopped = server.stop();

        if thread::panicking() {
            return;
        }

        if let Err(err) = stopped {
            log::error!("Could not stop the responder on {}: {}", self.handle.address, err);
        }

        if let Err(err) = self.outcome() {
            if self.assert_on_drop {
                panic!("{}", err);
            }
        }
    }
}

fn start_runtime(listener: StdTcpListener) -> Result<(Runtime, TcpListener), Error> {
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Error::new_with_context(ErrorKind::ServerFailure, err))?;

    let listener = {
        let _context = runtime.enter();
        TcpListener::from_std(listener).map_err(|err| {
            log::error!("Could not register the listener: {}", err);
            Error::new_with_context(ErrorKind::ServerFailure, err)
        })?
    };

    Ok((runtime, listener))
}

async fn serve(
    listener: TcpListener,
    spec: Arc<ResponseSpec>,
    state: Arc<RwLock<State>>,
    mut shutdown_receiver: oneshot::Receiver<()>,
) {
    let builder = ConnectionBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        log::warn!("Could not accept a connection: {}", err);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        continue;
                    }
                };

                log::debug!("Connection accepted from {}", peer);

                let spec = spec.clone();
                let state = state.clone();
                let service = service_fn(move |request: HyperRequest<Incoming>| {
                    handle_request(request, spec.clone(), state.clone())
                });

                let connection = builder
                    .serve_connection_with_upgrades(TokioIo::new(Box::pin(stream)), service)
                    .into_owned();
                let connection = graceful.watch(connection);

                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        log::debug!("Connection from {} closed with an error: {}", peer, err);
                    }
                });
            }
            _ = &mut shutdown_receiver => break,
        }
    }

    drop(listener);

    wait_for_drain(graceful, spec.drain_timeout).await;
}

async fn wait_for_drain(graceful: GracefulShutdown, drain_timeout: Duration) {
    if tokio::time::timeout(drain_timeout, graceful.shutdown())
        .await
        .is_err()
    {
        log::warn!(
            "Connections still open after {:?}, closing them",
            drain_timeout
        );
    }
}

async fn handle_request(
    hyper_request: HyperRequest<Incoming>,
    spec: Arc<ResponseSpec>,
    state: Arc<RwLock<State>>,
) -> Result<Response<Body>, Error> {
    let mut request = Request::new(hyper_request);

    if let Err(rejection) = spec.route.check(request.method(), request.path()) {
        // Recorded before the body is read, so a broken body can't hide it
        let mismatch = request.to_mismatch();
        log::warn!("{} (expected {})", mismatch, spec.route);
        write_state(&state).record_mismatch(mismatch);

        if let Err(err) = request.read_body().await {
            log::debug!("Could not read the body of an unexpected request: {}", err);
        }
        log::debug!("Request received: {}", request.formatted());

        return response::respond_with_mismatch(rejection, &spec.route);
    }

    request.read_body().await?;
    log::debug!("Request received: {}", request.formatted());

    let call = request.to_recorded_call();
    write_state(&state).record_call(call);

    response::respond_with_spec(&spec)
}

fn write_state(state: &RwLock<State>) -> RwLockWriteGuard<'_, State> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
