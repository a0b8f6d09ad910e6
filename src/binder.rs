use crate::{Error, ErrorKind};
use std::net::{SocketAddr, TcpListener};

///
/// Binds a listening socket on `host:port`. A port of `0` lets the OS pick one.
///
/// Binding is attempted exactly once. The socket is left in non-blocking mode so it
/// can be handed over to the tokio runtime serving it.
///
pub(crate) fn bind(host: &str, port: u16) -> Result<(TcpListener, SocketAddr), Error> {
    let requested = format!("{}:{}", host, port);

    let bind_error = |err: std::io::Error| {
        Error::new_with_context(ErrorKind::BindAddress, format!("{}: {}", requested, err))
    };

    let listener = TcpListener::bind(requested.as_str()).map_err(bind_error)?;
    let address = listener.local_addr().map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;

    log::debug!("Bound {} (requested {})", address, requested);

    Ok((listener, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_port() {
        let (_listener, address) = bind("127.0.0.1", 0).unwrap();

        assert_ne!(0, address.port());
        assert!(address.ip().is_loopback());
    }

    #[test]
    fn test_port_in_use() {
        let (_listener, address) = bind("127.0.0.1", 0).unwrap();

        let err = bind("127.0.0.1", address.port()).unwrap_err();

        assert_eq!(ErrorKind::BindAddress, err.kind);
        let message = err.to_string();
        assert!(message.starts_with("Unable to bind address: "));
        assert!(message.contains(&address.to_string()));
        assert!(message.to_lowercase().contains("address already in use"));
    }

    #[test]
    fn test_released_port_can_be_bound_again() {
        let (listener, address) = bind("127.0.0.1", 0).unwrap();
        drop(listener);

        assert!(bind("127.0.0.1", address.port()).is_ok());
    }

    #[test]
    fn test_unresolvable_host() {
        let err = bind("not a host", 0).unwrap_err();

        assert_eq!(ErrorKind::BindAddress, err.kind);
        assert!(err.to_string().contains("not a host:0"));
    }
}
