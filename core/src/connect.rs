//! High-level attested connection API.
//!
//! Opens the TCP transport and hands it to [`AtlsContext::wrap`], keeping
//! the composition explicit: host HTTP machinery runs unchanged on top of
//! the returned stream.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::net::{lookup_host, TcpSocket, TcpStream};

use crate::context::{AtlsContext, TlsStream};
use crate::error::AtlsError;

/// Default port for attested HTTPS endpoints.
pub const DEFAULT_PORT: u16 = 443;

/// Socket-level options for [`atls_connect_with`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Maximum time to wait for the TCP connection to establish.
    pub connect_timeout: Option<Duration>,
    /// Local address to bind before connecting.
    pub source_address: Option<SocketAddr>,
    /// Disable Nagle's algorithm on the connected socket. On by default,
    /// as request/response traffic is latency-sensitive.
    pub nodelay: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            source_address: None,
            nodelay: true,
        }
    }
}

/// Connect to `host:port` and perform the attested TLS handshake.
///
/// # Example
///
/// ```no_run
/// use atls_rs::{atls_connect, AnyValidator, AtlsContext, NullValidator, DEFAULT_PORT};
///
/// # async fn example() -> Result<(), atls_rs::AtlsError> {
/// let context = AtlsContext::new(vec![AnyValidator::Null(NullValidator::new())])?;
/// let stream = atls_connect("tee.example.com", DEFAULT_PORT, context).await?;
/// # let _ = stream;
/// # Ok(())
/// # }
/// ```
pub async fn atls_connect(
    host: &str,
    port: u16,
    context: AtlsContext,
) -> Result<TlsStream<TcpStream>, AtlsError> {
    atls_connect_with(host, port, context, ConnectOptions::default()).await
}

/// [`atls_connect`] with explicit socket options.
pub async fn atls_connect_with(
    host: &str,
    port: u16,
    context: AtlsContext,
    options: ConnectOptions,
) -> Result<TlsStream<TcpStream>, AtlsError> {
    crate::logging::init();

    let tcp = open_tcp(host, port, &options).await?;
    if options.nodelay {
        tcp.set_nodelay(true)
            .map_err(|e| AtlsError::Io(format!("failed to set TCP_NODELAY: {e}")))?;
    }

    context.wrap(tcp).await
}

async fn open_tcp(host: &str, port: u16, options: &ConnectOptions) -> Result<TcpStream, AtlsError> {
    let target = format!("{host}:{port}");
    debug!("opening TCP connection to {target}");

    let connect = async {
        let mut last_error: Option<io::Error> = None;
        for addr in lookup_host(&target).await? {
            let socket = match addr {
                SocketAddr::V4(_) => TcpSocket::new_v4()?,
                SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };
            if let Some(bind) = options.source_address {
                socket.bind(bind)?;
            }
            match socket.connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "name resolved to no addresses",
            )
        }))
    };

    match options.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| AtlsError::Io(format!("connection to {target} timed out")))?,
        None => connect.await,
    }
    .map_err(|e| AtlsError::Io(format!("tcp connect to {target} failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{AnyValidator, NullValidator};

    #[tokio::test]
    async fn test_connect_timeout_is_enforced() {
        let context = AtlsContext::new(vec![AnyValidator::Null(NullValidator::new())]).unwrap();
        // RFC 5737 TEST-NET-1 address: connects hang, so the timeout fires.
        let options = ConnectOptions {
            connect_timeout: Some(Duration::from_millis(100)),
            ..ConnectOptions::default()
        };
        let result = atls_connect_with("192.0.2.1", 443, context, options).await;
        assert!(matches!(result, Err(AtlsError::Io(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        let context = AtlsContext::new(vec![AnyValidator::Null(NullValidator::new())]).unwrap();
        // Bind a listener to learn a free port, then close it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = atls_connect("127.0.0.1", port, context).await;
        assert!(matches!(result, Err(AtlsError::Io(_))));
    }
}
