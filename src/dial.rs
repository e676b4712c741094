//! The connection primitive every proxy hop is built from.
//!
//! A [`Dial`] takes a `(network, address)` pair and asynchronously yields a
//! [`Conn`]. Proxy hops are themselves `Dial` implementations wrapping an
//! inner `Dial`, so a whole chain composes into one value.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error;

/// A byte stream that can be handed to the HTTP layer.
pub trait AsyncConn: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite> AsyncConn for T {}

/// An established connection, possibly tunneled through several proxies.
pub type Conn = Box<dyn AsyncConn + Send + Unpin + 'static>;

/// Alias for the `Future` type returned by a dialer.
pub type Dialing = Pin<Box<dyn Future<Output = crate::Result<Conn>> + Send>>;

/// Trait for establishing raw connections.
///
/// It differs from `tower_service::Service<Uri>` in several ways:
///  * It is assumed that `dial` will always be ready to poll.
///  * It does not need a mutable reference to `self`.
///  * Since trait objects cannot make use of associated types, it requires
///    wrapping the returned `Future` and its `Conn` with `Box`.
pub trait Dial: Send + Sync {
    /// Connects to `addr` (a `host:port` pair) over `network`.
    fn dial(&self, network: &str, addr: &str) -> Dialing;
}

pub(crate) type DynDial = Arc<dyn Dial>;

/// Plain TCP, the dialer every chain bottoms out at by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDial;

impl TcpDial {
    /// Construct a new [`TcpDial`].
    pub fn new() -> Self {
        TcpDial
    }
}

impl Dial for TcpDial {
    fn dial(&self, network: &str, addr: &str) -> Dialing {
        let network = network.to_owned();
        let addr = addr.to_owned();
        Box::pin(async move {
            match network.as_str() {
                "tcp" | "tcp4" | "tcp6" => (),
                other => {
                    return Err(error::connect(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported network {other:?}"),
                    )));
                }
            }
            log::trace!("tcp connecting to {addr}");
            let stream = TcpStream::connect(addr.as_str())
                .await
                .map_err(error::connect)?;
            stream.set_nodelay(true).map_err(error::connect)?;
            Ok(Box::new(stream) as Conn)
        })
    }
}

impl<D: Dial + ?Sized> Dial for Arc<D> {
    fn dial(&self, network: &str, addr: &str) -> Dialing {
        (**self).dial(network, addr)
    }
}
