use std::fmt;
use std::future::{ready, Ready};
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper_util::client::legacy::connect::proxy::SocksV5;
use hyper_util::rt::TokioIo;
use tower_service::Service;

use crate::dial::{Conn, Dial, Dialing, DynDial, TcpDial};
use crate::error;
use crate::util::split_host_port;

const DEFAULT_PORT: u16 = 1080;

/// A hop through a SOCKS5 proxy.
///
/// The proxy is reached through the inner dialer, or directly over TCP when
/// there is none, and then asked to connect onward to the destination.
/// Destination names are passed to the proxy unresolved.
#[derive(Clone)]
pub struct Socks5Hop {
    proxy: String,
    proxy_uri: Uri,
    inner: Option<DynDial>,
}

impl Socks5Hop {
    /// Wraps `inner` with a SOCKS5 hop through the proxy at `proxy`.
    ///
    /// `proxy` may be `host`, `host:port`, or either prefixed with
    /// `socks5://` or `socks5h://`. A missing port defaults to `1080`.
    pub fn new(proxy: &str, inner: Option<Arc<dyn Dial>>) -> crate::Result<Socks5Hop> {
        let normalized = normalize(proxy)?;
        let proxy_uri = format!("socks5://{normalized}")
            .parse::<Uri>()
            .map_err(|_| error::bad_proxy_address(proxy))?;
        Ok(Socks5Hop {
            proxy: normalized,
            proxy_uri,
            inner,
        })
    }

    /// The `host:port` this hop connects to.
    pub fn proxy(&self) -> &str {
        &self.proxy
    }
}

impl fmt::Debug for Socks5Hop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Socks5Hop")
            .field("proxy", &self.proxy)
            .field("tunneled", &self.inner.is_some())
            .finish()
    }
}

impl Dial for Socks5Hop {
    fn dial(&self, _network: &str, addr: &str) -> Dialing {
        let proxy = self.proxy.clone();
        let proxy_uri = self.proxy_uri.clone();
        let inner = self.inner.clone();
        let dst = addr.to_owned();
        Box::pin(async move {
            let dst_uri = match split_host_port(&dst) {
                Some(_) => format!("http://{dst}")
                    .parse::<Uri>()
                    .map_err(error::builder)?,
                None => {
                    return Err(error::builder(format!(
                        "invalid socks destination {dst:?}"
                    )))
                }
            };

            let conn = match inner {
                Some(inner) => inner.dial("tcp", &proxy).await?,
                None => TcpDial.dial("tcp", &proxy).await?,
            };

            log::debug!("socks5 negotiation with {proxy}; address={dst}");
            let mut svc = SocksV5::new(proxy_uri, Dialed(Some(conn)));
            let stream = Service::call(&mut svc, dst_uri)
                .await
                .map_err(error::connect)?;
            log::trace!("socks5 relay ready; address={dst}");
            Ok(stream.into_inner())
        })
    }
}

/// Hands `SocksV5` the connection the inner dialer already established, so
/// the negotiation runs over whatever hops came before.
struct Dialed(Option<Conn>);

impl Service<Uri> for Dialed {
    type Response = TokioIo<Conn>;
    type Error = io::Error;
    type Future = Ready<Result<TokioIo<Conn>, io::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _proxy: Uri) -> Self::Future {
        ready(self.0.take().map(TokioIo::new).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "socks proxy connection already used")
        }))
    }
}

fn normalize(proxy: &str) -> crate::Result<String> {
    let stripped = proxy
        .strip_prefix("socks5://")
        .or_else(|| proxy.strip_prefix("socks5h://"))
        .unwrap_or(proxy);

    if stripped.is_empty() {
        return Err(error::bad_proxy_address(proxy));
    }
    if !stripped.contains(':') {
        return Ok(format!("{stripped}:{DEFAULT_PORT}"));
    }
    match split_host_port(stripped) {
        Some((host, port)) => Ok(format!("{host}:{port}")),
        None => Err(error::bad_proxy_address(proxy)),
    }
}
