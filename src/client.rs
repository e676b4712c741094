use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, HOST, USER_AGENT};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use url::{Position, Url};

use crate::connect;
use crate::dial::{Conn, Dial, DynDial};
use crate::error;
use crate::hop::Hop;
use crate::into_url::IntoUrlSealed;
use crate::{IntoUrl, Response};

static DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A `Client` to make requests through a chain of proxies.
///
/// A `Client` is an immutable value. Adding a hop with
/// [`with_socks5`](Client::with_socks5) or [`with_http`](Client::with_http)
/// returns a new `Client` and leaves the receiver as it was, so one base
/// client can be extended in several directions and shared across tasks.
///
/// Hops are dialed in the order they were added: the first hop is connected
/// to directly, each later hop is reached through the one before it, and the
/// destination is reached through the last.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn run() -> Result<(), proxychain::Error> {
/// let client = proxychain::Client::new()
///     .with_http("proxy1:8080")
///     .with_socks5("proxy2:1080");
///
/// let res = client.get("http://example.com/").await?;
/// println!("{}", res.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    hops: Arc<Vec<Hop>>,
    dialer: Option<DynDial>,
    user_agent: HeaderValue,
}

impl Client {
    /// Constructs a new `Client` that connects directly.
    pub fn new() -> Client {
        Client {
            hops: Arc::new(Vec::new()),
            dialer: None,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    /// Returns a new `Client` with a SOCKS5 hop appended.
    pub fn with_socks5(&self, address: &str) -> Client {
        self.with_hop(Hop::socks5(address))
    }

    /// Returns a new `Client` with an HTTP CONNECT hop appended.
    pub fn with_http(&self, address: &str) -> Client {
        self.with_hop(Hop::http(address))
    }

    /// Returns a new `Client` with a hop of any method appended.
    ///
    /// The method is checked when a request is made; an unknown method
    /// fails the request with a builder error before anything is dialed.
    pub fn with_proxy(&self, method: &str, address: &str) -> Client {
        self.with_hop(Hop::new(method, address))
    }

    /// Returns a new `Client` with `hop` appended.
    pub fn with_hop(&self, hop: Hop) -> Client {
        let mut hops = Vec::with_capacity(self.hops.len() + 1);
        hops.extend(self.hops.iter().cloned());
        hops.push(hop);

        Client {
            hops: Arc::new(hops),
            ..self.clone()
        }
    }

    /// Returns a new `Client` whose first hop is dialed with `dialer`
    /// instead of plain TCP.
    pub fn with_dialer<D>(&self, dialer: D) -> Client
    where
        D: Dial + 'static,
    {
        Client {
            dialer: Some(Arc::new(dialer)),
            ..self.clone()
        }
    }

    /// Returns a new `Client` sending `value` as its `User-Agent`.
    pub fn with_user_agent(&self, value: HeaderValue) -> Client {
        Client {
            user_agent: value,
            ..self.clone()
        }
    }

    /// The configured hops, in dial order.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Opens a raw connection to `addr` through the proxy chain.
    ///
    /// # Errors
    ///
    /// Fails with a builder error if a hop is misconfigured, before any
    /// connection is attempted, and otherwise with the first error any hop
    /// runs into.
    pub async fn dial(&self, network: &str, addr: &str) -> crate::Result<Conn> {
        let dial = connect::chain(&self.hops, self.dialer.clone())?;
        dial.dial(network, addr).await
    }

    /// Sends a `GET` request to `url` through the proxy chain.
    ///
    /// The chain is composed afresh for every request; nothing is pooled.
    ///
    /// # Errors
    ///
    /// This method fails if the URL is not `http` or `https`, if a hop is
    /// misconfigured, if any hop fails to connect or tunnel, or if the
    /// exchange with the destination fails.
    pub async fn get<U: IntoUrl>(&self, url: U) -> crate::Result<Response> {
        let url = url.into_url()?;
        self.execute(url.clone()).await.map_err(|e| e.with_url(url))
    }

    async fn execute(&self, url: Url) -> crate::Result<Response> {
        let host = url.host_str().ok_or_else(|| error::url_bad_scheme(url.clone()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| error::url_bad_scheme(url.clone()))?;
        let addr = format!("{host}:{port}");

        log::debug!("dialing {addr} through {} hop(s)", self.hops.len());
        let conn = self.dial("tcp", &addr).await?;
        let conn = if url.scheme() == "https" {
            secure(conn, host).await?
        } else {
            conn
        };

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(conn))
            .await
            .map_err(error::request)?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::debug!("connection error: {err}");
            }
        });

        let req = http::Request::get(&url[Position::BeforePath..Position::AfterQuery])
            .header(HOST, &url[Position::BeforeHost..Position::AfterPort])
            .header(USER_AGENT, self.user_agent.clone())
            .body(Empty::<Bytes>::new())
            .map_err(error::builder)?;

        let res = sender.send_request(req).await.map_err(error::request)?;
        Ok(Response::new(res, url))
    }
}

#[cfg(feature = "rustls")]
async fn secure(conn: Conn, host: &str) -> crate::Result<Conn> {
    crate::tls::handshake(conn, host).await
}

#[cfg(not(feature = "rustls"))]
async fn secure(_conn: Conn, _host: &str) -> crate::Result<Conn> {
    Err(error::builder(
        "https destinations require the `rustls` feature",
    ))
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("hops", &self.hops)
            .field("custom_dialer", &self.dialer.is_some())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
