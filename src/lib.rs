#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # proxychain
//!
//! The `proxychain` crate provides an HTTP client that routes its
//! connections through an ordered chain of proxies before reaching the
//! destination.
//!
//! - SOCKS5 hops
//! - HTTP `CONNECT` hops, tolerant of `HTTP/1.0` proxies
//! - Any mix and any length of both, in configured order
//! - TLS to `https` destinations, end to end through the chain
//!
//! ## Making a GET request
//!
//! For a single direct request, use the [`get`] shortcut:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), proxychain::Error> {
//! let body = proxychain::get("http://example.com/")
//!     .await?
//!     .text()
//!     .await?;
//!
//! println!("body = {body:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Chaining proxies
//!
//! Each `with_*` call returns a new [`Client`] with one more hop. The first
//! hop added is the first one dialed:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), proxychain::Error> {
//! // local -> proxy1 (CONNECT) -> proxy2 (SOCKS5) -> example.com
//! let res = proxychain::with_http("proxy1:8080")
//!     .with_socks5("proxy2:1080")
//!     .get("http://example.com/")
//!     .await?;
//! # drop(res);
//! # Ok(())
//! # }
//! ```
//!
//! ## Raw connections
//!
//! [`Client::dial`] returns the tunneled byte stream itself, and the
//! [`Dial`] trait with [`ConnectHop`] and [`Socks5Hop`] lets a chain be
//! composed by hand.
//!
//! ## Optional Features
//!
//! - **rustls** *(enabled by default)*: TLS to `https` destinations via
//!   `rustls`, trusting the `webpki-roots` certificates.

use once_cell::sync::Lazy;

pub use http::header;
pub use http::{StatusCode, Version};
pub use url::Url;

pub use self::client::Client;
pub use self::connect::{ConnectHop, Socks5Hop};
pub use self::dial::{AsyncConn, Conn, Dial, Dialing, TcpDial};
pub use self::error::{Error, Result};
pub use self::hop::{Hop, ProxyMethod};
pub use self::into_url::IntoUrl;
pub use self::response::Response;

mod client;
mod connect;
mod dial;
mod error;
mod hop;
mod into_url;
mod response;
#[cfg(feature = "rustls")]
mod tls;
mod util;

static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// The process-wide `Client` used by the free functions; it has no hops.
pub fn default_client() -> &'static Client {
    &DEFAULT_CLIENT
}

/// Shortcut method to quickly make a direct `GET` request.
///
/// # Errors
///
/// This function fails if:
///
/// - the TLS configuration cannot be built,
/// - the supplied `Url` cannot be parsed,
/// - there was an error while sending request,
/// - the destination could not be reached.
pub async fn get<T: IntoUrl>(url: T) -> crate::Result<Response> {
    DEFAULT_CLIENT.get(url).await
}

/// A new `Client` with a single SOCKS5 hop.
///
/// The default client is left untouched.
pub fn with_socks5(address: &str) -> Client {
    DEFAULT_CLIENT.with_socks5(address)
}

/// A new `Client` with a single HTTP CONNECT hop.
///
/// The default client is left untouched.
pub fn with_http(address: &str) -> Client {
    DEFAULT_CLIENT.with_http(address)
}
