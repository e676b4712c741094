use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::util::Escape;
use crate::StatusCode;
use url::Url;

/// A `Result` alias where the `Err` case is `proxychain::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The Errors that may occur when dialing through a proxy chain or
/// processing a request.
///
/// Note: Errors may include the full URL used to make the `Request`. If the URL
/// contains sensitive information (e.g. an API key as a query parameter), be
/// sure to remove it ([`without_url`](Error::without_url))
pub struct Error {
    inner: Box<Inner>,
}

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns a mutable reference to the URL related to this error.
    ///
    /// This is useful if you need to remove sensitive information from the URL
    /// (e.g. an API key in the query), but do not want to remove the URL
    /// entirely.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.inner.url.as_mut()
    }

    /// Add a url related to this error (overwriting any existing)
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information)
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if the error is from a type Builder, or a proxy chain
    /// that could not be assembled from its configuration.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error is related to connecting to a hop or the
    /// destination.
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// Returns true if an HTTP proxy refused or garbled the CONNECT tunnel.
    pub fn is_tunnel(&self) -> bool {
        matches!(self.inner.kind, Kind::Tunnel)
    }

    /// Returns true if the proxy chain could not be composed.
    pub fn is_setup(&self) -> bool {
        matches!(self.inner.kind, Kind::Setup)
    }

    /// Returns true if the error is related to the request
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the error is related to the request or response body
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    /// Returns true if the error is from `Response::error_for_status`.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status(_))
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status(code) => Some(code),
            _ => None,
        }
    }

    /// Returns the raw bytes a proxy answered a CONNECT request with, if this
    /// error is a rejected tunnel.
    pub fn tunnel_response(&self) -> Option<&[u8]> {
        self.inner
            .source
            .as_ref()
            .and_then(|e| e.downcast_ref::<TunnelRejected>())
            .map(|rejected| &rejected.head[..])
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("proxychain::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Connect => f.write_str("error connecting through proxy chain")?,
            Kind::Tunnel => f.write_str("error establishing CONNECT tunnel")?,
            Kind::Setup => f.write_str("error setting up proxy chain")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Body => f.write_str("request or response body error")?,
            Kind::Status(ref code) => {
                let prefix = if code.is_client_error() {
                    "HTTP status client error"
                } else {
                    debug_assert!(code.is_server_error());
                    "HTTP status server error"
                };
                write!(f, "{prefix} ({code})")?;
            }
        };

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Connect,
    Tunnel,
    Setup,
    Request,
    Body,
    Status(StatusCode),
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect, Some(e))
}

pub(crate) fn tunnel<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tunnel, Some(e))
}

pub(crate) fn setup<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Setup, Some(e))
}

pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request, Some(e))
}

pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Body, Some(e))
}

pub(crate) fn status_code(url: Url, status: StatusCode) -> Error {
    Error::new(Kind::Status(status), None::<Error>).with_url(url)
}

pub(crate) fn url_bad_scheme(url: Url) -> Error {
    Error::new(Kind::Builder, Some(BadScheme)).with_url(url)
}

pub(crate) fn unknown_proxy_method(method: &str) -> Error {
    builder(format!("unable to determine proxy method {method:?}"))
}

pub(crate) fn bad_proxy_address(address: &str) -> Error {
    builder(format!("malformed proxy address {address:?}"))
}

#[derive(Debug)]
pub(crate) struct BadScheme;

impl fmt::Display for BadScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("URL scheme is not allowed")
    }
}

impl StdError for BadScheme {}

/// The head of a CONNECT response that was not an accepted success.
#[derive(Debug)]
pub(crate) struct TunnelRejected {
    pub(crate) head: Vec<u8>,
}

impl fmt::Display for TunnelRejected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bytes don't match: {:?}", Escape::new(&self.head))
    }
}

impl StdError for TunnelRejected {}

#[inline]
pub(crate) fn tunnel_eof() -> Error {
    connect(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "unexpected eof while tunneling",
    ))
}
