use std::fmt;
use std::str::FromStr;

/// One proxy in a chain: how to talk to it, and where it lives.
///
/// The method is kept as the text it was configured with and only resolved
/// to a [`ProxyMethod`] when a chain is built, so a client can carry a hop
/// it does not know how to dial and report it before touching the network.
#[derive(Clone, PartialEq, Eq)]
pub struct Hop {
    method: String,
    address: String,
}

/// The protocols a [`Hop`] can speak.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyMethod {
    /// A SOCKS5 proxy, asked to connect onward with a CONNECT command.
    Socks5,
    /// An HTTP proxy, asked to open a tunnel with an HTTP `CONNECT` request.
    HttpConnect,
}

impl Hop {
    /// A hop with an arbitrary method name.
    pub fn new(method: impl Into<String>, address: impl Into<String>) -> Hop {
        Hop {
            method: method.into(),
            address: address.into(),
        }
    }

    /// A SOCKS5 hop.
    pub fn socks5(address: impl Into<String>) -> Hop {
        Hop::new(ProxyMethod::Socks5.as_str(), address)
    }

    /// An HTTP CONNECT hop.
    pub fn http(address: impl Into<String>) -> Hop {
        Hop::new(ProxyMethod::HttpConnect.as_str(), address)
    }

    /// The method name this hop was configured with.
    pub fn method_str(&self) -> &str {
        &self.method
    }

    /// The proxy address, exactly as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Resolves the configured method name.
    pub fn method(&self) -> crate::Result<ProxyMethod> {
        self.method.parse()
    }
}

impl fmt::Debug for Hop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://{}", self.method, self.address)
    }
}

impl ProxyMethod {
    /// The canonical name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMethod::Socks5 => "socks5",
            ProxyMethod::HttpConnect => "https",
        }
    }
}

impl FromStr for ProxyMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<ProxyMethod> {
        match s {
            "socks5" | "socks5h" => Ok(ProxyMethod::Socks5),
            "https" | "http" => Ok(ProxyMethod::HttpConnect),
            other => Err(crate::error::unknown_proxy_method(other)),
        }
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
