//! Folding a list of hops into one dialer.

use std::sync::Arc;

use crate::dial::{DynDial, TcpDial};
use crate::error;
use crate::hop::{Hop, ProxyMethod};

mod socks;
mod tunnel;

pub use self::socks::Socks5Hop;
pub use self::tunnel::ConnectHop;

/// Composes `hops` into a single dialer.
///
/// Hop 0 is reached through `base` (plain TCP when `None`), every later hop
/// through the one before it, and the destination through the last. Every
/// hop is validated here, so a bad method or address fails before any
/// connection is attempted.
pub(crate) fn chain(hops: &[Hop], base: Option<DynDial>) -> crate::Result<DynDial> {
    let mut dial = base;
    for (i, hop) in hops.iter().enumerate() {
        log::trace!("proxy chain hop {i}: {hop:?}");
        let wrapped: DynDial = match hop.method()? {
            ProxyMethod::Socks5 => Arc::new(Socks5Hop::new(hop.address(), dial.take())?),
            ProxyMethod::HttpConnect => Arc::new(ConnectHop::new(hop.address(), dial.take())?),
        };
        dial = Some(wrapped);
    }

    match dial {
        Some(dial) => Ok(dial),
        None if hops.is_empty() => Ok(Arc::new(TcpDial)),
        None => Err(error::setup("unable to setup 1 or more proxies")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::dial::{Dial, Dialing};

    #[derive(Default)]
    struct Recording {
        dialed: Mutex<Vec<String>>,
    }

    impl Dial for Recording {
        fn dial(&self, _network: &str, addr: &str) -> Dialing {
            self.dialed.lock().unwrap().push(addr.to_owned());
            let err = error::connect("recording dialer never connects");
            Box::pin(async move { Err(err) })
        }
    }

    #[test]
    fn unknown_method_fails_before_io() {
        let base = Arc::new(Recording::default());
        let hops = vec![Hop::http("proxy1:8080"), Hop::new("gopher", "proxy2:70")];

        let err = chain(&hops, Some(base.clone() as DynDial)).err().unwrap();

        assert!(err.is_builder());
        assert!(base.dialed.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_address_fails_before_io() {
        let base = Arc::new(Recording::default());
        let hops = vec![Hop::http("a:b:c:d")];

        let err = chain(&hops, Some(base.clone() as DynDial)).err().unwrap();

        assert!(err.is_builder());
        assert!(base.dialed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_chain_uses_base() {
        let base = Arc::new(Recording::default());

        let dial = chain(&[], Some(base.clone() as DynDial)).unwrap();
        let _ = dial.dial("tcp", "example.com:80").await;

        assert_eq!(*base.dialed.lock().unwrap(), ["example.com:80"]);
    }

    #[tokio::test]
    async fn first_hop_is_dialed_first() {
        let base = Arc::new(Recording::default());
        let hops = vec![
            Hop::http("proxy1:8080"),
            Hop::socks5("proxy2:1080"),
            Hop::http("http://proxy3"),
        ];

        let dial = chain(&hops, Some(base.clone() as DynDial)).unwrap();
        let err = dial.dial("tcp", "example.com:80").await.err().unwrap();

        // the base only ever sees hop 0; the failure surfaces unchanged
        assert!(err.is_connect());
        assert_eq!(*base.dialed.lock().unwrap(), ["proxy1:8080"]);
    }
}
