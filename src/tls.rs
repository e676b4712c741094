//! TLS to `https` destinations.
//!
//! The handshake runs end to end with the destination, on top of whatever
//! tunnel the proxy chain produced. Proxies only ever see ciphertext.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use tokio_rustls::TlsConnector;

use crate::dial::Conn;
use crate::error;

pub(crate) async fn handshake(conn: Conn, host: &str) -> crate::Result<Conn> {
    let connector = TlsConnector::from(config()?);

    // IPv6 literals come out of `Url::host_str` bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(host.to_owned()).map_err(error::builder)?;

    log::trace!("tls handshake with {host}");
    let tls = connector
        .connect(server_name, conn)
        .await
        .map_err(error::connect)?;
    Ok(Box::new(tls))
}

static CONFIG: Lazy<Result<Arc<ClientConfig>, rustls::Error>> = Lazy::new(build_config);

fn config() -> crate::Result<Arc<ClientConfig>> {
    match &*CONFIG {
        Ok(config) => Ok(config.clone()),
        Err(err) => Err(error::builder(err.clone())),
    }
}

fn build_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds() {
        let config = config().unwrap();
        assert_eq!(config.alpn_protocols, [b"http/1.1".to_vec()]);
    }

    #[test]
    fn config_is_built_once() {
        let first = config().unwrap();
        let second = config().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn bad_server_name() {
        let (a, _b) = tokio::io::duplex(64);
        let err = handshake(Box::new(a), "not a hostname!").await.err().unwrap();
        assert!(err.is_builder());
    }
}
