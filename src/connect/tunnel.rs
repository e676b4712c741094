use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

use crate::dial::{Conn, Dial, Dialing, DynDial, TcpDial};
use crate::error::{self, TunnelRejected};
use crate::util::split_host_port;

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// Status line prefixes that open a tunnel.
const OK_11: &[u8] = b"HTTP/1.1 200 ";
const OK_10: &[u8] = b"HTTP/1.0 200 ";

// Largest CONNECT response head we are willing to buffer.
const MAX_HEAD_LEN: usize = 8 * 1024;

/// A hop through an HTTP proxy using `CONNECT`.
///
/// The proxy is reached through the inner dialer, or directly over TCP when
/// there is none. Once the proxy answers `200`, the connection is handed
/// back untouched and carries raw bytes to and from the destination.
#[derive(Clone)]
pub struct ConnectHop {
    proxy: String,
    inner: Option<DynDial>,
}

impl ConnectHop {
    /// Wraps `inner` with a CONNECT hop through the proxy at `proxy`.
    ///
    /// `proxy` may be `host`, `host:port`, `http://host` or
    /// `scheme://host:port`. A missing port defaults to `80`, including for
    /// `https://host`.
    pub fn new(proxy: &str, inner: Option<Arc<dyn Dial>>) -> crate::Result<ConnectHop> {
        Ok(ConnectHop {
            proxy: normalize(proxy)?,
            inner,
        })
    }

    /// The `host:port` this hop connects to.
    pub fn proxy(&self) -> &str {
        &self.proxy
    }
}

impl fmt::Debug for ConnectHop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectHop")
            .field("proxy", &self.proxy)
            .field("tunneled", &self.inner.is_some())
            .finish()
    }
}

impl Dial for ConnectHop {
    fn dial(&self, _network: &str, addr: &str) -> Dialing {
        let proxy = self.proxy.clone();
        let inner = self.inner.clone();
        let dst = addr.to_owned();
        Box::pin(async move {
            let host = match split_host_port(&dst) {
                Some((host, _)) => host.to_owned(),
                None => {
                    return Err(error::builder(format!(
                        "invalid tunnel destination {dst:?}"
                    )))
                }
            };

            let conn = match inner {
                Some(inner) => inner.dial("tcp", &proxy).await?,
                None => TcpDial.dial("tcp", &proxy).await?,
            };

            tunnel(conn, &dst, &host).await
        })
    }
}

fn normalize(proxy: &str) -> crate::Result<String> {
    let parts = proxy.split(':').collect::<Vec<_>>();
    let (host, port) = match parts[..] {
        [host] => (host, "80"),
        [scheme, host] if scheme == "http" || scheme == "https" => {
            (host.trim_start_matches('/'), "80")
        }
        [host, port] => (host, port),
        [_, host, port] => (host.trim_start_matches('/'), port),
        _ => return Err(error::bad_proxy_address(proxy)),
    };

    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(error::bad_proxy_address(proxy));
    }

    Ok(format!("{host}:{port}"))
}

pub(crate) async fn tunnel(mut conn: Conn, dst: &str, host: &str) -> crate::Result<Conn> {
    let buf = format!(
        "\
         CONNECT {dst} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {USER_AGENT}\r\n\
         Proxy-Connection: Keep-Alive\r\n\
         \r\n\
         "
    );

    log::debug!("sending connection information; address={dst}");
    conn.write_all(buf.as_bytes())
        .await
        .map_err(error::connect)?;
    conn.flush().await.map_err(error::connect)?;

    log::trace!("waiting for response; address={dst}");
    let mut reader = BufReader::new(conn);
    read_head(&mut reader).await?;

    log::debug!("all good; address={dst}");
    // anything buffered past the head belongs to the destination
    Ok(Box::new(reader))
}

async fn read_head<R>(reader: &mut R) -> crate::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut total = 0;

    let within = read_line(reader, &mut line, total).await?;
    // a rejection keeps its bytes even when the cap cut the line short
    if !line.starts_with(OK_11) && !line.starts_with(OK_10) {
        return Err(error::tunnel(TunnelRejected { head: line }));
    }
    if !within {
        return Err(error::tunnel(HeadTooLarge));
    }
    if !line.ends_with(b"\n") {
        return Err(error::tunnel_eof());
    }

    loop {
        total += line.len();
        line.clear();
        if !read_line(reader, &mut line, total).await? {
            return Err(error::tunnel(HeadTooLarge));
        }
        if !line.ends_with(b"\n") {
            return Err(error::tunnel_eof());
        }
        if line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
    }
}

/// Reads up to and including the next `\n`, never letting the whole head
/// grow past `MAX_HEAD_LEN`.
///
/// Returns `false` when the cap was reached before the line ended.
async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>, total: usize) -> crate::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    if total >= MAX_HEAD_LEN {
        return Ok(false);
    }

    let limit = (MAX_HEAD_LEN - total) as u64;
    let n = (&mut *reader)
        .take(limit)
        .read_until(b'\n', line)
        .await
        .map_err(error::connect)?;

    if n == 0 {
        return Err(error::tunnel_eof());
    }
    Ok(line.ends_with(b"\n") || (n as u64) < limit)
}

#[derive(Debug)]
struct HeadTooLarge;

impl fmt::Display for HeadTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "proxy response head exceeds {MAX_HEAD_LEN} bytes")
    }
}

impl std::error::Error for HeadTooLarge {}
