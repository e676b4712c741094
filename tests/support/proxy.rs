//! Minimal proxies for the integration tests.
//!
//! Both record what they were asked to reach, then relay bytes to it.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
pub struct Proxy {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Proxy {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The raw `CONNECT` heads, or the SOCKS5 targets, received so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    async fn bind() -> (TcpListener, Proxy) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy = Proxy {
            addr: listener.local_addr().unwrap(),
            seen: Arc::default(),
        };
        (listener, proxy)
    }
}

/// An HTTP `CONNECT` proxy answering every tunnel request with `reply`.
///
/// When `reply` is a `200` the tunnel is opened to the requested target.
pub async fn connect(reply: &'static str) -> Proxy {
    let (listener, proxy) = Proxy::bind().await;
    let seen = proxy.seen.clone();

    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let _ = tunnel(sock, reply, seen).await;
            });
        }
    });

    proxy
}

async fn tunnel(
    sock: TcpStream,
    reply: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut sock = BufReader::new(sock);
    let mut head = String::new();
    loop {
        let n = sock.read_line(&mut head).await?;
        if n == 0 || head.ends_with("\r\n\r\n") {
            break;
        }
    }
    seen.lock().unwrap().push(head.clone());

    let target = head
        .strip_prefix("CONNECT ")
        .and_then(|rest| rest.split(' ').next())
        .unwrap_or_default()
        .to_owned();

    let accepted = reply.starts_with("HTTP/1.1 200") || reply.starts_with("HTTP/1.0 200");
    if !accepted {
        sock.write_all(reply.as_bytes()).await?;
        return sock.shutdown().await;
    }

    let mut upstream = TcpStream::connect(&target).await?;
    sock.write_all(reply.as_bytes()).await?;
    tokio::io::copy_bidirectional(&mut sock, &mut upstream).await?;
    Ok(())
}

/// A SOCKS5 proxy accepting unauthenticated `CONNECT` commands.
pub async fn socks5() -> Proxy {
    let (listener, proxy) = Proxy::bind().await;
    let seen = proxy.seen.clone();

    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let _ = socks(sock, seen).await;
            });
        }
    });

    proxy
}

async fn socks(mut sock: TcpStream, seen: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    sock.read_exact(&mut greeting).await?;
    assert_eq!(greeting[0], 5, "socks version");
    let mut methods = vec![0u8; greeting[1] as usize];
    sock.read_exact(&mut methods).await?;
    assert!(methods.contains(&0), "no-auth offered");
    sock.write_all(&[5, 0]).await?;

    let mut request = [0u8; 4];
    sock.read_exact(&mut request).await?;
    assert_eq!(&request[..3], [5u8, 1, 0], "socks connect");

    let host = match request[3] {
        1 => {
            let mut ip = [0u8; 4];
            sock.read_exact(&mut ip).await?;
            Ipv4Addr::from(ip).to_string()
        }
        3 => {
            let len = sock.read_u8().await?;
            let mut name = vec![0u8; len as usize];
            sock.read_exact(&mut name).await?;
            String::from_utf8(name).unwrap()
        }
        4 => {
            let mut ip = [0u8; 16];
            sock.read_exact(&mut ip).await?;
            format!("[{}]", Ipv6Addr::from(ip))
        }
        other => panic!("unexpected address type {other}"),
    };
    let port = sock.read_u16().await?;
    let target = format!("{host}:{port}");
    seen.lock().unwrap().push(target.clone());

    let mut upstream = match TcpStream::connect(&target).await {
        Ok(upstream) => upstream,
        Err(err) => {
            // connection refused
            sock.write_all(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
            return Err(err);
        }
    };
    sock.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
    tokio::io::copy_bidirectional(&mut sock, &mut upstream).await?;
    Ok(())
}
