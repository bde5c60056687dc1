//! Versioned asset delivery.
//!
//! `Delivery` is the transport-independent part: URL in, `Asset` out, or a
//! decline. `AssetServer` wraps it in a small `tiny_http` server that falls
//! back to a static directory on decline.
//!
//! ```text
//! request ──► Delivery::lookup ──hit──► 200 + far-future cache headers
//!                    │
//!                  miss ──► fallback dir ──hit──► 200
//!                                │
//!                              miss ──► 404
//! ```

mod delivery;
mod path;
mod response;

pub use delivery::{Asset, Delivery, MAX_AGE, key_from_url};
pub use path::resolve_path;

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use tiny_http::{Method, Request, Server};

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// HTTP front-end for a `Delivery`.
pub struct AssetServer {
    delivery: Delivery,
    fallback: Option<PathBuf>,
}

impl AssetServer {
    pub fn new(delivery: Delivery, fallback: Option<PathBuf>) -> Self {
        Self { delivery, fallback }
    }

    /// Bind and serve until the process exits.
    pub fn run(self, interface: IpAddr, port: u16) -> io::Result<()> {
        let (server, addr) = bind_with_retry(interface, port)?;
        log!("serve"; "http://{}", addr);
        self.run_on(&server)
    }

    /// Request loop over an already bound server (blocking).
    pub fn run_on(self, server: &Server) -> io::Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .build()
            .map_err(io::Error::other)?;
        let this = Arc::new(self);

        for request in server.incoming_requests() {
            let this = Arc::clone(&this);
            pool.spawn(move || {
                if let Err(e) = this.handle_request(request) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }

    fn handle_request(&self, request: Request) -> io::Result<()> {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return response::respond_method_not_allowed(request);
        }

        if let Some(asset) = self.delivery.lookup(request.url()) {
            return response::respond_asset(request, &asset);
        }

        if let Some(root) = &self.fallback
            && let Some(path) = resolve_path(request.url(), root)
        {
            return response::respond_file(request, &path);
        }

        response::respond_not_found(request)
    }
}

/// Bind to the interface and port, trying the next ports when taken.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> io::Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 asks the OS for a free port; report the real one
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        format!(
            "failed to bind after {MAX_PORT_RETRIES} attempts (ports {base_port}-{}): {detail}",
            base_port.saturating_add(MAX_PORT_RETRIES - 1)
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetClass, AssetIndex, LogicalPath};
    use crate::logger::SilentLog;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::thread;

    fn send(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn start(fallback: Option<PathBuf>) -> SocketAddr {
        let index = AssetIndex::shared();
        index.write().commit(
            AssetClass::Script,
            LogicalPath::new("app.js"),
            "app.1234.js".into(),
            b"alert(1)".to_vec(),
        );
        let delivery = Delivery::new(index, Arc::new(SilentLog));

        let (server, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        thread::spawn(move || {
            let _ = AssetServer::new(delivery, fallback).run_on(&server);
        });
        addr
    }

    #[test]
    fn test_serves_versioned_asset() {
        let addr = start(None);
        let response = send(
            addr,
            "GET /assets/app.1234.js HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Cache-Control: public, max-age=31536000"));
        assert!(response.contains("Content-Type: text/javascript; charset=utf-8"));
        assert!(response.contains("Content-Length: 8"));
        assert!(response.ends_with("alert(1)"));
    }

    #[test]
    fn test_head_has_headers_only() {
        let addr = start(None);
        let response = send(
            addr,
            "HEAD /app.1234.js HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Content-Length: 8"));
        assert!(!response.contains("alert(1)"));
    }

    #[test]
    fn test_miss_falls_back_then_404() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();
        let addr = start(Some(dir.path().to_path_buf()));

        let response = send(addr, "GET /robots.txt HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("User-agent: *"));

        let response = send(addr, "GET /app.js HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 404"));
    }
}
