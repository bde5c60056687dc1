//! HTTP response handlers.

use std::fs;
use std::io;
use std::path::Path;

use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::delivery::Asset;
use crate::utils::mime::{self, types::PLAIN};

/// Respond with a versioned file and far-future cache headers.
pub fn respond_asset(request: Request, asset: &Asset) -> io::Result<()> {
    let headers = asset.headers().map(|(name, value)| make_header(name, &value));

    if is_head_request(&request) {
        // Content-Length on an empty response is kept for HEAD
        let mut response = Response::empty(StatusCode(200));
        for header in headers {
            response.add_header(header);
        }
        return request.respond(response);
    }

    let mut response = Response::from_data(asset.bytes.to_vec());
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)
}

/// Respond with a static file from the fallback directory.
pub fn respond_file(request: Request, path: &Path) -> io::Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        let len = fs::metadata(path)?.len();
        let response = Response::empty(StatusCode(200))
            .with_header(make_header("Content-Type", content_type))
            .with_header(make_header("Content-Length", &len.to_string()));
        return request.respond(response);
    }

    let body = fs::read(path)?;
    send_body(request, 200, content_type, body)
}

pub fn respond_not_found(request: Request) -> io::Result<()> {
    if is_head_request(&request) {
        let response = Response::empty(StatusCode(404)).with_header(make_header("Content-Type", PLAIN));
        return request.respond(response);
    }
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> io::Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", PLAIN))
        .with_header(make_header("Allow", "GET, HEAD"));
    request.respond(response)
}

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> io::Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)
}

/// Header from known-valid ASCII parts.
fn make_header(key: &str, value: &str) -> Header {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).unwrap()
}
