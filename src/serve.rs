//! Development server rendering pages on demand.
//!
//! Built on `tiny_http`:
//!
//! - Request path resolved to the page whose `Path` matches (drafts hidden)
//! - Query string passed to the page as template variables
//! - `/sitemap.xml` generated from the current registries
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Main Thread   │
//! │  (HTTP Server)  │
//! └────────┬────────┘
//!          │
//!          ▼
//!   GET /blog?x=1 ── page_by_path("/blog") ── render(page, {x: "1"})
//!   GET /sitemap.xml ─────────────────────── Sitemap::from_registries
//!   otherwise ───────────────────────────── 404
//! ```

use crate::{config::RenderConfig, log};
use anyhow::{Context, Result};
use std::{io::Cursor, net::SocketAddr, sync::Arc};
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tola_render::{RenderError, Renderer, Variables, minify::HTML_MIME, sitemap::{SITEMAP_MIME, Sitemap}};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the development server.
///
/// The server blocks until Ctrl+C is received.
pub fn serve_site(config: &RenderConfig, renderer: Renderer) -> Result<()> {
    let interface: std::net::IpAddr = config.serve.interface.parse()?;
    let base_port = config.serve.port;

    let (server, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);
    if config.render.debug {
        log!("reload"; "debug mode, templates reload on every request");
    }

    let base_url = format!("http://{addr}");
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &renderer, config, &base_url) {
            log!("error"; "request error: {e:#}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: std::net::IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// What a request resolves to.
#[derive(Debug, PartialEq)]
enum Route {
    Sitemap,
    Page { id: String, variables: Variables },
    NotFound,
}

/// Resolve a raw request URL against the current page registry.
fn route(url: &str, renderer: &Renderer) -> Route {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let path = urlencoding::decode(path)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| path.to_owned());

    if path == "/sitemap.xml" {
        return Route::Sitemap;
    }

    let registries = renderer.registries();
    let normalized = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    match registries.page_by_path(normalized) {
        Some((id, _)) => Route::Page {
            id: id.to_owned(),
            variables: parse_query(query),
        },
        None => Route::NotFound,
    }
}

/// `a=1&b=x%20y` -> `{a: "1", b: "x y"}`. Later keys win.
fn parse_query(query: &str) -> Variables {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            (!key.is_empty()).then(|| (key, decode_component(value).into()))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(s)
}

/// Route `url`, reloading once on a miss in debug mode so pages added
/// since the last render are found.
///
/// Hits are not reloaded here; rendering reloads in debug mode anyway.
fn resolve(url: &str, renderer: &Renderer, debug: bool) -> Result<Route> {
    let resolved = route(url, renderer);
    if debug && resolved == Route::NotFound {
        renderer.reload()?;
        return Ok(route(url, renderer));
    }
    Ok(resolved)
}

/// Handle a single HTTP request.
fn handle_request(request: Request, renderer: &Renderer, config: &RenderConfig, base_url: &str) -> Result<()> {
    let debug = config.render.debug;

    match resolve(request.url(), renderer, debug)? {
        Route::Sitemap => {
            if debug {
                renderer.reload()?;
            }
            let sitemap = Sitemap::from_registries(&renderer.registries(), base_url);
            let body = sitemap.to_bytes(config.render.minify)?;
            respond(request, 200, SITEMAP_MIME, body)
        }
        Route::Page { id, variables } => {
            let mut html = Vec::new();
            match renderer.render(&mut html, &id, variables) {
                Ok(()) => respond(request, 200, HTML_MIME, html),
                // removed since routing, picked up by the render's reload
                Err(RenderError::NotFound { .. }) => {
                    respond(request, 404, "text/plain", b"404 Not Found".to_vec())
                }
                Err(e) => {
                    log!("error"; "{id}: {e}");
                    respond(request, 500, "text/plain", b"500 Internal Server Error".to_vec())
                }
            }
        }
        Route::NotFound => respond(request, 404, "text/plain", b"404 Not Found".to_vec()),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn respond(request: Request, status: u16, mime: &str, body: Vec<u8>) -> Result<()> {
    let content_type = format!("{mime}; charset=utf-8");
    let header = Header::from_bytes("Content-Type", content_type)
        .map_err(|_| anyhow::anyhow!("invalid content type `{mime}`"))?;
    let len = body.len();
    let response = Response::new(StatusCode(status), vec![header], Cursor::new(body), Some(len), None);
    request.respond(response)?;
    Ok(())
}
