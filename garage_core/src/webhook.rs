//! Webhook adapter: HTTP POST with a JSON body to an external report.
//!
//! Classification is a pure function over method, URL, content type and
//! body so it can be tested (and fuzzed) without a socket. The listener is
//! a `tiny_http` server on its own thread that only ever talks to the
//! controller through a `DoorHandle`.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde_json::Value;
use serde_json_path::JsonPath;
use tiny_http::{Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::config::WebhookCfg;
use crate::error::{GarageError, WebhookError};
use crate::runtime::DoorHandle;
use crate::signal::{json_truthy, position_from_signal};
use crate::state::TargetState;

/// Larger bodies are refused with 500.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug)]
pub struct WebhookFilter {
    path: String,
    json_path: JsonPath,
    json_path_src: String,
    value_reverse: bool,
}

impl WebhookFilter {
    pub fn new(cfg: &WebhookCfg) -> Result<Self, GarageError> {
        let json_path = JsonPath::parse(&cfg.json_path).map_err(|e| {
            GarageError::Config(format!("webhook json_path {:?}: {e}", cfg.json_path))
        })?;
        Ok(Self {
            path: cfg.path.clone(),
            json_path,
            json_path_src: cfg.json_path.clone(),
            value_reverse: cfg.value_reverse,
        })
    }

    /// Decide what a request reports, or why it is refused.
    ///
    /// Checks run path, method, content type, then body; the first failure
    /// wins.
    pub fn classify(
        &self,
        method: &str,
        url: &str,
        content_type: Option<&str>,
        body: &mut dyn Read,
    ) -> Result<TargetState, WebhookError> {
        let path = url.split_once('?').map_or(url, |(p, _)| p);
        if path != self.path {
            return Err(WebhookError::NotFound(path.to_string()));
        }
        if method != "POST" {
            return Err(WebhookError::MethodNotAllowed(method.to_string()));
        }
        if !content_type.is_some_and(is_json_media_type) {
            return Err(WebhookError::UnsupportedMediaType(
                content_type.map(str::to_string),
            ));
        }

        let mut buf = Vec::new();
        body.take(MAX_BODY_BYTES + 1)
            .read_to_end(&mut buf)
            .map_err(|e| WebhookError::Body(e.to_string()))?;
        if buf.len() as u64 > MAX_BODY_BYTES {
            return Err(WebhookError::Body(format!(
                "body exceeds {MAX_BODY_BYTES} bytes"
            )));
        }
        let doc: Value = serde_json::from_slice(&buf)?;
        let value = self
            .json_path
            .query(&doc)
            .first()
            .ok_or_else(|| WebhookError::Missing(self.json_path_src.clone()))?;
        Ok(position_from_signal(json_truthy(value), self.value_reverse))
    }
}

fn is_json_media_type(ct: &str) -> bool {
    ct.split(';')
        .next()
        .is_some_and(|m| m.trim().eq_ignore_ascii_case("application/json"))
}

/// Running listener. Dropping it stops the accept loop and joins the thread.
pub struct WebhookServer {
    server: Arc<Server>,
    addr: Option<SocketAddr>,
    join_handle: Option<JoinHandle<()>>,
}

impl WebhookServer {
    pub fn spawn(cfg: &WebhookCfg, handle: DoorHandle) -> Result<Self, GarageError> {
        let filter = WebhookFilter::new(cfg)?;
        let bind = format!("{}:{}", cfg.bind, cfg.port);
        let server = Server::http(&bind)
            .map_err(|e| GarageError::Config(format!("webhook bind {bind}: {e}")))?;
        let server = Arc::new(server);
        let addr = server.server_addr().to_ip();
        info!(addr = ?addr, path = %cfg.path, "webhook listening");

        let srv = server.clone();
        let join_handle = std::thread::spawn(move || {
            for mut request in srv.incoming_requests() {
                let method = request.method().to_string();
                let url = request.url().to_string();
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.as_str().to_string());
                let status = match filter.classify(
                    &method,
                    &url,
                    content_type.as_deref(),
                    request.as_reader(),
                ) {
                    Ok(observed) => match handle.report_external(observed) {
                        Ok(()) => {
                            debug!(observed = %observed, "webhook report accepted");
                            200
                        }
                        Err(e) => {
                            warn!(error = %e, "webhook report dropped");
                            500
                        }
                    },
                    Err(e) => {
                        debug!(method = %method, url = %url, error = %e, "webhook request rejected");
                        e.status()
                    }
                };
                if let Err(e) = request.respond(Response::empty(StatusCode(status))) {
                    debug!(error = %e, "webhook response not delivered");
                }
            }
            tracing::trace!("webhook thread exiting");
        });

        Ok(Self {
            server,
            addr,
            join_handle: Some(join_handle),
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.addr.map(|a| a.port())
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(h) = self.join_handle.take() {
            if let Err(e) = h.join() {
                warn!(?e, "webhook thread panicked during shutdown");
            }
        }
    }
}
