/// Host header allow-list as an Axum middleware.
///
/// The server only binds to loopback, but a page on another origin can still
/// reach it through DNS rebinding: the browser then sends the attacker's
/// hostname in `Host`. Requests whose `Host` is not one of the loopback
/// names for our port are rejected with 403 before any handler runs.
use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use super::{log_api_issue, ErrorResponse};

#[derive(Clone)]
pub struct HostAllowList {
    hosts: Arc<HashSet<String>>,
}

impl HostAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: Arc::new(
                hosts
                    .into_iter()
                    .map(|h| h.as_ref().to_ascii_lowercase())
                    .collect(),
            ),
        }
    }

    /// `127.0.0.1:<port>`, `localhost:<port>` and `[::1]:<port>`.
    pub fn loopback(port: u16) -> Self {
        Self::new([
            format!("127.0.0.1:{}", port),
            format!("localhost:{}", port),
            format!("[::1]:{}", port),
        ])
    }

    pub fn allows(&self, host: &str) -> bool {
        self.hosts.contains(&host.trim().to_ascii_lowercase())
    }
}

/// HTTP/2 requests carry the host in the URI authority instead of a header.
fn request_host(req: &Request) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}

pub async fn host_guard_middleware(
    State(allow): State<HostAllowList>,
    req: Request,
    next: Next,
) -> Response {
    match request_host(&req) {
        Some(host) if allow.allows(&host) => next.run(req).await,
        host => {
            let status = StatusCode::FORBIDDEN;
            log_api_issue(
                status,
                "tafel.api.host_guard",
                format!("Rejected request with Host {:?}", host),
            );
            (
                status,
                Json(ErrorResponse {
                    error: "Forbidden host".to_string(),
                }),
            )
                .into_response()
        }
    }
}
