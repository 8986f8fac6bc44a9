use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use log::info;

const LOG_TARGET: &str = "trickle::access";

/// Logs one line per inbound request before handing it on.
pub async fn log_request(req: Request, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = header_str(&req, header::USER_AGENT);
    let host = req
        .uri()
        .authority()
        .map(|authority| authority.as_str())
        .unwrap_or_else(|| header_str(&req, header::HOST));

    info!(
        target: LOG_TARGET,
        "| {} (UserAgent: {}) --> {} {:?} {} {}",
        remote,
        user_agent,
        host,
        req.version(),
        req.method(),
        req.uri()
    );

    next.run(req).await
}

fn header_str(req: &Request, name: header::HeaderName) -> &str {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
