//! Client identity used as the rate limit key.

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

use crate::rate_limiter::ANONYMOUS_KEY;

/// Derive the rate limit key for a request.
///
/// Preference order: first entry of `X-Forwarded-For`, then `X-Real-IP`,
/// then the peer address. Every candidate must parse as an IP address;
/// the canonical form is returned so equivalent spellings share a bucket,
/// including IPv4-mapped IPv6 addresses.
pub fn client_identifier(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    forwarded_for(headers)
        .or_else(|| header_ip(headers, "x-real-ip"))
        .or_else(|| remote.map(|addr| addr.ip()))
        .map(|ip| ip.to_canonical().to_string())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

/// [`client_identifier`] for a full request, reading the peer address from
/// the connection info extension when the server provides it.
pub fn request_client_identifier(request: &Request) -> String {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_identifier(request.headers(), remote)
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get("x-forwarded-for")?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
