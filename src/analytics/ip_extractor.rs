//! Client IP extraction from HTTP headers with trust validation
//!
//! The extracted address only feeds the visitor hash and is never stored.
//! - Cloudflare mode reads CF-Connecting-IP
//! - Standard and Vercel modes walk X-Forwarded-For right to left, skipping
//!   configured proxy networks, then fall back to X-Real-IP and
//!   CF-Connecting-IP
//! - Without usable headers the socket address is used

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

use crate::config::{TrustedProxyMode, VisitorConfig};

/// Used when neither headers nor the socket yield an address
pub const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Extract the client IP address from HTTP headers
///
/// `socket_addr` is the peer address when the server knows it.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<IpAddr>,
    config: &VisitorConfig,
) -> IpAddr {
    let fallback = socket_addr.unwrap_or(FALLBACK_IP);

    match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            fallback
        }),
        TrustedProxyMode::Standard | TrustedProxyMode::Vercel => {
            extract_from_x_forwarded_for(headers, config)
                .or_else(|| extract_x_real_ip(headers))
                .or_else(|| extract_cloudflare_ip(headers))
                .unwrap_or(fallback)
        }
        TrustedProxyMode::None => fallback,
    }
}

fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn extract_x_real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Rightmost X-Forwarded-For hop that is not a trusted proxy.
///
/// With no trusted networks configured this is the leftmost entry, which is
/// what a single edge proxy (Vercel, a lone nginx) reports as the client.
fn extract_from_x_forwarded_for(headers: &HeaderMap, config: &VisitorConfig) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    let ips: Vec<IpAddr> = xff
        .split(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .collect();

    if config.trusted_proxies.is_empty() {
        return ips.first().copied();
    }

    ips.iter()
        .rev()
        .find(|ip| !config.trusted_proxies.iter().any(|net| net.contains(*ip)))
        .or_else(|| ips.first())
        .copied()
}
