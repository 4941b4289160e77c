//! Privacy-preserving visitor identity

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::IpAddr;

use crate::models::UNKNOWN_COUNTRY;

/// Hex SHA-256 of address, user agent and salt. The raw address is never stored.
pub fn hash_visitor(ip: IpAddr, user_agent: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.to_string().as_bytes());
    hasher.update(user_agent.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Country code set by the edge network, or `"Unknown"`
pub fn country_from_headers(headers: &HeaderMap) -> String {
    ["x-vercel-ip-country", "cf-ipcountry"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|code| !code.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_is_deterministic_and_salted() {
        let ip: IpAddr = "203.0.113.1".parse().unwrap();

        let a = hash_visitor(ip, "Mozilla/5.0", "salt-1");
        let b = hash_visitor(ip, "Mozilla/5.0", "salt-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        assert_ne!(a, hash_visitor(ip, "Mozilla/5.0", "salt-2"));
        assert_ne!(a, hash_visitor(ip, "curl/8.0", "salt-1"));
        assert_ne!(
            a,
            hash_visitor("203.0.113.2".parse().unwrap(), "Mozilla/5.0", "salt-1")
        );
    }

    #[test]
    fn test_country_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(country_from_headers(&headers), "Unknown");

        headers.insert("cf-ipcountry", HeaderValue::from_static("DE"));
        assert_eq!(country_from_headers(&headers), "DE");

        headers.insert("x-vercel-ip-country", HeaderValue::from_static("JP"));
        assert_eq!(country_from_headers(&headers), "JP");
    }
}
