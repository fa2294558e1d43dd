//! Request metadata helpers.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::{IpAddr, SocketAddr};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client address for per-client accounting.
///
/// The peer socket is authoritative. The first `x-forwarded-for` hop is used
/// only when `trust_forwarded` is set, i.e. behind a proxy that overwrites it.
pub fn client_ip<B>(request: &Request<B>, trust_forwarded: bool) -> Option<IpAddr> {
    let forwarded = trust_forwarded
        .then(|| forwarded_for(request.headers()))
        .flatten();
    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_forwarded_for_wins_when_trusted() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000))));
        assert_eq!(client_ip(&request, true), Some("203.0.113.7".parse().unwrap()));
        assert_eq!(client_ip(&request, false), Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request, true), None);
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 4], 5000))));
        assert_eq!(client_ip(&request, false), Some("192.168.1.4".parse().unwrap()));
    }
}
