use actix_web::dev::ServiceRequest;
use actix_web::http::header;

/// Source address recorded when the peer address cannot be determined
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Client address of a request.
///
/// Forwarding headers are only honoured when the service sits behind a
/// trusted proxy; otherwise the socket peer is used.
pub fn client_address(req: &ServiceRequest, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

/// `User-Agent` header, lossily decoded
pub fn user_agent(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
