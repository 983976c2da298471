use admission_core_types::UNKNOWN_CLIENT_IP;

use crate::context::ProtoRequest;

pub const FORWARDED_FOR: &str = "X-Forwarded-For";
pub const REAL_IP: &str = "X-Real-IP";

/// First `X-Forwarded-For` entry, else `X-Real-IP`, else the peer address, else `unknown`.
pub fn client_ip(req: &dyn ProtoRequest) -> String {
    let forwarded = req.header(FORWARDED_FOR).and_then(|value| {
        value
            .split(',')
            .map(str::trim)
            .find(|entry| !entry.is_empty())
            .map(str::to_string)
    });
    if let Some(ip) = forwarded {
        return ip;
    }
    if let Some(ip) = req
        .header(REAL_IP)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        return ip;
    }
    req.remote_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}
