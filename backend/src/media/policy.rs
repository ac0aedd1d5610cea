//! Source URL checks applied before any network or process activity.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use reqwest::Url;

use super::MediaError;

/// Parse and vet a source URL.
///
/// Only `http`/`https` are accepted. Unless `allow_private_hosts` is set,
/// `localhost` and IP literals in loopback, private, link-local, reserved
/// or unique-local ranges (including IPv4 embedded in IPv6) are refused.
/// Host names are not resolved here, and redirects followed by the
/// transcoder are not re-checked.
pub fn validate_source_url(raw: &str, allow_private_hosts: bool) -> Result<Url, MediaError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| MediaError::InvalidInput(format!("not an absolute URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(MediaError::InvalidInput(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| MediaError::InvalidInput("URL has no host".to_string()))?;

    if !allow_private_hosts && is_internal_host(host) {
        return Err(MediaError::InvalidInput(format!(
            "host {host} is not publicly routable"
        )));
    }

    Ok(url)
}

fn is_internal_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let lower = host.to_ascii_lowercase();
    if lower == "localhost" || lower.ends_with(".localhost") {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_internal_v4(ip),
        Ok(IpAddr::V6(ip)) => is_internal_v6(ip),
        Err(_) => false,
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved, includes broadcast
        || a >= 240
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let segments = ip.segments();

    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // ::a.b.c.d compatible and ::ffff:a.b.c.d mapped
    if let Some(v4) = ip.to_ipv4() {
        return is_internal_v4(v4);
    }
    // 64:ff9b::/96 NAT64
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [.., hi, lo] = segments;
        return is_internal_v4(Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo)));
    }

    // fc00::/7 unique local
    (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (segments[0] & 0xffc0) == 0xfe80
}
