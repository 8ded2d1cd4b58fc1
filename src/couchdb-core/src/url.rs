//! Pre-flight URL gate and path helpers.

use reqwest::Url;

use crate::error::RequestError;

/// True when `url` is an absolute http(s) URL with a host and a numeric port
/// (if any). No network access.
pub fn is_valid_url(url: &str) -> bool {
    parse_target(url).is_ok()
}

pub(crate) fn parse_target(raw: &str) -> Result<Url, RequestError> {
    let invalid = || RequestError::InvalidUrl(raw.to_string());

    let (scheme, rest) = raw.split_once(':').ok_or_else(invalid)?;
    if !matches!(scheme, "http" | "https") || !rest.starts_with("//") {
        return Err(invalid());
    }

    if !explicit_port_is_valid(&rest[2..]) {
        return Err(invalid());
    }

    let url = Url::parse(raw).map_err(|_| invalid())?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

/// `host:` and `host:0` are rejected here; the url crate would drop the
/// empty port silently.
fn explicit_port_is_valid(after_slashes: &str) -> bool {
    let end = after_slashes
        .find(['/', '?', '#'])
        .unwrap_or(after_slashes.len());
    let authority = &after_slashes[..end];
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    let port = if let Some(bracketed) = host_port.strip_prefix('[') {
        let Some((_, after)) = bracketed.split_once(']') else {
            return false;
        };
        if after.is_empty() {
            return true;
        }
        match after.strip_prefix(':') {
            Some(port) => port,
            None => return false,
        }
    } else {
        match host_port.split_once(':') {
            Some((_, port)) => port,
            None => return true,
        }
    };

    !port.is_empty()
        && port.bytes().all(|b| b.is_ascii_digit())
        && matches!(port.parse::<u32>(), Ok(1..=65535))
}

/// URL rendering safe for logs: any password is masked.
pub(crate) fn redact(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut masked = url.clone();
    // Only fails for cannot-be-a-base URLs, which never pass parse_target.
    let _ = masked.set_password(Some("***"));
    masked.to_string()
}

/// Percent-encode one path segment (database name, document id, attachment name).
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode a document id, keeping the `/` of `_design/` and `_local/` prefixes.
pub fn encode_doc_id(id: &str) -> String {
    for prefix in ["_design/", "_local/"] {
        if let Some(name) = id.strip_prefix(prefix) {
            return format!("{}{}", prefix, encode_segment(name));
        }
    }
    encode_segment(id)
}
