//! Domain-specific extensions and host resolution.
//!
//! Every extension serves exactly one remote domain. A request is handed to the
//! extension whose domain equals the request host or is a parent of it.

pub mod gemini;
pub mod wikipedia;

use axum::http::{header, HeaderMap, Uri};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    Gemini,
    Wikipedia,
}

impl Extension {
    pub const ALL: [Extension; 2] = [Extension::Gemini, Extension::Wikipedia];

    pub fn domain(self) -> &'static str {
        match self {
            Extension::Gemini => gemini::DOMAIN,
            Extension::Wikipedia => wikipedia::DOMAIN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Extension::Gemini => "gemini",
            Extension::Wikipedia => "wikipedia",
        }
    }

    /// Find the extension serving `host` (port and trailing dot ignored).
    pub fn for_host(host: &str) -> Option<Extension> {
        let host = normalize_host(host);
        Self::ALL.into_iter().find(|ext| {
            let domain = ext.domain();
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Host the client asked for: absolute-form URI authority first, then the `Host` header.
pub fn request_host(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    uri.host().map(str::to_string).or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}
