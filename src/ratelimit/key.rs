//! Rate limit key derivation.

use axum::http::HeaderMap;

use super::policy::{Category, Tier};

/// Client IP header set by the edge proxy. Only trust it behind that proxy.
pub const DEFAULT_TRUSTED_IP_HEADER: &str = "cf-connecting-ip";
/// Bucket shared by every caller without an identifying header.
pub const UNKNOWN_CLIENT: &str = "unknown";

const REAL_IP_HEADER: &str = "x-real-ip";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// A key that identifies one caller's quota for one feature and tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimitKey {
    /// Category and tier prefix
    pub prefix: String,
    /// Client identity (usually an IP address)
    pub client: String,
}

impl LimitKey {
    /// Build a key from request headers, trusting `trusted_header` first.
    pub fn from_headers(headers: &HeaderMap, prefix: &str, trusted_header: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            client: client_identity(headers, trusted_header),
        }
    }
}

impl std::fmt::Display for LimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.prefix, self.client)
    }
}

/// Prefix giving each category and tier an independent quota.
pub fn key_prefix(category: Category, tier: Tier) -> String {
    format!("{}:{}", category, tier.as_str())
}

/// Derive a rate limit key using the default trusted proxy header.
pub fn derive_key(headers: &HeaderMap, prefix: &str) -> String {
    LimitKey::from_headers(headers, prefix, DEFAULT_TRUSTED_IP_HEADER).to_string()
}

/// First usable client identity: trusted proxy header, `x-real-ip`, then the
/// first `x-forwarded-for` hop.
fn client_identity(headers: &HeaderMap, trusted_header: &str) -> String {
    let single = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    single(trusted_header)
        .or_else(|| single(REAL_IP_HEADER))
        .or_else(|| {
            single(FORWARDED_FOR_HEADER)
                .and_then(|list| list.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
