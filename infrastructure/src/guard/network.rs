//! Network guard: URL validation and SSRF protection
//!
//! [`NetworkGuard::validate`] is the only way to obtain a [`ValidatedUrl`],
//! and the fetch pipeline only issues requests for a `ValidatedUrl`. A
//! validated URL carries the socket addresses that were checked so the HTTP
//! client can be pinned to them.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use reqwest::Url;
use tracing::{debug, warn};
use warden_domain::{Capability, GuardPolicy};

use super::GuardError;

/// A URL that passed scheme, host and address checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
    addrs: Vec<SocketAddr>,
}

impl ValidatedUrl {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host as written in the URL (IPv6 without brackets)
    pub fn host(&self) -> &str {
        host_of(&self.url)
    }

    /// Addresses the host resolved to at validation time
    pub fn resolved(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Whether the host is a domain name, as opposed to a literal IP
    pub fn is_domain(&self) -> bool {
        self.host().parse::<IpAddr>().is_err()
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

pub struct NetworkGuard;

impl NetworkGuard {
    /// Parse and validate a URL, resolving its host.
    ///
    /// Fails closed: a host that does not resolve is rejected, and a host
    /// with any private address among its resolutions is rejected.
    pub async fn validate(raw: &str) -> Result<ValidatedUrl, GuardError> {
        let url = Url::parse(raw).map_err(|e| GuardError::InvalidUrl(format!("{}: {}", raw, e)))?;
        Self::validate_url(url).await
    }

    /// Validate an already-parsed URL (used for redirect targets)
    pub async fn validate_url(url: Url) -> Result<ValidatedUrl, GuardError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(GuardError::UnsupportedScheme(other.to_string())),
        }

        let port = url
            .port_or_known_default()
            .ok_or_else(|| GuardError::InvalidUrl(url.to_string()))?;

        let host = host_of(&url);
        if host.is_empty() {
            return Err(GuardError::InvalidUrl(format!("{}: missing host", url)));
        }

        let addrs = match host.parse::<IpAddr>() {
            Ok(ip) => vec![SocketAddr::new(ip, port)],
            Err(_) => {
                let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
                    .await
                    .map_err(|e| GuardError::Unresolved(format!("{}: {}", host, e)))?
                    .collect();
                if resolved.is_empty() {
                    return Err(GuardError::Unresolved(host.to_string()));
                }
                resolved
            }
        };

        if let Some(private) = addrs.iter().find(|a| is_private_ip(a.ip())) {
            warn!(url = %url, address = %private.ip(), "Rejected URL targeting private address");
            return Err(GuardError::PrivateAddress(format!(
                "{} resolves to {}",
                host_of(&url),
                private.ip()
            )));
        }

        debug!(url = %url, addresses = addrs.len(), "URL validated");
        Ok(ValidatedUrl { url, addrs })
    }

    /// Suffix match of the URL host against a domain allow-list.
    ///
    /// `example.com` allows `example.com` and any subdomain. A literal-IP
    /// host is allowed only if the exact IP string is listed. An empty
    /// allow-list allows everything.
    pub fn is_domain_allowed(url: &Url, allow_list: &[String]) -> bool {
        if allow_list.is_empty() {
            return true;
        }

        let host = host_of(url);
        if host.is_empty() {
            return false;
        }

        if host.parse::<IpAddr>().is_ok() {
            return allow_list.iter().any(|entry| {
                let entry = entry.trim();
                let entry = entry
                    .strip_prefix('[')
                    .and_then(|e| e.strip_suffix(']'))
                    .unwrap_or(entry);
                entry == host
            });
        }

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        allow_list.iter().any(|entry| {
            let entry = entry
                .trim()
                .trim_start_matches("*.")
                .trim_start_matches('.')
                .trim_end_matches('.')
                .to_ascii_lowercase();
            !entry.is_empty()
                && (host == entry
                    || host
                        .strip_suffix(entry.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
    }

    /// Validate and then apply the domain allow-list of a network policy
    pub async fn check(raw: &str, policy: &GuardPolicy) -> Result<ValidatedUrl, GuardError> {
        if !policy.enabled {
            return Err(GuardError::Disabled(Capability::Network));
        }
        let validated = Self::validate(raw).await?;
        Self::check_allowed(&validated, policy)?;
        Ok(validated)
    }

    /// Allow-list half of [`check`](Self::check), for already-validated hops
    pub fn check_allowed(url: &ValidatedUrl, policy: &GuardPolicy) -> Result<(), GuardError> {
        if !Self::is_domain_allowed(url.url(), &policy.allow_list) {
            warn!(host = %url.host(), "Host not in domain allow-list");
            return Err(GuardError::DomainNotAllowed(url.host().to_string()));
        }
        Ok(())
    }
}

fn host_of(url: &Url) -> &str {
    let host = url.host_str().unwrap_or("");
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Loopback, private, link-local, unique-local or otherwise non-public
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_v4(mapped);
    }
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_unique_local()
        || ip.is_unicast_link_local()
        || ip.is_multicast()
}
