//! URL validation for synthesized-audio downloads (SSRF protection)
//!
//! Synthesis providers may answer with a URL to fetch the audio from. Before
//! following it the URL must:
//! - Use `http` or `https`
//! - Carry no embedded credentials
//! - Not point at (or resolve to) private, loopback, link-local or metadata addresses
//!
//! Private addresses can be allowed for local development and tests.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    SchemeNotAllowed(String),

    #[error("URL must not embed credentials")]
    CredentialsNotAllowed,

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL points to private/internal IP address: {0}")]
    PrivateIpDetected(IpAddr),

    #[error("Failed to resolve hostname: {0}")]
    DnsResolutionFailed(String),
}

/// Checks if an IPv4 address is private/internal
///
/// Covers loopback, RFC 1918, link-local (incl. cloud metadata 169.254.169.254),
/// broadcast, unspecified, documentation, CGNAT (100.64.0.0/10) and
/// benchmarking (198.18.0.0/15) ranges.
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        || (a == 100 && (b & 0xC0) == 64)
        || (a == 198 && (b == 18 || b == 19))
}

/// Checks if an IPv6 address is private/internal
///
/// Covers loopback, unspecified, link-local (fe80::/10), unique local
/// (fc00::/7), documentation (2001:db8::/32) and IPv4-mapped private addresses.
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    if segments[0] & 0xFFC0 == 0xFE80
        || segments[0] & 0xFE00 == 0xFC00
        || (segments[0] == 0x2001 && segments[1] == 0x0DB8)
    {
        return true;
    }
    ip.to_ipv4_mapped().is_some_and(|v4| is_private_ipv4(&v4))
}

/// Checks if an IP address is private/internal
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// Validates an audio download URL returned by a synthesis provider.
///
/// Domain names are resolved and every resolved address is checked, so a
/// public-looking name pointing at an internal address is rejected too.
///
/// # Arguments
/// * `url` - The URL string to validate
/// * `allow_private` - Skip the private-address checks (development only)
///
/// # Example
/// ```rust,no_run
/// use voxchat::utils::url_validation::validate_audio_url;
///
/// # async fn run() {
/// assert!(validate_audio_url("https://cdn.example.com/a.wav", false).await.is_ok());
/// assert!(validate_audio_url("http://169.254.169.254/latest", false).await.is_err());
/// assert!(validate_audio_url("http://127.0.0.1:8080/a.wav", true).await.is_ok());
/// # }
/// ```
pub async fn validate_audio_url(url: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "https" && scheme != "http" {
        return Err(UrlValidationError::SchemeNotAllowed(scheme.to_string()));
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(UrlValidationError::CredentialsNotAllowed);
    }

    let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;
    if allow_private {
        return Ok(parsed);
    }

    let domain = match host {
        Host::Ipv4(ip) => return check_ip(IpAddr::V4(ip), url).map(|_| parsed),
        Host::Ipv6(ip) => return check_ip(IpAddr::V6(ip), url).map(|_| parsed),
        Host::Domain(domain) => domain.to_string(),
    };

    let port = parsed.port_or_known_default().unwrap_or(443);
    let addrs: Vec<_> = tokio::net::lookup_host((domain.as_str(), port))
        .await
        .map_err(|e| UrlValidationError::DnsResolutionFailed(format!("{domain}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(UrlValidationError::DnsResolutionFailed(format!(
            "No addresses found for {domain}"
        )));
    }

    for addr in addrs {
        check_ip(addr.ip(), url)?;
    }

    Ok(parsed)
}

fn check_ip(ip: IpAddr, url: &str) -> Result<(), UrlValidationError> {
    if is_private_ip(&ip) {
        warn!(
            url = %url,
            resolved_ip = %ip,
            "Audio URL points to private IP address (SSRF protection)"
        );
        return Err(UrlValidationError::PrivateIpDetected(ip));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ipv4_ranges() {
        for ip in [
            [127, 0, 0, 1],
            [10, 1, 2, 3],
            [172, 16, 0, 1],
            [192, 168, 1, 1],
            [169, 254, 169, 254],
            [0, 0, 0, 0],
            [255, 255, 255, 255],
            [100, 64, 0, 1],
            [198, 18, 0, 1],
            [203, 0, 113, 5],
        ] {
            assert!(is_private_ipv4(&Ipv4Addr::from(ip)), "{ip:?} should be private");
        }
    }

    #[test]
    fn test_public_ipv4() {
        assert!(!is_private_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(172, 32, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(100, 128, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(47, 98, 1, 1)));
    }

    #[test]
    fn test_private_ipv6() {
        assert!(is_private_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_private_ipv6(&Ipv6Addr::UNSPECIFIED));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFE80, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFD00, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv6Addr::new(0x2001, 0x0DB8, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped()));
        assert!(!is_private_ipv6(&Ipv6Addr::new(
            0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888
        )));
    }

    #[tokio::test]
    async fn test_rejects_bad_scheme_and_format() {
        assert!(matches!(
            validate_audio_url("not-a-url", false).await,
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_audio_url("file:///etc/passwd", false).await,
            Err(UrlValidationError::SchemeNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_credentials() {
        assert!(matches!(
            validate_audio_url("https://user:pw@cdn.example.com/a.wav", true).await,
            Err(UrlValidationError::CredentialsNotAllowed)
        ));
    }

    #[tokio::test]
    async fn test_rejects_private_raw_ips() {
        assert!(matches!(
            validate_audio_url("http://169.254.169.254/latest/meta-data", false).await,
            Err(UrlValidationError::PrivateIpDetected(_))
        ));
        assert!(matches!(
            validate_audio_url("http://[::1]:8080/a.wav", false).await,
            Err(UrlValidationError::PrivateIpDetected(_))
        ));
    }

    #[tokio::test]
    async fn test_public_raw_ip_is_allowed() {
        assert!(validate_audio_url("http://8.8.8.8/a.wav", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_localhost_rejected_unless_allowed() {
        let result = validate_audio_url("http://localhost:8080/a.wav", false).await;
        assert!(
            matches!(
                result,
                Err(UrlValidationError::PrivateIpDetected(_))
                    | Err(UrlValidationError::DnsResolutionFailed(_))
            ),
            "Expected rejection, got {:?}",
            result
        );
        assert!(validate_audio_url("http://localhost:8080/a.wav", true).await.is_ok());
        assert!(validate_audio_url("http://127.0.0.1:8080/a.wav", true).await.is_ok());
    }
}
