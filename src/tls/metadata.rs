use super::Address;
use crate::{
    error::{Error, Result},
    zone::Zone,
};
use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::{
    extensions::GeneralName,
    prelude::{FromDer, X509Certificate},
    time::ASN1Time,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Certificate information collected for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateRecord {
    /// Host part of the normalized target
    pub domain_name: String,
    /// Port part of the normalized target
    pub access_port: String,
    /// Resolved addresses, empty when the lookup failed
    #[serde(rename = "IPAddresses")]
    pub ip_addresses: Vec<IpAddr>,
    /// Issuer distinguished name of the leaf certificate
    pub issuer: String,
    /// Subject common name of the leaf certificate
    pub common_name: String,
    /// DNS names, email addresses, IP addresses and URIs, in that order
    #[serde(rename = "SANs")]
    pub sans: Vec<String>,
    pub not_before: DateTime<FixedOffset>,
    pub not_after: DateTime<FixedOffset>,
    pub current_time: DateTime<FixedOffset>,
    /// Whole days until expiry (negative if expired)
    pub days_left: i64,
}

impl CertificateRecord {
    /// Build a record from the DER-encoded leaf certificate of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if the certificate cannot be parsed or
    /// carries a validity period outside the representable range.
    pub fn from_der(
        address: &Address,
        ip_addresses: Vec<IpAddr>,
        cert_der: &[u8],
        now: DateTime<Utc>,
        zone: Zone,
    ) -> Result<Self> {
        let invalid = |reason: String| Error::Certificate {
            host: address.host().to_string(),
            reason,
        };

        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| invalid(format!("failed to parse certificate: {e}")))?;

        let validity = cert.validity();
        let not_before = to_utc(&validity.not_before)
            .ok_or_else(|| invalid("invalid certificate start timestamp".to_string()))?;
        let not_after = to_utc(&validity.not_after)
            .ok_or_else(|| invalid("invalid certificate expiry timestamp".to_string()))?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            domain_name: address.host().to_string(),
            access_port: address.port().to_string(),
            ip_addresses,
            issuer: cert.issuer().to_string(),
            common_name,
            sans: subject_alternative_names(&cert),
            not_before: zone.convert(not_before),
            not_after: zone.convert(not_after),
            current_time: zone.convert(now).trunc_subsecs(0),
            days_left: days_left(not_after, now),
        })
    }
}

/// Whole days between `now` and `not_after`, rounded toward negative infinity
#[must_use]
pub fn days_left(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn to_utc(time: &ASN1Time) -> Option<DateTime<Utc>> {
    let raw = time.to_datetime();
    DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
}

fn subject_alternative_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let Ok(Some(ext)) = cert.subject_alternative_name() else {
        return Vec::new();
    };

    let mut dns = Vec::new();
    let mut emails = Vec::new();
    let mut ips = Vec::new();
    let mut uris = Vec::new();

    for name in &ext.value.general_names {
        match name {
            GeneralName::DNSName(d) => dns.push((*d).to_string()),
            GeneralName::RFC822Name(e) => emails.push((*e).to_string()),
            GeneralName::IPAddress(bytes) => {
                if let Some(ip) = ip_from_bytes(bytes) {
                    ips.push(ip.to_string());
                }
            }
            GeneralName::URI(u) => uris.push((*u).to_string()),
            _ => {}
        }
    }

    let mut sans = Vec::with_capacity(dns.len() + emails.len() + ips.len() + uris.len());
    sans.extend(dns);
    sans.extend(emails);
    sans.extend(ips);
    sans.extend(uris);
    sans
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    <[u8; 16]>::try_from(bytes)
        .ok()
        .map(|v6| IpAddr::V6(Ipv6Addr::from(v6)))
}
