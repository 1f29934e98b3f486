use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

use crate::{
    dns::{
        client::{DnsClient, UdpClient},
        message::{Message, Query, ResourceData, TYPE_A, TYPE_TXT},
    },
    providers::{self, IpVersion, Provider},
};

pub const DNS_PORT: u16 = 53;

/// A provider asked for a record type there is no answer-parsing rule for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRecordType(pub u16);

impl fmt::Display for InvalidRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid record type {}", self.0)
    }
}

impl std::error::Error for InvalidRecordType {}

pub async fn v4() -> Result<Option<Ipv4Addr>> {
    query_dns(IpVersion::V4).await
}

pub async fn query_dns(version: IpVersion) -> Result<Option<Ipv4Addr>> {
    if version == IpVersion::V6 {
        bail!("IPv6 resolution is not implemented");
    }
    resolve(&UdpClient::new(), &providers::registry(version)).await
}

/// Asks every server of every provider in order and returns the first address
/// reported.
///
/// `Ok(None)` means every exchange succeeded but no answer carried an address.
/// A failed exchange aborts the whole lookup: remaining servers and providers
/// are not tried.
pub async fn resolve(
    client: &impl DnsClient,
    providers: &[Provider],
) -> Result<Option<Ipv4Addr>> {
    for provider in providers {
        for server in &provider.servers {
            let server = SocketAddr::new(IpAddr::V4(*server), DNS_PORT);
            let query = Query::new(provider.question.name, provider.question.type_)?;
            debug!(
                "Asking {} server {} for {}",
                provider.name, server, provider.question.name
            );
            let response = client
                .send(server, &query)
                .await
                .with_context(|| {
                    format!("Exchange with {} server {} failed", provider.name, server)
                })?;
            let message = response.parse()?;
            if message.header.flags.response_code != 0 {
                warn!(
                    "{} server {} answered with rcode {}",
                    provider.name, server, message.header.flags.response_code
                );
            }
            if message.header.flags.truncated {
                warn!(
                    "{} server {} sent a truncated answer, records may be missing",
                    provider.name, server
                );
            }
            if let Some(ip) = extract_ip(&message, provider.question.type_)? {
                info!(
                    "Public address {} reported by {} server {}",
                    ip, provider.name, server
                );
                return Ok(Some(ip));
            }
        }
    }
    Ok(None)
}

fn extract_ip(message: &Message, type_: u16) -> Result<Option<Ipv4Addr>> {
    let ip = match type_ {
        TYPE_A => message.answers().find_map(|r| match r.data {
            ResourceData::Ipv4(ip) => Some(ip),
            _ => None,
        }),
        TYPE_TXT => message.answers().find_map(|r| match &r.data {
            ResourceData::Txt(segments) => segments.iter().find_map(|s| parse_ip_literal(s)),
            _ => None,
        }),
        _ => return Err(InvalidRecordType(type_).into()),
    };
    Ok(ip)
}

fn parse_ip_literal(segment: &[u8]) -> Option<Ipv4Addr> {
    match std::str::from_utf8(segment).ok()?.parse().ok()? {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}
