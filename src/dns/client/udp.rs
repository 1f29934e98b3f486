use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use tokio::{net::UdpSocket, time::timeout};

use crate::dns::message::{Message, Query, Response};

use super::DnsClient;

pub const DNS_TIMEOUT: Duration = Duration::from_secs(3);

const MAX_PACKET_SIZE: usize = 4096;

/// Transient UDP client: every exchange gets its own ephemeral socket.
pub struct UdpClient {
    timeout: Duration,
}

impl UdpClient {
    pub fn new() -> Self {
        Self::with_timeout(DNS_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for UdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsClient for UdpClient {
    async fn send(&self, server: SocketAddr, query: &Query) -> Result<Response> {
        timeout(self.timeout, exchange(server, query))
            .await
            .map_err(|_| anyhow!("No response from {} within {:?}", server, self.timeout))?
    }
}

async fn exchange(server: SocketAddr, query: &Query) -> Result<Response> {
    let bind_addr = if server.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(server).await?;
    socket.send(query.bytes()).await?;

    let request = query.parse()?;
    let mut packet_buf = vec![0; MAX_PACKET_SIZE];
    loop {
        let read = socket.recv(&mut packet_buf).await?;
        let response = Response::from_bytes(Bytes::copy_from_slice(&packet_buf[..read]))?;
        if response.header().id != query.header().id {
            warn!(
                "Ignoring response from {} with unexpected id {:#06x}",
                server,
                response.header().id
            );
            continue;
        }
        let parsed_response = response.parse()?;
        if !same_domains(&request, &parsed_response) {
            warn!(
                "Request and response domains don't match. Request: {:?}. Response: {:?}",
                request, parsed_response
            );
            continue;
        }
        return Ok(response);
    }
}

fn same_domains(request: &Message, response: &Message) -> bool {
    request
        .domains()
        .map(|d| d.to_ascii_lowercase())
        .eq(response.domains().map(|d| d.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::UdpClient;
    use crate::dns::{
        client::DnsClient,
        message::{
            testing::{a, response_to},
            Query, ResourceData, TYPE_A,
        },
    };
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use std::{net::SocketAddr, time::Duration};
    use tokio::net::UdpSocket;

    async fn dns_stub(
        reply: impl Fn(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    ) -> Result<SocketAddr> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        tokio::spawn(async move {
            let mut packet_buf = [0; 512];
            while let Ok((read, sender)) = socket.recv_from(&mut packet_buf).await {
                for packet in reply(&packet_buf[..read]) {
                    socket.send_to(&packet, sender).await.unwrap();
                }
            }
        });
        Ok(addr)
    }

    #[tokio::test]
    async fn should_receive_matching_response() -> Result<()> {
        let server = dns_stub(|request| {
            vec![response_to(request, &[a("198.51.100.5".parse().unwrap())])]
        })
        .await?;
        let query = Query::new("myip.opendns.com.", TYPE_A)?;

        let response = UdpClient::new().send(server, &query).await?;
        let message = response.parse()?;

        assert_eq!(response.header().id, query.header().id);
        assert_eq!(
            message.answers().map(|r| &r.data).collect::<Vec<_>>(),
            vec![&ResourceData::Ipv4("198.51.100.5".parse()?)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn should_skip_responses_for_other_queries() -> Result<()> {
        let server = dns_stub(|request| {
            let stale = Query::with_id(
                u16::from_be_bytes([request[0], request[1]]).wrapping_add(1),
                "myip.opendns.com.",
                TYPE_A,
            )
            .unwrap();
            let other_domain = Query::with_id(
                u16::from_be_bytes([request[0], request[1]]),
                "example.com.",
                TYPE_A,
            )
            .unwrap();
            vec![
                response_to(stale.bytes(), &[a("192.0.2.1".parse().unwrap())]),
                response_to(other_domain.bytes(), &[a("192.0.2.2".parse().unwrap())]),
                response_to(request, &[a("198.51.100.5".parse().unwrap())]),
            ]
        })
        .await?;
        let query = Query::new("myip.opendns.com.", TYPE_A)?;

        let response = UdpClient::new().send(server, &query).await?;

        assert_eq!(
            response.parse()?.answers().map(|r| &r.data).collect::<Vec<_>>(),
            vec![&ResourceData::Ipv4("198.51.100.5".parse()?)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn should_fail_on_timeout() -> Result<()> {
        let server = dns_stub(|_| Vec::new()).await?;
        let query = Query::new("myip.opendns.com.", TYPE_A)?;

        let result = UdpClient::with_timeout(Duration::from_millis(50))
            .send(server, &query)
            .await;

        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn should_fail_on_malformed_response() -> Result<()> {
        let server = dns_stub(|_| vec![vec![0xde, 0xad]]).await?;
        let query = Query::new("myip.opendns.com.", TYPE_A)?;

        let result = UdpClient::new().send(server, &query).await;

        assert!(result.is_err());
        Ok(())
    }
}
