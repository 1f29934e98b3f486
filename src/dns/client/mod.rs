use std::net::SocketAddr;

use anyhow::Result;

use async_trait::async_trait;

mod udp;

pub use udp::*;

use super::message::{Query, Response};

/// One request/response exchange with `server`.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn send(&self, server: SocketAddr, query: &Query) -> Result<Response>;
}
