//! Public IPv4 discovery through DNS servers that echo the requester's
//! address back: Google answers `o-o.myaddr.l.google.com.` with a TXT record,
//! OpenDNS answers `myip.opendns.com.` with an A record.

pub mod dns;
pub mod providers;
pub mod resolver;

pub use providers::IpVersion;
pub use resolver::{query_dns, resolve, v4, InvalidRecordType};
