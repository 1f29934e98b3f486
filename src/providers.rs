use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::dns::message::{TYPE_A, TYPE_TXT};

const GOOGLE_SERVER_NAME: &str = "o-o.myaddr.l.google.com.";
const OPENDNS_SERVER_NAME: &str = "myip.opendns.com.";

const V4_GOOGLE_SERVERS: [Ipv4Addr; 4] = [
    Ipv4Addr::new(216, 239, 32, 10),
    Ipv4Addr::new(216, 239, 34, 10),
    Ipv4Addr::new(216, 239, 36, 10),
    Ipv4Addr::new(216, 239, 38, 10),
];

const V4_OPENDNS_SERVERS: [Ipv4Addr; 4] = [
    Ipv4Addr::new(208, 67, 222, 222),
    Ipv4Addr::new(208, 67, 220, 220),
    Ipv4Addr::new(208, 67, 222, 220),
    Ipv4Addr::new(208, 67, 220, 222),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub name: &'static str,
    pub type_: u16,
}

/// A public address echo service. Every server answers `question` in the
/// same format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    pub servers: Vec<Ipv4Addr>,
    pub question: Question,
}

/// Providers in the order they should be tried.
///
/// Only IPv4 tables exist, so `version` does not change the result.
pub fn registry(_version: IpVersion) -> Vec<Provider> {
    vec![
        Provider {
            name: "google",
            servers: V4_GOOGLE_SERVERS.to_vec(),
            question: Question {
                name: GOOGLE_SERVER_NAME,
                type_: TYPE_TXT,
            },
        },
        Provider {
            name: "opendns",
            servers: V4_OPENDNS_SERVERS.to_vec(),
            question: Question {
                name: OPENDNS_SERVER_NAME,
                type_: TYPE_A,
            },
        },
    ]
}
