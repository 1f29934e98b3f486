use anyhow::{anyhow, bail, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::{net::Ipv4Addr, time::Duration};

mod parsers;
#[cfg(test)]
pub mod testing;

pub const CLASS_IN: u16 = 1;
pub const TYPE_A: u16 = 1;
pub const TYPE_TXT: u16 = 16;

const HEADER_SIZE: usize = 12;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const RECURSION_DESIRED: u16 = 0x0100;

#[derive(Debug, Clone)]
pub struct Query {
    request: Bytes,
    header: Header,
}

impl Query {
    /// Standard recursive query for a single question of class IN.
    pub fn new(name: &str, type_: u16) -> Result<Self> {
        Self::with_id(rand::random(), name, type_)
    }

    pub fn with_id(id: u16, name: &str, type_: u16) -> Result<Self> {
        let mut request = BytesMut::with_capacity(HEADER_SIZE + name.len() + 6);
        request.put_u16(id);
        request.put_u16(RECURSION_DESIRED);
        request.put_u16(1);
        request.put_u16(0);
        request.put_u16(0);
        request.put_u16(0);
        put_name(&mut request, name)?;
        request.put_u16(type_);
        request.put_u16(CLASS_IN);
        Self::from_bytes(request.freeze())
    }

    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let header = Header::from_packet(&bytes)?;
        if matches!(header.flags.message_type, MessageType::Query) {
            Ok(Self {
                request: bytes,
                header,
            })
        } else {
            Err(anyhow!("Got dns response"))
        }
    }

    pub fn parse(&self) -> Result<Message<'_>> {
        Message::from_packet(self.bytes())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn bytes(&self) -> &Bytes {
        &self.request
    }
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<()> {
    let start = buf.len();
    let relative = name.strip_suffix('.').unwrap_or(name);
    if !relative.is_empty() {
        for label in relative.split('.') {
            if label.is_empty() {
                bail!("Empty label in domain name {:?}", name);
            }
            if label.len() > MAX_LABEL_LEN {
                bail!("Label {:?} of domain name {:?} is too long", label, name);
            }
            buf.put_u8(label.len() as u8);
            buf.put_slice(label.as_bytes());
        }
    }
    buf.put_u8(0);
    if buf.len() - start > MAX_NAME_LEN {
        bail!("Domain name {:?} is too long", name);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Response {
    response: Bytes,
    header: Header,
}

impl Response {
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let header = Header::from_packet(&bytes)?;
        if matches!(header.flags.message_type, MessageType::Response) {
            Ok(Self {
                response: bytes,
                header,
            })
        } else {
            Err(anyhow!("Got dns query"))
        }
    }

    pub fn parse(&self) -> Result<Message<'_>> {
        Message::from_packet(self.bytes())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn bytes(&self) -> &Bytes {
        &self.response
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Message<'a> {
    pub header: Header,
    pub questions: Option<Vec<Question<'a>>>,
    pub answer: Option<Vec<ResourceRecord<'a>>>,
    pub authority: Option<Vec<ResourceRecord<'a>>>,
    pub additional: Option<Vec<ResourceRecord<'a>>>,
}

impl<'m> Message<'m> {
    fn from_packet(packet: &[u8]) -> Result<Message<'_>> {
        match parsers::parse_message(packet) {
            Ok((_, msg)) => Ok(msg),
            Err(err) => Err(anyhow!(
                "got error while parsing dns message. Err: {:?}, raw_packet: {:02X?}",
                err,
                packet
            )),
        }
    }

    pub fn answers(&self) -> impl Iterator<Item = &ResourceRecord<'m>> + '_ {
        self.answer.iter().flatten()
    }

    pub fn domains(&self) -> impl Iterator<Item = String> + '_ {
        self.questions
            .iter()
            .flatten()
            .map(|q| q.name.as_slice())
            .map(|d| d.join("."))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MessageType {
    Query,
    Response,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Flags {
    pub message_type: MessageType,
    pub truncated: bool,
    pub response_code: u8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub questions: u16,
    pub answer_resource_records: u16,
    pub authority_resource_records: u16,
    pub additional_resource_records: u16,
}

impl Header {
    fn from_packet(packet: &[u8]) -> Result<Header> {
        match parsers::parse_header(packet) {
            Ok((_, header)) => Ok(header),
            Err(err) => Err(anyhow!(
                "got error while parsing dns header. Err: {:?}, raw_packet: {:02X?}",
                err,
                packet
            )),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Question<'a> {
    pub name: Vec<&'a str>,
    pub type_: u16,
    pub class: u16,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceRecord<'a> {
    pub name: Vec<&'a str>,
    pub type_: u16,
    pub class: u16,
    pub ttl: Duration,
    pub data: ResourceData<'a>,
}

impl ResourceRecord<'_> {
    fn from_raw<'a>(
        name: Vec<&'a str>,
        type_: u16,
        class: u16,
        ttl: Duration,
        data: &'a [u8],
    ) -> Option<ResourceRecord<'a>> {
        let data = match (class, type_) {
            (CLASS_IN, TYPE_A) => {
                ResourceData::Ipv4(Ipv4Addr::from(<[u8; 4]>::try_from(data).ok()?))
            }
            (_, TYPE_TXT) => ResourceData::Txt(parsers::parse_character_strings(data).ok()?.1),
            _ => ResourceData::Other(data),
        };
        Some(ResourceRecord {
            name,
            type_,
            class,
            ttl,
            data,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ResourceData<'a> {
    Ipv4(Ipv4Addr),
    /// Character-strings in wire order, without their length octets.
    Txt(Vec<&'a [u8]>),
    Other(&'a [u8]),
}
