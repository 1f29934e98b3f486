//! Builders for canned responses used by tests across the crate.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use super::{CLASS_IN, HEADER_SIZE, TYPE_A, TYPE_TXT};

const TYPE_CNAME: u16 = 5;

pub struct Answer {
    pub type_: u16,
    pub r_data: Vec<u8>,
}

pub fn a(ip: Ipv4Addr) -> Answer {
    Answer {
        type_: TYPE_A,
        r_data: ip.octets().to_vec(),
    }
}

pub fn txt(segments: &[&str]) -> Answer {
    let mut r_data = Vec::new();
    for segment in segments {
        r_data.push(segment.len() as u8);
        r_data.extend_from_slice(segment.as_bytes());
    }
    Answer {
        type_: TYPE_TXT,
        r_data,
    }
}

pub fn cname(target: &str) -> Answer {
    let mut r_data = Vec::new();
    for label in target.trim_end_matches('.').split('.') {
        r_data.push(label.len() as u8);
        r_data.extend_from_slice(label.as_bytes());
    }
    r_data.push(0);
    Answer {
        type_: TYPE_CNAME,
        r_data,
    }
}

/// Sets the TC bit of an encoded response.
pub fn truncated(mut response: Vec<u8>) -> Vec<u8> {
    response[2] |= 0x02;
    response
}

/// Answers a single-question query. Every record name points back at the
/// question name.
pub fn response_to(query: &[u8], answers: &[Answer]) -> Vec<u8> {
    let mut response = BytesMut::new();
    response.put_slice(&query[0..2]);
    response.put_u16(0x8180);
    response.put_u16(1);
    response.put_u16(answers.len() as u16);
    response.put_u16(0);
    response.put_u16(0);
    response.put_slice(&query[HEADER_SIZE..]);
    for answer in answers {
        response.put_u16(0xc00c);
        response.put_u16(answer.type_);
        response.put_u16(CLASS_IN);
        response.put_u32(60);
        response.put_u16(answer.r_data.len() as u16);
        response.put_slice(&answer.r_data);
    }
    response.to_vec()
}
