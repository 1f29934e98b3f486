use std::time::Duration;

use nom::{
    branch::alt,
    bytes::complete::{tag, take},
    combinator::{all_consuming, cond, flat_map, map, map_opt, map_res, verify},
    error::{Error, ErrorKind},
    multi::{count, length_data, many0},
    number::complete::{be_u16, be_u32, be_u8},
    sequence::tuple,
    IResult,
};

use super::{Flags, Header, Message, MessageType, Question, ResourceRecord, MAX_LABEL_LEN};

const QR_MASK: u16 = 0x8000;
const TC_MASK: u16 = 0x0200;
const RCODE_MASK: u16 = 0x000f;
const POINTER_MASK: u16 = 0xc000;
const MAX_POINTER_HOPS: usize = 16;

enum NamePart<'a> {
    Label(&'a str),
    Pointer(u16),
    End,
}

pub fn parse_message(packet: &[u8]) -> IResult<&[u8], Message<'_>> {
    let (rest, header) = parse_header(packet)?;
    let (rest, questions) = parse_questions(header.questions, rest, packet)?;
    let (rest, answer) = parse_resource_records(header.answer_resource_records, rest, packet)?;
    let (rest, authority) =
        parse_resource_records(header.authority_resource_records, rest, packet)?;
    let (rest, additional) =
        parse_resource_records(header.additional_resource_records, rest, packet)?;
    Ok((
        rest,
        Message {
            header,
            questions,
            answer,
            authority,
            additional,
        },
    ))
}

pub fn parse_header(packet: &[u8]) -> IResult<&[u8], Header> {
    let parse_header = tuple((be_u16, parse_flags, be_u16, be_u16, be_u16, be_u16));
    map(
        parse_header,
        |(
            id,
            flags,
            questions,
            answer_resource_records,
            authority_resource_records,
            additional_resource_records,
        )| Header {
            id,
            flags,
            questions,
            answer_resource_records,
            authority_resource_records,
            additional_resource_records,
        },
    )(packet)
}

pub fn parse_character_strings(r_data: &[u8]) -> IResult<&[u8], Vec<&[u8]>> {
    all_consuming(many0(length_data(be_u8)))(r_data)
}

fn parse_questions<'a>(
    questions_count: u16,
    questions: &'a [u8],
    packet: &'a [u8],
) -> IResult<&'a [u8], Option<Vec<Question<'a>>>> {
    cond(
        questions_count != 0,
        count(
            |i: &'a [u8]| parse_question(i, packet),
            questions_count as usize,
        ),
    )(questions)
}

fn parse_resource_records<'a>(
    records_count: u16,
    records: &'a [u8],
    packet: &'a [u8],
) -> IResult<&'a [u8], Option<Vec<ResourceRecord<'a>>>> {
    cond(
        records_count != 0,
        count(
            |i: &'a [u8]| parse_resource_record(i, packet),
            records_count as usize,
        ),
    )(records)
}

fn parse_resource_record<'a>(
    records: &'a [u8],
    packet: &'a [u8],
) -> IResult<&'a [u8], ResourceRecord<'a>> {
    let parse_name = |i: &'a [u8]| parse_name(i, packet);
    let parse_ttl = map(be_u32, |ttl| Duration::from_secs(u64::from(ttl)));
    let resource_record = tuple((parse_name, be_u16, be_u16, parse_ttl, length_data(be_u16)));
    map_opt(resource_record, |(name, type_, class, ttl, r_data)| {
        ResourceRecord::from_raw(name, type_, class, ttl, r_data)
    })(records)
}

fn parse_question<'a>(questions: &'a [u8], packet: &'a [u8]) -> IResult<&'a [u8], Question<'a>> {
    let parse_name = |i: &'a [u8]| parse_name(i, packet);
    let parse_question = tuple((parse_name, be_u16, be_u16));
    map(parse_question, |(name, type_, class)| Question {
        name,
        type_,
        class,
    })(questions)
}

/// Reads a possibly compressed domain name. The returned rest starts right
/// after the name as written in `name_part`, not after any pointed-to labels.
fn parse_name<'a>(name_part: &'a [u8], packet: &'a [u8]) -> IResult<&'a [u8], Vec<&'a str>> {
    let mut name = Vec::new();
    let mut input = name_part;
    let mut after_name = None;
    let mut hops = 0;
    loop {
        let (rest, part) = parse_name_part(input)?;
        match part {
            NamePart::Label(label) => {
                name.push(label);
                input = rest;
            }
            NamePart::End => return Ok((after_name.unwrap_or(rest), name)),
            NamePart::Pointer(pointer) => {
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(failure(name_part, ErrorKind::TooLarge));
                }
                after_name.get_or_insert(rest);
                input = packet
                    .get(pointer as usize..)
                    .ok_or_else(|| failure(name_part, ErrorKind::Eof))?;
            }
        }
    }
}

fn parse_name_part(label_part: &[u8]) -> IResult<&[u8], NamePart<'_>> {
    alt((
        map(tag("\0"), |_| NamePart::End),
        map(parse_pointer, NamePart::Pointer),
        map(parse_label, NamePart::Label),
    ))(label_part)
}

fn parse_pointer(label_part: &[u8]) -> IResult<&[u8], u16> {
    map(
        verify(be_u16, |p: &u16| p & POINTER_MASK == POINTER_MASK),
        |p| p & !POINTER_MASK,
    )(label_part)
}

fn parse_label(label_part: &[u8]) -> IResult<&[u8], &str> {
    let label_len = verify(be_u8, |len: &u8| usize::from(*len) <= MAX_LABEL_LEN);
    map_res(flat_map(label_len, take), std::str::from_utf8)(label_part)
}

fn parse_flags(flags: &[u8]) -> IResult<&[u8], Flags> {
    map(be_u16, |flags| Flags {
        message_type: if flags & QR_MASK == 0 {
            MessageType::Query
        } else {
            MessageType::Response
        },
        truncated: flags & TC_MASK != 0,
        response_code: (flags & RCODE_MASK) as u8,
    })(flags)
}

fn failure(input: &[u8], kind: ErrorKind) -> nom::Err<Error<&[u8]>> {
    nom::Err::Failure(Error::new(input, kind))
}
