use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};

use crate::channel::{MethodCall, MethodResult, Value};

// Value tags - one byte each
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tag {
    Null = 0x00,
    True = 0x01,
    False = 0x02,
    Int = 0x03,
    Str = 0x04,
    Bytes = 0x05,
    List = 0x06,
    Map = 0x07,
}

impl Tag {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Tag::Null),
            0x01 => Some(Tag::True),
            0x02 => Some(Tag::False),
            0x03 => Some(Tag::Int),
            0x04 => Some(Tag::Str),
            0x05 => Some(Tag::Bytes),
            0x06 => Some(Tag::List),
            0x07 => Some(Tag::Map),
            _ => None,
        }
    }
}

// Result envelopes - identified by first byte
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum ResultType {
    Success = 0x80,
    Error = 0x82,
    NotImplemented = 0x83,
}

const MAX_DEPTH: usize = 64;

pub mod messages {
    pub const INVALID_TAG: &str = "Invalid value tag";
    pub const INVALID_RESULT: &str = "Invalid result envelope";
    pub const INVALID_UTF8: &str = "String is not valid UTF-8";
    pub const TOO_DEEP: &str = "Value nesting too deep";
    pub const TOO_LONG: &str = "Length does not fit in 32 bits";
    pub const TRUNCATED: &str = "Truncated payload";
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn write_len<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| invalid(messages::TOO_LONG))?;
    w.write_all(&len.to_be_bytes())
}

fn read_len<R: Read>(r: &mut R) -> io::Result<usize> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    Ok(u32::from_be_bytes(len_buf) as usize)
}

fn read_blob<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_len(r)?;
    // never trust the prefix for the allocation size
    let mut buf = Vec::new();
    r.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(invalid(messages::TRUNCATED));
    }
    Ok(buf)
}

fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_len(w, s.len())?;
    w.write_all(s.as_bytes())
}

fn read_str<R: Read>(r: &mut R) -> io::Result<String> {
    String::from_utf8(read_blob(r)?).map_err(|_| invalid(messages::INVALID_UTF8))
}

pub fn write_value<W: Write>(w: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Null => w.write_all(&[Tag::Null as u8]),
        Value::Bool(true) => w.write_all(&[Tag::True as u8]),
        Value::Bool(false) => w.write_all(&[Tag::False as u8]),
        Value::Int(i) => {
            w.write_all(&[Tag::Int as u8])?;
            w.write_all(&i.to_be_bytes())
        }
        Value::Str(s) => {
            w.write_all(&[Tag::Str as u8])?;
            write_str(w, s)
        }
        Value::Bytes(bytes) => {
            w.write_all(&[Tag::Bytes as u8])?;
            write_len(w, bytes.len())?;
            w.write_all(bytes)
        }
        Value::List(items) => {
            w.write_all(&[Tag::List as u8])?;
            write_len(w, items.len())?;
            items.iter().try_for_each(|item| write_value(w, item))
        }
        Value::Map(entries) => {
            w.write_all(&[Tag::Map as u8])?;
            write_len(w, entries.len())?;
            entries.iter().try_for_each(|(k, v)| {
                write_str(w, k)?;
                write_value(w, v)
            })
        }
    }
}

pub fn read_value<R: Read>(r: &mut R) -> io::Result<Value> {
    read_nested(r, 0)
}

fn read_nested<R: Read>(r: &mut R, depth: usize) -> io::Result<Value> {
    if depth > MAX_DEPTH {
        return Err(invalid(messages::TOO_DEEP));
    }

    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;

    match Tag::from_byte(tag[0]).ok_or_else(|| invalid(messages::INVALID_TAG))? {
        Tag::Null => Ok(Value::Null),
        Tag::True => Ok(Value::Bool(true)),
        Tag::False => Ok(Value::Bool(false)),
        Tag::Int => {
            let mut buf = [0u8; 8];
            r.read_exact(&mut buf)?;
            Ok(Value::Int(i64::from_be_bytes(buf)))
        }
        Tag::Str => read_str(r).map(Value::Str),
        Tag::Bytes => read_blob(r).map(Value::Bytes),
        Tag::List => {
            let count = read_len(r)?;
            (0..count)
                .map(|_| read_nested(r, depth + 1))
                .collect::<io::Result<Vec<_>>>()
                .map(Value::List)
        }
        Tag::Map => {
            let count = read_len(r)?;
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = read_str(r)?;
                entries.insert(key, read_nested(r, depth + 1)?);
            }
            Ok(Value::Map(entries))
        }
    }
}

/// Method name followed by the argument map.
pub fn write_call<W: Write>(w: &mut W, call: &MethodCall) -> io::Result<()> {
    write_str(w, &call.method)?;
    write_len(w, call.arguments.len())?;
    call.arguments.iter().try_for_each(|(k, v)| {
        write_str(w, k)?;
        write_value(w, v)
    })?;
    w.flush()
}

pub fn read_call<R: Read>(r: &mut R) -> io::Result<MethodCall> {
    let method = read_str(r)?;
    let count = read_len(r)?;
    let mut call = MethodCall::new(method);
    for _ in 0..count {
        let key = read_str(r)?;
        call.arguments.insert(key, read_value(r)?);
    }
    Ok(call)
}

pub fn write_result<W: Write>(w: &mut W, result: &MethodResult) -> io::Result<()> {
    match result {
        MethodResult::Success(value) => {
            w.write_all(&[ResultType::Success as u8])?;
            write_value(w, value)?;
        }
        MethodResult::Error { code, message } => {
            w.write_all(&[ResultType::Error as u8])?;
            write_str(w, code)?;
            write_str(w, message)?;
        }
        MethodResult::NotImplemented => {
            w.write_all(&[ResultType::NotImplemented as u8])?;
        }
    }
    w.flush()
}

pub fn read_result<R: Read>(r: &mut R) -> io::Result<MethodResult> {
    let mut result_type = [0u8; 1];
    r.read_exact(&mut result_type)?;

    match result_type[0] {
        x if x == ResultType::Success as u8 => read_value(r).map(MethodResult::Success),
        x if x == ResultType::Error as u8 => Ok(MethodResult::Error {
            code: read_str(r)?,
            message: read_str(r)?,
        }),
        x if x == ResultType::NotImplemented as u8 => Ok(MethodResult::NotImplemented),
        _ => Err(invalid(messages::INVALID_RESULT)),
    }
}

pub fn encode_result(result: &MethodResult) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_result(&mut buf, result)?;
    Ok(buf)
}

pub fn decode_result(bytes: &[u8]) -> io::Result<MethodResult> {
    read_result(&mut Cursor::new(bytes))
}
