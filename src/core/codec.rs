//! Length-prefix framing and field serialization/parsing.
//!
//! A frame is `len:4 big-endian unsigned || body`, where `body` is a
//! sequence of zero or more null-terminated textual fields. Field text is
//! encoded as latin-1 so that every byte round-trips.

use byteorder::{BigEndian, ByteOrder};
use encoding::all::ISO_8859_1;
use encoding::{DecoderTrap, EncoderTrap, Encoding};

/// A single outbound field. Numbers render in their natural decimal form,
/// booleans as `1`/`0`, and absent/empty fields as the empty string -- all
/// followed by a null terminator once encoded.
pub enum Field<'a> {
    Int(i64),
    OptInt(Option<i64>),
    Float(f64),
    OptFloat(Option<f64>),
    Bool(bool),
    Str(&'a str),
    Owned(String),
    Empty,
}

impl<'a> Field<'a> {
    fn render(&self) -> String {
        match self {
            Field::Int(v) => v.to_string(),
            Field::OptInt(Some(v)) => v.to_string(),
            Field::OptInt(None) => String::new(),
            Field::Float(v) => format!("{v}"),
            Field::OptFloat(Some(v)) => format!("{v}"),
            Field::OptFloat(None) => String::new(),
            Field::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Field::Str(s) => (*s).to_string(),
            Field::Owned(s) => s.clone(),
            Field::Empty => String::new(),
        }
    }
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(s: &'a str) -> Self {
        Field::Str(s)
    }
}

impl From<String> for Field<'static> {
    fn from(s: String) -> Self {
        Field::Owned(s)
    }
}

impl<'a> From<i32> for Field<'a> {
    fn from(v: i32) -> Self {
        Field::Int(v as i64)
    }
}

impl<'a> From<i64> for Field<'a> {
    fn from(v: i64) -> Self {
        Field::Int(v)
    }
}

impl<'a> From<f64> for Field<'a> {
    fn from(v: f64) -> Self {
        Field::Float(v)
    }
}

impl<'a> From<bool> for Field<'a> {
    fn from(v: bool) -> Self {
        Field::Bool(v)
    }
}

fn write_field(body: &mut Vec<u8>, field: &Field) {
    let text = field.render();
    let bytes = ISO_8859_1
        .encode(&text, EncoderTrap::Strict)
        .unwrap_or_else(|_| text.into_bytes());
    body.extend_from_slice(&bytes);
    body.push(0);
}

fn wrap_length(body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    let mut len_buf = [0u8; 4];
    BigEndian::write_u32(&mut len_buf, body.len() as u32);
    out.extend_from_slice(&len_buf);
    out.extend_from_slice(&body);
    out
}

/// Encode one framed message: `kind` followed by `fields`, length-prefixed.
pub fn frame(kind: i32, fields: &[Field]) -> Vec<u8> {
    let mut body = Vec::new();
    write_field(&mut body, &Field::Int(kind as i64));
    for field in fields {
        write_field(&mut body, field);
    }
    wrap_length(body)
}

/// Encode the handshake reply: the one frame in the protocol carrying no
/// kind identifier.
pub fn frame_handshake_reply(server_version: i32, connection_time: &str) -> Vec<u8> {
    let mut body = Vec::new();
    write_field(&mut body, &Field::Int(server_version as i64));
    write_field(&mut body, &Field::Str(connection_time));
    wrap_length(body)
}

fn decode_latin1(bytes: &[u8]) -> String {
    ISO_8859_1
        .decode(bytes, DecoderTrap::Strict)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

fn decode_fields(body: &[u8]) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = Vec::new();
    for &byte in body {
        if byte == 0 {
            fields.push(decode_latin1(&current));
            current.clear();
        } else {
            current.push(byte);
        }
    }
    if !current.is_empty() {
        fields.push(decode_latin1(&current));
    }
    fields
}

/// Result of attempting to pull one frame off an accumulating byte stream.
pub enum UnframeResult {
    /// Fewer than 4 bytes, or fewer than `4 + len` bytes, are available yet.
    Incomplete,
    Complete {
        kind: i32,
        fields: Vec<String>,
        consumed: usize,
    },
}

/// Try to extract one complete frame from the front of `buf`, without
/// consuming anything if it is incomplete.
pub fn unframe(buf: &[u8]) -> UnframeResult {
    if buf.len() < 4 {
        return UnframeResult::Incomplete;
    }
    let len = BigEndian::read_u32(&buf[0..4]) as usize;
    if buf.len() < 4 + len {
        return UnframeResult::Incomplete;
    }
    let body = &buf[4..4 + len];
    let mut fields = decode_fields(body);
    let kind = if fields.is_empty() {
        -1
    } else {
        fields[0].parse::<i32>().unwrap_or(-1)
    };
    if !fields.is_empty() {
        fields.remove(0);
    }
    UnframeResult::Complete {
        kind,
        fields,
        consumed: 4 + len,
    }
}

/// Accumulates bytes read off a socket and yields complete frames as they
/// become available, preserving any trailing partial frame across calls.
#[derive(Default)]
pub struct IngressBuffer {
    buf: Vec<u8>,
}

impl IngressBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<(i32, Vec<String>)> {
        match unframe(&self.buf) {
            UnframeResult::Incomplete => None,
            UnframeResult::Complete {
                kind,
                fields,
                consumed,
            } => {
                self.buf.drain(0..consumed);
                Some((kind, fields))
            }
        }
    }
}

/// Positional reader over a parsed field vector, tolerant of missing or
/// unparseable fields (they come back as `None`/default rather than
/// erroring).
pub struct FieldReader<'a> {
    fields: &'a [String],
    idx: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a [String]) -> Self {
        Self { fields, idx: 0 }
    }

    pub fn read_str(&mut self) -> String {
        let value = self.fields.get(self.idx).cloned().unwrap_or_default();
        self.idx += 1;
        value
    }

    pub fn read_opt_i64(&mut self) -> Option<i64> {
        let raw = self.fields.get(self.idx);
        self.idx += 1;
        raw.and_then(|s| if s.is_empty() { None } else { s.parse().ok() })
    }

    pub fn read_opt_i32(&mut self) -> Option<i32> {
        self.read_opt_i64().map(|v| v as i32)
    }

    pub fn read_opt_f64(&mut self) -> Option<f64> {
        let raw = self.fields.get(self.idx);
        self.idx += 1;
        raw.and_then(|s| if s.is_empty() { None } else { s.parse().ok() })
    }

    pub fn read_bool(&mut self) -> bool {
        let raw = self.fields.get(self.idx);
        self.idx += 1;
        raw.map(|s| s == "1").unwrap_or(false)
    }

    /// Number of fields left unread -- used by parsers to detect a
    /// too-short message for their kind.
    pub fn remaining(&self) -> usize {
        self.fields.len().saturating_sub(self.idx)
    }
}
