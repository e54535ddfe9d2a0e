//! A minimal, allocation-light JSON scanner.
//!
//! `serde_json`'s `StreamDeserializer` parses consecutive top-level values
//! (NDJSON-style); it has no public API for "skip to the `records` key and
//! decode its array one element at a time" without buffering the whole
//! document. This module implements exactly that one operation by hand:
//! locate a top-level key's array, then yield each element's raw bytes so
//! the caller can decode one record at a time. Memory footprint is O(one
//! record), matching §4.3.

use std::io::Read;

use crate::error::{CoreError, Result};

fn next_byte(bytes: &mut impl Iterator<Item = std::io::Result<u8>>) -> Result<Option<u8>> {
    match bytes.next() {
        Some(Ok(b)) => Ok(Some(b)),
        Some(Err(e)) => Err(CoreError::DataFormat(format!("I/O error while scanning: {e}"))),
        None => Ok(None),
    }
}

fn require_byte(bytes: &mut impl Iterator<Item = std::io::Result<u8>>) -> Result<u8> {
    next_byte(bytes)?.ok_or_else(|| CoreError::DataFormat("unexpected end of stream".to_string()))
}

fn skip_whitespace(bytes: &mut impl Iterator<Item = std::io::Result<u8>>) -> Result<u8> {
    loop {
        let b = require_byte(bytes)?;
        if !b.is_ascii_whitespace() {
            return Ok(b);
        }
    }
}

/// Consume a JSON string, assuming the opening `"` has already been read.
fn skip_string_body(bytes: &mut impl Iterator<Item = std::io::Result<u8>>) -> Result<()> {
    loop {
        let b = require_byte(bytes)?;
        match b {
            b'"' => return Ok(()),
            b'\\' => {
                // Consume the escaped character (or first byte of \uXXXX).
                require_byte(bytes)?;
            }
            _ => {}
        }
    }
}

/// Consume a complete JSON value whose first byte has already been read.
/// Used both to skip uninteresting keys and to capture each array element.
fn skip_value(
    bytes: &mut impl Iterator<Item = std::io::Result<u8>>,
    first: u8,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.push(first);
    match first {
        b'"' => {
            loop {
                let b = require_byte(bytes)?;
                out.push(b);
                match b {
                    b'"' => break,
                    b'\\' => {
                        let escaped = require_byte(bytes)?;
                        out.push(escaped);
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        b'{' | b'[' => {
            let close = if first == b'{' { b'}' } else { b']' };
            let mut depth: u32 = 1;
            while depth > 0 {
                let b = require_byte(bytes)?;
                out.push(b);
                match b {
                    b'"' => {
                        // Strings may contain unbalanced brackets; skip them
                        // as opaque but still append their bytes to `out`.
                        loop {
                            let sb = require_byte(bytes)?;
                            out.push(sb);
                            match sb {
                                b'"' => break,
                                b'\\' => {
                                    let esc = require_byte(bytes)?;
                                    out.push(esc);
                                }
                                _ => {}
                            }
                        }
                    }
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        if b == close || depth > 1 {
                            depth -= 1;
                        }
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        // number, true, false, null — read until a delimiter.
        _ => {
            // We've already consumed `first`; peeking isn't available on a
            // plain byte iterator, so literal/number skipping is handled by
            // the caller via `skip_scalar_rest` when needed. For our use
            // (skipping whole key/value pairs we don't care about) this
            // branch only needs to consume non-delimiter bytes.
            Ok(())
        }
    }
}

/// Skip a bare scalar (number/true/false/null) whose first byte has been
/// consumed, stopping just before the next structural delimiter. Returns the
/// delimiter byte (not consumed from the underlying iterator is impossible
/// without peek, so callers that need the delimiter use `skip_kv_pair`
/// instead, which owns the whole decision).
fn is_scalar_start(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-' || b == b't' || b == b'f' || b == b'n'
}

/// Advance the reader until it is positioned right after the `[` that opens
/// the value of the top-level object key `target_key`, erroring if the
/// document is not an object or the key is absent.
pub fn seek_to_array(reader: &mut impl Read, target_key: &str) -> Result<()> {
    let mut bytes = reader.bytes();

    let first = skip_whitespace(&mut bytes)?;
    if first != b'{' {
        return Err(CoreError::DataFormat(
            "expected top-level JSON object".to_string(),
        ));
    }

    loop {
        let b = skip_whitespace(&mut bytes)?;
        if b == b'}' {
            return Err(CoreError::DataFormat(format!(
                "key \"{target_key}\" not found in document"
            )));
        }
        if b != b'"' {
            return Err(CoreError::DataFormat(
                "expected object key".to_string(),
            ));
        }

        let mut key_bytes = Vec::new();
        loop {
            let kb = require_byte(&mut bytes)?;
            match kb {
                b'"' => break,
                b'\\' => {
                    key_bytes.push(kb);
                    key_bytes.push(require_byte(&mut bytes)?);
                }
                _ => key_bytes.push(kb),
            }
        }
        let key = String::from_utf8_lossy(&key_bytes).to_string();

        let colon = skip_whitespace(&mut bytes)?;
        if colon != b':' {
            return Err(CoreError::DataFormat("expected ':' after key".to_string()));
        }

        let value_start = skip_whitespace(&mut bytes)?;

        if key == target_key {
            if value_start != b'[' {
                return Err(CoreError::DataFormat(format!(
                    "expected \"{target_key}\" to be an array"
                )));
            }
            return Ok(());
        }

        // Not the key we want — skip its value entirely, then the
        // trailing ',' or '}'.
        let mut discard = Vec::new();
        if is_scalar_start(value_start) {
            discard.push(value_start);
            skip_scalar(&mut bytes, &mut discard)?;
        } else {
            skip_value(&mut bytes, value_start, &mut discard)?;
        }

        let sep = skip_whitespace(&mut bytes)?;
        match sep {
            b',' => continue,
            b'}' => {
                return Err(CoreError::DataFormat(format!(
                    "key \"{target_key}\" not found in document"
                )))
            }
            _ => return Err(CoreError::DataFormat("expected ',' or '}'".to_string())),
        }
    }
}

fn skip_scalar(
    bytes: &mut impl Iterator<Item = std::io::Result<u8>>,
    out: &mut Vec<u8>,
) -> Result<u8> {
    // Consume bytes belonging to a number/true/false/null literal, then
    // return the first delimiter byte found (',' '}' ']' or whitespace).
    loop {
        let b = require_byte(bytes)?;
        if b == b',' || b == b'}' || b == b']' || b.is_ascii_whitespace() {
            return Ok(b);
        }
        out.push(b);
    }
}

/// Reads successive elements out of a JSON array the cursor is already
/// positioned inside of (right after `[`), one element's raw bytes at a
/// time.
pub struct ArrayElementReader<'r, R: Read> {
    bytes: std::io::Bytes<&'r mut R>,
    finished: bool,
}

impl<'r, R: Read> ArrayElementReader<'r, R> {
    pub fn new(reader: &'r mut R) -> Self {
        Self {
            bytes: reader.bytes(),
            finished: false,
        }
    }

    /// Returns the raw bytes of the next array element, or `None` once the
    /// closing `]` has been reached.
    pub fn next_element(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        let first = skip_whitespace(&mut self.bytes)?;
        if first == b']' {
            self.finished = true;
            return Ok(None);
        }
        if first == b',' {
            // Separator between elements; read the real first byte next.
            return self.next_element_after_comma();
        }

        self.read_one_element(first)
    }

    fn next_element_after_comma(&mut self) -> Result<Option<Vec<u8>>> {
        let first = skip_whitespace(&mut self.bytes)?;
        if first == b']' {
            self.finished = true;
            return Ok(None);
        }
        self.read_one_element(first)
    }

    fn read_one_element(&mut self, first: u8) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        if is_scalar_start(first) {
            buf.push(first);
            let _delim = skip_scalar(&mut self.bytes, &mut buf)?;
            // The scalar skip consumed the trailing delimiter; if it was
            // ']' we're done after this element.
        } else {
            skip_value(&mut self.bytes, first, &mut buf)?;
            // Consume up to the next ',' or ']' delimiter.
            loop {
                let b = require_byte(&mut self.bytes)?;
                if b == b',' || b == b']' {
                    if b == b']' {
                        self.finished = true;
                    }
                    break;
                }
                if !b.is_ascii_whitespace() {
                    return Err(CoreError::DataFormat(
                        "expected ',' or ']' after array element".to_string(),
                    ));
                }
            }
        }
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn seeks_past_leading_keys_to_records_array() {
        let doc = br#"{"meta":{"a":1,"b":[1,2,3]},"records":[{"id":1},{"id":2}]}"#;
        let mut cursor = Cursor::new(doc.to_vec());
        seek_to_array(&mut cursor, "records").unwrap();

        let mut reader = ArrayElementReader::new(&mut cursor);
        let first = reader.next_element().unwrap().unwrap();
        assert_eq!(String::from_utf8(first).unwrap(), r#"{"id":1}"#);
        let second = reader.next_element().unwrap().unwrap();
        assert_eq!(String::from_utf8(second).unwrap(), r#"{"id":2}"#);
        assert!(reader.next_element().unwrap().is_none());
    }

    #[test]
    fn empty_records_array() {
        let doc = br#"{"records":[]}"#;
        let mut cursor = Cursor::new(doc.to_vec());
        seek_to_array(&mut cursor, "records").unwrap();
        let mut reader = ArrayElementReader::new(&mut cursor);
        assert!(reader.next_element().unwrap().is_none());
    }

    #[test]
    fn missing_records_key_is_data_format_error() {
        let doc = br#"{"foo": 1}"#;
        let mut cursor = Cursor::new(doc.to_vec());
        let err = seek_to_array(&mut cursor, "records").unwrap_err();
        assert!(matches!(err, CoreError::DataFormat(_)));
    }

    #[test]
    fn strings_with_escaped_brackets_dont_confuse_depth_tracking() {
        let doc = br#"{"records":[{"name":"A [note] \"quoted\""},{"name":"B"}]}"#;
        let mut cursor = Cursor::new(doc.to_vec());
        seek_to_array(&mut cursor, "records").unwrap();
        let mut reader = ArrayElementReader::new(&mut cursor);
        let first = reader.next_element().unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(parsed["name"], "A [note] \"quoted\"");
        let second = reader.next_element().unwrap().unwrap();
        let parsed2: serde_json::Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(parsed2["name"], "B");
    }
}
