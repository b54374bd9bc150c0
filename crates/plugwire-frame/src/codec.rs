use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::message::Message;

/// Default maximum size of a single JSON value: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a message as one compact JSON value followed by `\n`.
///
/// ```text
/// [5,["invoke","echo",["hi"]]]\n
/// ```
pub fn encode_frame(message: &Message, dst: &mut BytesMut, max_payload: usize) -> Result<()> {
    let encoded = serde_json::to_vec(message).map_err(FrameError::Encode)?;
    if encoded.len() > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: encoded.len(),
            max: max_payload,
        });
    }
    dst.reserve(encoded.len() + 1);
    dst.put_slice(&encoded);
    dst.put_u8(b'\n');
    Ok(())
}

/// Decode one JSON value from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete value yet.
/// On success, consumes the value (and any whitespace before it).
///
/// Stateless: a partial value is rescanned from its first byte on every
/// call. [`MessageCodec`] keeps the scan position between reads instead.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Value>> {
    ValueScanner::default().decode(src, max_payload)
}

/// Finds where the next JSON value ends without parsing it.
///
/// Tracks nesting depth and string/escape state byte by byte and remembers
/// how far it got, so each read only looks at bytes that arrived since the
/// last one. The value is parsed once, after its end has been found.
#[derive(Debug, Clone, Default)]
struct ValueScanner {
    /// Bytes of the current value already scanned. Zero means no value has
    /// started yet.
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ValueScanner {
    fn decode(&mut self, src: &mut BytesMut, max_payload: usize) -> Result<Option<Value>> {
        if self.scanned == 0 {
            let skip = leading_whitespace(src);
            src.advance(skip);
            if src.is_empty() {
                return Ok(None);
            }
        }

        let Some(end) = self.scan(src) else {
            if src.len() > max_payload {
                return Err(FrameError::PayloadTooLarge {
                    size: src.len(),
                    max: max_payload,
                });
            }
            return Ok(None); // Need more data
        };

        *self = Self::default();
        if end > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: end,
                max: max_payload,
            });
        }
        let value = serde_json::from_slice(&src[..end]).map_err(FrameError::InvalidJson)?;
        src.advance(end);
        Ok(Some(value))
    }

    /// Length of the value starting at `src[0]`, once its last byte is in.
    fn scan(&mut self, src: &[u8]) -> Option<usize> {
        let scalar = !matches!(src[0], b'[' | b'{' | b'"');
        for (i, &byte) in src.iter().enumerate().skip(self.scanned) {
            if scalar {
                // Numbers and literals end at the first delimiter. A stray
                // closing bracket or comma ends at once and fails to parse.
                if is_delimiter(byte) {
                    return Some(i.max(1));
                }
                continue;
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'[' | b'{' => self.depth += 1,
                b']' | b'}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        self.scanned = src.len();
        None
    }

    /// A top-level number or literal has no closing byte; at EOF whatever
    /// is buffered is the whole value.
    fn finish_scalar(&mut self, src: &mut BytesMut) -> Result<Option<Value>> {
        if src.is_empty() || matches!(src[0], b'[' | b'{' | b'"') {
            return Ok(None);
        }
        *self = Self::default();
        let value = serde_json::from_slice(&src[..]).map_err(FrameError::InvalidJson)?;
        src.clear();
        Ok(Some(value))
    }
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t' | b'\n' | b'\r' | b'[' | b']' | b'{' | b'}' | b',' | b':' | b'"'
    )
}

/// Configuration for the message codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum size of one JSON value in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// `tokio_util` codec over [`decode_frame`] and [`encode_frame`].
///
/// Decodes raw JSON values rather than [`Message`]s so that a well-formed
/// value with the wrong envelope shape can be dropped without ending the
/// stream.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    config: FrameConfig,
    scanner: ValueScanner,
}

impl MessageCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            scanner: ValueScanner::default(),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }
}

impl Decoder for MessageCodec {
    type Item = Value;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>> {
        self.scanner.decode(src, self.config.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Value>> {
        if let Some(value) = self.decode(src)? {
            return Ok(Some(value));
        }
        match self.scanner.finish_scalar(src)? {
            Some(value) => Ok(Some(value)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&message, dst, self.config.max_payload_size)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_writes_one_line() {
        let mut buf = BytesMut::new();
        let msg = Message::new(5, json!(["invoke", "echo", ["hi"]]));
        encode_frame(&msg, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(&buf[..], b"[5,[\"invoke\",\"echo\",[\"hi\"]]]\n");
    }

    #[test]
    fn encode_then_decode() {
        let mut buf = BytesMut::new();
        let msg = Message::new(-1, json!(["hello", null]));
        encode_frame(&msg, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();

        let value = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(Message::from_value(value).unwrap(), msg);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_value() {
        let mut buf = BytesMut::from(&b"[1,[\"invoke\",\"ec"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert!(!buf.is_empty(), "partial bytes must be kept");

        buf.extend_from_slice(b"ho\",[]]]\n");
        let value = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(value, json!([1, ["invoke", "echo", []]]));
    }

    #[test]
    fn decode_concatenated_values_without_newlines() {
        let mut buf = BytesMut::from(&b"[1,\"a\"][2,\"b\"]  \r\n [3,\"c\"]"[..]);
        let mut ids = Vec::new();
        while let Some(value) = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap() {
            ids.push(value[0].as_i64().unwrap());
        }
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_whitespace_only() {
        let mut buf = BytesMut::from(&b"\n\n  \t"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_invalid_json() {
        let mut buf = BytesMut::from(&b"[1, nope]\n"[..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidJson(_))));
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::from(&b"[1,\"0123456789\"]"[..]);
        let result = decode_frame(&mut buf, 8);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }

    #[test]
    fn decode_partial_payload_too_large() {
        let mut buf = BytesMut::from(&b"[1,\"0123456789"[..]);
        let result = decode_frame(&mut buf, 8);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 14, max: 8 })
        ));
    }

    #[test]
    fn encode_payload_too_large() {
        let mut buf = BytesMut::new();
        let msg = Message::new(1, json!("0123456789"));
        let result = encode_frame(&msg, &mut buf, 4);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn codec_decode_eof_with_leftover_bytes() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&b"[1,"[..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(FrameError::ConnectionClosed)
        ));

        let mut buf = BytesMut::from(&b"  \n"[..]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn codec_respects_configured_limit() {
        let mut codec = MessageCodec::new(FrameConfig {
            max_payload_size: 4,
        });
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Message::new(1, json!("too long")), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 4, .. }));

        codec.set_max_payload_size(DEFAULT_MAX_PAYLOAD);
        codec
            .encode(Message::new(1, json!("fits")), &mut buf)
            .unwrap();
        assert_eq!(codec.config().max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap(),
            json!([1, "fits"])
        );
    }

    #[test]
    fn codec_resumes_large_frame_across_chunks() {
        let big = "x".repeat(4 * 1024 * 1024);
        let mut wire = BytesMut::new();
        encode_frame(&Message::new(3, json!(big)), &mut wire, DEFAULT_MAX_PAYLOAD).unwrap();

        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::new();
        let mut decoded = None;
        for chunk in wire.chunks(8 * 1024) {
            buf.extend_from_slice(chunk);
            if let Some(value) = codec.decode(&mut buf).unwrap() {
                decoded = Some(value);
                break;
            }
            // Nothing already seen is looked at again on the next read.
            assert_eq!(codec.scanner.scanned, buf.len());
        }

        let value = decoded.expect("frame should complete on its last chunk");
        assert_eq!(value[0], json!(3));
        assert_eq!(value[1].as_str().map(str::len), Some(big.len()));
        assert_eq!(&buf[..], b"\n");
        assert_eq!(codec.scanner.scanned, 0);
    }

    #[test]
    fn codec_tracks_strings_split_byte_by_byte() {
        let wire = br#"[1,["invoke","m",["a]\"}[","\\",{"k":"]"}]]] [2,"b"]"#;
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::new();
        let mut values = Vec::new();
        for &byte in wire.iter() {
            buf.extend_from_slice(&[byte]);
            while let Some(value) = codec.decode(&mut buf).unwrap() {
                values.push(value);
            }
        }
        assert_eq!(
            values,
            vec![
                json!([1, ["invoke", "m", ["a]\"}[", "\\", {"k": "]"}]]]),
                json!([2, "b"]),
            ]
        );
    }

    #[test]
    fn codec_scalars_end_at_delimiter_or_eof() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&b"12"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"3 true[4]");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!(123)));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!(true)));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!([4])));

        let mut buf = BytesMut::from(&b" null"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(Value::Null));
        assert!(buf.is_empty());
    }

    #[test]
    fn codec_rejects_stray_closing_bracket() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&b"][1]"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::InvalidJson(_))
        ));
    }
}
