//! Value codec: picks an encoding based on value shape, compresses large
//! payloads, and prefixes everything with a one-byte format tag so the
//! decoder never has to guess.
//!
//! Generalizes the tag scheme of the original cache layer: `j` for scalar
//! JSON, `m` for map/list values (MessagePack here, where the original used
//! a binary tuple encoding), `p` for anything that falls through both, and
//! `c` + inner tag for a zlib-compressed payload. Untagged legacy payloads
//! fall back through a JSON → MessagePack → raw-text decode chain.

use serde_json::Value;
use std::io::{Read, Write};

const TAG_JSON: u8 = b'j';
const TAG_MSGPACK: u8 = b'm';
const TAG_PICKLE_EQUIVALENT: u8 = b'p';
const TAG_COMPRESSED: u8 = b'c';

const COMPRESSION_MIN_SIZE: usize = 1024;
const COMPRESSION_MIN_SAVINGS: f64 = 0.10;

/// Encode a value for storage. Never fails: anything that can't be
/// represented falls back to a JSON string of its `Display`-equivalent.
pub fn encode(value: &Value) -> Vec<u8> {
    let (tag, body) = match value {
        Value::Object(_) | Value::Array(_) => match rmp_serde::to_vec(value) {
            Ok(bytes) => (TAG_MSGPACK, bytes),
            Err(_) => (TAG_PICKLE_EQUIVALENT, serde_json::to_vec(value).unwrap_or_default()),
        },
        _ => match serde_json::to_vec(value) {
            Ok(bytes) => (TAG_JSON, bytes),
            Err(_) => (TAG_PICKLE_EQUIVALENT, Vec::new()),
        },
    };

    maybe_compress(tag, body)
}

fn maybe_compress(tag: u8, body: Vec<u8>) -> Vec<u8> {
    if body.len() < COMPRESSION_MIN_SIZE {
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(tag);
        out.extend_from_slice(&body);
        return out;
    }

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(&body).is_err() {
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(tag);
        out.extend_from_slice(&body);
        return out;
    }
    let compressed = match encoder.finish() {
        Ok(c) => c,
        Err(_) => {
            let mut out = Vec::with_capacity(body.len() + 1);
            out.push(tag);
            out.extend_from_slice(&body);
            return out;
        }
    };

    let savings = 1.0 - (compressed.len() as f64 / body.len() as f64);
    if savings >= COMPRESSION_MIN_SAVINGS {
        let mut out = Vec::with_capacity(compressed.len() + 2);
        out.push(TAG_COMPRESSED);
        out.push(tag);
        out.extend_from_slice(&compressed);
        out
    } else {
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(tag);
        out.extend_from_slice(&body);
        out
    }
}

/// Decode a stored payload. Corrupt or unrecognized data returns `None`
/// rather than propagating an error — the cache contract treats "can't
/// make sense of this" the same as "absent".
pub fn decode(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }

    let (tag, rest) = (bytes[0], &bytes[1..]);
    match tag {
        TAG_COMPRESSED => {
            if rest.is_empty() {
                return None;
            }
            let (inner_tag, compressed) = (rest[0], &rest[1..]);
            let mut decoder = flate2::read::ZlibDecoder::new(compressed);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed).ok()?;
            decode_tagged(inner_tag, &decompressed)
        }
        TAG_JSON | TAG_MSGPACK | TAG_PICKLE_EQUIVALENT => decode_tagged(tag, rest),
        _ => decode_legacy(bytes),
    }
}

fn decode_tagged(tag: u8, body: &[u8]) -> Option<Value> {
    match tag {
        TAG_JSON => serde_json::from_slice(body).ok(),
        TAG_MSGPACK => rmp_serde::from_slice(body).ok(),
        TAG_PICKLE_EQUIVALENT => serde_json::from_slice(body).ok(),
        _ => None,
    }
}

/// Legacy/untagged decode chain: JSON, then MessagePack, then raw text.
fn decode_legacy(bytes: &[u8]) -> Option<Value> {
    if let Ok(v) = serde_json::from_slice::<Value>(bytes) {
        return Some(v);
    }
    if let Ok(v) = rmp_serde::from_slice::<Value>(bytes) {
        return Some(v);
    }
    std::str::from_utf8(bytes)
        .ok()
        .map(|s| Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_scalars() {
        for v in [
            json!(null),
            json!(true),
            json!(false),
            json!(42),
            json!(3.25),
            json!("hello"),
        ] {
            assert_eq!(decode(&encode(&v)).unwrap(), v);
        }
    }

    #[test]
    fn round_trips_maps_and_lists() {
        let v = json!({"a": [1, 2, {"b": "c"}], "n": null});
        assert_eq!(decode(&encode(&v)).unwrap(), v);
    }

    #[test]
    fn large_compressible_values_round_trip() {
        let big: Vec<Value> = (0..2000).map(|i| json!(format!("item-{i}"))).collect();
        let v = Value::Array(big);
        let encoded = encode(&v);
        assert_eq!(encoded[0], TAG_COMPRESSED);
        assert_eq!(decode(&encoded).unwrap(), v);
    }

    #[test]
    fn corrupt_payload_returns_none_not_error() {
        let garbage = vec![TAG_COMPRESSED, TAG_JSON, 0xff, 0xfe, 0x00, 0x01];
        assert!(decode(&garbage).is_none());
    }

    #[test]
    fn legacy_untagged_json_decodes() {
        let bytes = serde_json::to_vec(&json!({"x": 1})).unwrap();
        assert_eq!(decode(&bytes).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn empty_payload_is_absent() {
        assert!(decode(&[]).is_none());
    }
}
