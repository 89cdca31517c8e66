//! Canonical CBOR encoding of documents for digest computation.
//!
//! This module follows RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Two nodes holding the same tree must produce identical bytes, so every
//! digest in the cluster is computed over this encoding.

use std::collections::BTreeMap;

use crate::document::Document;

/// Element field keys (integer keys for compact encoding).
mod keys {
    pub const NAME: u64 = 0;
    pub const ATTRIBUTES: u64 = 1;
    pub const CHILDREN: u64 = 2;
}

/// CBOR major types used by the encoding.
mod major {
    pub const UINT: u8 = 0;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
}

/// Encode a document to canonical CBOR bytes.
pub fn canonical_document_bytes(doc: &Document) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_element(&mut buf, doc);
    buf
}

/// Encode an element as `{0: name, 1: {attr: value}, 2: [children]}`.
///
/// The integer keys are already in canonical order.
fn encode_element(buf: &mut Vec<u8>, doc: &Document) {
    encode_uint(buf, major::MAP, 3);

    encode_uint(buf, major::UINT, keys::NAME);
    encode_text(buf, &doc.name);

    encode_uint(buf, major::UINT, keys::ATTRIBUTES);
    encode_attributes(buf, &doc.attributes);

    encode_uint(buf, major::UINT, keys::CHILDREN);
    encode_uint(buf, major::ARRAY, doc.children.len() as u64);
    for child in &doc.children {
        encode_element(buf, child);
    }
}

/// Encode a text-to-text map, keys sorted by encoded bytes.
fn encode_attributes(buf: &mut Vec<u8>, attributes: &BTreeMap<String, String>) {
    let mut pairs: Vec<(Vec<u8>, &str)> = attributes
        .iter()
        .map(|(k, v)| {
            let mut key = Vec::new();
            encode_text(&mut key, k);
            (key, v.as_str())
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, major::MAP, pairs.len() as u64);
    for (key, value) in pairs {
        buf.extend_from_slice(&key);
        encode_text(buf, value);
    }
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, major::TEXT, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}
