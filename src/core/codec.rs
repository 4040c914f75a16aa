//! Value codec
//!
//! Values are stored as serde_json bytes behind a one-byte envelope tag:
//!
//! - `0x00` raw JSON
//! - `0x01` gzip-compressed JSON
//!
//! Payloads above the configured threshold are compressed, but only kept
//! compressed when that actually saves space.

use crate::config::CompressionConfig;
use crate::utils::error::{CacheError, Result};
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};

const TAG_RAW: u8 = 0x00;
const TAG_GZIP: u8 = 0x01;

/// Result of encoding one value
#[derive(Debug, Clone)]
pub struct Encoded {
    /// Envelope bytes ready for the Remote Tier
    pub bytes: Bytes,
    /// Bytes saved by compression (zero for raw payloads)
    pub saved: usize,
}

impl Encoded {
    pub fn is_compressed(&self) -> bool {
        self.bytes.first() == Some(&TAG_GZIP)
    }
}

/// Serializer plus optional gzip stage
#[derive(Debug, Clone)]
pub struct Codec {
    enabled: bool,
    threshold: usize,
    level: Compression,
}

impl Codec {
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            enabled: config.enabled,
            threshold: config.threshold_bytes,
            level: Compression::new(config.level.min(9)),
        }
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Encoded> {
        let json = serde_json::to_vec(value)?;

        if self.enabled && json.len() > self.threshold {
            let compressed = self.gzip(&json)?;
            if compressed.len() < json.len() {
                let saved = json.len() - compressed.len();
                return Ok(Encoded {
                    bytes: envelope(TAG_GZIP, &compressed),
                    saved,
                });
            }
        }

        Ok(Encoded {
            bytes: envelope(TAG_RAW, &json),
            saved: 0,
        })
    }

    /// Decode an envelope; failures name the key they belong to
    pub fn decode<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Result<T> {
        let (tag, body) = bytes
            .split_first()
            .ok_or_else(|| CacheError::decode(key, "empty payload"))?;

        match *tag {
            TAG_RAW => serde_json::from_slice(body)
                .map_err(|e| CacheError::decode(key, e.to_string())),
            TAG_GZIP => {
                let json = gunzip(body)?;
                serde_json::from_slice(&json).map_err(|e| CacheError::decode(key, e.to_string()))
            }
            other => Err(CacheError::decode(
                key,
                format!("unknown envelope tag 0x{:02x}", other),
            )),
        }
    }

    fn gzip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder
            .write_all(data)
            .map_err(|e| CacheError::compression(format!("gzip write failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| CacheError::compression(format!("gzip finish failed: {}", e)))
    }
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheError::compression(format!("gzip stream is corrupt: {}", e)))?;
    Ok(out)
}

fn envelope(tag: u8, body: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(tag);
    out.extend_from_slice(body);
    Bytes::from(out)
}
