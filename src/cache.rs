//! Content hashing and the build-scoped cache.
//!
//! Two things live here:
//!
//! - **Hash helpers.** Every [`GeneratedFile`](crate::types::GeneratedFile)
//!   carries a [`content_hash`] of its final bytes: the first 8 hex digits of
//!   SHA-256. The hash is a pure function of the bytes, so identical input
//!   always yields identical hashes no matter how work was scheduled.
//!
//! - **[`BuildCache`].** An in-memory memo owned by one generation run.
//!   Image encodes are looked up by content (`"{source_hash}:{params_hash}"`)
//!   rather than by path, so two assets with the same bytes and the same
//!   encode settings are encoded once. Rendered blocks are looked up by
//!   block id plus effective properties, so a header or footer repeated on
//!   every page renders once per run.
//!
//! The cache is discarded with the run. There is no on-disk state, and
//! `--no-cache` simply turns every lookup into a miss.

use crate::blocks::RenderedBlock;
use crate::imaging::EncodeParams;
use crate::types::Properties;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Length of the short content hash in hex characters.
pub const CONTENT_HASH_LEN: usize = 8;

/// SHA-256 of a byte slice, returned as a full hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Short content hash: first 8 hex characters of SHA-256.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut full = hash_bytes(bytes);
    full.truncate(CONTENT_HASH_LEN);
    full
}

/// SHA-256 of encoding parameters for one image output.
///
/// Inputs: output format, exact resize, quality, and blur. If any of these
/// change, a cached encode is not reused.
pub fn hash_encode_params(params: &EncodeParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"encode\0");
    hasher.update(params.format.extension().as_bytes());
    hasher.update(b"\0");
    match params.resize {
        Some((w, h)) => {
            hasher.update(b"\x01");
            hasher.update(w.to_le_bytes());
            hasher.update(h.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(params.quality.value().to_le_bytes());
    match params.blur {
        Some(sigma) => {
            hasher.update(b"\x01");
            hasher.update(sigma.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Cache key for a rendered block: block id plus its effective properties.
///
/// `serde_json::Map` iterates in key order, so equal property sets always
/// serialize identically.
pub fn block_key(block_id: &str, props: &Properties) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(serde_json::Value::Object(props.clone()).to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} computed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} computed", self.misses)
        }
    }
}

/// Run-scoped memo for encoded images and rendered blocks.
///
/// Shared by reference across worker threads; all maps sit behind mutexes.
/// A disabled cache never stores anything and counts every lookup as a miss.
#[derive(Debug, Default)]
pub struct BuildCache {
    enabled: bool,
    encodes: Mutex<HashMap<String, Vec<u8>>>,
    blocks: Mutex<HashMap<String, RenderedBlock>>,
    stats: Mutex<CacheStats>,
}

impl BuildCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up an encoded image by `source_hash` and `params_hash`.
    pub fn get_encoded(&self, source_hash: &str, params_hash: &str) -> Option<Vec<u8>> {
        let found = if self.enabled {
            let key = format!("{}:{}", source_hash, params_hash);
            self.encodes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned()
        } else {
            None
        };
        self.record(found.is_some());
        found
    }

    pub fn put_encoded(&self, source_hash: &str, params_hash: &str, bytes: Vec<u8>) {
        if !self.enabled {
            return;
        }
        let key = format!("{}:{}", source_hash, params_hash);
        self.encodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes);
    }

    /// Look up a rendered block by [`block_key`].
    pub fn get_block(&self, key: &str) -> Option<RenderedBlock> {
        let found = if self.enabled {
            self.blocks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        } else {
            None
        };
        self.record(found.is_some());
        found
    }

    pub fn put_block(&self, key: String, block: RenderedBlock) {
        if !self.enabled {
            return;
        }
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, block);
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, hit: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if hit {
            stats.hit();
        } else {
            stats.miss();
        }
    }
}
