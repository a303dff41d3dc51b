//! Fixed-width string keys for integer indices.
//!
//! Candidates store string keys, so every harness operation encodes its drawn
//! index once on the hot path. Encoding writes into an inline buffer and never
//! touches the heap.
//!
//! ## Layout
//!
//! ```text
//!   encode(42)              -> "key-000000000042"      (12-digit index)
//!   encode_parallel(7, 42)  -> "key-0007-00000042"     (4-digit worker, 8-digit counter)
//! ```
//!
//! Indices wider than the field keep only their low digits, so the output
//! width is constant; within `[0, 10^width)` encoding is collision-free and
//! lexical order matches numeric order. The two layouts differ in length and
//! never alias each other.
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::key::{self, KeyCodec};
//!
//! let k = key::encode(42);
//! assert_eq!(k.as_str(), "key-000000000042");
//! assert_eq!(key::decode(k.as_str()), Some(42));
//!
//! let narrow = KeyCodec::new(4);
//! assert_eq!(narrow.encode(7).as_str(), "key-0007");
//! ```

use std::fmt;

/// Prefix shared by every encoded key.
pub const KEY_PREFIX: &str = "key-";
/// Default width of the index field.
pub const INDEX_WIDTH: usize = 12;
/// Width of the worker field in parallel keys.
pub const WORKER_WIDTH: usize = 4;
/// Width of the counter field in parallel keys.
pub const COUNTER_WIDTH: usize = 8;
/// Widest index field a codec accepts (`u64::MAX` has 20 digits).
pub const MAX_INDEX_WIDTH: usize = 20;

const MAX_KEY_LEN: usize = 32;

/// An encoded key held inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedKey {
    buf: [u8; MAX_KEY_LEN],
    len: u8,
}

impl EncodedKey {
    fn with_prefix() -> Self {
        let mut buf = [0u8; MAX_KEY_LEN];
        buf[..KEY_PREFIX.len()].copy_from_slice(KEY_PREFIX.as_bytes());
        Self {
            buf,
            len: KEY_PREFIX.len() as u8,
        }
    }

    fn push_padded(&mut self, value: u64, width: usize) {
        let start = self.len as usize;
        write_padded(&mut self.buf[start..start + width], value);
        self.len += width as u8;
    }

    fn push_byte(&mut self, byte: u8) {
        self.buf[self.len as usize] = byte;
        self.len += 1;
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: the buffer only ever receives the ASCII prefix, ASCII
        // digits and '-' separators.
        unsafe { std::str::from_utf8_unchecked(&self.buf[..self.len as usize]) }
    }

    /// Returns the encoded length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always `false`; an encoded key carries at least the prefix.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<str> for EncodedKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-padded decimal into `dst`, keeping the low `dst.len()` digits.
#[inline]
fn write_padded(dst: &mut [u8], mut value: u64) {
    for slot in dst.iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
    }
}

fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Encoder for single-space keys with a configurable index width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCodec {
    width: usize,
}

impl KeyCodec {
    /// Creates a codec whose index field is `width` digits, clamped to
    /// `1..=MAX_INDEX_WIDTH`.
    pub const fn new(width: usize) -> Self {
        let width = if width == 0 {
            1
        } else if width > MAX_INDEX_WIDTH {
            MAX_INDEX_WIDTH
        } else {
            width
        };
        Self { width }
    }

    /// Width of the index field in digits.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of indices that encode without wrapping (`10^width`, saturating).
    pub fn domain(&self) -> u64 {
        10u64.checked_pow(self.width as u32).unwrap_or(u64::MAX)
    }

    /// Total encoded key length.
    #[inline]
    pub fn key_len(&self) -> usize {
        KEY_PREFIX.len() + self.width
    }

    /// Encodes `index`.
    #[inline]
    pub fn encode(&self, index: u64) -> EncodedKey {
        let mut key = EncodedKey::with_prefix();
        key.push_padded(index, self.width);
        key
    }

    /// Parses a key produced by [`encode`](Self::encode) back to its index.
    pub fn decode(&self, key: &str) -> Option<u64> {
        let digits = key.strip_prefix(KEY_PREFIX)?;
        if digits.len() != self.width {
            return None;
        }
        parse_digits(digits)
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(INDEX_WIDTH)
    }
}

const DEFAULT_CODEC: KeyCodec = KeyCodec::new(INDEX_WIDTH);

/// Encodes `index` with the default 12-digit codec.
#[inline]
pub fn encode(index: u64) -> EncodedKey {
    DEFAULT_CODEC.encode(index)
}

/// Decodes a key produced by [`encode`].
pub fn decode(key: &str) -> Option<u64> {
    DEFAULT_CODEC.decode(key)
}

/// Encodes a key in a worker-private namespace.
///
/// Keys from distinct workers never collide as long as worker ids stay below
/// `10^WORKER_WIDTH`.
#[inline]
pub fn encode_parallel(worker: u64, counter: u64) -> EncodedKey {
    let mut key = EncodedKey::with_prefix();
    key.push_padded(worker, WORKER_WIDTH);
    key.push_byte(b'-');
    key.push_padded(counter, COUNTER_WIDTH);
    key
}

/// Parses a key produced by [`encode_parallel`] into `(worker, counter)`.
pub fn decode_parallel(key: &str) -> Option<(u64, u64)> {
    let rest = key.strip_prefix(KEY_PREFIX)?;
    let (worker, counter) = rest.split_once('-')?;
    if worker.len() != WORKER_WIDTH || counter.len() != COUNTER_WIDTH {
        return None;
    }
    Some((parse_digits(worker)?, parse_digits(counter)?))
}
