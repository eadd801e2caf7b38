//! Content hashing of rule objects.
//!
//! A rule item copied from a library onto a character is expected to keep its
//! author-controlled ("source") fields intact while the character's own data
//! (levels, points, chosen replacements) changes freely. Hashing only the
//! source fields lets the library view tell whether a character's copy still
//! matches the library original.
//!
//! Every implementation writes its fields in a fixed order. That order is part
//! of the stored-hash contract: reordering the writes changes every digest.
//!
//! Encoding rules:
//! - strings are written as a little-endian `u64` byte length followed by the
//!   UTF-8 bytes, so adjacent fields cannot run together
//! - [`Fxp`] values are written as their raw little-endian `i64`
//! - booleans are a single byte
//! - sequences are prefixed with their element count as a little-endian `u32`
//! - `None` writes nothing at all

use crate::criteria::{NumericCriteria, StringCriteria, WeightCriteria};
use crate::fxp::Fxp;
use crate::leveled::LeveledAmount;
use crate::weight::Weight;
use sha2::{Digest, Sha256};

/// A SHA-256 content digest.
pub type ContentDigest = [u8; 32];

/// Types whose source fields can be written into a running hash.
pub trait ContentHash {
    /// Write this value's source fields into `h`.
    fn hash_source(&self, h: &mut Sha256);
}

/// Hash a single value's source fields.
///
/// # Examples
///
/// ```rust
/// use rulecore::hashing::content_hash;
///
/// assert_eq!(content_hash("Stealth"), content_hash(&"Stealth".to_string()));
/// assert_ne!(content_hash("Stealth"), content_hash("Climbing"));
/// ```
pub fn content_hash<T: ContentHash + ?Sized>(value: &T) -> ContentDigest {
    let mut hasher = Sha256::new();
    value.hash_source(&mut hasher);
    hasher.finalize().into()
}

/// Lowercase hex form of a digest, for display and storage.
pub fn to_hex(digest: &ContentDigest) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl ContentHash for str {
    fn hash_source(&self, h: &mut Sha256) {
        h.update((self.len() as u64).to_le_bytes());
        h.update(self.as_bytes());
    }
}

impl ContentHash for String {
    fn hash_source(&self, h: &mut Sha256) {
        self.as_str().hash_source(h);
    }
}

impl ContentHash for bool {
    fn hash_source(&self, h: &mut Sha256) {
        h.update([u8::from(*self)]);
    }
}

impl ContentHash for Fxp {
    fn hash_source(&self, h: &mut Sha256) {
        h.update(self.raw().to_le_bytes());
    }
}

impl ContentHash for Weight {
    fn hash_source(&self, h: &mut Sha256) {
        self.pounds().hash_source(h);
    }
}

impl<T: ContentHash> ContentHash for Option<T> {
    fn hash_source(&self, h: &mut Sha256) {
        if let Some(value) = self {
            value.hash_source(h);
        }
    }
}

impl<T: ContentHash> ContentHash for [T] {
    fn hash_source(&self, h: &mut Sha256) {
        h.update((self.len() as u32).to_le_bytes());
        for one in self {
            one.hash_source(h);
        }
    }
}

impl<T: ContentHash> ContentHash for Vec<T> {
    fn hash_source(&self, h: &mut Sha256) {
        self.as_slice().hash_source(h);
    }
}

impl<T: ContentHash + ?Sized> ContentHash for &T {
    fn hash_source(&self, h: &mut Sha256) {
        (**self).hash_source(h);
    }
}

impl ContentHash for StringCriteria {
    fn hash_source(&self, h: &mut Sha256) {
        self.compare.key().hash_source(h);
        self.qualifier.hash_source(h);
    }
}

impl ContentHash for NumericCriteria {
    fn hash_source(&self, h: &mut Sha256) {
        self.compare.key().hash_source(h);
        self.qualifier.hash_source(h);
    }
}

impl ContentHash for WeightCriteria {
    fn hash_source(&self, h: &mut Sha256) {
        self.compare.key().hash_source(h);
        self.qualifier.hash_source(h);
    }
}

impl ContentHash for LeveledAmount {
    fn hash_source(&self, h: &mut Sha256) {
        self.amount.hash_source(h);
        self.per_level.hash_source(h);
    }
}
