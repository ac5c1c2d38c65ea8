//! Optimized collection types for Tessera.
//!
//! Re-exports of hash collections using AHash. The draw pool keys these by
//! precomputed 64-bit content hashes, so the hashing cost of the key itself is
//! what matters here.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
