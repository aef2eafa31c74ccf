//! Blending of offline and online rankings
//!
//! The two lists are interleaved position by position (offline first), the
//! tail of the longer list is appended, duplicates are dropped keeping the
//! earliest position, and the result is cut to `k`.

use super::dedup::dedup;
use super::{ItemId, RankedList};

/// Merge offline and online rankings into one list of at most `k` items.
pub fn merge(offline: &[ItemId], online: &[ItemId], k: usize) -> RankedList {
    let shared = offline.len().min(online.len());

    let mut interleaved = Vec::with_capacity(offline.len() + online.len());
    for (off, on) in offline.iter().zip(online.iter()) {
        interleaved.push(*off);
        interleaved.push(*on);
    }
    interleaved.extend_from_slice(&offline[shared..]);
    interleaved.extend_from_slice(&online[shared..]);

    let mut blended = dedup(interleaved);
    blended.truncate(k);
    blended
}
